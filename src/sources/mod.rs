//! Package sources.
//!
//! Locating a package (registry metadata or a version-control URL) and
//! fetching it into the run workspace (download + extract, or clone +
//! checkout).

pub mod archive;
pub mod fetch;
pub mod git;
pub mod locator;
pub mod registry;

pub use fetch::Fetcher;
pub use git::GitFetcher;
pub use locator::SourceLocator;
pub use registry::RegistryClient;
