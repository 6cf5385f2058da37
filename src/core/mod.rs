//! Core data types: requests, origins, artifacts, descriptors, plans and
//! the run workspace.

pub mod artifact;
pub mod descriptor;
pub mod error;
pub mod plan;
pub mod request;
pub mod workspace;

pub use artifact::{ArchiveFormat, DistributionKind, SourceArtifact, SourceOrigin, SourceTree};
pub use descriptor::{BuildDialect, ProjectDescriptor};
pub use error::InstallError;
pub use plan::{InstallPlan, InstallTarget};
pub use request::{PackageRequest, VcsReference};
pub use workspace::Workspace;
