//! High-level operations.
//!
//! This module contains the run entry point and the drivers behind it.

pub mod batch;
pub mod install;
pub mod manifest;
pub mod preflight;
pub mod run;

pub use batch::{run_batch, BatchReport, EntryFailure};
pub use install::{Installer, PackageInstaller};
pub use manifest::{parse_line, BatchEntry, ManifestKind};
pub use preflight::{run_preflight, PreflightError, PreflightReport};
pub use run::{run, RunMode, RunOptions, RunOutcome};
