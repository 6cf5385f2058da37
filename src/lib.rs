//! srcinstall - build and install Python projects from source on Fedora
//!
//! This crate provides the library behind the `srcinstall` binary:
//! locating source artifacts on a package registry or in a git repository,
//! fetching and unpacking them, inspecting the project layout, and driving
//! either a direct host install or a native RPM build.

pub mod builder;
pub mod core;
pub mod inspect;
pub mod ops;
pub mod sources;
pub mod util;

/// Test utilities and mocks for srcinstall unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a scripted command runner, archive builders and local git
/// repository fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{
    descriptor::ProjectDescriptor, error::InstallError, plan::InstallTarget,
    request::PackageRequest, workspace::Workspace,
};
pub use util::config::Config;
