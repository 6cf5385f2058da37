//! Build and install.
//!
//! [`BuildDispatcher`] routes an [`InstallPlan`] to one of two strategies:
//! a direct host install ([`direct`]) or a native package build ([`rpm`]).
//! The strategy is chosen once per run through [`InstallTarget`].

pub mod deps;
pub mod direct;
pub mod rpm;

use std::path::Path;

use crate::core::descriptor::BuildDialect;
use crate::core::error::InstallError;
use crate::core::plan::{InstallPlan, InstallTarget};
use crate::util::config::{HostConfig, InstallConfig};
use crate::util::process::CommandRunner;

pub use deps::DependencyInstaller;
pub use direct::DirectInstaller;
pub use rpm::RpmBuilder;

/// Dispatches install plans to a build strategy.
pub struct BuildDispatcher<'a> {
    runner: &'a dyn CommandRunner,
    install: InstallConfig,
    host: HostConfig,
}

impl<'a> BuildDispatcher<'a> {
    pub fn new(runner: &'a dyn CommandRunner, install: &InstallConfig, host: &HostConfig) -> Self {
        BuildDispatcher {
            runner,
            install: install.clone(),
            host: host.clone(),
        }
    }

    /// Build and install the plan's source tree.
    ///
    /// `work_dir` is the entry's scratch directory; native builds put their
    /// build tree there.
    pub fn build_and_install(&self, plan: &InstallPlan, work_dir: &Path) -> Result<(), InstallError> {
        if plan.descriptor.build_dialect() == BuildDialect::Unknown {
            tracing::error!("No recognized build system (pyproject.toml or setup.py)");
            return Err(InstallError::NoBuildSystem {
                path: plan.source_dir.clone(),
            });
        }

        tracing::info!(
            "Building and installing {} {} ({})",
            plan.descriptor.name(),
            plan.descriptor.version(),
            plan.target
        );

        match plan.target {
            InstallTarget::DirectHostInstall => {
                DirectInstaller::new(self.runner, &self.install).install(plan)
            }
            InstallTarget::NativePackageBuild => {
                RpmBuilder::new(self.runner, &self.host).build_and_install(plan, work_dir)
            }
        }
    }
}
