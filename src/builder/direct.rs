//! Direct host installation.

use crate::core::descriptor::BuildDialect;
use crate::core::error::InstallError;
use crate::core::plan::InstallPlan;
use crate::inspect::LEGACY_SCRIPT;
use crate::util::config::InstallConfig;
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Installs a source tree straight onto the host under the configured prefix.
pub struct DirectInstaller<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a InstallConfig,
}

impl<'a> DirectInstaller<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a InstallConfig) -> Self {
        DirectInstaller { runner, config }
    }

    pub fn install(&self, plan: &InstallPlan) -> Result<(), InstallError> {
        let cmd = self.install_command(plan)?;

        tracing::info!("Running: {}", cmd.display_command());
        self.runner
            .run_checked(&cmd)
            .map_err(InstallError::InstallCommandFailed)?;

        if self.config.refresh_library_cache {
            self.refresh_library_cache()?;
        }

        tracing::info!(
            "Installed {} {}",
            plan.descriptor.name(),
            plan.descriptor.version()
        );
        Ok(())
    }

    /// The install command for the plan's dialect.
    pub fn install_command(&self, plan: &InstallPlan) -> Result<ProcessBuilder, InstallError> {
        let prefix = format!("--prefix={}", self.config.prefix.display());
        let root = format!("--root={}", self.config.root.display());

        let cmd = match plan.descriptor.build_dialect() {
            BuildDialect::ModernProject => ProcessBuilder::new(&self.config.python)
                .args(["-m", "pip", "install", "."])
                .args([prefix, root]),
            BuildDialect::LegacySetupScript => ProcessBuilder::new(&self.config.python)
                .args([LEGACY_SCRIPT, "install"])
                .args([prefix, root]),
            BuildDialect::Unknown => {
                return Err(InstallError::NoBuildSystem {
                    path: plan.source_dir.clone(),
                })
            }
        };

        Ok(cmd.cwd(&plan.source_dir))
    }

    /// `ldconfig`. A failure here does not undo a finished install.
    fn refresh_library_cache(&self) -> Result<(), InstallError> {
        match self.runner.run_checked(&ProcessBuilder::new("ldconfig")) {
            Ok(_) => Ok(()),
            Err(e) if e.is_interrupted() => Err(InstallError::Interrupted),
            Err(e) => {
                tracing::warn!("Failed to refresh shared library cache: {}", e);
                Ok(())
            }
        }
    }
}
