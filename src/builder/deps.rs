//! Dependency installation.
//!
//! Advisory only: every failure is logged and skipped, and the caller always
//! proceeds to the build step.

use std::path::Path;

use crate::core::descriptor::ProjectDescriptor;
use crate::util::config::InstallConfig;
use crate::util::process::{CommandRunner, ProcessBuilder, ProcessError};

/// Installs requirement files and declared dependencies with pip.
pub struct DependencyInstaller<'a> {
    runner: &'a dyn CommandRunner,
    python: String,
    requirement_files: Vec<String>,
}

impl<'a> DependencyInstaller<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &InstallConfig) -> Self {
        DependencyInstaller {
            runner,
            python: config.python.clone(),
            requirement_files: config.requirement_files.clone(),
        }
    }

    /// Install dependencies for the tree at `source_dir`.
    ///
    /// Requirement files come first, then each declared specifier on its
    /// own. Returns the number of successful installs. Stops early only
    /// when a command was interrupted.
    pub fn install_dependencies(&self, descriptor: &ProjectDescriptor, source_dir: &Path) -> usize {
        tracing::info!("Installing dependencies");
        let mut installed = 0;

        for file in &self.requirement_files {
            if !source_dir.join(file).is_file() {
                continue;
            }
            tracing::info!("Installing dependencies from {}", file);
            let cmd = self.pip(source_dir).args(["-r", file.as_str()]);
            match self.runner.run_checked(&cmd) {
                Ok(_) => {
                    installed += 1;
                    tracing::info!("Successfully installed dependencies from {}", file);
                }
                Err(e) if e.is_interrupted() => return installed,
                Err(e) => {
                    tracing::warn!("Failed to install some dependencies from {}: {}", file, failure_detail(&e))
                }
            }
        }

        let deps = descriptor.declared_dependencies();
        if !deps.is_empty() {
            tracing::info!("Installing {} declared dependencies", deps.len());
        }
        for dep in deps {
            let cmd = self.pip(source_dir).arg(dep);
            match self.runner.run_checked(&cmd) {
                Ok(_) => {
                    installed += 1;
                    tracing::info!("Installed dependency: {}", dep);
                }
                Err(e) if e.is_interrupted() => return installed,
                Err(e) => tracing::warn!("Failed to install dependency {}: {}", dep, failure_detail(&e)),
            }
        }

        installed
    }

    fn pip(&self, source_dir: &Path) -> ProcessBuilder {
        ProcessBuilder::new(&self.python)
            .args(["-m", "pip", "install"])
            .env("PIP_DISABLE_PIP_VERSION_CHECK", "1")
            .cwd(source_dir)
    }
}

fn failure_detail(e: &ProcessError) -> String {
    match e.captured_output() {
        Some((_, stderr)) if !stderr.trim().is_empty() => format!("{}: {}", e, stderr.trim_end()),
        _ => e.to_string(),
    }
}
