//! Host checks run once before any package is processed.
//!
//! - effective uid 0 (installs write under the system prefix)
//! - interpreter available on `PATH`
//! - host build packages installed, installing the missing ones

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::plan::InstallTarget;
use crate::util::config::Config;
use crate::util::diagnostic::Diagnostic;
use crate::util::process::{find_executable, CommandRunner, ProcessBuilder, ProcessError};

/// A preflight failure. Fatal for the run.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum PreflightError {
    #[error("this tool must be run as root")]
    #[diagnostic(code(srcinstall::preflight::not_root))]
    NotRoot,

    #[error("failed to query installed packages: {0}")]
    #[diagnostic(code(srcinstall::preflight::query_failed))]
    QueryFailed(#[source] ProcessError),

    #[error("failed to install host packages: {}", packages.join(", "))]
    #[diagnostic(code(srcinstall::preflight::install_failed))]
    InstallFailed {
        packages: Vec<String>,
        #[source]
        source: ProcessError,
    },
}

impl PreflightError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string());
        if let Some(code) = MietteDiagnostic::code(self) {
            diag = diag.with_code(code.to_string());
        }
        match self {
            PreflightError::NotRoot => {
                diag.with_suggestion("re-run with sudo, or pass --skip-preflight")
            }
            PreflightError::QueryFailed(e) => diag.with_context(format!("command: {}", e.command())),
            PreflightError::InstallFailed { source, .. } => {
                diag = diag.with_context(format!("command: {}", source.command()));
                if let Some((_, stderr)) = source.captured_output() {
                    if !stderr.trim().is_empty() {
                        diag = diag.with_context(format!("stderr:\n{}", stderr.trim_end()));
                    }
                }
                diag
            }
        }
    }
}

/// What preflight did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreflightReport {
    /// Packages that were missing and got installed
    pub installed: Vec<String>,
}

/// Whether the process runs with an effective uid of 0.
#[cfg(unix)]
pub fn effective_uid_is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn effective_uid_is_root() -> bool {
    false
}

/// Host packages needed for `target`.
pub fn required_host_packages(config: &Config, target: InstallTarget) -> Vec<String> {
    let mut packages = config.host.build_packages.clone();
    if target == InstallTarget::NativePackageBuild {
        for pkg in &config.host.rpm_packages {
            if !packages.contains(pkg) {
                packages.push(pkg.clone());
            }
        }
    }
    packages
}

/// Run the preflight checks.
pub fn run_preflight(
    runner: &dyn CommandRunner,
    config: &Config,
    target: InstallTarget,
    is_root: bool,
) -> Result<PreflightReport, PreflightError> {
    if config.preflight.require_root && !is_root {
        return Err(PreflightError::NotRoot);
    }

    if find_executable(&config.install.python).is_none() {
        tracing::warn!("`{}` was not found on PATH", config.install.python);
    }

    let mut report = PreflightReport::default();
    if !config.preflight.ensure_build_packages {
        return Ok(report);
    }

    tracing::info!("Checking host build packages");
    let mut missing = Vec::new();
    for pkg in required_host_packages(config, target) {
        let query = ProcessBuilder::new(&config.host.query_tool).args(["-q", pkg.as_str()]);
        let output = runner.run(&query).map_err(PreflightError::QueryFailed)?;
        if !output.is_success() {
            tracing::debug!("{} is not installed", pkg);
            missing.push(pkg);
        }
    }

    if missing.is_empty() {
        return Ok(report);
    }

    tracing::info!("Installing missing host packages: {}", missing.join(" "));
    let install = ProcessBuilder::new(&config.host.package_tool)
        .args(["install", "-y"])
        .args(&missing);
    runner
        .run_checked(&install)
        .map_err(|source| PreflightError::InstallFailed {
            packages: missing.clone(),
            source,
        })?;

    report.installed = missing;
    Ok(report)
}
