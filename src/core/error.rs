//! Error taxonomy for locating, fetching, inspecting and installing a package.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::process::ProcessError;

/// Error from one package's pipeline.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum InstallError {
    #[error("invalid package request: {0}")]
    #[diagnostic(code(srcinstall::request::invalid))]
    InvalidRequest(String),

    #[error("no source artifact found for `{package}`{}", version_suffix(version.as_deref()))]
    #[diagnostic(code(srcinstall::locate::not_found))]
    NotFound {
        package: String,
        version: Option<String>,
    },

    #[error("registry query {url} failed: {message}")]
    #[diagnostic(code(srcinstall::locate::network))]
    Network { url: String, message: String },

    #[error("failed to download {url}: {message}")]
    #[diagnostic(code(srcinstall::fetch::download))]
    Download { url: String, message: String },

    #[error("failed to clone {url}: {message}")]
    #[diagnostic(code(srcinstall::fetch::clone))]
    Clone { url: String, message: String },

    #[error("failed to check out `{reference}` in {url}: {message}")]
    #[diagnostic(code(srcinstall::fetch::checkout))]
    Checkout {
        url: String,
        reference: String,
        message: String,
    },

    #[error("failed to extract {}: {message}", path.display())]
    #[diagnostic(code(srcinstall::fetch::extract))]
    Extract { path: PathBuf, message: String },

    #[error("no recognized build system in {}", path.display())]
    #[diagnostic(code(srcinstall::build::no_build_system))]
    NoBuildSystem { path: PathBuf },

    #[error("install command failed: {0}")]
    #[diagnostic(code(srcinstall::build::install_failed))]
    InstallCommandFailed(#[source] ProcessError),

    #[error("native package build failed: {message}")]
    #[diagnostic(code(srcinstall::build::packaging_failed))]
    PackagingFailed {
        message: String,
        #[source]
        source: Option<ProcessError>,
    },

    #[error("interrupted")]
    #[diagnostic(code(srcinstall::interrupted))]
    Interrupted,

    #[error(transparent)]
    #[diagnostic(code(srcinstall::io))]
    Io(#[from] std::io::Error),
}

fn version_suffix(version: Option<&str>) -> String {
    version.map(|v| format!(" version {}", v)).unwrap_or_default()
}

impl InstallError {
    /// Short classification used in batch summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            InstallError::InvalidRequest(_) => "InvalidRequest",
            InstallError::NotFound { .. } => "NotFound",
            InstallError::Network { .. } => "NetworkError",
            InstallError::Download { .. } => "DownloadError",
            InstallError::Clone { .. } => "CloneError",
            InstallError::Checkout { .. } => "CheckoutError",
            InstallError::Extract { .. } => "ExtractError",
            InstallError::NoBuildSystem { .. } => "NoBuildSystem",
            InstallError::InstallCommandFailed(_) => "InstallCommandFailed",
            InstallError::PackagingFailed { .. } => "PackagingFailed",
            InstallError::Interrupted => "Interrupted",
            InstallError::Io(_) => "IoError",
        }
    }

    pub fn is_interrupted(&self) -> bool {
        match self {
            InstallError::Interrupted => true,
            InstallError::InstallCommandFailed(e) => e.is_interrupted(),
            InstallError::PackagingFailed {
                source: Some(e), ..
            } => e.is_interrupted(),
            _ => false,
        }
    }

    /// The underlying command failure, if any.
    pub fn process_error(&self) -> Option<&ProcessError> {
        match self {
            InstallError::InstallCommandFailed(e) => Some(e),
            InstallError::PackagingFailed { source, .. } => source.as_ref(),
            _ => None,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string());
        if let Some(code) = MietteDiagnostic::code(self) {
            diag = diag.with_code(code.to_string());
        }

        if let Some(process) = self.process_error() {
            diag = diag.with_context(format!("command: {}", process.command()));
            match process {
                ProcessError::Failed { code, .. } => {
                    let code = code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "none (killed by signal)".to_string());
                    diag = diag.with_context(format!("exit code: {}", code));
                }
                other => diag = diag.with_context(other.to_string()),
            }
            if let Some((stdout, stderr)) = process.captured_output() {
                if !stderr.trim().is_empty() {
                    diag = diag.with_context(format!("stderr:\n{}", stderr.trim_end()));
                }
                if !stdout.trim().is_empty() {
                    diag = diag.with_context(format!("stdout:\n{}", stdout.trim_end()));
                }
            }
        }

        match self {
            InstallError::NotFound { .. } => diag.with_suggestion(suggestions::PACKAGE_NOT_FOUND),
            InstallError::Network { .. } | InstallError::Download { .. } => {
                diag.with_suggestion(suggestions::NETWORK)
            }
            InstallError::Clone { .. } | InstallError::Checkout { .. } => {
                diag.with_suggestion(suggestions::VCS)
            }
            InstallError::NoBuildSystem { path } => diag
                .with_location(path)
                .with_suggestion(suggestions::NO_BUILD_SYSTEM),
            InstallError::Extract { path, .. } => diag.with_location(path),
            InstallError::InstallCommandFailed(_) | InstallError::PackagingFailed { .. } => {
                diag.with_suggestion(suggestions::COMMAND_FAILED)
            }
            _ => diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failure_diagnostic_names_command_and_exit_code() {
        let err = InstallError::InstallCommandFailed(ProcessError::Failed {
            command: "python3 -m pip install . --prefix=/usr/local --root=/".to_string(),
            code: Some(1),
            stdout: "Processing /tmp/x\n".to_string(),
            stderr: "ERROR: No matching distribution\n".to_string(),
        });

        let text = err.to_diagnostic().format(false);
        assert!(text.contains("srcinstall::build::install_failed"));
        assert!(text.contains("command: python3 -m pip install . --prefix=/usr/local --root=/"));
        assert!(text.contains("exit code: 1"));
        assert!(text.contains("ERROR: No matching distribution"));
        assert!(text.contains("Processing /tmp/x"));
    }

    #[test]
    fn test_not_found_message() {
        let err = InstallError::NotFound {
            package: "foo".to_string(),
            version: Some("1.2.3".to_string()),
        };
        assert_eq!(err.to_string(), "no source artifact found for `foo` version 1.2.3");
        assert_eq!(err.kind(), "NotFound");
    }

    #[test]
    fn test_interrupted_through_process_error() {
        let err = InstallError::PackagingFailed {
            message: "rpmbuild did not finish".to_string(),
            source: Some(ProcessError::Interrupted {
                command: "rpmbuild -ba x.spec".to_string(),
            }),
        };
        assert!(err.is_interrupted());
        assert!(!InstallError::InvalidRequest("x".to_string()).is_interrupted());
    }
}
