//! Batch driver.
//!
//! Reads a manifest line by line and dispatches every entry through a
//! [`PackageInstaller`]. A failing entry is logged with its line number and
//! the batch moves on; only an interrupt stops it.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};

use crate::core::error::InstallError;
use crate::ops::install::PackageInstaller;
use crate::ops::manifest::{parse_line, BatchEntry, ManifestKind};

/// One entry that did not install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    /// 1-based manifest line
    pub line: usize,
    pub request: String,
    pub kind: &'static str,
    pub message: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Non-blank, non-comment lines seen
    pub processed: usize,
    pub installed: usize,
    /// Malformed lines
    pub skipped: usize,
    pub failures: Vec<EntryFailure>,
}

impl BatchReport {
    /// Entries that were dispatched.
    pub fn dispatched(&self) -> usize {
        self.installed + self.failures.len()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} installed, {} failed, {} skipped",
            self.processed,
            self.installed,
            self.failures.len(),
            self.skipped
        )
    }
}

/// Run every entry of the manifest at `path`.
pub fn run_batch(
    path: &Path,
    kind: ManifestKind,
    installer: &mut dyn PackageInstaller,
) -> Result<BatchReport> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {} file: {}", kind, path.display()))?;

    tracing::info!("Processing {} file {}", kind, path.display());
    run_entries(&contents, kind, installer)
}

/// Run every entry of an already-read manifest.
pub fn run_entries(
    contents: &str,
    kind: ManifestKind,
    installer: &mut dyn PackageInstaller,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();

    for (index, raw) in contents.lines().enumerate() {
        let line_no = index + 1;
        let request = match parse_line(raw, kind) {
            BatchEntry::Skip => continue,
            BatchEntry::Malformed(reason) => {
                report.processed += 1;
                report.skipped += 1;
                tracing::warn!("Skipping line {}: {}", line_no, reason);
                continue;
            }
            BatchEntry::Registry(request) | BatchEntry::VersionControl(request) => request,
        };
        report.processed += 1;

        tracing::info!("Line {}: Installing {}", line_no, request.label());
        match installer.install(&request) {
            Ok(descriptor) => {
                report.installed += 1;
                tracing::info!(
                    "Line {}: Installed {} {}",
                    line_no,
                    descriptor.name(),
                    descriptor.version()
                );
            }
            Err(e) if e.is_interrupted() => {
                tracing::warn!("Interrupted at line {}", line_no);
                return Err(InstallError::Interrupted.into());
            }
            Err(e) => {
                tracing::error!("Error processing line {}: {}", line_no, e);
                for context in e.to_diagnostic().context {
                    tracing::error!("  {}", context);
                }
                report.failures.push(EntryFailure {
                    line: line_no,
                    request: request.label(),
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }
    }

    tracing::info!("Batch finished: {}", report);
    Ok(report)
}
