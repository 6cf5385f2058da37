//! Workspace - the per-run temporary directory.
//!
//! Everything a run downloads, extracts, clones or builds lives under one
//! temp directory. The directory is removed when the [`Workspace`] is
//! dropped, so every exit path that unwinds through its owner (normal
//! completion, an early error return, an interrupt turned into an error)
//! cleans it up.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::util::config::WorkspaceConfig;

/// A process-scoped temporary directory.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
    next_scratch: usize,
}

impl Workspace {
    /// Create a fresh workspace under the configured parent (or the system temp dir).
    pub fn create(config: &WorkspaceConfig) -> Result<Self> {
        let parent = config
            .parent
            .clone()
            .unwrap_or_else(std::env::temp_dir);

        let dir = tempfile::Builder::new()
            .prefix(&config.prefix)
            .tempdir_in(&parent)
            .with_context(|| {
                format!("failed to create workspace under {}", parent.display())
            })?;
        let path = dir.path().to_path_buf();

        tracing::debug!("Created workspace {}", path.display());

        Ok(Workspace {
            dir: Some(dir),
            path,
            next_scratch: 0,
        })
    }

    /// Root of the workspace.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a new, uniquely named scratch directory for one package.
    pub fn scratch_dir(&mut self, label: &str) -> Result<PathBuf> {
        self.next_scratch += 1;
        let name = format!("{:03}-{}", self.next_scratch, sanitize_label(label));
        let dir = self.path.join(name);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;
        Ok(dir)
    }

    /// Remove the workspace now, reporting failures.
    pub fn close(mut self) -> Result<()> {
        match self.dir.take() {
            Some(dir) => {
                tracing::debug!("Cleaning up {}", self.path.display());
                dir.close()
                    .with_context(|| format!("failed to remove {}", self.path.display()))
            }
            None => Ok(()),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            tracing::debug!("Cleaning up {}", self.path.display());
            if let Err(e) = dir.close() {
                tracing::warn!("Failed to remove workspace {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Keep scratch directory names filesystem-friendly.
fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "entry".to_string()
    } else {
        cleaned
    }
}
