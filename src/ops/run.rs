//! Run entry point.
//!
//! Owns the run [`Workspace`] for the whole invocation. Every exit path
//! (success, a surfaced error, an interrupt) returns through here, so the
//! workspace is removed before the process exits.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::descriptor::ProjectDescriptor;
use crate::core::plan::InstallTarget;
use crate::core::request::PackageRequest;
use crate::core::workspace::Workspace;
use crate::ops::batch::{run_batch, BatchReport};
use crate::ops::install::{Installer, PackageInstaller};
use crate::ops::manifest::ManifestKind;
use crate::ops::preflight::{effective_uid_is_root, run_preflight};
use crate::util::config::Config;
use crate::util::interrupt::InterruptFlag;
use crate::util::process::SystemRunner;

/// What to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Single(PackageRequest),
    Manifest { path: PathBuf, kind: ManifestKind },
}

/// Options for one invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: RunMode,
    pub target: InstallTarget,
    pub skip_preflight: bool,
    pub show_progress: bool,
}

/// What a run produced.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Installed(ProjectDescriptor),
    Batch(BatchReport),
}

/// Run one invocation.
///
/// Single-package failures are surfaced as the returned error. Batch entry
/// failures are recorded in the report.
pub fn run(config: &Config, options: &RunOptions, interrupt: InterruptFlag) -> Result<RunOutcome> {
    let runner = SystemRunner::new(config.commands.timeout(), interrupt.clone());

    if !options.skip_preflight {
        run_preflight(&runner, config, options.target, effective_uid_is_root())?;
    }

    let mut workspace = Workspace::create(&config.workspace)?;
    let outcome = {
        let mut installer = Installer::new(
            config,
            options.target,
            &runner,
            &mut workspace,
            interrupt,
        )?
        .with_progress(options.show_progress);

        match &options.mode {
            RunMode::Single(request) => RunOutcome::Installed(installer.install(request)?),
            RunMode::Manifest { path, kind } => {
                RunOutcome::Batch(run_batch(path, *kind, &mut installer)?)
            }
        }
    };

    workspace.close().context("failed to clean up workspace")?;
    Ok(outcome)
}
