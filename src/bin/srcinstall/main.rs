//! srcinstall CLI - build and install Python packages from source

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;
use srcinstall::core::error::InstallError;
use srcinstall::core::plan::InstallTarget;
use srcinstall::core::request::PackageRequest;
use srcinstall::ops::{run, ManifestKind, PreflightError, RunMode, RunOptions, RunOutcome};
use srcinstall::util::config::{global_config_path, load_config, Config};
use srcinstall::util::diagnostic::emit;
use srcinstall::util::interrupt::install_signal_handlers;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = execute(cli) {
        report_error(&e, color);
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("srcinstall=debug")
    } else {
        EnvFilter::new("srcinstall=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let interrupt = install_signal_handlers();

    let global = global_config_path();
    let mut config = load_config(cli.config.as_deref(), global.as_deref())?;
    apply_overrides(&mut config, &cli);

    let options = RunOptions {
        mode: run_mode(&cli)?,
        target: if cli.rpm {
            InstallTarget::NativePackageBuild
        } else {
            InstallTarget::DirectHostInstall
        },
        skip_preflight: cli.skip_preflight,
        show_progress: std::io::stderr().is_terminal(),
    };

    match run(&config, &options, interrupt)? {
        RunOutcome::Installed(descriptor) => {
            tracing::info!(
                "Successfully installed {} {}",
                descriptor.name(),
                descriptor.version()
            );
        }
        RunOutcome::Batch(report) => {
            for failure in &report.failures {
                tracing::warn!(
                    "line {}: {} ({}): {}",
                    failure.line,
                    failure.request,
                    failure.kind,
                    failure.message
                );
            }
            println!("{}", report);
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(url) = &cli.index_url {
        config.registry.url = url.clone();
    }
    if let Some(prefix) = &cli.prefix {
        config.install.prefix = prefix.clone();
    }
}

fn run_mode(cli: &Cli) -> Result<RunMode> {
    if let Some(url) = &cli.git {
        let request = PackageRequest::vcs(
            url.as_str(),
            cli.branch.clone(),
            cli.tag.clone(),
            cli.commit.clone(),
        )?;
        return Ok(RunMode::Single(request));
    }

    let manifests = [
        (&cli.requirements, ManifestKind::Requirements),
        (&cli.list_file, ManifestKind::PackageList),
        (&cli.mixed_sources, ManifestKind::Mixed),
    ];
    for (path, kind) in manifests {
        if let Some(path) = path {
            return Ok(RunMode::Manifest {
                path: path.clone(),
                kind,
            });
        }
    }

    match &cli.package {
        Some(name) => Ok(RunMode::Single(PackageRequest::registry(
            name.as_str(),
            cli.version.clone(),
        )?)),
        None => anyhow::bail!("no package, manifest or repository given"),
    }
}

fn report_error(err: &anyhow::Error, color: bool) {
    if let Some(e) = err.downcast_ref::<InstallError>() {
        emit(&e.to_diagnostic(), color);
    } else if let Some(e) = err.downcast_ref::<PreflightError>() {
        emit(&e.to_diagnostic(), color);
    } else {
        eprintln!("error: {:#}", err);
    }
}
