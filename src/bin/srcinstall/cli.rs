//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

/// srcinstall - build and install Python packages from source
#[derive(Parser, Debug)]
#[command(name = "srcinstall")]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["package", "requirements", "list_file", "mixed_sources", "git"]),
))]
#[command(group(
    ArgGroup::new("reference")
        .multiple(false)
        .args(["branch", "tag", "commit"]),
))]
pub struct Cli {
    /// Registry package name
    pub package: Option<String>,

    /// Exact version of the registry package
    #[arg(id = "package_version", value_name = "VERSION", requires = "package")]
    pub version: Option<String>,

    /// Install every entry of a pip-style requirements file
    #[arg(short = 'r', long, value_name = "FILE")]
    pub requirements: Option<PathBuf>,

    /// Install every package named in a plain list file
    #[arg(short = 'l', long, value_name = "FILE")]
    pub list_file: Option<PathBuf>,

    /// Install every entry of a manifest mixing registry packages and git URLs
    #[arg(short = 'm', long, value_name = "FILE")]
    pub mixed_sources: Option<PathBuf>,

    /// Install from a git repository
    #[arg(long, value_name = "URL")]
    pub git: Option<String>,

    /// Branch to clone
    #[arg(long, requires = "git")]
    pub branch: Option<String>,

    /// Tag to check out after cloning
    #[arg(long, requires = "git")]
    pub tag: Option<String>,

    /// Commit to check out after cloning
    #[arg(long, requires = "git")]
    pub commit: Option<String>,

    /// Build an RPM and install that instead of installing directly
    #[arg(long)]
    pub rpm: bool,

    /// Registry metadata root (overrides the config file)
    #[arg(long, value_name = "URL")]
    pub index_url: Option<String>,

    /// Install prefix for direct installs (overrides the config file)
    #[arg(long, value_name = "DIR")]
    pub prefix: Option<PathBuf>,

    /// Skip the root and host package checks
    #[arg(long)]
    pub skip_preflight: bool,

    /// Configuration file
    #[arg(long, env = "SRCINSTALL_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}
