//! Configuration file support.
//!
//! Configuration is read from, in order of precedence:
//! 1. An explicit file (`--config` / `SRCINSTALL_CONFIG`); must load.
//! 2. The global file `~/.srcinstall/config.toml`; a broken file is
//!    reported and ignored.
//! 3. Built-in defaults.
//!
//! Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default registry metadata root.
pub const DEFAULT_REGISTRY_URL: &str = "https://pypi.org/pypi";

/// Default temp-directory prefix for run workspaces.
pub const DEFAULT_WORKSPACE_PREFIX: &str = "srcinstall_";

/// Version used when neither the project nor the registry provides one.
pub const PLACEHOLDER_VERSION: &str = "0.1";

/// srcinstall configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry settings
    pub registry: RegistryConfig,

    /// Host install settings
    pub install: InstallConfig,

    /// Host package tooling
    pub host: HostConfig,

    /// Workspace settings
    pub workspace: WorkspaceConfig,

    /// Project inspection settings
    pub inspect: InspectConfig,

    /// Subprocess settings
    pub commands: CommandConfig,

    /// Preflight checks
    pub preflight: PreflightConfig,
}

/// Package registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Metadata root; requests go to `<url>/<name>/[<version>/]json`
    pub url: String,

    /// HTTP timeout in seconds for metadata queries and downloads
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            url: DEFAULT_REGISTRY_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for installing onto the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Install prefix passed to pip / setup.py
    pub prefix: PathBuf,

    /// Filesystem root passed to pip / setup.py
    pub root: PathBuf,

    /// Python interpreter
    pub python: String,

    /// Run `ldconfig` after a direct install
    pub refresh_library_cache: bool,

    /// Requirement files checked, relative to the source root
    pub requirement_files: Vec<String>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        InstallConfig {
            prefix: PathBuf::from("/usr/local"),
            root: PathBuf::from("/"),
            python: "python3".to_string(),
            refresh_library_cache: true,
            requirement_files: vec![
                "requirements.txt".to_string(),
                "requirements/base.txt".to_string(),
                "requirements/production.txt".to_string(),
            ],
        }
    }
}

/// Host package manager settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Installs system packages and built RPMs (`<tool> install -y ...`)
    pub package_tool: String,

    /// Queries installed system packages (`<tool> -q <pkg>`)
    pub query_tool: String,

    /// Native package builder
    pub rpmbuild: String,

    /// System packages needed to build from source
    pub build_packages: Vec<String>,

    /// Extra system packages needed for native package builds
    pub rpm_packages: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            package_tool: "dnf".to_string(),
            query_tool: "rpm".to_string(),
            rpmbuild: "rpmbuild".to_string(),
            build_packages: [
                "python3-devel",
                "gcc",
                "gcc-c++",
                "make",
                "cmake",
                "pkg-config",
                "python3-pip",
                "python3-setuptools",
                "python3-wheel",
                "python3-build",
                "git",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            rpm_packages: [
                "rpm-build",
                "python3-rpm-generators",
                "pyproject-rpm-macros",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Run workspace settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory name prefix
    pub prefix: String,

    /// Parent directory (defaults to the system temp directory)
    pub parent: Option<PathBuf>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        WorkspaceConfig {
            prefix: DEFAULT_WORKSPACE_PREFIX.to_string(),
            parent: None,
        }
    }
}

/// Project inspection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
    /// Allow running `setup.py egg_info` to read legacy project metadata.
    ///
    /// This executes code from the downloaded project.
    pub allow_setup_script_execution: bool,
}

impl Default for InspectConfig {
    fn default() -> Self {
        InspectConfig {
            allow_setup_script_execution: true,
        }
    }
}

/// Subprocess settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Per-command timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        CommandConfig {
            timeout_secs: Some(3600),
        }
    }
}

impl CommandConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Checks run before any package is processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreflightConfig {
    /// Refuse to run without an effective uid of 0
    pub require_root: bool,

    /// Install missing host build packages
    pub ensure_build_packages: bool,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        PreflightConfig {
            require_root: true,
            ensure_build_packages: true,
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }
}

/// Get the global srcinstall config directory (~/.srcinstall).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".srcinstall"))
}

/// Get the global config path (~/.srcinstall/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Resolve the effective configuration.
pub fn load_config(explicit: Option<&Path>, global: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::load(path);
    }

    Ok(global.map(Config::load_or_default).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.registry.url, "https://pypi.org/pypi");
        assert_eq!(config.install.prefix, PathBuf::from("/usr/local"));
        assert_eq!(config.install.root, PathBuf::from("/"));
        assert_eq!(config.workspace.prefix, "srcinstall_");
        assert!(config.host.build_packages.contains(&"python3-devel".to_string()));
        assert!(config.inspect.allow_setup_script_execution);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[install]
prefix = "/opt/py"

[inspect]
allow_setup_script_execution = false
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.install.prefix, PathBuf::from("/opt/py"));
        assert_eq!(config.install.python, "python3");
        assert!(!config.inspect.allow_setup_script_execution);
        assert_eq!(config.registry.timeout_secs, 60);
    }

    #[test]
    fn test_explicit_config_must_load() {
        let tmp = TempDir::new().unwrap();
        let broken = tmp.path().join("broken.toml");
        std::fs::write(&broken, "[install\nprefix = ").unwrap();

        assert!(load_config(Some(&broken), None).is_err());

        // The same broken file as the global config falls back to defaults.
        let config = load_config(None, Some(&broken)).unwrap();
        assert_eq!(config.install.prefix, PathBuf::from("/usr/local"));
    }
}
