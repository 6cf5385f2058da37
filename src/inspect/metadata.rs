//! Name/version extraction strategies.
//!
//! Modern projects are read from `pyproject.toml`. Legacy projects have two
//! strategies: [`SetupScriptInvocation`] runs `setup.py egg_info` and reads
//! the generated `PKG-INFO` record, which executes project code and is only
//! used when the caller explicitly allows it; [`SetupScriptPattern`] reads
//! literals out of `setup.py` / `setup.cfg` without executing anything.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use regex::Regex;

use crate::inspect::{LEGACY_SCRIPT, MODERN_MANIFEST};
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Fields a strategy managed to find.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialMetadata {
    pub name: Option<String>,
    pub version: Option<String>,
    pub summary: Option<String>,
    pub license: Option<String>,
}

impl PartialMetadata {
    /// Whether both name and version are known.
    pub fn is_complete(&self) -> bool {
        self.name.is_some() && self.version.is_some()
    }

    /// Fill fields that are still missing from `other`.
    pub fn fill_from(&mut self, other: PartialMetadata) {
        fn fill(slot: &mut Option<String>, value: Option<String>) {
            if slot.is_none() {
                *slot = value.filter(|v| !v.trim().is_empty());
            }
        }
        fill(&mut self.name, other.name);
        fill(&mut self.version, other.version);
        fill(&mut self.summary, other.summary);
        fill(&mut self.license, other.license);
    }
}

/// A way of reading project metadata from a source tree.
pub trait MetadataStrategy {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    fn extract(&self, source_dir: &Path) -> Result<PartialMetadata>;
}

// ============================================================================
// pyproject.toml
// ============================================================================

/// Reads `[project]`, then `[tool.poetry]`, then top-level keys of `pyproject.toml`.
pub struct ModernManifest;

impl MetadataStrategy for ModernManifest {
    fn name(&self) -> &'static str {
        "pyproject.toml"
    }

    fn extract(&self, source_dir: &Path) -> Result<PartialMetadata> {
        let path = source_dir.join(MODERN_MANIFEST);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        match content.parse::<toml::Table>() {
            Ok(table) => Ok(metadata_from_table(&table)),
            Err(e) => {
                tracing::warn!("Error parsing {}: {}", path.display(), e);
                Ok(metadata_from_pyproject_text(&content))
            }
        }
    }
}

fn metadata_from_table(table: &toml::Table) -> PartialMetadata {
    let section = table
        .get("project")
        .and_then(|v| v.as_table())
        .or_else(|| {
            table
                .get("tool")
                .and_then(|t| t.get("poetry"))
                .and_then(|v| v.as_table())
        });

    let string = |t: &toml::Table, key: &str| t.get(key).and_then(|v| v.as_str()).map(str::to_string);

    let mut meta = PartialMetadata::default();
    if let Some(section) = section {
        meta.name = string(section, "name");
        meta.version = string(section, "version");
        meta.summary = string(section, "description");
        meta.license = match section.get("license") {
            Some(toml::Value::String(s)) => Some(s.clone()),
            Some(toml::Value::Table(t)) => string(t, "text"),
            _ => None,
        };
    }

    meta.fill_from(PartialMetadata {
        name: string(table, "name"),
        version: string(table, "version"),
        ..Default::default()
    });
    meta
}

/// Pattern fallback for manifests that are not valid TOML.
fn metadata_from_pyproject_text(content: &str) -> PartialMetadata {
    let mut meta = PartialMetadata {
        name: first_capture(r#"(?s)\[project\].*?name\s*=\s*["']([^"']+)["']"#, content),
        version: first_capture(r#"(?s)\[project\].*?version\s*=\s*["']([^"']+)["']"#, content),
        ..Default::default()
    };
    meta.fill_from(PartialMetadata {
        name: first_capture(r#"name\s*=\s*["']([^"']+)["']"#, content),
        version: first_capture(r#"version\s*=\s*["']([^"']+)["']"#, content),
        ..Default::default()
    });
    meta
}

// ============================================================================
// setup.py
// ============================================================================

/// Runs `<python> setup.py egg_info` and reads `*.egg-info/PKG-INFO`.
///
/// This executes code shipped in the source tree.
pub struct SetupScriptInvocation<'a> {
    runner: &'a dyn CommandRunner,
    python: String,
}

impl<'a> SetupScriptInvocation<'a> {
    pub fn new(runner: &'a dyn CommandRunner, python: impl Into<String>) -> Self {
        SetupScriptInvocation {
            runner,
            python: python.into(),
        }
    }
}

impl MetadataStrategy for SetupScriptInvocation<'_> {
    fn name(&self) -> &'static str {
        "setup.py egg_info"
    }

    fn extract(&self, source_dir: &Path) -> Result<PartialMetadata> {
        let cmd = ProcessBuilder::new(&self.python)
            .args([LEGACY_SCRIPT, "egg_info"])
            .cwd(source_dir);
        self.runner
            .run_checked(&cmd)
            .with_context(|| format!("`{}` failed", cmd.display_command()))?;

        let Some(pkg_info) = find_pkg_info(source_dir) else {
            bail!("egg-info directory not found");
        };
        let content = std::fs::read_to_string(&pkg_info)
            .with_context(|| format!("failed to read {}", pkg_info.display()))?;
        Ok(parse_pkg_info(&content))
    }
}

fn find_pkg_info(source_dir: &Path) -> Option<PathBuf> {
    let base = glob::Pattern::escape(&source_dir.to_string_lossy());
    ["*.egg-info/PKG-INFO", "src/*.egg-info/PKG-INFO"]
        .iter()
        .filter_map(|rel| glob::glob(&format!("{}/{}", base, rel)).ok())
        .flat_map(|paths| paths.filter_map(|p| p.ok()))
        .next()
}

/// Parse the header block of a core-metadata record. First occurrence wins.
pub fn parse_pkg_info(content: &str) -> PartialMetadata {
    let mut meta = PartialMetadata::default();
    for line in content.lines() {
        if line.trim().is_empty() {
            break;
        }
        let Some((key, value)) = line.split_once(": ") else {
            continue;
        };
        let value = value.trim().to_string();
        let slot = match key {
            "Name" => &mut meta.name,
            "Version" => &mut meta.version,
            "Summary" => &mut meta.summary,
            "License" => &mut meta.license,
            _ => continue,
        };
        if slot.is_none() && !value.is_empty() && value != "UNKNOWN" {
            *slot = Some(value);
        }
    }
    meta
}

/// Reads `name=` / `version=` literals from `setup.py`, then `setup.cfg` `[metadata]`.
pub struct SetupScriptPattern;

impl MetadataStrategy for SetupScriptPattern {
    fn name(&self) -> &'static str {
        "setup.py patterns"
    }

    fn extract(&self, source_dir: &Path) -> Result<PartialMetadata> {
        let mut meta = PartialMetadata::default();

        let script = source_dir.join(LEGACY_SCRIPT);
        if let Ok(content) = std::fs::read_to_string(&script) {
            meta.fill_from(PartialMetadata {
                name: first_capture(r#"name\s*=\s*["']([^"']+)["']"#, &content),
                version: first_capture(r#"version\s*=\s*["']([^"']+)["']"#, &content),
                summary: first_capture(r#"description\s*=\s*["']([^"']+)["']"#, &content),
                license: first_capture(r#"license\s*=\s*["']([^"']+)["']"#, &content),
            });
        }

        if !meta.is_complete() {
            let cfg = source_dir.join("setup.cfg");
            if let Ok(content) = std::fs::read_to_string(&cfg) {
                meta.fill_from(setup_cfg_metadata(&content));
            }
        }

        Ok(meta)
    }
}

/// `[metadata]` keys of a `setup.cfg`. Values starting with `attr:` or `file:` are skipped.
fn setup_cfg_metadata(content: &str) -> PartialMetadata {
    let mut in_metadata = false;
    let mut meta = PartialMetadata::default();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            in_metadata = trimmed == "[metadata]";
            continue;
        }
        if !in_metadata {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() || value.starts_with("attr:") || value.starts_with("file:") {
            continue;
        }
        let slot = match key.trim() {
            "name" => &mut meta.name,
            "version" => &mut meta.version,
            "description" => &mut meta.summary,
            "license" => &mut meta.license,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }
    meta
}

fn first_capture(pattern: &str, content: &str) -> Option<String> {
    Regex::new(pattern)
        .ok()?
        .captures(content)?
        .get(1)
        .map(|m| m.as_str().to_string())
}
