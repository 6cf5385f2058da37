//! Project inspection.
//!
//! Given a fetched source tree, work out which build dialect it uses, what it
//! calls itself and which dependencies it declares.

pub mod deps;
pub mod metadata;

use std::path::Path;

use crate::core::descriptor::{BuildDialect, ProjectDescriptor};
use crate::util::config::{InspectConfig, PLACEHOLDER_VERSION};
use crate::util::process::CommandRunner;

pub use deps::{extract_dependencies, EXTRACTOR_VERSION};
pub use metadata::{
    MetadataStrategy, ModernManifest, PartialMetadata, SetupScriptInvocation, SetupScriptPattern,
};

/// Modern declarative manifest.
pub const MODERN_MANIFEST: &str = "pyproject.toml";

/// Legacy imperative build script.
pub const LEGACY_SCRIPT: &str = "setup.py";

/// Detect the build dialect. A modern manifest wins over a legacy script.
pub fn detect_dialect(source_dir: &Path) -> BuildDialect {
    if source_dir.join(MODERN_MANIFEST).is_file() {
        BuildDialect::ModernProject
    } else if source_dir.join(LEGACY_SCRIPT).is_file() {
        BuildDialect::LegacySetupScript
    } else {
        BuildDialect::Unknown
    }
}

/// Inspects source trees into [`ProjectDescriptor`]s.
pub struct Inspector<'a> {
    runner: &'a dyn CommandRunner,
    python: String,
    allow_setup_script_execution: bool,
}

impl<'a> Inspector<'a> {
    pub fn new(runner: &'a dyn CommandRunner, python: impl Into<String>, config: &InspectConfig) -> Self {
        Inspector {
            runner,
            python: python.into(),
            allow_setup_script_execution: config.allow_setup_script_execution,
        }
    }

    /// Inspect `source_dir`.
    ///
    /// `hint` carries what the registry already said about the package; it
    /// fills fields the tree itself does not declare. Never fails: an
    /// unrecognized tree yields [`BuildDialect::Unknown`] with the directory
    /// name and a placeholder version.
    pub fn inspect(&self, source_dir: &Path, hint: Option<&PartialMetadata>) -> ProjectDescriptor {
        let dialect = detect_dialect(source_dir);
        tracing::info!("Detected build system: {}", dialect);

        let mut meta = PartialMetadata::default();
        for strategy in self.strategies(dialect) {
            if meta.is_complete() {
                break;
            }
            match strategy.extract(source_dir) {
                Ok(found) => {
                    tracing::debug!("{} found {:?}", strategy.name(), found);
                    meta.fill_from(found);
                }
                Err(e) => tracing::warn!("{} failed: {:#}", strategy.name(), e),
            }
        }

        if let Some(hint) = hint {
            meta.fill_from(hint.clone());
        }

        let name = meta.name.unwrap_or_else(|| directory_name(source_dir));
        let version = meta.version.unwrap_or_else(|| {
            tracing::warn!("No version found for {}; using {}", name, PLACEHOLDER_VERSION);
            PLACEHOLDER_VERSION.to_string()
        });

        let dependencies = extract_dependencies(source_dir, dialect);

        tracing::info!("Package: {} {}", name, version);
        ProjectDescriptor::new(name, version, dependencies, dialect)
            .with_summary(meta.summary)
            .with_license(meta.license)
    }

    fn strategies(&self, dialect: BuildDialect) -> Vec<Box<dyn MetadataStrategy + 'a>> {
        match dialect {
            BuildDialect::ModernProject => vec![Box::new(ModernManifest)],
            BuildDialect::LegacySetupScript => {
                let mut strategies: Vec<Box<dyn MetadataStrategy + 'a>> = Vec::new();
                if self.allow_setup_script_execution {
                    strategies.push(Box::new(SetupScriptInvocation::new(
                        self.runner,
                        self.python.clone(),
                    )));
                }
                strategies.push(Box::new(SetupScriptPattern));
                strategies
            }
            BuildDialect::Unknown => Vec::new(),
        }
    }
}

fn directory_name(source_dir: &Path) -> String {
    source_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string())
}
