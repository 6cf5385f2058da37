//! Project descriptors - what an inspected source tree declares.

use std::fmt;

/// Build-tooling convention a source tree follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildDialect {
    /// `pyproject.toml`
    ModernProject,
    /// `setup.py`
    LegacySetupScript,
    /// Neither
    Unknown,
}

impl fmt::Display for BuildDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildDialect::ModernProject => write!(f, "pyproject.toml"),
            BuildDialect::LegacySetupScript => write!(f, "setup.py"),
            BuildDialect::Unknown => write!(f, "unknown"),
        }
    }
}

/// Name, version, dependencies and dialect of a source tree.
///
/// Produced once by the inspector and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    name: String,
    version: String,
    declared_dependencies: Vec<String>,
    build_dialect: BuildDialect,
    summary: Option<String>,
    license: Option<String>,
}

impl ProjectDescriptor {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        declared_dependencies: Vec<String>,
        build_dialect: BuildDialect,
    ) -> Self {
        ProjectDescriptor {
            name: name.into(),
            version: version.into(),
            declared_dependencies,
            build_dialect,
            summary: None,
            license: None,
        }
    }

    /// Attach an optional one-line summary.
    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary;
        self
    }

    /// Attach an optional license string.
    pub fn with_license(mut self, license: Option<String>) -> Self {
        self.license = license;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Dependency specifiers in declaration order.
    pub fn declared_dependencies(&self) -> &[String] {
        &self.declared_dependencies
    }

    pub fn build_dialect(&self) -> BuildDialect {
        self.build_dialect
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn license(&self) -> Option<&str> {
        self.license.as_deref()
    }
}
