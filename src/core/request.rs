//! Package requests - WHAT the user asked to install.

use std::fmt;

use url::Url;

use crate::core::error::InstallError;

/// Which revision of a repository to build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum VcsReference {
    /// Whatever the remote's HEAD points at
    #[default]
    DefaultBranch,
    /// Passed to the clone itself
    Branch(String),
    /// Checked out after cloning, as `refs/tags/<tag>`
    Tag(String),
    /// Checked out after cloning; full or abbreviated object id
    Commit(String),
}

impl VcsReference {
    /// Build a reference from optional branch/tag/commit values.
    ///
    /// At most one of the three may be set.
    pub fn from_parts(
        branch: Option<String>,
        tag: Option<String>,
        commit: Option<String>,
    ) -> Result<Self, InstallError> {
        let set = [&branch, &tag, &commit]
            .iter()
            .filter(|v| v.is_some())
            .count();
        if set > 1 {
            return Err(InstallError::InvalidRequest(
                "only one of branch, tag or commit can be specified".to_string(),
            ));
        }

        let non_empty = |kind: &str, value: String| {
            if value.trim().is_empty() {
                Err(InstallError::InvalidRequest(format!("empty {} name", kind)))
            } else {
                Ok(value)
            }
        };

        Ok(match (branch, tag, commit) {
            (Some(b), None, None) => VcsReference::Branch(non_empty("branch", b)?),
            (None, Some(t), None) => VcsReference::Tag(non_empty("tag", t)?),
            (None, None, Some(c)) => VcsReference::Commit(non_empty("commit", c)?),
            _ => VcsReference::DefaultBranch,
        })
    }
}

impl fmt::Display for VcsReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsReference::DefaultBranch => write!(f, "default branch"),
            VcsReference::Branch(b) => write!(f, "branch {}", b),
            VcsReference::Tag(t) => write!(f, "tag {}", t),
            VcsReference::Commit(c) => write!(f, "commit {}", c),
        }
    }
}

/// A request to install one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageRequest {
    /// A registry package, optionally pinned to an exact version
    Registry {
        name: String,
        version: Option<String>,
    },
    /// A version-control repository
    VersionControl { url: String, reference: VcsReference },
}

impl PackageRequest {
    /// Create a registry request.
    pub fn registry(
        name: impl Into<String>,
        version: Option<String>,
    ) -> Result<Self, InstallError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(InstallError::InvalidRequest(
                "package name is empty".to_string(),
            ));
        }
        if name.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(InstallError::InvalidRequest(format!(
                "invalid package name `{}`",
                name
            )));
        }
        let version = match version.map(|v| v.trim().to_string()) {
            Some(v) if v.is_empty() => {
                return Err(InstallError::InvalidRequest(format!(
                    "empty version for `{}`",
                    name
                )))
            }
            other => other,
        };
        Ok(PackageRequest::Registry { name, version })
    }

    /// Create a version-control request. At most one of branch/tag/commit may be set.
    pub fn vcs(
        url: impl Into<String>,
        branch: Option<String>,
        tag: Option<String>,
        commit: Option<String>,
    ) -> Result<Self, InstallError> {
        let reference = VcsReference::from_parts(branch, tag, commit)?;
        let url = url.into().trim().to_string();
        if url.is_empty() {
            return Err(InstallError::InvalidRequest(
                "repository URL is empty".to_string(),
            ));
        }
        Ok(PackageRequest::VersionControl { url, reference })
    }

    /// Human-readable label for logs.
    pub fn label(&self) -> String {
        match self {
            PackageRequest::Registry {
                name,
                version: Some(v),
            } => format!("{}=={}", name, v),
            PackageRequest::Registry {
                name,
                version: None,
            } => name.clone(),
            PackageRequest::VersionControl {
                url,
                reference: VcsReference::DefaultBranch,
            } => url.clone(),
            PackageRequest::VersionControl { url, reference } => {
                format!("{} ({})", url, reference)
            }
        }
    }
}

/// Derive a project name from a repository URL.
///
/// Takes the last path segment and strips a trailing `.git`. Falls back to
/// `source` when that leaves nothing usable as a directory name.
pub fn project_name_from_url(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };

    let last = path
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);

    if name.is_empty() || name == "." || name == ".." || name.contains(['\\', '\0']) {
        "source".to_string()
    } else {
        name.to_string()
    }
}
