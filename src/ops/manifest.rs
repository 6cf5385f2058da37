//! Manifest line parsing.
//!
//! One entry per line. Blank lines and `#` comments are skipped. A line is a
//! version-control entry when it starts with a URL scheme and mentions a
//! known forge or a `.git` suffix; it may carry `--branch=`, `--tag=` or
//! `--commit=` modifiers (short forms `-b=`, `-t=`, `-c=`). Anything else is
//! `name` or `name==version`.
//!
//! Parsing is stateless per line and never fails: unusable lines become
//! [`BatchEntry::Malformed`].

use std::fmt;

use crate::core::request::PackageRequest;

const VCS_SCHEMES: [&str; 4] = ["http://", "https://", "git://", "ssh://"];
const VCS_MARKERS: [&str; 3] = ["github.com", "gitlab.com", ".git"];

/// Which kind of manifest is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    /// pip-style requirements file
    Requirements,
    /// Plain list of package names
    PackageList,
    /// Registry entries and version-control URLs
    Mixed,
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestKind::Requirements => write!(f, "requirements"),
            ManifestKind::PackageList => write!(f, "package list"),
            ManifestKind::Mixed => write!(f, "mixed sources"),
        }
    }
}

/// One classified manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEntry {
    /// Blank line or comment
    Skip,
    /// Unusable line, skipped with a warning
    Malformed(String),
    Registry(PackageRequest),
    VersionControl(PackageRequest),
}

impl BatchEntry {
    /// The request to dispatch, if any.
    pub fn request(&self) -> Option<&PackageRequest> {
        match self {
            BatchEntry::Registry(r) | BatchEntry::VersionControl(r) => Some(r),
            BatchEntry::Skip | BatchEntry::Malformed(_) => None,
        }
    }
}

/// Whether a line looks like a version-control URL.
pub fn is_vcs_line(line: &str) -> bool {
    VCS_SCHEMES.iter().any(|s| line.starts_with(s)) && VCS_MARKERS.iter().any(|m| line.contains(m))
}

/// Classify one manifest line.
pub fn parse_line(line: &str, kind: ManifestKind) -> BatchEntry {
    let mut line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return BatchEntry::Skip;
    }

    if kind == ManifestKind::Requirements {
        if let Some((before, _)) = line.split_once(" #") {
            line = before.trim_end();
        }
        if line.starts_with('-') {
            return BatchEntry::Malformed(format!("unsupported requirements option `{}`", line));
        }
    }

    if is_vcs_line(line) {
        return parse_vcs_line(line);
    }

    parse_registry_line(line)
}

fn parse_vcs_line(line: &str) -> BatchEntry {
    let mut parts = line.split_whitespace();
    let url = parts.next().unwrap_or_default();

    let (mut branch, mut tag, mut commit) = (None, None, None);
    for part in parts {
        let Some((key, value)) = part.split_once('=') else {
            tracing::warn!("Ignoring unknown modifier `{}`", part);
            continue;
        };
        match key {
            "--branch" | "-b" => branch = Some(value.to_string()),
            "--tag" | "-t" => tag = Some(value.to_string()),
            "--commit" | "-c" => commit = Some(value.to_string()),
            _ => tracing::warn!("Ignoring unknown modifier `{}`", part),
        }
    }

    match PackageRequest::vcs(url, branch, tag, commit) {
        Ok(request) => BatchEntry::VersionControl(request),
        Err(e) => BatchEntry::Malformed(e.to_string()),
    }
}

fn parse_registry_line(line: &str) -> BatchEntry {
    let (name, version) = match line.split_once("==") {
        Some((name, version)) => (name.trim(), Some(version.trim().to_string())),
        None => (line, None),
    };

    if name.contains(['<', '>', '!', '~', '=', ';', '[', '@']) {
        return BatchEntry::Malformed(format!(
            "unsupported requirement `{}`; only `name` or `name==version` entries are accepted",
            line
        ));
    }

    match PackageRequest::registry(name, version) {
        Ok(request) => BatchEntry::Registry(request),
        Err(e) => BatchEntry::Malformed(e.to_string()),
    }
}
