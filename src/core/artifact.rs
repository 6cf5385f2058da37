//! Source origins and fetched artifacts - WHERE a package's source lives.

use std::path::PathBuf;

use crate::core::request::VcsReference;

/// Archive container formats the fetcher can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    TarGz,
    TarBz2,
    Tar,
    Zip,
}

impl ArchiveFormat {
    /// Detect the format from an archive file name.
    ///
    /// Wheels and eggs are zip containers.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if lower.ends_with(".tar.bz2") || lower.ends_with(".tbz2") || lower.ends_with(".tbz") {
            Some(ArchiveFormat::TarBz2)
        } else if lower.ends_with(".tar") {
            Some(ArchiveFormat::Tar)
        } else if lower.ends_with(".zip") || lower.ends_with(".whl") || lower.ends_with(".egg") {
            Some(ArchiveFormat::Zip)
        } else {
            None
        }
    }
}

/// Registry packaging type of a release file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributionKind {
    /// `sdist`
    Source,
    /// `bdist_wheel`, `bdist_egg`, ...
    Binary(String),
}

impl DistributionKind {
    pub fn from_packagetype(packagetype: &str) -> Self {
        if packagetype == "sdist" {
            DistributionKind::Source
        } else {
            DistributionKind::Binary(packagetype.to_string())
        }
    }
}

/// A fetchable location produced by the source locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    /// A downloadable registry artifact
    Registry {
        name: String,
        /// Version requested, or the version the registry reported as latest
        version: Option<String>,
        url: String,
        filename: String,
        kind: DistributionKind,
        /// Expected SHA256 digest, when the registry publishes one
        sha256: Option<String>,
    },
    /// A repository to clone
    VersionControl {
        url: String,
        project_name: String,
        reference: VcsReference,
    },
}

/// A fetched artifact, owned by the run workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceArtifact {
    /// A downloaded archive
    Archive { path: PathBuf, format: ArchiveFormat },
    /// A cloned working tree
    WorkingTree { path: PathBuf },
}

/// The result of a successful fetch: the artifact and the directory to build from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    pub artifact: SourceArtifact,
    /// Existing, non-empty source root
    pub root: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_format_from_filename() {
        assert_eq!(ArchiveFormat::from_filename("foo-1.2.3.tar.gz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_filename("foo-1.2.3.TGZ"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_filename("foo.tar.bz2"), Some(ArchiveFormat::TarBz2));
        assert_eq!(ArchiveFormat::from_filename("foo.tar"), Some(ArchiveFormat::Tar));
        assert_eq!(ArchiveFormat::from_filename("foo.zip"), Some(ArchiveFormat::Zip));
        assert_eq!(
            ArchiveFormat::from_filename("foo-1.0-py3-none-any.whl"),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(ArchiveFormat::from_filename("foo.tar.xz"), None);
        assert_eq!(ArchiveFormat::from_filename("foo.exe"), None);
    }

    #[test]
    fn test_distribution_kind() {
        assert_eq!(DistributionKind::from_packagetype("sdist"), DistributionKind::Source);
        assert_eq!(
            DistributionKind::from_packagetype("bdist_wheel"),
            DistributionKind::Binary("bdist_wheel".to_string())
        );
    }
}
