//! Test fixtures: source trees, archives and local git repositories.

use std::io::Write;
use std::path::{Path, PathBuf};

use git2::{Oid, Repository, Signature};

/// Write `files` (path relative to `root` -> content) under `root`.
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
}

/// A `pyproject.toml` with a `[project]` table.
pub fn pyproject(name: &str, version: &str, deps: &[&str]) -> String {
    let deps = deps
        .iter()
        .map(|d| format!("    \"{}\",", d))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"[build-system]
requires = ["setuptools>=61"]
build-backend = "setuptools.build_meta"

[project]
name = "{name}"
version = "{version}"
description = "The {name} project"
dependencies = [
{deps}
]
"#
    )
}

/// A `setup.py` calling `setup()` with literal arguments.
pub fn setup_py(name: &str, version: &str, deps: &[&str]) -> String {
    let deps = deps
        .iter()
        .map(|d| format!("'{}'", d))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"from setuptools import setup, find_packages

setup(
    name='{name}',
    version='{version}',
    packages=find_packages(),
    install_requires=[{deps}],
)
"#
    )
}

/// A plain tar stream with the given regular files.
pub fn tar_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, content.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap()
}

pub fn tar_gz_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&tar_bytes(entries)).unwrap();
    encoder.finish().unwrap()
}

pub fn tar_bz2_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(&tar_bytes(entries)).unwrap();
    encoder.finish().unwrap()
}

pub fn write_tar_gz(path: &Path, entries: &[(&str, &str)]) {
    std::fs::write(path, tar_gz_bytes(entries)).unwrap();
}

pub fn write_tar_bz2(path: &Path, entries: &[(&str, &str)]) {
    std::fs::write(path, tar_bz2_bytes(entries)).unwrap();
}

pub fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in entries {
        zip.start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// A bare git repository that tests commit into directly.
///
/// Files are top-level only; commits are built from trees, not a working copy.
pub struct GitFixture {
    path: PathBuf,
    repo: Repository,
}

impl GitFixture {
    pub fn new(path: &Path) -> Self {
        std::fs::create_dir_all(path).unwrap();
        let repo = Repository::init_bare(path).unwrap();
        GitFixture {
            path: path.to_path_buf(),
            repo,
        }
    }

    /// Clone URL for this repository.
    pub fn url(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Commit `file` on the branch HEAD points at.
    pub fn commit(&self, file: &str, content: &str, message: &str) -> Oid {
        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok());
        self.commit_with_parent("HEAD", parent, file, content, message)
    }

    /// Commit `file` on an existing branch without moving HEAD.
    pub fn commit_on(&self, branch: &str, file: &str, content: &str, message: &str) -> Oid {
        let parent = self
            .repo
            .find_branch(branch, git2::BranchType::Local)
            .unwrap()
            .get()
            .peel_to_commit()
            .unwrap();
        self.commit_with_parent(&format!("refs/heads/{}", branch), Some(parent), file, content, message)
    }

    pub fn branch(&self, name: &str, at: Oid) {
        let commit = self.repo.find_commit(at).unwrap();
        self.repo.branch(name, &commit, true).unwrap();
    }

    /// Lightweight tag.
    pub fn tag(&self, name: &str, at: Oid) {
        let object = self.repo.find_object(at, None).unwrap();
        self.repo.tag_lightweight(name, &object, false).unwrap();
    }

    fn commit_with_parent(
        &self,
        update_ref: &str,
        parent: Option<git2::Commit<'_>>,
        file: &str,
        content: &str,
        message: &str,
    ) -> Oid {
        let base_tree = parent.as_ref().map(|p| p.tree().unwrap());
        let mut builder = self.repo.treebuilder(base_tree.as_ref()).unwrap();
        let blob = self.repo.blob(content.as_bytes()).unwrap();
        builder.insert(file, blob, 0o100644).unwrap();
        let tree = self.repo.find_tree(builder.write().unwrap()).unwrap();

        let sig = Signature::now("Fixture", "fixture@example.com").unwrap();
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        self.repo
            .commit(Some(update_ref), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }
}
