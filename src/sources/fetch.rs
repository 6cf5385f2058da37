//! Artifact fetcher.
//!
//! Registry artifacts are downloaded to `<filename>.part` and renamed once
//! complete, then extracted into `extracted.partial` and renamed to
//! `extracted` once the source root is known. A failure at any stage removes
//! the staged files, so a half-downloaded archive or half-extracted tree is
//! never handed to a later step.
//!
//! Repositories are cloned into `checkout/<project>`.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::core::artifact::{ArchiveFormat, SourceArtifact, SourceOrigin, SourceTree};
use crate::core::error::InstallError;
use crate::sources::archive::{extract_archive, resolve_source_root};
use crate::sources::git::GitFetcher;
use crate::sources::registry::build_http_client;
use crate::util::fs::{is_non_empty_dir, remove_dir_all_if_exists};
use crate::util::hash::{digest_matches, HashingWriter};
use crate::util::interrupt::InterruptFlag;

const CHUNK_SIZE: usize = 64 * 1024;

/// Subdirectory of the scratch dir that holds repository clones.
const CHECKOUT_DIR: &str = "checkout";

/// Fetches located sources into a scratch directory.
pub struct Fetcher {
    http: reqwest::blocking::Client,
    git: GitFetcher,
    interrupt: InterruptFlag,
    show_progress: bool,
}

impl Fetcher {
    pub fn new(download_timeout: Duration, interrupt: InterruptFlag) -> Result<Self, InstallError> {
        let http = build_http_client(download_timeout).map_err(|e| InstallError::Download {
            url: String::new(),
            message: e.to_string(),
        })?;
        Ok(Fetcher {
            http,
            git: GitFetcher::new(interrupt.clone()),
            interrupt,
            show_progress: false,
        })
    }

    /// Draw a byte progress bar during downloads.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Fetch `origin` into `scratch`.
    ///
    /// On success the returned source root exists and is non-empty.
    pub fn fetch(&self, origin: &SourceOrigin, scratch: &Path) -> Result<SourceTree, InstallError> {
        match origin {
            SourceOrigin::Registry {
                url,
                filename,
                sha256,
                ..
            } => self.fetch_archive(url, filename, sha256.as_deref(), scratch),
            SourceOrigin::VersionControl {
                url,
                project_name,
                reference,
            } => {
                let checkouts = scratch.join(CHECKOUT_DIR);
                std::fs::create_dir_all(&checkouts)?;
                let dest = checkouts.join(project_name);
                self.git.fetch(url, reference, &dest)?;

                if !is_non_empty_dir(&dest) {
                    remove_dir_all_if_exists(&dest).ok();
                    return Err(InstallError::Clone {
                        url: url.clone(),
                        message: "clone produced an empty working tree".to_string(),
                    });
                }

                Ok(SourceTree {
                    artifact: SourceArtifact::WorkingTree { path: dest.clone() },
                    root: dest,
                })
            }
        }
    }

    fn fetch_archive(
        &self,
        url: &str,
        filename: &str,
        sha256: Option<&str>,
        scratch: &Path,
    ) -> Result<SourceTree, InstallError> {
        let file_name = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());
        let archive_path = scratch.join(&file_name);

        let format = ArchiveFormat::from_filename(&file_name).ok_or_else(|| InstallError::Extract {
            path: archive_path.clone(),
            message: format!("unsupported archive format: {}", file_name),
        })?;

        self.download(url, &archive_path, sha256)?;

        if self.interrupt.is_set() {
            return Err(InstallError::Interrupted);
        }

        tracing::info!("Extracting {}", file_name);
        let root = stage_extraction(&archive_path, format, scratch)?;

        Ok(SourceTree {
            artifact: SourceArtifact::Archive {
                path: archive_path,
                format,
            },
            root,
        })
    }

    /// Stream `url` to `dest`, verifying the digest when one is known.
    fn download(&self, url: &str, dest: &Path, sha256: Option<&str>) -> Result<(), InstallError> {
        tracing::info!("Downloading {}", url);

        let partial = partial_path(dest);
        let result = self.download_to(url, &partial, sha256);
        match result {
            Ok(()) => std::fs::rename(&partial, dest).map_err(|e| InstallError::Download {
                url: url.to_string(),
                message: format!("failed to move download into place: {}", e),
            }),
            Err(e) => {
                let _ = std::fs::remove_file(&partial);
                Err(e)
            }
        }
    }

    fn download_to(&self, url: &str, partial: &Path, sha256: Option<&str>) -> Result<(), InstallError> {
        let download_error = |message: String| InstallError::Download {
            url: url.to_string(),
            message,
        };

        let mut response = self
            .http
            .get(url)
            .send()
            .map_err(|e| download_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_error(format!("HTTP {}", response.status())));
        }

        let progress = self.progress_bar(response.content_length());

        let mut file = HashingWriter::new(BufWriter::new(File::create(partial)?));
        let mut buffer = vec![0u8; CHUNK_SIZE];

        loop {
            if self.interrupt.is_set() {
                if let Some(pb) = &progress {
                    pb.abandon();
                }
                return Err(InstallError::Interrupted);
            }

            let n = response
                .read(&mut buffer)
                .map_err(|e| download_error(format!("failed to read response body: {}", e)))?;
            if n == 0 {
                break;
            }

            file.write_all(&buffer[..n])?;
            if let Some(pb) = &progress {
                pb.inc(n as u64);
            }
        }
        let (_, actual) = file.finish()?;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        if let Some(expected) = sha256 {
            if !digest_matches(expected, &actual) {
                return Err(download_error(format!(
                    "sha256 mismatch:\n  expected: {}\n  actual:   {}",
                    expected, actual
                )));
            }
            tracing::debug!("Digest verified: {}", &actual[..16]);
        }

        Ok(())
    }

    fn progress_bar(&self, total: Option<u64>) -> Option<ProgressBar> {
        let total = total.filter(|_| self.show_progress)?;
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Some(pb)
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Extract into a staging directory and publish it only once a source root was found.
fn stage_extraction(archive: &Path, format: ArchiveFormat, scratch: &Path) -> Result<PathBuf, InstallError> {
    let staging = scratch.join("extracted.partial");
    let target = scratch.join("extracted");

    let extract_error = |message: String| InstallError::Extract {
        path: archive.to_path_buf(),
        message,
    };

    remove_dir_all_if_exists(&staging).map_err(|e| extract_error(e.to_string()))?;

    let staged_root = extract_archive(archive, format, &staging)
        .and_then(|()| resolve_source_root(&staging))
        .map_err(|e| {
            let _ = remove_dir_all_if_exists(&staging);
            extract_error(format!("{:#}", e))
        })?;

    let relative = staged_root
        .strip_prefix(&staging)
        .map(Path::to_path_buf)
        .unwrap_or_default();

    std::fs::rename(&staging, &target).map_err(|e| {
        let _ = remove_dir_all_if_exists(&staging);
        extract_error(format!("failed to publish extracted tree: {}", e))
    })?;

    let root = target.join(relative);
    tracing::debug!("Source root: {}", root.display());
    Ok(root)
}
