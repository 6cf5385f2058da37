//! Archive extraction and source-root resolution.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::artifact::ArchiveFormat;

/// Extract an archive into `dest`.
///
/// Entries that would land outside `dest` are skipped.
pub fn extract_archive(archive: &Path, format: ArchiveFormat, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create destination directory: {}", dest.display()))?;

    let file = File::open(archive)
        .with_context(|| format!("failed to open archive: {}", archive.display()))?;
    let reader = BufReader::new(file);

    match format {
        ArchiveFormat::TarGz => unpack_tar(flate2::read::GzDecoder::new(reader), dest),
        ArchiveFormat::TarBz2 => unpack_tar(bzip2::read::BzDecoder::new(reader), dest),
        ArchiveFormat::Tar => unpack_tar(reader, dest),
        ArchiveFormat::Zip => {
            let mut zip = zip::ZipArchive::new(reader).context("failed to read zip archive")?;
            zip.extract(dest).context("failed to extract zip archive")?;
            Ok(())
        }
    }
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);

    for entry in archive.entries().context("failed to read tarball entries")? {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry
            .path()
            .context("failed to get entry path")?
            .into_owned();

        let unpacked = entry
            .unpack_in(dest)
            .with_context(|| format!("failed to extract {}", entry_path.display()))?;
        if !unpacked {
            tracing::warn!(
                "Skipping archive entry outside destination: {}",
                entry_path.display()
            );
        }
    }

    Ok(())
}

/// Pick the directory to build from inside an extraction root.
///
/// A single top-level directory is treated as a wrapper and returned; any
/// other layout resolves to the extraction root itself. Only one level is
/// collapsed. An empty extraction root is an error.
pub fn resolve_source_root(extracted: &Path) -> Result<PathBuf> {
    let mut entries = std::fs::read_dir(extracted)
        .with_context(|| format!("failed to read directory: {}", extracted.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("failed to read directory: {}", extracted.display()))?;

    match entries.len() {
        0 => bail!("archive produced no files"),
        1 => {
            let only = entries.remove(0);
            let path = only.path();
            if path.is_dir() {
                Ok(path)
            } else {
                Ok(extracted.to_path_buf())
            }
        }
        _ => Ok(extracted.to_path_buf()),
    }
}
