//! Archive extraction
//!
//! Python distributions ship as `.zip` on Windows and `.tar.gz` elsewhere.
//! The format is chosen from the archive's file name. Extraction happens in a
//! sibling temp directory that is renamed into place only on success.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

/// Extract `archive` into `dest`, replacing anything already there
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<PathBuf> {
    let format = ArchiveFormat::from_path(archive)
        .ok_or_else(|| Error::extraction_failed(archive.display(), "unsupported archive format"))?;

    let staging = staging_dir(dest);
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    debug!("Extracting {} ({:?}) to {}", archive.display(), format, dest.display());
    let result = match format {
        ArchiveFormat::Zip => extract_zip(archive, &staging),
        ArchiveFormat::TarGz => extract_tar_gz(archive, &staging),
    };
    if let Err(e) = result {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    if dest.exists() {
        fs::remove_dir_all(dest)?;
    }
    fs::rename(&staging, dest)?;
    Ok(dest.to_path_buf())
}

/// Run [`extract_archive`] on the blocking thread pool
pub async fn extract_archive_async(archive: PathBuf, dest: PathBuf) -> Result<PathBuf> {
    let display = archive.display().to_string();
    tokio::task::spawn_blocking(move || extract_archive(&archive, &dest))
        .await
        .map_err(|e| Error::extraction_failed(display, e))?
}

fn staging_dir(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "extract".to_string());
    dest.with_file_name(format!(".{}.tmp", name))
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| Error::extraction_failed(archive.display(), e))?;
    zip.extract(dest)
        .map_err(|e| Error::extraction_failed(archive.display(), e))
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut tar = Archive::new(GzDecoder::new(file));
    tar.set_preserve_permissions(true);
    tar.unpack(dest)
        .map_err(|e| Error::extraction_failed(archive.display(), e))
}
