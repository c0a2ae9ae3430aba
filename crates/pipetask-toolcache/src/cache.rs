//! Local tool cache
//!
//! Layout: `<root>/<tool>/<version>/<arch>/` holds an installation and the
//! sibling file `<root>/<tool>/<version>/<arch>.complete` marks it finished.
//! Entries without the marker are ignored by lookups. Registration writes
//! the marker last, under an exclusive lock on `<arch>.lock`.

use crate::candidate::{select_best, ToolCandidate};
use crate::error::{Error, Result};
use crate::version::{ToolVersion, VersionSpec};
use fs4::fs_std::FileExt;
use pipetask_core::platform::Arch;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Handle on the agent's tool cache directory
#[derive(Debug, Clone)]
pub struct ToolCache {
    root: PathBuf,
}

impl ToolCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Installation directory for one tool build
    pub fn install_dir(&self, tool: &str, version: &ToolVersion, arch: Arch) -> PathBuf {
        self.root.join(tool).join(version.as_str()).join(arch.as_str())
    }

    fn marker_path(&self, tool: &str, version: &ToolVersion, arch: Arch) -> PathBuf {
        self.root
            .join(tool)
            .join(version.as_str())
            .join(format!("{}.complete", arch))
    }

    fn lock_path(&self, tool: &str, version: &ToolVersion, arch: Arch) -> PathBuf {
        self.root
            .join(tool)
            .join(version.as_str())
            .join(format!("{}.lock", arch))
    }

    /// Whether a completed installation exists for this build
    pub fn is_installed(&self, tool: &str, version: &ToolVersion, arch: Arch) -> bool {
        self.marker_path(tool, version, arch).is_file()
            && self.install_dir(tool, version, arch).is_dir()
    }

    /// Every completed installation of `tool` for `arch`, ordered by
    /// directory name
    pub fn list(&self, tool: &str, arch: Arch) -> Result<Vec<ToolCandidate>> {
        let tool_dir = self.root.join(tool);
        let entries = match fs::read_dir(&tool_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::cache(tool_dir.display(), e)),
        };

        let mut names: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::cache(tool_dir.display(), e))?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        let mut candidates = Vec::new();
        for name in names {
            let Some(version) = ToolVersion::parse(&name) else {
                debug!("Skipping non-version directory {}", tool_dir.join(&name).display());
                continue;
            };
            if self.is_installed(tool, &version, arch) {
                let root = self.install_dir(tool, &version, arch);
                candidates.push(ToolCandidate::installed(version, arch, root));
            }
        }
        Ok(candidates)
    }

    /// Every completed installation of `tool`, across architectures
    pub fn list_all(&self, tool: &str) -> Result<Vec<ToolCandidate>> {
        let mut all = Vec::new();
        for arch in Arch::ALL {
            all.extend(self.list(tool, arch)?);
        }
        Ok(all)
    }

    /// Best completed installation of `tool` satisfying `spec` for `arch`
    pub fn find_local(
        &self,
        tool: &str,
        spec: &VersionSpec,
        arch: Arch,
        allow_unstable: bool,
    ) -> Result<Option<ToolCandidate>> {
        let candidates = self.list(tool, arch)?;
        let found = select_best(&candidates, spec, arch, allow_unstable);
        match &found {
            Some(candidate) => debug!(
                "Found {} {} ({}) in tool cache",
                tool, candidate.version, candidate.arch
            ),
            None => debug!(
                "No {} in tool cache matches {} ({}); {} installed",
                tool,
                spec,
                arch,
                candidates.len()
            ),
        }
        Ok(found)
    }

    /// Copy `source` into the cache as `tool`/`version`/`arch` and mark it
    /// complete. Returns the installation directory.
    ///
    /// If a completed entry already exists (another job got there first, or
    /// the setup script installed itself) it is reused untouched. An
    /// unfinished entry left by an interrupted run is replaced.
    pub fn register(
        &self,
        tool: &str,
        version: &ToolVersion,
        arch: Arch,
        source: &Path,
    ) -> Result<PathBuf> {
        let install_dir = self.install_dir(tool, version, arch);
        let version_dir = install_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&version_dir).map_err(|e| Error::cache(version_dir.display(), e))?;

        let lock_path = self.lock_path(tool, version, arch);
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| Error::cache(lock_path.display(), e))?;
        // Released when `lock_file` is dropped
        lock_file
            .lock_exclusive()
            .map_err(|e| Error::cache(lock_path.display(), e))?;

        if self.is_installed(tool, version, arch) {
            info!("{} {} ({}) is already registered", tool, version, arch);
            return Ok(install_dir);
        }

        let staging = tempfile::Builder::new()
            .prefix(&format!(".{}-", arch))
            .tempdir_in(&version_dir)
            .map_err(|e| Error::cache(version_dir.display(), e))?;
        copy_tree(source, staging.path())?;

        if install_dir.exists() {
            debug!("Removing unfinished entry {}", install_dir.display());
            fs::remove_dir_all(&install_dir).map_err(|e| Error::cache(install_dir.display(), e))?;
        }
        let staged = staging.keep();
        fs::rename(&staged, &install_dir).map_err(|e| Error::cache(install_dir.display(), e))?;

        let marker = self.marker_path(tool, version, arch);
        fs::write(&marker, b"").map_err(|e| Error::cache(marker.display(), e))?;

        info!(
            "Registered {} {} ({}) at {}",
            tool,
            version,
            arch,
            install_dir.display()
        );
        Ok(install_dir)
    }
}

/// Recursively copy `source` into the existing directory `dest`
fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(|e| Error::cache(source.display(), e))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| Error::cache(entry.path().display(), e))?;
        let target = dest.join(relative);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    let pointee = fs::read_link(link)?;
    std::os::unix::fs::symlink(pointee, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    fs::copy(link, target)?;
    Ok(())
}
