//! Builder patterns for manifest test data

use pipetask_toolcache::manifest::{ManifestFile, ManifestRelease};

use super::constants::*;

/// Builder for [`ManifestRelease`] with sensible test defaults
#[derive(Debug, Clone)]
pub struct ReleaseBuilder {
    version: String,
    stable: bool,
    files: Vec<ManifestFile>,
}

impl ReleaseBuilder {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            stable: true,
            files: Vec::new(),
        }
    }

    pub fn unstable(mut self) -> Self {
        self.stable = false;
        self
    }

    /// Add a Linux `.tar.gz` file served under `base_url`
    pub fn linux_file(mut self, base_url: &str, arch: &str) -> Self {
        let path = archive_path(&self.version, arch);
        self.files.push(ManifestFile {
            filename: path.trim_start_matches('/').to_string(),
            arch: arch.to_string(),
            platform: "linux".to_string(),
            platform_version: None,
            download_url: format!("{}{}", base_url, path),
        });
        self
    }

    /// Add a Windows `.zip` file that tests never download
    pub fn windows_file(mut self, arch: &str) -> Self {
        self.files.push(ManifestFile {
            filename: format!("python-{}-win32-{}.zip", self.version, arch),
            arch: arch.to_string(),
            platform: "win32".to_string(),
            platform_version: None,
            download_url: format!(
                "https://example.test/python-{}-win32-{}.zip",
                self.version, arch
            ),
        });
        self
    }

    pub fn build(self) -> ManifestRelease {
        ManifestRelease {
            version: self.version,
            stable: self.stable,
            release_url: None,
            files: self.files,
        }
    }
}
