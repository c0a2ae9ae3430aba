//! Error types for pipetask-toolcache
//!
//! A lookup that finds nothing is not an error: locators return `Option`.
//! Only exhausting every strategy produces [`Error::VersionResolutionFailed`].

use pipetask_core::platform::{Arch, PlatformInfo};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Result type alias using pipetask-toolcache's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// A version that was considered during resolution and rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptedVersion {
    pub version: String,
    pub arch: Arch,
    pub stable: bool,
}

impl fmt::Display for AttemptedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.version, self.arch)?;
        if !self.stable {
            f.write_str(" (unstable)")?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// Version constraint could not be parsed
    #[error("Invalid version spec '{spec}': {reason}")]
    InvalidSpecFormat { spec: String, reason: String },

    /// Manifest could not be fetched or decoded
    #[error("Versions manifest unavailable at {url}: {reason}")]
    ManifestUnavailable { url: String, reason: String },

    /// Neither the tool cache nor the manifest had a match
    #[error(
        "{}",
        resolution_failure_message(.spec, .platform, .attempted_local, .attempted_remote)
    )]
    VersionResolutionFailed {
        spec: String,
        platform: PlatformInfo,
        attempted_local: Vec<AttemptedVersion>,
        /// `None` when the remote lookup was not attempted
        attempted_remote: Option<Vec<AttemptedVersion>>,
    },

    /// Post-extraction setup script exited non-zero
    #[error("Setup script {script} failed with exit code {code}")]
    SetupScriptFailed { script: String, code: i32 },

    /// Setup script ran past its time limit and was killed
    #[error("Setup script {script} timed out after {secs}s")]
    SetupScriptTimedOut { script: String, secs: u64 },

    #[error("Download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Failed to extract {archive}: {reason}")]
    ExtractionFailed { archive: String, reason: String },

    #[error("Tool cache error at {path}: {reason}")]
    Cache { path: String, reason: String },

    #[error(transparent)]
    Core(#[from] pipetask_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_spec(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSpecFormat {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    pub fn manifest_unavailable(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::ManifestUnavailable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn download_failed(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::DownloadFailed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn extraction_failed(archive: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::ExtractionFailed {
            archive: archive.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn cache(path: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::Cache {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn resolution_failure_message(
    spec: &str,
    platform: &PlatformInfo,
    attempted_local: &[AttemptedVersion],
    attempted_remote: &Option<Vec<AttemptedVersion>>,
) -> String {
    let mut message = format!(
        "Version spec {} for architecture {} did not match any version in the tool cache",
        spec, platform.arch
    );
    if attempted_remote.is_some() {
        message.push_str(" or the versions manifest");
    }
    message.push_str(&format!(" on {}.", platform));

    message.push_str("\nVersions in the tool cache:");
    push_grouped(&mut message, attempted_local);

    if let Some(remote) = attempted_remote {
        message.push_str("\nVersions in the versions manifest:");
        push_grouped(&mut message, remote);
    }
    message
}

fn push_grouped(message: &mut String, versions: &[AttemptedVersion]) {
    if versions.is_empty() {
        message.push_str("\n  (none)");
        return;
    }
    let mut by_arch: BTreeMap<Arch, Vec<&AttemptedVersion>> = BTreeMap::new();
    for attempted in versions {
        by_arch.entry(attempted.arch).or_default().push(attempted);
    }
    for (arch, entries) in by_arch {
        message.push_str(&format!("\n  {}:", arch));
        for entry in entries {
            message.push_str(&format!("\n    {}", entry));
        }
    }
}
