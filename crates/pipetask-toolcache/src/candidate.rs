//! Tool candidates and best-match selection

use crate::error::AttemptedVersion;
use crate::version::{ToolVersion, VersionSpec};
use pipetask_core::platform::Arch;
use std::path::PathBuf;

/// Where a candidate build lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateLocation {
    /// Registered in the local tool cache
    Installed(PathBuf),
    /// Downloadable archive listed in a versions manifest
    Remote { download_url: String, filename: String },
}

/// A located or locatable build of a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCandidate {
    pub version: ToolVersion,
    pub arch: Arch,
    pub location: CandidateLocation,
    pub stable: bool,
}

impl ToolCandidate {
    pub fn installed(version: ToolVersion, arch: Arch, root: PathBuf) -> Self {
        let stable = !version.is_prerelease();
        Self {
            version,
            arch,
            location: CandidateLocation::Installed(root),
            stable,
        }
    }

    /// Install root, for candidates already in the tool cache
    pub fn root(&self) -> Option<&PathBuf> {
        match &self.location {
            CandidateLocation::Installed(path) => Some(path),
            CandidateLocation::Remote { .. } => None,
        }
    }

    pub fn to_attempted(&self) -> AttemptedVersion {
        AttemptedVersion {
            version: self.version.to_string(),
            arch: self.arch,
            stable: self.stable,
        }
    }
}

/// Pick the greatest version satisfying `spec` for `arch`
///
/// Architecture is a hard filter applied before any comparison. Unstable
/// candidates are skipped unless `allow_unstable` is set. Among equal
/// versions the first one in iteration order wins. Returns `None` when
/// nothing survives the filters.
pub fn select_best<'a, I>(
    candidates: I,
    spec: &VersionSpec,
    arch: Arch,
    allow_unstable: bool,
) -> Option<ToolCandidate>
where
    I: IntoIterator<Item = &'a ToolCandidate>,
{
    let mut best: Option<&ToolCandidate> = None;

    for candidate in candidates {
        if candidate.arch != arch {
            continue;
        }
        if !candidate.stable && !allow_unstable {
            continue;
        }
        if !spec.matches(&candidate.version, allow_unstable) {
            continue;
        }
        if best.is_none_or(|b| candidate.version > b.version) {
            best = Some(candidate);
        }
    }

    best.cloned()
}
