//! Platform detection and naming conventions
//!
//! Maps the host's OS and CPU identifiers onto the small set the pipeline
//! tasks understand, and answers layout questions that differ per OS: the
//! tool cache architecture directory, manifest platform tokens, the
//! interpreter's bin/scripts subdirectory and executable suffixes.

use crate::error::{Error, Result};
use std::fmt;
use std::fs;
use std::str::FromStr;

/// Operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

impl Os {
    /// Map a vendor OS identifier (`win32`, `darwin`, `linux`, or a Rust
    /// `std::env::consts::OS` value) to an [`Os`]
    pub fn from_identifier(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "darwin" | "macos" | "osx" => Some(Self::MacOs),
            "win32" | "windows" | "windows_nt" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Platform token used by the Python versions manifest
    pub fn manifest_token(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "darwin",
            Self::Windows => "win32",
        }
    }

    /// Suffix appended to executable file names
    pub fn executable_suffix(self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            _ => "",
        }
    }

    pub fn is_windows(self) -> bool {
        matches!(self, Self::Windows)
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "Linux"),
            Self::MacOs => write!(f, "macOS"),
            Self::Windows => write!(f, "Windows"),
        }
    }
}

/// CPU architecture, named the way the tool cache names its directories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    X86,
    X64,
    Arm64,
}

impl Arch {
    pub const ALL: [Arch; 3] = [Arch::X86, Arch::X64, Arch::Arm64];

    /// Map a vendor architecture identifier to an [`Arch`]
    pub fn from_identifier(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "x86" | "ia32" | "i386" | "i686" => Some(Self::X86),
            "x64" | "x86_64" | "amd64" => Some(Self::X64),
            "arm64" | "aarch64" => Some(Self::Arm64),
            _ => None,
        }
    }

    /// Directory and manifest name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_identifier(s.trim()).ok_or_else(|| Error::invalid_architecture(s))
    }
}

/// Resolved host platform, immutable for the duration of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
    pub os: Os,
    pub arch: Arch,
    /// OS release used to pick manifest files built for a specific distro
    /// version (Linux `VERSION_ID`), when known
    pub os_version: Option<String>,
}

impl PlatformInfo {
    pub fn new(os: Os, arch: Arch) -> Self {
        Self {
            os,
            arch,
            os_version: None,
        }
    }

    /// Same OS, different architecture
    pub fn with_arch(&self, arch: Arch) -> Self {
        Self {
            arch,
            ..self.clone()
        }
    }

    pub fn with_os_version(mut self, version: impl Into<String>) -> Self {
        self.os_version = Some(version.into());
        self
    }
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.os, self.arch)?;
        if let Some(version) = &self.os_version {
            write!(f, " {}", version)?;
        }
        Ok(())
    }
}

/// Detect the current host platform
pub fn detect() -> Result<PlatformInfo> {
    let mut info = detect_from(std::env::consts::OS, std::env::consts::ARCH)?;
    if info.os == Os::Linux {
        info.os_version = read_os_release_version();
    }
    Ok(info)
}

/// Build a [`PlatformInfo`] from vendor OS and architecture identifiers
pub fn detect_from(os: &str, arch: &str) -> Result<PlatformInfo> {
    match (Os::from_identifier(os), Arch::from_identifier(arch)) {
        (Some(os), Some(arch)) => Ok(PlatformInfo::new(os, arch)),
        _ => Err(Error::unsupported_platform(os, arch)),
    }
}

fn read_os_release_version() -> Option<String> {
    let content = fs::read_to_string("/etc/os-release").ok()?;
    parse_os_release_version(&content)
}

fn parse_os_release_version(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        line.strip_prefix("VERSION_ID=")
            .map(|v| v.trim().trim_matches('"').to_string())
            .filter(|v| !v.is_empty())
    })
}

/// Installation layout of an interpreter build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallLayout {
    CPython,
    PyPy,
}

/// Subdirectory of an installation root holding its executables and
/// console scripts. Empty when executables live in the root itself.
pub fn bin_subdir_for(layout: InstallLayout, os: Os) -> &'static str {
    match (layout, os) {
        (InstallLayout::CPython, Os::Windows) => "Scripts",
        (InstallLayout::PyPy, Os::Windows) => "",
        _ => "bin",
    }
}
