//! Environment publishing
//!
//! Turns a resolved installation into host commands: the location variable
//! first, then `PATH` entries for the root, its bin/scripts directory and any
//! OS-specific extras, in that order.

use crate::version::ToolVersion;
use pipetask_core::host::HostChannel;
use pipetask_core::platform::{bin_subdir_for, Arch, InstallLayout, Os, PlatformInfo};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// An installation ready to be exposed to later pipeline steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInstallation {
    pub version: ToolVersion,
    pub arch: Arch,
    pub root: PathBuf,
    /// Relative to `root`; empty when executables live in the root
    pub bin_subdir: String,
    pub extra_prepend_paths: Vec<PathBuf>,
    /// Value published for the location variable
    pub location: PathBuf,
    /// Acquired from the manifest during this run
    pub downloaded: bool,
}

impl ResolvedInstallation {
    /// Compute the layout of an installation rooted at `root`
    ///
    /// CPython on Windows also gets the per-user scripts directory that
    /// `pip install --user` writes to, when `APPDATA` is set.
    pub fn resolve(
        version: ToolVersion,
        arch: Arch,
        root: PathBuf,
        layout: InstallLayout,
        platform: &PlatformInfo,
    ) -> Self {
        let bin_subdir = bin_subdir_for(layout, platform.os).to_string();

        let location = match layout {
            InstallLayout::CPython => root.clone(),
            InstallLayout::PyPy if platform.os.is_windows() => root.clone(),
            InstallLayout::PyPy => root.join("bin"),
        };

        let mut extra_prepend_paths = Vec::new();
        if layout == InstallLayout::CPython && platform.os == Os::Windows {
            if let Some(appdata) = env::var_os("APPDATA") {
                extra_prepend_paths.push(user_scripts_dir(Path::new(&appdata), &version));
            }
        }

        Self {
            version,
            arch,
            root,
            bin_subdir,
            extra_prepend_paths,
            location,
            downloaded: false,
        }
    }

    /// The bin/scripts directory, if distinct from the root
    pub fn bin_dir(&self) -> Option<PathBuf> {
        (!self.bin_subdir.is_empty()).then(|| self.root.join(&self.bin_subdir))
    }
}

/// `%APPDATA%\Python\Python<major><minor>\Scripts`
fn user_scripts_dir(appdata: &Path, version: &ToolVersion) -> PathBuf {
    appdata
        .join("Python")
        .join(format!("Python{}{}", version.major(), version.minor()))
        .join("Scripts")
}

/// Emits location and `PATH` commands for an installation
pub struct EnvironmentPublisher {
    host: Arc<dyn HostChannel>,
    variable: String,
    add_to_path: bool,
}

impl EnvironmentPublisher {
    pub fn new(host: Arc<dyn HostChannel>, variable: impl Into<String>) -> Self {
        Self {
            host,
            variable: variable.into(),
            add_to_path: true,
        }
    }

    /// When disabled only the location variable is published
    pub fn with_add_to_path(mut self, add_to_path: bool) -> Self {
        self.add_to_path = add_to_path;
        self
    }

    pub fn publish(&self, installation: &ResolvedInstallation) {
        self.host
            .set_variable(&self.variable, &installation.location.display().to_string());

        if !self.add_to_path {
            debug!("Not adding {} to PATH", installation.root.display());
            return;
        }

        self.host.prepend_path(&installation.root);
        if let Some(bin_dir) = installation.bin_dir() {
            self.host.prepend_path(&bin_dir);
        }
        for extra in &installation.extra_prepend_paths {
            self.host.prepend_path(extra);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipetask_core::host::RecordingChannel;
    use serial_test::serial;

    fn v(s: &str) -> ToolVersion {
        ToolVersion::parse(s).unwrap()
    }

    fn prepended(channel: &RecordingChannel) -> Vec<String> {
        channel
            .commands_named("task.prependpath")
            .iter()
            .map(|c| c.data().to_string())
            .collect()
    }

    #[test]
    fn test_cpython_linux_order() {
        let platform = PlatformInfo::new(Os::Linux, Arch::X64);
        let root = PathBuf::from("/tool/Python/3.10.1/x64");
        let install = ResolvedInstallation::resolve(
            v("3.10.1"),
            Arch::X64,
            root.clone(),
            InstallLayout::CPython,
            &platform,
        );

        let channel = Arc::new(RecordingChannel::new());
        EnvironmentPublisher::new(channel.clone(), "pythonLocation").publish(&install);

        let commands = channel.commands();
        assert_eq!(commands[0].command(), "task.setvariable");
        assert_eq!(commands[0].property("variable"), Some("pythonLocation"));
        assert_eq!(commands[0].data(), root.display().to_string());
        assert_eq!(
            prepended(&channel),
            vec![
                root.display().to_string(),
                root.join("bin").display().to_string()
            ]
        );
    }

    #[test]
    #[serial]
    fn test_cpython_windows_adds_user_scripts_last() {
        let original = env::var_os("APPDATA");
        env::set_var("APPDATA", "/users/agent/AppData/Roaming");

        let platform = PlatformInfo::new(Os::Windows, Arch::X64);
        let root = PathBuf::from("/tool/Python/3.10.1/x64");
        let install = ResolvedInstallation::resolve(
            v("3.10.1"),
            Arch::X64,
            root.clone(),
            InstallLayout::CPython,
            &platform,
        );

        match original {
            Some(value) => env::set_var("APPDATA", value),
            None => env::remove_var("APPDATA"),
        }

        let channel = Arc::new(RecordingChannel::new());
        EnvironmentPublisher::new(channel.clone(), "pythonLocation").publish(&install);

        let expected_extra = PathBuf::from("/users/agent/AppData/Roaming")
            .join("Python")
            .join("Python310")
            .join("Scripts");
        assert_eq!(
            prepended(&channel),
            vec![
                root.display().to_string(),
                root.join("Scripts").display().to_string(),
                expected_extra.display().to_string(),
            ]
        );
    }

    #[test]
    fn test_pypy_location() {
        let root = PathBuf::from("/tool/PyPy/3.5.2/x64");

        let linux = PlatformInfo::new(Os::Linux, Arch::X64);
        let install = ResolvedInstallation::resolve(
            v("3.5.2"),
            Arch::X64,
            root.clone(),
            InstallLayout::PyPy,
            &linux,
        );
        assert_eq!(install.location, root.join("bin"));
        assert_eq!(install.bin_dir(), Some(root.join("bin")));

        let windows = PlatformInfo::new(Os::Windows, Arch::X64);
        let install = ResolvedInstallation::resolve(
            v("3.5.2"),
            Arch::X64,
            root.clone(),
            InstallLayout::PyPy,
            &windows,
        );
        assert_eq!(install.location, root);
        assert_eq!(install.bin_dir(), None);
        assert!(install.extra_prepend_paths.is_empty());
    }

    #[test]
    fn test_add_to_path_disabled_sets_variable_only() {
        let platform = PlatformInfo::new(Os::MacOs, Arch::Arm64);
        let install = ResolvedInstallation::resolve(
            v("3.12.0"),
            Arch::Arm64,
            PathBuf::from("/tool/Python/3.12.0/arm64"),
            InstallLayout::CPython,
            &platform,
        );

        let channel = Arc::new(RecordingChannel::new());
        EnvironmentPublisher::new(channel.clone(), "pythonLocation")
            .with_add_to_path(false)
            .publish(&install);

        let commands = channel.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command(), "task.setvariable");
    }
}
