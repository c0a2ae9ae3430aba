//! Fake programs for process-level tests
//!
//! The fakes are small `sh` scripts, so the tests that use them are
//! `#[cfg(unix)]`.

use super::constants::*;
use pipetask_core::host::{HostChannel, RecordingChannel};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recording host plus the same channel as a trait object
pub fn recording_host() -> (Arc<RecordingChannel>, Arc<dyn HostChannel>) {
    let recording = Arc::new(RecordingChannel::new());
    let host: Arc<dyn HostChannel> = recording.clone();
    (recording, host)
}

/// Write an executable script at `path`
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut permissions = fs::metadata(path).unwrap().permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions).unwrap();
    path.to_path_buf()
}

/// A Maven home whose `bin/mvn` answers `-version` and runs `build` for
/// anything else
#[cfg(unix)]
pub fn fake_maven(home: &Path, build: &str) -> PathBuf {
    let body = format!(
        "if [ \"$1\" = \"-version\" ]; then\n  echo \"{}\"\n  exit 0\nfi\necho \"args: $*\"\n{}",
        MAVEN_VERSION_BANNER, build
    );
    write_script(&home.join("bin").join("mvn"), &body)
}

/// A Maven home whose `bin/mvn` fails every invocation
#[cfg(unix)]
pub fn broken_maven(home: &Path) -> PathBuf {
    write_script(
        &home.join("bin").join("mvn"),
        "echo 'Error: JAVA_HOME is not defined correctly.' >&2\nexit 1",
    )
}

/// Build script body that prints diagnostics, writes a surefire report and
/// exits with `exit_code`
pub fn diagnostic_build(exit_code: i32) -> String {
    format!(
        "echo '{}'\necho '{}'\necho '{}'\necho '{}'\n\
         mkdir -p target/surefire-reports\necho '<testsuite/>' > {}\nexit {}",
        COMPILER_ERROR_LINE,
        COMPILER_WARNING_LINE,
        SPOTBUGS_MARKER_LINE,
        SPOTBUGS_SUMMARY_LINE,
        SUREFIRE_REPORT,
        exit_code
    )
}

/// A program that records its arguments in `log` and exits with `exit_code`
#[cfg(unix)]
pub fn logging_program(path: &Path, log: &Path, exit_code: i32) -> PathBuf {
    write_script(
        path,
        &format!("echo \"$0 $*\" >> '{}'\nexit {}", log.display(), exit_code),
    )
}
