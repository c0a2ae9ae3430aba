//! JUnit result publishing
//!
//! A results pattern containing `*` or `?` is matched under the default
//! working directory; a pattern without a `/` matches file names at any
//! depth. Anything else is taken as a literal path.

use crate::error::{Error, Result};
use pipetask_core::host::{HostChannel, HostCommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const TEST_RUN_SYSTEM: &str = "VSTS - maven";

/// Result files selected by `pattern`
pub fn find_result_files(pattern: &str, working_dir: &Path) -> Result<Vec<PathBuf>> {
    if !pattern.contains('*') && !pattern.contains('?') {
        debug!("No pattern found in test results input");
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let relative = if pattern.contains('/') || pattern.contains('\\') {
        pattern.to_string()
    } else {
        format!("**/{}", pattern)
    };
    let full = if Path::new(&relative).is_absolute() {
        relative
    } else {
        working_dir.join(&relative).to_string_lossy().into_owned()
    };
    debug!("Matching test results with {}", full);

    let mut files = Vec::new();
    for entry in glob::glob(&full).map_err(|e| Error::invalid_pattern(pattern, e))? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => debug!("Skipping unreadable path: {}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// `results.publish` command for `files`
pub fn publish_command(files: &[PathBuf], run_title: Option<&str>) -> HostCommand {
    let result_files = files
        .iter()
        .map(|f| f.display().to_string())
        .collect::<Vec<_>>()
        .join(",");

    HostCommand::new("results.publish", "")
        .with_property("type", "JUnit")
        .with_property("mergeResults", "true")
        .with_property("runTitle", run_title.unwrap_or(""))
        .with_property("publishRunAttachments", "true")
        .with_property("resultFiles", result_files)
        .with_property("testRunSystem", TEST_RUN_SYSTEM)
}

/// Find and publish result files. Returns how many were published.
pub fn publish_results(
    host: &dyn HostChannel,
    pattern: &str,
    working_dir: &Path,
    run_title: Option<&str>,
) -> Result<usize> {
    let files = find_result_files(pattern, working_dir)?;
    if files.is_empty() {
        info!("No test result files matching {} were found.", pattern);
        return Ok(0);
    }

    host.emit(publish_command(&files, run_title));
    Ok(files.len())
}
