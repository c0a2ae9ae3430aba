//! Post-extraction setup scripts
//!
//! Python distributions carry an installer script at the archive root:
//! `setup.ps1` on Windows (run as `powershell ./setup.ps1`) and `setup.sh`
//! elsewhere (run as `bash ./setup.sh`), both from the extraction directory.
//! The scripts install into the tool cache named by `AGENT_TOOLSDIRECTORY`
//! and `RUNNER_TOOL_CACHE`, so both are pointed at the cache root.

use crate::error::{Error, Result};
use pipetask_core::platform::Os;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use pipetask_core::lines::LossyLines;
use tokio::io::BufReader;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Setup script name and interpreter for `os`
pub fn setup_command(os: Os) -> (&'static str, &'static str) {
    match os {
        Os::Windows => ("powershell", "setup.ps1"),
        _ => ("bash", "setup.sh"),
    }
}

/// Run the setup script in `dir` if the archive shipped one
///
/// Returns `false` when no script exists. The child is killed if this
/// future is dropped or `timeout` elapses.
pub async fn run_setup_script(
    dir: &Path,
    os: Os,
    tool_cache_root: &Path,
    timeout: Duration,
) -> Result<bool> {
    let (program, script) = setup_command(os);
    if !dir.join(script).is_file() {
        debug!("No {} in {}, skipping setup", script, dir.display());
        return Ok(false);
    }

    info!("Running {} ./{} in {}", program, script, dir.display());
    let mut child = Command::new(program)
        .arg(format!("./{}", script))
        .current_dir(dir)
        .env("AGENT_TOOLSDIRECTORY", tool_cache_root)
        .env("RUNNER_TOOL_CACHE", tool_cache_root)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    if let Some(stdout) = child.stdout.take() {
        let mut lines = LossyLines::new(BufReader::new(stdout));
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                info!("setup: {}", line);
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        let mut lines = LossyLines::new(BufReader::new(stderr));
        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                warn!("setup: {}", line);
            }
        });
    }

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) if status.success() => {
            info!("{} completed", script);
            Ok(true)
        }
        Ok(Ok(status)) => Err(Error::SetupScriptFailed {
            script: script.to_string(),
            code: status.code().unwrap_or(-1),
        }),
        Ok(Err(e)) => Err(Error::Io(e)),
        Err(_) => {
            let _ = child.kill().await;
            Err(Error::SetupScriptTimedOut {
                script: script.to_string(),
                secs: timeout.as_secs(),
            })
        }
    }
}
