//! Subprocess execution with line streaming

use crate::error::{Error, Result};
use pipetask_core::host::HostChannel;
use pipetask_core::lines::LossyLines;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::process::Command;
use tracing::{debug, warn};

/// Run `command` to completion, handing each stdout line to `on_line` as
/// it arrives. Stderr lines are passed through to the host. Returns the exit
/// code, `-1` when the process was terminated by a signal.
///
/// Output is decoded lossily. A read failure stops the streaming but the
/// process is still waited on for its exit code.
pub async fn run_streaming<F>(
    command: &mut Command,
    program: &str,
    host: &Arc<dyn HostChannel>,
    mut on_line: F,
) -> Result<i32>
where
    F: FnMut(&str),
{
    debug!("Running {:?}", command.as_std());
    let mut child = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::spawn(program, e))?;

    let stderr_task = child.stderr.take().map(|stderr| {
        let host = host.clone();
        tokio::spawn(async move {
            let mut lines = LossyLines::new(BufReader::new(stderr));
            while let Ok(Some(line)) = lines.next_line().await {
                host.write_line(&line);
            }
        })
    });

    if let Some(stdout) = child.stdout.take() {
        let mut lines = LossyLines::new(BufReader::new(stdout));
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => on_line(&line),
                Ok(None) => break,
                Err(e) => {
                    warn!("Stopped reading output of {}: {}", program, e);
                    break;
                }
            }
        }
    }

    let status = child.wait().await?;
    if let Some(task) = stderr_task {
        let _ = task.await;
    }

    let code = status.code().unwrap_or(-1);
    debug!("{} exited with {}", program, code);
    Ok(code)
}

/// Run `command` and pass all of its output through to the host
pub async fn run_passthrough(
    command: &mut Command,
    program: &str,
    host: &Arc<dyn HostChannel>,
) -> Result<i32> {
    let echo = host.clone();
    run_streaming(command, program, host, |line| echo.write_line(line)).await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pipetask_core::host::RecordingChannel;

    #[tokio::test]
    async fn test_streams_stdout_in_order() {
        let recording = Arc::new(RecordingChannel::new());
        let host: Arc<dyn HostChannel> = recording.clone();
        let mut seen = Vec::new();

        let mut command = Command::new("sh");
        command.args(["-c", "echo one; echo two; echo oops >&2; exit 3"]);
        let code = run_streaming(&mut command, "sh", &host, |line| seen.push(line.to_string()))
            .await
            .unwrap();

        assert_eq!(code, 3);
        assert_eq!(seen, vec!["one", "two"]);
        assert_eq!(recording.lines(), vec!["oops"]);
    }

    #[tokio::test]
    async fn test_non_utf8_output_keeps_streaming() {
        let host: Arc<dyn HostChannel> = Arc::new(RecordingChannel::new());
        let mut seen = Vec::new();

        let mut command = Command::new("sh");
        command.args([
            "-c",
            "printf '[INFO] Compiling caf\\351.java\\n'; \
             echo '[ERROR] /a/b/File.java:[10,5] unexpected token'; exit 0",
        ]);
        let code = run_streaming(&mut command, "sh", &host, |line| seen.push(line.to_string()))
            .await
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], "[INFO] Compiling caf\u{FFFD}.java");
        assert_eq!(seen[1], "[ERROR] /a/b/File.java:[10,5] unexpected token");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let host: Arc<dyn HostChannel> = Arc::new(RecordingChannel::new());
        let mut command = Command::new("/nonexistent/pipetask-test-binary");
        let err = run_passthrough(&mut command, "pipetask-test-binary", &host)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
