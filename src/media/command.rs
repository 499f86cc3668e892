//! External tool runner
//!
//! Spawns a subprocess with captured output and a hard timeout. The child is
//! killed when the returned future is dropped, so a cancelled request does
//! not leave `ffmpeg`/`ffprobe` running.

use super::ProcessingError;
use crate::metrics;
use std::ffi::OsStr;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Run `program` with `args`, returning its output when it exits successfully.
#[tracing::instrument(name = "media.run_tool", skip(args), fields(tool = %program), err)]
pub async fn run_tool<I, S>(
    program: &str,
    args: I,
    timeout: Duration,
) -> Result<Output, ProcessingError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let start = Instant::now();

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| {
            metrics::record_tool_invocation(program, "spawn_error");
            ProcessingError::Spawn {
                tool: program.to_string(),
                source,
            }
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            metrics::record_tool_invocation(program, "io_error");
            return Err(ProcessingError::Io(e));
        }
        Err(_) => {
            // The child was moved into the dropped future; kill_on_drop reaps it.
            metrics::record_tool_invocation(program, "timeout");
            tracing::warn!(timeout_secs = timeout.as_secs(), "Tool invocation timed out");
            return Err(ProcessingError::Timeout {
                tool: program.to_string(),
                seconds: timeout.as_secs(),
            });
        }
    };

    let elapsed = start.elapsed();

    if !output.status.success() {
        metrics::record_tool_invocation(program, "failure");
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::error!(
            exit_code = ?output.status.code(),
            duration_ms = elapsed.as_millis(),
            stderr = %stderr,
            "Tool exited with failure"
        );
        return Err(ProcessingError::ToolFailed {
            tool: program.to_string(),
            exit_code: output.status.code(),
            stderr,
        });
    }

    metrics::record_tool_invocation(program, "success");
    tracing::debug!(duration_ms = elapsed.as_millis(), "Tool completed");

    Ok(output)
}
