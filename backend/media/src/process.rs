//! Capture tool process runner.
//!
//! Spawns the tool, drains stdout and stderr on parallel tasks while the
//! caller waits for exit, and optionally enforces a deadline by killing the
//! process. Output is kept as a bounded tail for error reporting.

use std::process::Stdio;
use std::time::Duration;

use doorcam_core::{CaptureError, ToolHandle};
use doorcam_logging::redact_sensitive_data;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Maximum bytes of diagnostic output retained per stream.
pub const MAX_DIAGNOSTIC_BYTES: usize = 64 * 1024;

/// How long output readers may keep draining after a deadline kill.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Result of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub timed_out: bool,
    pub stdout: String,
    /// Diagnostic stream (stderr) text, tail-bounded.
    pub diagnostics: String,
}

impl ToolOutput {
    /// Non-zero exit (or death by signal) becomes `ProcessFailed`.
    pub fn ensure_success(self) -> Result<Self, CaptureError> {
        if self.success {
            Ok(self)
        } else {
            Err(CaptureError::ProcessFailed {
                exit_code: self.exit_code,
                diagnostics: self.diagnostics,
            })
        }
    }
}

/// Run the tool to completion, or until `deadline` expires.
///
/// On expiry the process is killed and `timed_out` is set; the output collected
/// so far is still returned. `label` tags log lines.
pub async fn run_tool(
    handle: &ToolHandle,
    args: &[String],
    deadline: Option<Duration>,
    label: &str,
) -> Result<ToolOutput, CaptureError> {
    debug!(
        tool = %handle.path.display(),
        label,
        args = %redact_sensitive_data(&args.join(" ")),
        "Spawning capture tool"
    );

    let mut child = Command::new(&handle.path)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout_task = child.stdout.take().map(|s| drain(s, label.to_string(), "stdout"));
    let stderr_task = child.stderr.take().map(|s| drain(s, label.to_string(), "stderr"));

    let mut timed_out = false;
    let status = match deadline {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(label, timeout_ms = limit.as_millis() as u64, "Capture tool deadline expired, killing process");
                timed_out = true;
                if let Err(e) = child.start_kill() {
                    warn!(label, error = %e, "Failed to signal capture tool");
                }
                child.wait().await?
            }
        },
        None => child.wait().await?,
    };

    // A killed tool may leave descendants holding the pipes open.
    let grace = timed_out.then_some(DRAIN_GRACE);
    let stdout = collect(stdout_task, grace).await;
    let diagnostics = collect(stderr_task, grace).await;

    debug!(label, code = ?status.code(), timed_out, "Capture tool exited");

    Ok(ToolOutput {
        exit_code: status.code(),
        success: status.success() && !timed_out,
        timed_out,
        stdout,
        diagnostics,
    })
}

fn drain<R>(stream: R, label: String, stream_name: &'static str) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut collected = String::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&line);
                    debug!(label = %label, stream = stream_name, "{}", redact_sensitive_data(text.trim_end()));
                    collected.push_str(&text);
                    trim_front(&mut collected, MAX_DIAGNOSTIC_BYTES);
                }
                Err(e) => {
                    warn!(label = %label, stream = stream_name, error = %e, "Failed reading capture tool output");
                    break;
                }
            }
        }
        collected
    })
}

async fn collect(task: Option<JoinHandle<String>>, grace: Option<Duration>) -> String {
    let Some(task) = task else {
        return String::new();
    };
    match grace {
        None => task.await.unwrap_or_default(),
        Some(grace) => {
            let abort = task.abort_handle();
            match tokio::time::timeout(grace, task).await {
                Ok(joined) => joined.unwrap_or_default(),
                Err(_) => {
                    abort.abort();
                    String::new()
                }
            }
        }
    }
}

/// Drop leading bytes so `text` fits in `max`, keeping a char boundary.
fn trim_front(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut cut = text.len() - max;
    while !text.is_char_boundary(cut) {
        cut += 1;
    }
    text.drain(..cut);
}
