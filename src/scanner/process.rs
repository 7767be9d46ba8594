//! External process plumbing shared by the tool adapters.
//!
//! Locates executables, writes input lists to temp files, streams stdout
//! line by line while draining stderr, and classifies failures into
//! [`ScanError`] kinds.

use crate::error::{ScanError, ScanResult};
use serde::de::DeserializeOwned;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{ExitStatus, Output, Stdio};
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Longest stderr excerpt carried into an error message.
const STDERR_EXCERPT: usize = 200;

/// Find `tool` on `PATH`.
pub fn locate(tool: &str) -> ScanResult<PathBuf> {
    which::which(tool).map_err(|_| ScanError::tool_not_found(tool))
}

/// Write one token per line into a fresh temp file.
///
/// The file is removed when the returned handle is dropped.
pub fn input_file(tool: &str, lines: &[String]) -> ScanResult<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix(&format!("trawl-{}-", tool))
        .suffix(".txt")
        .tempfile()?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    file.flush()?;
    Ok(file)
}

/// Captured output of a finished tool process.
#[derive(Debug)]
pub struct ToolRun {
    pub tool: String,
    /// Non-empty, trimmed stdout lines in emission order.
    pub lines: Vec<String>,
    pub stderr: String,
    pub status: ExitStatus,
}

impl ToolRun {
    /// Treat a non-zero exit as an execution failure.
    pub fn ensure_success(&self) -> ScanResult<()> {
        if self.status.success() {
            Ok(())
        } else {
            Err(ScanError::execution(&self.tool, self.failure_reason()))
        }
    }

    /// Accept a non-zero exit, keeping whatever was printed.
    ///
    /// Probers and sweepers exit non-zero when some targets are unreachable,
    /// which is not a failure of the run.
    pub fn tolerate_failure(&self) {
        if !self.status.success() {
            debug!(
                tool = %self.tool,
                status = %self.status,
                stderr = %excerpt(&self.stderr),
                "tool exited unsuccessfully, keeping partial output"
            );
        }
    }

    fn failure_reason(&self) -> String {
        let stderr = excerpt(&self.stderr);
        if stderr.is_empty() {
            self.status.to_string()
        } else {
            format!("{}: {}", self.status, stderr)
        }
    }
}

/// Spawn `command`, optionally feeding `stdin_lines`, and collect its output.
pub async fn run(
    tool: &str,
    mut command: Command,
    stdin_lines: Option<Vec<String>>,
) -> ScanResult<ToolRun> {
    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin_lines.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

    debug!(tool, command = ?command.as_std(), "spawning");
    let mut child = command.spawn().map_err(|e| spawn_error(tool, e))?;

    let writer = match (child.stdin.take(), stdin_lines) {
        (Some(mut stdin), Some(lines)) => Some(tokio::spawn(async move {
            for line in lines {
                stdin.write_all(line.as_bytes()).await?;
                stdin.write_all(b"\n").await?;
            }
            stdin.shutdown().await
        })),
        _ => None,
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ScanError::execution(tool, "stdout was not captured"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| ScanError::execution(tool, "stderr was not captured"))?;

    let read_stdout = async {
        let mut reader = BufReader::new(stdout).lines();
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line().await? {
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        Ok::<_, io::Error>(lines)
    };
    let read_stderr = async {
        let mut buf = String::new();
        stderr.read_to_string(&mut buf).await.map(|_| buf)
    };

    let (lines, stderr) = tokio::join!(read_stdout, read_stderr);
    let lines = lines.map_err(|e| ScanError::execution(tool, format!("reading output: {}", e)))?;
    let stderr = stderr.unwrap_or_default();

    if let Some(writer) = writer {
        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(tool, error = %e, "tool closed stdin early"),
            Err(e) => debug!(tool, error = %e, "stdin writer task failed"),
        }
    }

    let status = child.wait().await?;

    Ok(ToolRun {
        tool: tool.to_string(),
        lines,
        stderr,
        status,
    })
}

/// Run `command` to completion, buffering all output.
pub async fn output(tool: &str, mut command: Command) -> ScanResult<Output> {
    command.stdin(Stdio::null());
    debug!(tool, command = ?command.as_std(), "spawning");
    command.output().await.map_err(|e| spawn_error(tool, e))
}

/// Run `command` attached to the terminal.
pub async fn interactive(tool: &str, mut command: Command) -> ScanResult<()> {
    let status = command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| spawn_error(tool, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(ScanError::execution(tool, status.to_string()))
    }
}

/// Parse JSON-lines output into `T`.
///
/// Malformed lines are skipped with a warning; output in which no line
/// parses at all is an execution failure.
pub fn parse_json_lines<T: DeserializeOwned>(tool: &str, lines: &[String]) -> ScanResult<Vec<T>> {
    let mut parsed = Vec::with_capacity(lines.len());
    let mut rejected = 0usize;

    for line in lines {
        match serde_json::from_str::<T>(line) {
            Ok(value) => parsed.push(value),
            Err(e) => {
                rejected += 1;
                warn!(tool, error = %e, line = %excerpt(line), "skipping unparseable output line");
            }
        }
    }

    if parsed.is_empty() && rejected > 0 {
        return Err(ScanError::execution(
            tool,
            format!("none of {} output lines could be parsed", rejected),
        ));
    }

    Ok(parsed)
}

fn spawn_error(tool: &str, err: io::Error) -> ScanError {
    if err.kind() == io::ErrorKind::NotFound {
        ScanError::tool_not_found(tool)
    } else {
        ScanError::execution(tool, format!("failed to start: {}", err))
    }
}

fn excerpt(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(STDERR_EXCERPT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
