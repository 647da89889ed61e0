//! Subprocess execution shared by the plotting and typesetting adapters.

use crate::errors::CollaboratorError;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Runs `program` to completion, optionally feeding `stdin`.
///
/// Returns captured stdout on a zero exit status.
pub(crate) async fn run_program(
    program: &str,
    args: &[&str],
    stdin: Option<&[u8]>,
    cwd: Option<&Path>,
) -> Result<Vec<u8>, CollaboratorError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    debug!(program, ?args, "Spawning");
    let mut child = command.spawn()?;
    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input).await?;
        // Closing stdin signals end of input.
        drop(pipe);
    }

    let output = child.wait_with_output().await?;
    if output.status.success() {
        return Ok(output.stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let detail = if stderr.trim().is_empty() { stdout } else { stderr };
    Err(CollaboratorError::Process {
        program: program.to_string(),
        status: output.status.to_string(),
        stderr: tail(&detail, 20),
    })
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
