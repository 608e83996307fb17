use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;

use crate::error::{Error, Result};

/// Captured result of an external command.
#[derive(Debug, Clone, Default)]
pub struct SessionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl SessionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr, for pattern matching over everything the tool printed.
    pub fn combined(&self) -> String {
        if self.stderr.trim().is_empty() {
            self.stdout.clone()
        } else if self.stdout.trim().is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs `program args...` to completion, optionally streaming a file on stdin.
///
/// A non-zero exit is not an error here; callers decide what it means.
pub async fn run(program: &str, args: &[String], stdin: Option<&Path>) -> Result<SessionResult> {
    tracing::debug!("[{}] >>> {} {}", program, program, preview_args(args));
    let start = Instant::now();

    let mut command = Command::new(program);
    command.args(args);
    match stdin {
        Some(path) => {
            let file = std::fs::File::open(path)?;
            command.stdin(Stdio::from(file));
        }
        None => {
            command.stdin(Stdio::null());
        }
    }

    let output = command.output().await.map_err(|e| spawn_error(program, e))?;
    let elapsed = start.elapsed();

    let result = SessionResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    };

    if result.success() {
        tracing::debug!(
            "[{}] <<< OK ({}ms, {} bytes)",
            program,
            elapsed.as_millis(),
            result.stdout.len()
        );
    } else {
        tracing::debug!(
            "[{}] <<< FAILED (exit={}, {}ms): {}",
            program,
            result.exit_code,
            elapsed.as_millis(),
            result.stderr.trim()
        );
    }

    Ok(result)
}

/// Verifies every tool can be launched.
pub async fn ensure_tools(tools: &[&str]) -> Result<()> {
    for tool in tools {
        let status = Command::new(tool)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| spawn_error(tool, e))?;

        if !status.success() {
            return Err(Error::MissingTool(format!(
                "{} (--version exited with {})",
                tool,
                status.code().unwrap_or(-1)
            )));
        }
        tracing::debug!("Found required tool: {}", tool);
    }
    Ok(())
}

fn spawn_error(program: &str, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::MissingTool(program.to_string())
    } else {
        Error::Io(err)
    }
}

// Long arguments (system prompts, schemas) are shortened in logs.
fn preview_args(args: &[String]) -> String {
    args.iter()
        .map(|a| {
            if a.len() > 80 {
                let mut end = 80;
                while end > 0 && !a.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}...", &a[..end])
            } else {
                a.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
