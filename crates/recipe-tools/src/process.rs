//! Lightweight command spawning for the `shell`/`install` tools. No resource
//! sandboxing (cgroups/rlimits) — this is the unsandboxed subset of the
//! host's process-spawning pattern.

use std::collections::HashMap;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Result of running a single shell command to completion.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

pub async fn run_shell(
    command: &str,
    cwd: Option<&Path>,
    env: &HashMap<String, String>,
) -> std::io::Result<ProcessOutput> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());

    let mut child = cmd.spawn()?;
    let mut stdout = String::new();
    let mut stderr = String::new();
    if let Some(mut out) = child.stdout.take() {
        out.read_to_string(&mut stdout).await?;
    }
    if let Some(mut err) = child.stderr.take() {
        err.read_to_string(&mut stderr).await?;
    }
    let status = child.wait().await?;

    Ok(ProcessOutput {
        stdout,
        stderr,
        exit_code: status.code().unwrap_or(1),
    })
}
