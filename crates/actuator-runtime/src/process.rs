use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Exit code reported when the child ended without one (killed by a signal).
pub const DEFAULT_FAILED_CODE: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Run `program` to completion, capturing both output streams and the exit
/// code. The child inherits the current environment plus `env`.
pub async fn run_command(
    program: &str,
    args: &[String],
    env: &[(String, String)],
) -> Result<ProcessOutput> {
    let output = Command::new(program)
        .args(args)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| Error::Spawn {
            program: program.to_string(),
            source,
        })?;

    let code = match output.status.code() {
        Some(code) => code,
        None => {
            warn!(%program, "could not get exit code for failed program");
            DEFAULT_FAILED_CODE
        }
    };

    let result = ProcessOutput {
        code,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    debug!(
        %program,
        code = result.code,
        stdout = %result.stdout.trim_end(),
        stderr = %result.stderr.trim_end(),
        "command result"
    );
    Ok(result)
}
