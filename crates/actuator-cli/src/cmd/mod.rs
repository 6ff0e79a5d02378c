pub mod cluster;
pub mod config;
pub mod fence;
pub mod machine;
pub mod provision;

use crate::output::print_json;
use actuator_core::fence::FenceCommand;
use actuator_runtime::process::run_command;
use anyhow::Context;
use std::path::Path;
use tracing::info;

/// Secret files are read whole; a single trailing newline is dropped.
pub(crate) fn read_secret(path: &Path) -> anyhow::Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read secret {}", path.display()))?;
    let value = raw.strip_suffix('\n').unwrap_or(&raw);
    Ok(value.strip_suffix('\r').unwrap_or(value).to_string())
}

/// Log the command line, then run it unless `dry_run`. Any nonzero exit is
/// an error carrying the agent's stderr.
pub(crate) fn execute_fence(command: &FenceCommand, dry_run: bool, json: bool) -> anyhow::Result<()> {
    let redacted = command.redacted();
    info!("run fence command {redacted}");

    if dry_run {
        if json {
            print_json(&serde_json::json!({ "dry_run": true, "command": redacted }))?;
        } else {
            println!("dry run: {redacted}");
        }
        return Ok(());
    }

    let program = command.program.to_string_lossy().into_owned();
    let rt = tokio::runtime::Runtime::new()?;
    let out = rt.block_on(run_command(&program, &command.args, &[]))?;
    if out.code != 0 {
        anyhow::bail!("{program} exited with code {}: {}", out.code, out.stderr.trim());
    }

    info!("fence command output: {}", out.stdout.trim_end());
    if json {
        print_json(&serde_json::json!({
            "command": redacted,
            "code": out.code,
            "stdout": out.stdout,
        }))?;
    } else {
        print!("{}", out.stdout);
    }
    Ok(())
}
