use actuator_core::fence::{fence_command, FenceRequest};
use anyhow::Context;
use clap::{ArgAction, Args};
use std::path::PathBuf;

use super::{execute_fence, read_secret};

#[derive(Args)]
pub struct FenceArgs {
    /// Fence agent executable name under the sbin directory
    #[arg(long = "type", value_name = "TYPE")]
    pub agent_type: String,

    /// Fence action (status, reboot, off or on)
    #[arg(long)]
    pub action: String,

    /// Address of the host to fence
    #[arg(long)]
    pub ip: String,

    /// File holding the agent username
    #[arg(long)]
    pub username_secret: PathBuf,

    /// File holding the agent password
    #[arg(long)]
    pub password_secret: PathBuf,

    /// Additional agent options (key=value,...)
    #[arg(long, default_value = "")]
    pub options: String,

    /// Only log the fence command, do not execute it
    #[arg(
        long,
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub dry_run: bool,

    /// Directory holding the fence agents
    #[arg(long, default_value = "sbin")]
    pub sbin_dir: PathBuf,
}

pub fn run(args: FenceArgs, json: bool) -> anyhow::Result<()> {
    let username = read_secret(&args.username_secret)?;
    let password = read_secret(&args.password_secret)?;

    let command = fence_command(
        &args.sbin_dir,
        &FenceRequest {
            agent_type: &args.agent_type,
            action: &args.action,
            ip: &args.ip,
            username: &username,
            password: &password,
            options: &args.options,
        },
    )
    .context("invalid fence arguments")?;

    execute_fence(&command, args.dry_run, json)
}
