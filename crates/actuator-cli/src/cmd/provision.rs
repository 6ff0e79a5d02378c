use actuator_core::fence::provision_command;
use anyhow::Context;
use clap::{ArgAction, Args};
use std::path::PathBuf;

use super::{execute_fence, read_secret};

#[derive(Args)]
pub struct ProvisionArgs {
    /// Fencing agent type; runs sbin/fence_<TYPE>
    #[arg(long, value_name = "TYPE")]
    pub agent_type: String,

    /// Directory holding `username` and `password` files
    #[arg(long)]
    pub secret_path: PathBuf,

    /// Fencing action (status, reboot, off or on)
    #[arg(long, short = 'o')]
    pub action: String,

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

    /// Arguments passed to the agent ahead of the credentials
    #[arg(last = true)]
    pub passthrough: Vec<String>,
}

pub fn run(args: ProvisionArgs, json: bool) -> anyhow::Result<()> {
    let username = read_secret(&args.secret_path.join("username"))?;
    let password = read_secret(&args.secret_path.join("password"))?;

    let command = provision_command(
        &args.sbin_dir,
        &args.agent_type,
        &args.passthrough,
        &username,
        &password,
        &args.action,
        &args.options,
    )
    .context("invalid fence arguments")?;

    execute_fence(&command, args.dry_run, json)
}
