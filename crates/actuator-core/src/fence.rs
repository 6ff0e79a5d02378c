//! Power-management commands run as local processes.
//!
//! Covers the standalone fence/provision command lines and the template a
//! machine's inline [`FencingConfig`] stands for, plus exit-code
//! interpretation shared by every locally executed action.

use k8s_openapi::api::core::v1::Container;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{ActuatorError, Result};
use crate::provider::FencingConfig;
use crate::template::ActionTemplate;
use crate::types::Action;

/// Exit code a status check uses to report "powered off / not present".
pub const STATUS_ABSENT_EXIT_CODE: i32 = 2;

pub const DEFAULT_PROVISION_EXECUTABLE: &str = "ansible-playbook";
pub const DEFAULT_PROVISION_PLAYBOOK: &str = "/home/non-root/ansible/provision.yml";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Parse `key1=value1,...,keyn=valuen` into `--key=value` arguments. Every
/// entry must split into exactly two parts on `=`.
pub fn parse_options(options: &str) -> Result<Vec<String>> {
    if options.is_empty() {
        return Ok(Vec::new());
    }
    options
        .split(',')
        .map(|entry| {
            let parts: Vec<&str> = entry.split('=').collect();
            match parts.as_slice() {
                [key, value] => Ok(format!("--{key}={value}")),
                _ => Err(ActuatorError::MalformedOptions(entry.to_string())),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Fence command lines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FenceCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl FenceCommand {
    /// The command line with credential values masked, for logging.
    pub fn redacted(&self) -> String {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| {
                if a.starts_with("--password=") {
                    "--password=***".to_string()
                } else {
                    a.clone()
                }
            })
            .collect();
        format!("{} {}", self.program.display(), args.join(" "))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FenceRequest<'a> {
    pub agent_type: &'a str,
    pub action: &'a str,
    pub ip: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub options: &'a str,
}

/// `<sbin>/<agent_type> --action= --ip= --username= --password= [--k=v...]`
pub fn fence_command(sbin: &Path, req: &FenceRequest<'_>) -> Result<FenceCommand> {
    let mut args = vec![
        format!("--action={}", req.action),
        format!("--ip={}", req.ip),
        format!("--username={}", req.username),
        format!("--password={}", req.password),
    ];
    args.extend(parse_options(req.options)?);
    Ok(FenceCommand {
        program: sbin.join(req.agent_type),
        args,
    })
}

/// `<sbin>/fence_<agent_type> [passthrough...] --username= --password= --action= [--k=v...]`
pub fn provision_command(
    sbin: &Path,
    agent_type: &str,
    passthrough: &[String],
    username: &str,
    password: &str,
    action: &str,
    options: &str,
) -> Result<FenceCommand> {
    let mut args = passthrough.to_vec();
    args.push(format!("--username={username}"));
    args.push(format!("--password={password}"));
    args.push(format!("--action={action}"));
    args.extend(parse_options(options)?);
    Ok(FenceCommand {
        program: sbin.join(format!("fence_{agent_type}")),
        args,
    })
}

// ---------------------------------------------------------------------------
// Fencing-config template
// ---------------------------------------------------------------------------

/// Action word the provisioning playbook expects.
pub fn provision_action(action: Action) -> &'static str {
    match action {
        Action::Check => "status",
        other => other.as_str(),
    }
}

/// The template an inline fencing config stands for: the provisioning
/// executable run against the playbook with the agent parameters as extra
/// vars, one fragment per action.
pub fn provision_template(
    fencing: &FencingConfig,
    executable: &str,
    playbook: &str,
) -> Result<ActionTemplate> {
    let username = fencing.username()?;
    let password = fencing.password()?;

    let agent_options: Vec<String> = fencing
        .agent_options
        .iter()
        .map(|(k, v)| {
            if v.is_empty() {
                format!("--{k}")
            } else {
                format!("--{k}={v}")
            }
        })
        .collect();

    let extra_vars = |action: Action| {
        let mut vars = vec![
            format!("provision_action={}", provision_action(action)),
            format!("agent_address={}", fencing.agent_address),
            format!("agent_type={}", fencing.agent_type),
            format!("agent_username={username}"),
            format!("agent_password={password}"),
        ];
        if !agent_options.is_empty() {
            vars.push(format!("agent_options=\"{}\"", agent_options.join(" ")));
        }
        Some(vec![format!("--extra-vars={}", vars.join(" "))])
    };

    Ok(ActionTemplate {
        name: format!("fencing-{}", fencing.agent_type),
        container: Container {
            name: "provision".to_string(),
            command: Some(vec![executable.to_string()]),
            args: Some(vec![playbook.to_string()]),
            ..Default::default()
        },
        create_args: extra_vars(Action::Create),
        delete_args: extra_vars(Action::Delete),
        reboot_args: extra_vars(Action::Reboot),
        check_args: extra_vars(Action::Check),
        argument_format: "env".to_string(),
        config: BTreeMap::from([
            ("AGENT_ADDRESS".to_string(), fencing.agent_address.clone()),
            ("AGENT_TYPE".to_string(), fencing.agent_type.clone()),
        ]),
        pass_target_as: Some("PROVISION_TARGET".to_string()),
        pass_action_as: Some("PROVISION_ACTION".to_string()),
        ..Default::default()
    })
}

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitVerdict {
    Success,
    /// The status check ran and reported the target absent.
    Absent,
    Failed,
}

pub fn interpret_exit(action: Action, code: i32) -> ExitVerdict {
    match code {
        0 => ExitVerdict::Success,
        STATUS_ABSENT_EXIT_CODE if action == Action::Check => ExitVerdict::Absent,
        _ => ExitVerdict::Failed,
    }
}
