use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ActuatorError;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A lifecycle action an action template knows how to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Delete,
    Reboot,
    Check,
}

impl Action {
    pub fn all() -> &'static [Action] {
        &[Action::Create, Action::Delete, Action::Reboot, Action::Check]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Delete => "delete",
            Action::Reboot => "reboot",
            Action::Check => "check",
        }
    }

    /// Suffix used for event reasons (`Created`, `FailedDelete`, ...).
    pub fn event_name(self) -> &'static str {
        match self {
            Action::Create => "Create",
            Action::Delete => "Delete",
            Action::Reboot => "Reboot",
            Action::Check => "Status",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = ActuatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "delete" => Ok(Action::Delete),
            "reboot" => Ok(Action::Reboot),
            "check" | "status" => Ok(Action::Check),
            other => Err(ActuatorError::InvalidAction(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ArgumentFormat
// ---------------------------------------------------------------------------

/// How template parameters reach the command: as flags or as environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentFormat {
    Cli,
    Env,
}

impl ArgumentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ArgumentFormat::Cli => "cli",
            ArgumentFormat::Env => "env",
        }
    }
}

impl fmt::Display for ArgumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArgumentFormat {
    type Err = ActuatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cli" => Ok(ArgumentFormat::Cli),
            "env" => Ok(ArgumentFormat::Env),
            other => Err(ActuatorError::UnsupportedArgumentFormat(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// MachineRole
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MachineRole {
    Master,
    Node,
}

pub fn is_master(roles: &[MachineRole]) -> bool {
    roles.contains(&MachineRole::Master)
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Where a synthesized command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Submitted as a batch Job and polled to completion.
    #[default]
    Job,
    /// Run synchronously as a child process of the actuator.
    Process,
}
