use actuator_core::ActuatorError;
use std::fmt;
use thiserror::Error;

/// Standardized reason attached to errors a facade verb returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineErrorReason {
    CreateError,
    DeleteError,
    UpdateError,
    InvalidConfiguration,
}

impl MachineErrorReason {
    pub fn as_str(self) -> &'static str {
        match self {
            MachineErrorReason::CreateError => "CreateError",
            MachineErrorReason::DeleteError => "DeleteError",
            MachineErrorReason::UpdateError => "UpdateError",
            MachineErrorReason::InvalidConfiguration => "InvalidConfiguration",
        }
    }
}

impl fmt::Display for MachineErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ActuatorError),

    #[error("platform error: {0}")]
    Kube(#[from] kube::Error),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("job submission failed after {attempts} attempts: {last}")]
    Submission { attempts: u32, last: Box<Error> },

    #[error("Job {job} failed: {message}")]
    JobFailed { job: String, message: String },

    #[error("Job {job} in progress")]
    JobInProgress { job: String },

    #[error("{program} exited with code {code}: {stderr}")]
    ProcessFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("in-place update of master machine {0} is not supported")]
    UpdateUnsupported(String),

    #[error("cannot retrieve current state to update machine {0}")]
    MissingCurrentState(String),

    #[error("{reason}: {message}")]
    Machine {
        reason: MachineErrorReason,
        message: String,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for errors raised before anything was submitted or executed.
    pub fn is_configuration(&self) -> bool {
        match self {
            Error::Config(e) => e.is_configuration(),
            Error::Machine { reason, .. } => *reason == MachineErrorReason::InvalidConfiguration,
            _ => false,
        }
    }

    pub fn reason(&self) -> Option<MachineErrorReason> {
        match self {
            Error::Machine { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
