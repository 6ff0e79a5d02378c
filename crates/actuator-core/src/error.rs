use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("no valid configuration for machine {0}")]
    NoValidConfig(String),

    #[error("argument format '{0}' not supported")]
    UnsupportedArgumentFormat(String),

    #[error("action '{action}' is not defined on template '{template}'")]
    ActionNotDefined { template: String, action: String },

    #[error("no value of '{field}' found for '{target}'")]
    MissingDynamicValue { field: String, target: String },

    #[error("incorrect option format '{0}', please use \"key1=value1,...,keyn=valuen\"")]
    MalformedOptions(String),

    #[error("template '{0}' does not name a command to run locally")]
    MissingCommand(String),

    #[error("failed to get {0} from the agent secret")]
    MissingSecretField(String),

    #[error("invalid provider config: {0}")]
    InvalidProviderConfig(String),

    #[error("no machine setup matches {0}")]
    CatalogNoMatch(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ActuatorError {
    /// True for every variant except I/O.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, ActuatorError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, ActuatorError>;
