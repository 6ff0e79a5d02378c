use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fence::{DEFAULT_PROVISION_EXECUTABLE, DEFAULT_PROVISION_PLAYBOOK};
use crate::job::{JobOptions, DEFAULT_ACTIVE_DEADLINE_SECONDS};
use crate::secrets::DEFAULT_SECRETS_DIR;
use crate::types::Strategy;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// PollConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    /// Number of polls before giving up; negative polls until terminal.
    #[serde(default = "default_poll_retries")]
    pub retries: i32,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_poll_retries() -> i32 {
    -1
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            retries: default_poll_retries(),
        }
    }
}

// ---------------------------------------------------------------------------
// SubmitConfig
// ---------------------------------------------------------------------------

/// Exponential backoff around job creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitConfig {
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_factor")]
    pub factor: f64,
    #[serde(default = "default_steps")]
    pub steps: u32,
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_factor() -> f64 {
    1.2
}

fn default_steps() -> u32 {
    5
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            factor: default_factor(),
            steps: default_steps(),
        }
    }
}

// ---------------------------------------------------------------------------
// JobConfig / ProvisionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default = "default_active_deadline")]
    pub active_deadline_seconds: i64,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

fn default_active_deadline() -> i64 {
    DEFAULT_ACTIVE_DEADLINE_SECONDS
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            active_deadline_seconds: default_active_deadline(),
            labels: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionConfig {
    #[serde(default = "default_provision_executable")]
    pub executable: String,
    #[serde(default = "default_provision_playbook")]
    pub playbook: String,
}

fn default_provision_executable() -> String {
    DEFAULT_PROVISION_EXECUTABLE.to_string()
}

fn default_provision_playbook() -> String {
    DEFAULT_PROVISION_PLAYBOOK.to_string()
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            executable: default_provision_executable(),
            playbook: default_provision_playbook(),
        }
    }
}

// ---------------------------------------------------------------------------
// ActuatorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorConfig {
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub submit: SubmitConfig,
    #[serde(default)]
    pub job: JobConfig,
    #[serde(default = "default_secrets_dir")]
    pub secrets_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_catalog: Option<PathBuf>,
    #[serde(default)]
    pub provision: ProvisionConfig,
    #[serde(default = "default_event_component")]
    pub event_component: String,
}

fn default_secrets_dir() -> String {
    DEFAULT_SECRETS_DIR.to_string()
}

fn default_event_component() -> String {
    "machine-actuator".to_string()
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            poll: PollConfig::default(),
            submit: SubmitConfig::default(),
            job: JobConfig::default(),
            secrets_dir: default_secrets_dir(),
            setup_catalog: None,
            provision: ProvisionConfig::default(),
            event_component: default_event_component(),
        }
    }
}

impl ActuatorConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: ActuatorConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn job_options(&self) -> JobOptions {
        JobOptions {
            active_deadline_seconds: self.job.active_deadline_seconds,
            labels: self.job.labels.clone(),
            secrets_dir: self.secrets_dir.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message })
        };

        if self.submit.steps == 0 {
            push(
                WarnLevel::Warning,
                "submit.steps is 0: treated as a single attempt".to_string(),
            );
        }
        if self.submit.factor < 1.0 {
            push(
                WarnLevel::Warning,
                format!(
                    "submit.factor {} is below 1.0: retry delays will shrink",
                    self.submit.factor
                ),
            );
        }
        if self.poll.interval_secs == 0 {
            push(
                WarnLevel::Warning,
                "poll.interval_secs is 0: job status will be polled in a tight loop".to_string(),
            );
        }
        if self.poll.retries == 0 {
            push(
                WarnLevel::Warning,
                "poll.retries is 0: a job still pending on its first read reports as in progress".to_string(),
            );
        }
        if self.job.active_deadline_seconds <= 0 {
            push(
                WarnLevel::Error,
                format!(
                    "job.active_deadline_seconds {} must be positive",
                    self.job.active_deadline_seconds
                ),
            );
        }
        if !self.secrets_dir.starts_with('/') {
            push(
                WarnLevel::Warning,
                format!("secrets_dir '{}' is not an absolute path", self.secrets_dir),
            );
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = ActuatorConfig::load(&dir.path().join("actuator.yaml")).unwrap();
        assert_eq!(cfg, ActuatorConfig::default());
        assert_eq!(cfg.poll.interval_secs, 5);
        assert_eq!(cfg.poll.retries, -1);
        assert_eq!(cfg.submit.steps, 5);
        assert_eq!(cfg.secrets_dir, "/etc/fencing/secrets");
        assert_eq!(cfg.event_component, "machine-actuator");
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("actuator.yaml");
        std::fs::write(
            &path,
            "strategy: process\npoll:\n  retries: 12\njob:\n  labels:\n    team: infra\n",
        )
        .unwrap();
        let cfg = ActuatorConfig::load(&path).unwrap();
        assert_eq!(cfg.strategy, Strategy::Process);
        assert_eq!(cfg.poll.retries, 12);
        assert_eq!(cfg.poll.interval_secs, 5);
        assert_eq!(cfg.submit.factor, 1.2);
        assert_eq!(cfg.provision.executable, "ansible-playbook");

        let opts = cfg.job_options();
        assert_eq!(opts.labels["team"], "infra");
        assert_eq!(opts.active_deadline_seconds, 30);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("actuator.yaml");
        std::fs::write(&path, "strategy: [nope").unwrap();
        assert!(ActuatorConfig::load(&path).is_err());
    }

    #[test]
    fn validate_flags_degenerate_backoff_and_polling() {
        let mut cfg = ActuatorConfig::default();
        cfg.submit.steps = 0;
        cfg.submit.factor = 0.5;
        cfg.poll.retries = 0;
        cfg.poll.interval_secs = 0;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 4);
        assert!(warnings.iter().all(|w| w.level == WarnLevel::Warning));
        assert!(warnings.iter().any(|w| w.message.contains("submit.steps")));
        assert!(warnings.iter().any(|w| w.message.contains("submit.factor")));
    }

    #[test]
    fn validate_flags_relative_secrets_dir() {
        let cfg = ActuatorConfig {
            secrets_dir: "secrets".into(),
            ..Default::default()
        };
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("secrets_dir"));
    }

    #[test]
    fn non_positive_deadline_is_an_error() {
        let mut cfg = ActuatorConfig::default();
        cfg.job.active_deadline_seconds = 0;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Error);
    }
}
