//! Execution strategies for a synthesized command.
//!
//! Both executors consume the same [`WorkUnit`]; neither synthesis nor the
//! facade knows which one runs a given action.

use actuator_core::fence::{interpret_exit, ExitVerdict};
use actuator_core::job::{build_job, JobOptions};
use actuator_core::secrets;
use actuator_core::{Action, ActionTemplate, ActuatorError, Invocation};
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::client::PlatformClient;
use crate::error::{Error, Result};
use crate::poll::Poller;
use crate::process::run_command;

/// One action against one target, ready to run.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub action: Action,
    pub target: String,
    pub namespace: String,
    pub template: ActionTemplate,
    pub invocation: Invocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Succeeded,
    /// A check ran to completion and found the target absent.
    Absent,
}

#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, unit: &WorkUnit) -> Result<Verdict>;
}

// ─── JobExecutor ──────────────────────────────────────────────────────────

/// Submits a Job with backoff and polls it to a terminal state.
pub struct JobExecutor {
    platform: Arc<dyn PlatformClient>,
    backoff: Backoff,
    poller: Poller,
    options: JobOptions,
}

impl JobExecutor {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        backoff: Backoff,
        poller: Poller,
        options: JobOptions,
    ) -> Self {
        Self {
            platform,
            backoff,
            poller,
            options,
        }
    }
}

#[async_trait]
impl Executor for JobExecutor {
    async fn execute(&self, unit: &WorkUnit) -> Result<Verdict> {
        let job = build_job(
            &unit.template,
            unit.action,
            &unit.target,
            &unit.namespace,
            &unit.invocation,
            &self.options,
        );

        let platform = self.platform.as_ref();
        let namespace = unit.namespace.as_str();
        let job_ref = &job;
        let created = self
            .backoff
            .retry(move |attempt| async move {
                debug!(attempt, %namespace, "creating job");
                match platform.create_job(namespace, job_ref).await {
                    Ok(created) => Ok(Some(created)),
                    Err(Error::AlreadyExists(what)) => {
                        info!("{what} already exists, treating as submitted");
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            })
            .await?;

        let Some(created) = created else {
            // No result was observed for a colliding check.
            if unit.action == Action::Check {
                info!(machine = %unit.target, "check job already exists, target absent");
                return Ok(Verdict::Absent);
            }
            return Ok(Verdict::Succeeded);
        };
        let name = created.name_any();
        info!(job = %name, machine = %unit.target, action = %unit.action, "job running");

        match self.poller.wait(platform, namespace, &name).await {
            Ok(()) => Ok(Verdict::Succeeded),
            Err(e @ (Error::JobFailed { .. } | Error::JobInProgress { .. }))
                if unit.action == Action::Check =>
            {
                info!(job = %name, machine = %unit.target, "check did not succeed, target absent: {e}");
                Ok(Verdict::Absent)
            }
            Err(e) => {
                warn!(job = %name, "job error: {e}");
                Err(e)
            }
        }
    }
}

// ─── ProcessExecutor ──────────────────────────────────────────────────────

/// Runs the template's container command as a local child process.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    secrets_dir: String,
}

impl ProcessExecutor {
    pub fn new(secrets_dir: impl Into<String>) -> Self {
        Self {
            secrets_dir: secrets_dir.into(),
        }
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new(secrets::DEFAULT_SECRETS_DIR)
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn execute(&self, unit: &WorkUnit) -> Result<Verdict> {
        let command = unit.template.container.command.as_deref().unwrap_or_default();
        let Some((program, prefix)) = command.split_first() else {
            return Err(ActuatorError::MissingCommand(unit.template.display_name().to_string()).into());
        };

        let mut args = prefix.to_vec();
        args.extend(unit.invocation.args.iter().cloned());

        let mut env = unit.invocation.literal_env();
        let skipped = unit.invocation.env.len() - env.len();
        if skipped > 0 {
            warn!(machine = %unit.target, skipped, "environment entries with valueFrom are not available locally");
        }
        let materials = secrets::materialize(&unit.template.secrets, &self.secrets_dir);
        env.extend(
            materials
                .env
                .into_iter()
                .filter_map(|e| e.value.map(|v| (e.name, v))),
        );

        info!(%program, machine = %unit.target, action = %unit.action, "running command");
        let out = run_command(program, &args, &env).await?;

        match interpret_exit(unit.action, out.code) {
            ExitVerdict::Success => Ok(Verdict::Succeeded),
            ExitVerdict::Absent => Ok(Verdict::Absent),
            ExitVerdict::Failed => Err(Error::ProcessFailed {
                program: program.clone(),
                code: out.code,
                stderr: out.stderr.trim().to_string(),
            }),
        }
    }
}
