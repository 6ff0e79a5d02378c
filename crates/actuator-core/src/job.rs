//! BackgroundJob construction and job-state interpretation.

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

use crate::secrets::{self, DEFAULT_SECRETS_DIR};
use crate::synth::Invocation;
use crate::template::ActionTemplate;
use crate::types::Action;

pub const DEFAULT_ACTIVE_DEADLINE_SECONDS: i64 = 30;

/// Label stamped on every job with the action it runs.
pub const ACTION_LABEL: &str = "actuator.cluster.k8s.io/action";
/// Label stamped on every job with the machine it targets.
pub const TARGET_LABEL: &str = "actuator.cluster.k8s.io/target";

#[derive(Debug, Clone)]
pub struct JobOptions {
    pub active_deadline_seconds: i64,
    pub labels: BTreeMap<String, String>,
    pub secrets_dir: String,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            active_deadline_seconds: DEFAULT_ACTIVE_DEADLINE_SECONDS,
            labels: BTreeMap::new(),
            secrets_dir: DEFAULT_SECRETS_DIR.to_string(),
        }
    }
}

/// `<target>-job-<action>-`; the platform appends a random suffix.
pub fn generate_name(target: &str, action: Action) -> String {
    format!("{target}-job-{}-", action.as_str().to_lowercase())
}

/// Wrap a synthesized invocation into a single-container, single-completion
/// Job in `namespace`.
pub fn build_job(
    template: &ActionTemplate,
    action: Action,
    target: &str,
    namespace: &str,
    invocation: &Invocation,
    opts: &JobOptions,
) -> Job {
    let materials = secrets::materialize(&template.secrets, &opts.secrets_dir);

    let mut container = template.container.clone();
    if !invocation.args.is_empty() {
        container.args = Some(invocation.args.clone());
    }
    let mut env = invocation.env.clone();
    env.extend(materials.env);
    container.env = Some(env);
    if !materials.mounts.is_empty() {
        container
            .volume_mounts
            .get_or_insert_with(Vec::new)
            .extend(materials.mounts);
    }

    let volumes = secrets::merge_volumes(&template.volumes, materials.volumes);

    let mut labels = opts.labels.clone();
    labels.insert(ACTION_LABEL.to_string(), action.as_str().to_string());
    labels.insert(TARGET_LABEL.to_string(), target.to_string());

    Job {
        metadata: ObjectMeta {
            generate_name: Some(generate_name(target, action)),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: template.retries,
            parallelism: Some(1),
            completions: Some(1),
            active_deadline_seconds: Some(opts.active_deadline_seconds),
            template: PodTemplateSpec {
                metadata: None,
                spec: Some(PodSpec {
                    containers: vec![container],
                    restart_policy: Some("OnFailure".to_string()),
                    volumes: if volumes.is_empty() { None } else { Some(volumes) },
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

// ---------------------------------------------------------------------------
// Job state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Succeeded,
    Failed(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Pending)
    }
}

/// Read the terminal verdict from a job's conditions, in the order they are
/// listed. `Complete` only counts as success when at least one pod
/// succeeded.
pub fn job_state(job: &Job) -> JobState {
    let Some(status) = job.status.as_ref() else {
        return JobState::Pending;
    };
    for condition in status.conditions.iter().flatten() {
        let message = condition.message.clone().unwrap_or_default();
        match condition.type_.as_str() {
            "Failed" => return JobState::Failed(message),
            "Complete" => {
                return if status.succeeded.unwrap_or(0) > 0 {
                    JobState::Succeeded
                } else {
                    JobState::Failed(message)
                };
            }
            _ => {}
        }
    }
    JobState::Pending
}
