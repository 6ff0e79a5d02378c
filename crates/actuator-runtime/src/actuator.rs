//! Machine actuator: Create / Delete / Update / Exists.
//!
//! Every verb decodes the provider configs, selects a template, synthesizes
//! the invocation and hands it to the executor for the configured strategy.
//! Failures come back as [`Error::Machine`] carrying a [`MachineErrorReason`];
//! the same reason and message are written to the machine's status when a
//! [`MachineStore`] is available.

use actuator_core::catalog::CatalogSource;
use actuator_core::codec;
use actuator_core::config::ActuatorConfig;
use actuator_core::provider::{
    ClusterProviderConfig, MachineProviderConfig, MachineProviderStatus, INSTANCE_ON,
};
use actuator_core::resources::{Cluster, Machine, MachineTemplateMeta, MachineVersionInfo, ProviderSpec};
use actuator_core::types::{is_master, Strategy};
use actuator_core::{synthesize, Action};
use chrono::Utc;
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::client::{MachineStore, PlatformClient};
use crate::error::{Error, MachineErrorReason, Result};
use crate::events::{EventRecorder, EventType};
use crate::exec::{Executor, JobExecutor, ProcessExecutor, Verdict, WorkUnit};
use crate::poll::Poller;
use crate::selector::{ConfigSelector, TemplateSource};

pub const PROJECT_ANNOTATION: &str = "ext-project";
pub const ZONE_ANNOTATION: &str = "ext-zone";
pub const NAME_ANNOTATION: &str = "ext-name";
/// JSON snapshot of the fields the last successful create provisioned.
pub const LAST_APPLIED_ANNOTATION: &str = "ext-last-applied";
/// Machines created while the cluster was being installed.
pub const BOOTSTRAP_LABEL: &str = "bootstrap";

// ─── Outcome ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The action ran to completion.
    Applied,
    /// Nothing to do: created target already present, or deleted target absent.
    Skipped,
    /// Update found no provisioning-relevant difference.
    Unchanged,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Applied => "applied",
            Outcome::Skipped => "skipped",
            Outcome::Unchanged => "unchanged",
        })
    }
}

// ─── Snapshot ─────────────────────────────────────────────────────────────

/// The provisioning-relevant part of a machine. Status is never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSnapshot {
    pub name: String,
    #[serde(default)]
    pub metadata: MachineTemplateMeta,
    #[serde(default)]
    pub provider_spec: ProviderSpec,
    #[serde(default)]
    pub versions: MachineVersionInfo,
}

impl MachineSnapshot {
    pub fn of(machine: &Machine) -> Self {
        Self {
            name: machine.name_any(),
            metadata: machine.spec.metadata.clone(),
            provider_spec: machine.spec.provider_spec.clone(),
            versions: machine.spec.versions.clone(),
        }
    }

    /// The snapshot recorded on `machine`, if any.
    pub fn recorded(machine: &Machine) -> Result<Option<Self>> {
        match machine.annotations().get(LAST_APPLIED_ANNOTATION) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    /// `machine` as it looked when this snapshot was taken.
    pub fn apply_to(&self, machine: &Machine) -> Machine {
        let mut m = machine.clone();
        m.spec.metadata = self.metadata.clone();
        m.spec.provider_spec = self.provider_spec.clone();
        m.spec.versions = self.versions.clone();
        m
    }
}

// ─── MachineActuator ──────────────────────────────────────────────────────

pub struct MachineActuatorParams {
    pub platform: Arc<dyn PlatformClient>,
    /// `None` while the cluster is being installed; status and annotations
    /// are then left untouched.
    pub store: Option<Arc<dyn MachineStore>>,
    pub events: Arc<dyn EventRecorder>,
    pub catalog: Option<Arc<dyn CatalogSource>>,
    pub config: ActuatorConfig,
}

pub struct MachineActuator {
    platform: Arc<dyn PlatformClient>,
    store: Option<Arc<dyn MachineStore>>,
    events: Arc<dyn EventRecorder>,
    catalog: Option<Arc<dyn CatalogSource>>,
    config: ActuatorConfig,
    backoff: Backoff,
    poller: Poller,
}

impl MachineActuator {
    pub fn new(params: MachineActuatorParams) -> Self {
        let backoff = Backoff::from_config(&params.config.submit);
        let poller = Poller::from_config(&params.config.poll);
        Self {
            platform: params.platform,
            store: params.store,
            events: params.events,
            catalog: params.catalog,
            config: params.config,
            backoff,
            poller,
        }
    }

    pub async fn create(&self, cluster: &Cluster, machine: &Machine) -> Result<Outcome> {
        let name = machine.name_any();
        let (machine_cfg, cluster_cfg) = self.configs(cluster, machine).await?;

        let verdict = match self.run(machine, &machine_cfg, &cluster_cfg, Action::Check).await {
            Ok(verdict) => verdict,
            Err(e) => {
                let message = format!("error checking instance: {e}");
                return Err(self
                    .machine_error(machine, MachineErrorReason::CreateError, &e, message, Some(Action::Create))
                    .await);
            }
        };
        if verdict == Verdict::Succeeded {
            info!(machine = %name, "skipping machine that already exists");
            return Ok(Outcome::Skipped);
        }

        info!(machine = %name, "creating machine");
        if let Err(e) = self.run(machine, &machine_cfg, &cluster_cfg, Action::Create).await {
            let message = format!("error creating instance: {e}");
            return Err(self
                .machine_error(machine, MachineErrorReason::CreateError, &e, message, Some(Action::Create))
                .await);
        }
        self.events
            .record(machine, EventType::Normal, "Created", &format!("Created Machine {name}"))
            .await;

        if let Some(store) = &self.store {
            let recorded = match self
                .record_annotations(store.as_ref(), machine, &machine_cfg, &cluster_cfg)
                .await
            {
                Ok(annotated) => {
                    self.record_instance_status(store.as_ref(), &annotated, &machine_cfg)
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = recorded {
                let message = format!("error recording instance state: {e}");
                return Err(self
                    .machine_error(machine, MachineErrorReason::CreateError, &e, message, Some(Action::Create))
                    .await);
            }
        }
        Ok(Outcome::Applied)
    }

    pub async fn delete(&self, cluster: &Cluster, machine: &Machine) -> Result<Outcome> {
        let name = machine.name_any();
        let (machine_cfg, cluster_cfg) = self.configs(cluster, machine).await?;

        let verdict = match self.run(machine, &machine_cfg, &cluster_cfg, Action::Check).await {
            Ok(verdict) => verdict,
            Err(e) => {
                let message = format!("error checking instance: {e}");
                return Err(self
                    .machine_error(machine, MachineErrorReason::DeleteError, &e, message, Some(Action::Delete))
                    .await);
            }
        };
        if verdict == Verdict::Absent {
            info!(machine = %name, "skipping machine that doesn't exist");
            return Ok(Outcome::Skipped);
        }

        info!(machine = %name, "deleting machine");
        if let Err(e) = self.run(machine, &machine_cfg, &cluster_cfg, Action::Delete).await {
            let message = format!("error deleting instance: {e}");
            return Err(self
                .machine_error(machine, MachineErrorReason::DeleteError, &e, message, Some(Action::Delete))
                .await);
        }
        self.events
            .record(machine, EventType::Normal, "Deleted", &format!("Deleted Machine {name}"))
            .await;
        Ok(Outcome::Applied)
    }

    /// Reconcile `goal` against the last snapshot recorded by create.
    pub async fn update(&self, cluster: &Cluster, goal: &Machine) -> Result<Outcome> {
        let name = goal.name_any();
        let (goal_cfg, cluster_cfg) = self.configs(cluster, goal).await?;

        let current = match MachineSnapshot::recorded(goal) {
            Ok(current) => current,
            Err(e) => {
                let message = format!("cannot read last applied state: {e}");
                return Err(self
                    .machine_error(goal, MachineErrorReason::UpdateError, &e, message, None)
                    .await);
            }
        };

        let Some(current) = current else {
            return self.adopt_bootstrap(goal, &goal_cfg, &cluster_cfg).await;
        };

        if current == MachineSnapshot::of(goal) {
            debug!(machine = %name, "no provisioning-relevant changes");
            return Ok(Outcome::Unchanged);
        }

        let current_machine = current.apply_to(goal);
        let current_cfg = match codec::machine_config(&current_machine) {
            Ok(cfg) => cfg,
            Err(e) => {
                let e = Error::from(e);
                let message = format!("cannot decode last applied providerSpec: {e}");
                return Err(self
                    .machine_error(goal, MachineErrorReason::InvalidConfiguration, &e, message, None)
                    .await);
            }
        };
        if is_master(&current_cfg.roles) {
            error!(machine = %name, "in-place update of master machines is not supported");
            return Err(Error::UpdateUnsupported(name));
        }

        info!(machine = %name, "replacing machine to apply update");
        self.delete(cluster, &current_machine).await?;
        self.create(cluster, goal).await?;
        Ok(Outcome::Applied)
    }

    /// Runs the check action. Failures are recorded like a create failure
    /// but raise no event.
    pub async fn exists(&self, cluster: &Cluster, machine: &Machine) -> Result<bool> {
        let (machine_cfg, cluster_cfg) = self.configs(cluster, machine).await?;
        match self.run(machine, &machine_cfg, &cluster_cfg, Action::Check).await {
            Ok(verdict) => Ok(verdict == Verdict::Succeeded),
            Err(e) => {
                let message = format!("error checking instance: {e}");
                Err(self
                    .machine_error(machine, MachineErrorReason::CreateError, &e, message, None)
                    .await)
            }
        }
    }

    // ─── Pipeline ─────────────────────────────────────────────────────────

    async fn configs(
        &self,
        cluster: &Cluster,
        machine: &Machine,
    ) -> Result<(MachineProviderConfig, ClusterProviderConfig)> {
        let decoded = codec::machine_config(machine)
            .and_then(|m| codec::cluster_config(cluster).map(|c| (m, c)));
        match decoded {
            Ok(configs) => Ok(configs),
            Err(e) => {
                let e = Error::from(e);
                let message = format!("cannot unmarshal providerSpec field: {e}");
                Err(self
                    .machine_error(machine, MachineErrorReason::InvalidConfiguration, &e, message, None)
                    .await)
            }
        }
    }

    async fn run(
        &self,
        machine: &Machine,
        machine_cfg: &MachineProviderConfig,
        cluster_cfg: &ClusterProviderConfig,
        action: Action,
    ) -> Result<Verdict> {
        let selection = ConfigSelector {
            platform: self.platform.as_ref(),
            catalog: self.catalog.as_deref(),
            provision: &self.config.provision,
        }
        .select(machine, machine_cfg, cluster_cfg)
        .await?;

        let target = machine.name_any();
        let invocation = synthesize(&selection.template, action, &target)?;
        let unit = WorkUnit {
            action,
            target,
            namespace: job_namespace(machine, machine_cfg),
            template: selection.template,
            invocation,
        };
        self.executor(selection.source).execute(&unit).await
    }

    fn executor(&self, source: TemplateSource) -> Box<dyn Executor> {
        if source == TemplateSource::Fencing || self.config.strategy == Strategy::Process {
            return Box::new(ProcessExecutor::new(self.config.secrets_dir.clone()));
        }
        Box::new(JobExecutor::new(
            self.platform.clone(),
            self.backoff.clone(),
            self.poller.clone(),
            self.config.job_options(),
        ))
    }

    // ─── Persistence ──────────────────────────────────────────────────────

    async fn adopt_bootstrap(
        &self,
        goal: &Machine,
        goal_cfg: &MachineProviderConfig,
        cluster_cfg: &ClusterProviderConfig,
    ) -> Result<Outcome> {
        let name = goal.name_any();
        if let Some(store) = &self.store {
            if goal.labels().contains_key(BOOTSTRAP_LABEL)
                && self.run(goal, goal_cfg, cluster_cfg, Action::Check).await? == Verdict::Succeeded
            {
                info!(machine = %name, "populating current state for bootstrap machine");
                let annotated = self
                    .record_annotations(store.as_ref(), goal, goal_cfg, cluster_cfg)
                    .await?;
                self.record_instance_status(store.as_ref(), &annotated, goal_cfg)
                    .await?;
                return Ok(Outcome::Unchanged);
            }
        }
        error!(machine = %name, "cannot retrieve current state to update machine");
        Err(Error::MissingCurrentState(name))
    }

    async fn record_annotations(
        &self,
        store: &dyn MachineStore,
        machine: &Machine,
        machine_cfg: &MachineProviderConfig,
        cluster_cfg: &ClusterProviderConfig,
    ) -> Result<Machine> {
        let mut m = machine.clone();
        let snapshot = serde_json::to_string(&MachineSnapshot::of(machine))?;
        let annotations = m.annotations_mut();
        annotations.insert(PROJECT_ANNOTATION.to_string(), cluster_cfg.project.clone());
        annotations.insert(ZONE_ANNOTATION.to_string(), machine_cfg.zone.clone());
        annotations.insert(NAME_ANNOTATION.to_string(), machine.name_any());
        annotations.insert(LAST_APPLIED_ANNOTATION.to_string(), snapshot);
        store.update(&m).await
    }

    /// Record the instance as ON together with its node's system UUID.
    /// Skips the write when nothing changed.
    async fn record_instance_status(
        &self,
        store: &dyn MachineStore,
        machine: &Machine,
        machine_cfg: &MachineProviderConfig,
    ) -> Result<()> {
        let name = machine.name_any();
        let current = codec::machine_status(machine)?;

        let node_name = machine_cfg.node_name.clone().unwrap_or_else(|| name.clone());
        let system_uuid = self
            .platform
            .get_node(&node_name)
            .await?
            .and_then(|node| node.status)
            .and_then(|status| status.node_info)
            .map(|info| info.system_uuid);

        let next = MachineProviderStatus {
            instance_uuid: system_uuid.or_else(|| current.instance_uuid.clone()),
            instance_state: Some(INSTANCE_ON.to_string()),
            conditions: current.conditions.clone(),
        };
        if next == current {
            debug!(machine = %name, "provider status unchanged");
            return Ok(());
        }

        let mut m = machine.clone();
        let status = m.status.get_or_insert_with(Default::default);
        status.provider_status = Some(serde_json::to_value(&next)?);
        status.last_updated = Some(Utc::now().to_rfc3339());
        store.update_status(&m).await?;
        info!(machine = %name, state = INSTANCE_ON, "updated provider status");
        Ok(())
    }

    /// Record a failed verb on the machine and build the error returned to
    /// the caller. Configuration errors always carry `InvalidConfiguration`.
    async fn machine_error(
        &self,
        machine: &Machine,
        reason: MachineErrorReason,
        cause: &Error,
        message: String,
        event_action: Option<Action>,
    ) -> Error {
        let reason = if cause.is_configuration() {
            MachineErrorReason::InvalidConfiguration
        } else {
            reason
        };
        let name = machine.name_any();

        if let Some(store) = &self.store {
            let mut m = machine.clone();
            let status = m.status.get_or_insert_with(Default::default);
            status.error_reason = Some(reason.to_string());
            status.error_message = Some(message.clone());
            if let Err(e) = store.update_status(&m).await {
                warn!(machine = %name, "failed to record machine error: {e}");
            }
        }

        if let Some(action) = event_action {
            self.events
                .record(
                    machine,
                    EventType::Warning,
                    &format!("Failed{}", action.event_name()),
                    &format!("{reason}: {message}"),
                )
                .await;
        }

        error!(machine = %name, %reason, "machine error: {message}");
        Error::Machine { reason, message }
    }
}

/// The machine config's zone, else the machine's namespace.
pub fn job_namespace(machine: &Machine, machine_cfg: &MachineProviderConfig) -> String {
    if !machine_cfg.zone.is_empty() {
        return machine_cfg.zone.clone();
    }
    machine.namespace().unwrap_or_else(|| "default".to_string())
}
