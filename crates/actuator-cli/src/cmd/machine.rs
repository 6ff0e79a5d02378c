use crate::output::print_json;
use actuator_core::catalog::{CatalogSource, FileCatalog};
use actuator_core::config::ActuatorConfig;
use actuator_core::resources::{Cluster, Machine};
use actuator_runtime::events::KubeEventRecorder;
use actuator_runtime::kube_client::{KubeMachineStore, KubePlatform};
use actuator_runtime::{MachineActuator, MachineActuatorParams, MachineStore};
use anyhow::Context;
use clap::{Args, Subcommand};
use kube::ResourceExt;
use serde_json::{json, to_value, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum MachineSubcommand {
    /// Create the machine unless it already exists
    Create(MachineArgs),
    /// Delete the machine if it exists
    Delete(MachineArgs),
    /// Apply spec changes since the last create
    Update(MachineArgs),
    /// Report whether the machine exists
    Exists(MachineArgs),
}

#[derive(Args)]
pub struct MachineArgs {
    /// Machine manifest (YAML)
    #[arg(long)]
    pub machine: PathBuf,

    /// Cluster manifest (YAML)
    #[arg(long)]
    pub cluster: PathBuf,

    /// Actuator config file
    #[arg(long, env = "ACTUATOR_CONFIG", default_value = "actuator.yaml")]
    pub config: PathBuf,

    /// Do not write status or annotations back to the Machine
    #[arg(long)]
    pub no_store: bool,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(subcmd: MachineSubcommand, json: bool) -> anyhow::Result<()> {
    let (verb, args) = match &subcmd {
        MachineSubcommand::Create(a) => ("create", a),
        MachineSubcommand::Delete(a) => ("delete", a),
        MachineSubcommand::Update(a) => ("update", a),
        MachineSubcommand::Exists(a) => ("exists", a),
    };

    let config = load_config(&args.config)?;
    let machine: Machine = load_manifest(&args.machine)?;
    let cluster: Cluster = load_manifest(&args.cluster)?;
    let name = machine.name_any();

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async {
        let actuator = build_actuator(config, args.no_store).await?;
        let value = match &subcmd {
            MachineSubcommand::Create(_) => to_value(actuator.create(&cluster, &machine).await?)?,
            MachineSubcommand::Delete(_) => to_value(actuator.delete(&cluster, &machine).await?)?,
            MachineSubcommand::Update(_) => to_value(actuator.update(&cluster, &machine).await?)?,
            MachineSubcommand::Exists(_) => to_value(actuator.exists(&cluster, &machine).await?)?,
        };
        anyhow::Ok(value)
    })?;

    if json {
        print_json(&json!({ "machine": name, "verb": verb, "result": result }))?;
    } else {
        match result {
            Value::String(outcome) => println!("{verb} {name}: {outcome}"),
            other => println!("{verb} {name}: {other}"),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn load_config(path: &Path) -> anyhow::Result<ActuatorConfig> {
    let config = ActuatorConfig::load(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    for w in config.validate() {
        warn!("{}", w.message);
    }
    Ok(config)
}

pub(crate) fn load_manifest<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

async fn build_actuator(config: ActuatorConfig, no_store: bool) -> anyhow::Result<MachineActuator> {
    let client = kube::Client::try_default()
        .await
        .context("failed to build cluster client")?;

    let store = if no_store {
        None
    } else {
        Some(Arc::new(KubeMachineStore::new(client.clone())) as Arc<dyn MachineStore>)
    };
    let catalog = config
        .setup_catalog
        .clone()
        .map(|path| Arc::new(FileCatalog::new(path)) as Arc<dyn CatalogSource>);
    let events = Arc::new(KubeEventRecorder::new(client.clone(), config.event_component.clone()));

    Ok(MachineActuator::new(MachineActuatorParams {
        platform: Arc::new(KubePlatform::new(client)),
        store,
        events,
        catalog,
        config,
    }))
}
