use crate::output::print_json;
use actuator_core::resources::Cluster;
use actuator_runtime::ClusterActuator;
use clap::Subcommand;
use kube::ResourceExt;
use std::path::PathBuf;

use super::machine::load_manifest;

#[derive(Subcommand)]
pub enum ClusterSubcommand {
    /// Check that the cluster provider config decodes
    Reconcile {
        /// Cluster manifest (YAML)
        #[arg(long)]
        cluster: PathBuf,
    },
    /// Delete the cluster
    Delete {
        /// Cluster manifest (YAML)
        #[arg(long)]
        cluster: PathBuf,
    },
}

pub fn run(subcmd: ClusterSubcommand, json: bool) -> anyhow::Result<()> {
    let actuator = ClusterActuator::new();
    let (verb, cluster) = match subcmd {
        ClusterSubcommand::Reconcile { cluster } => {
            let cluster: Cluster = load_manifest(&cluster)?;
            actuator.reconcile(&cluster)?;
            ("reconcile", cluster)
        }
        ClusterSubcommand::Delete { cluster } => {
            let cluster: Cluster = load_manifest(&cluster)?;
            actuator.delete(&cluster)?;
            ("delete", cluster)
        }
    };

    let name = cluster.name_any();
    if json {
        print_json(&serde_json::json!({ "cluster": name, "verb": verb, "result": "ok" }))?;
    } else {
        println!("{verb} {name}: ok");
    }
    Ok(())
}
