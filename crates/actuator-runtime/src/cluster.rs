use actuator_core::codec;
use actuator_core::resources::Cluster;
use kube::ResourceExt;
use tracing::{info, warn};

use crate::error::Result;

/// Cluster-level actuator. Clusters carry no provisioned resources of their
/// own; reconcile only checks the provider config is usable.
#[derive(Debug, Clone, Default)]
pub struct ClusterActuator;

impl ClusterActuator {
    pub fn new() -> Self {
        Self
    }

    pub fn reconcile(&self, cluster: &Cluster) -> Result<()> {
        let name = cluster.name_any();
        info!(cluster = %name, "reconciling cluster");
        match codec::cluster_config(cluster) {
            Ok(cfg) => {
                info!(
                    cluster = %name,
                    project = %cfg.project,
                    templates = cfg.crud_primitives.len(),
                    "cluster config is valid"
                );
                Ok(())
            }
            Err(e) => {
                warn!(cluster = %name, "no config found for cluster: {e}");
                Err(e.into())
            }
        }
    }

    pub fn delete(&self, cluster: &Cluster) -> Result<()> {
        info!(cluster = %cluster.name_any(), "deleting cluster");
        Ok(())
    }
}
