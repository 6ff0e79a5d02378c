//! Platform seams: the operations the actuator needs from the cluster API.
//!
//! Production code uses the kube-backed implementations in
//! [`crate::kube_client`]; tests substitute the generated mocks.

use actuator_core::resources::Machine;
use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Node;
use std::collections::BTreeMap;

#[cfg(test)]
use mockall::automock;

use crate::error::Result;

/// Job and node operations.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Create a job. A name collision surfaces as [`crate::Error::AlreadyExists`].
    async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job>;

    /// Fetch a job, optionally no older than `resource_version`.
    async fn get_job(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<String>,
    ) -> Result<Job>;

    /// Nodes matching every label in `selector`. An empty selector matches all nodes.
    async fn list_nodes(&self, selector: &BTreeMap<String, String>) -> Result<Vec<Node>>;

    async fn get_node(&self, name: &str) -> Result<Option<Node>>;
}

/// Write access to Machine objects. Absent while the cluster itself is
/// being installed; the actuator skips persistence then.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MachineStore: Send + Sync {
    /// Replace the machine's metadata and spec.
    async fn update(&self, machine: &Machine) -> Result<Machine>;

    /// Write the machine's status block.
    async fn update_status(&self, machine: &Machine) -> Result<Machine>;
}

pub fn node_in_list(name: &str, nodes: &[Node]) -> bool {
    nodes
        .iter()
        .any(|n| n.metadata.name.as_deref() == Some(name))
}

/// `k1=v1,k2=v2` in key order.
pub fn label_selector(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}
