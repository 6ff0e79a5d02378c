use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ActuatorError, Result};
use crate::template::ActionTemplate;
use crate::types::MachineRole;

// ---------------------------------------------------------------------------
// Machine provider config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    #[serde(default)]
    pub initialize_params: DiskInitializeParams,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskInitializeParams {
    #[serde(default)]
    pub disk_size_gb: i64,
    #[serde(default)]
    pub disk_type: String,
}

/// Power-management parameters for machines driven by a local
/// provisioning executable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FencingConfig {
    pub agent_type: String,
    pub agent_address: String,
    #[serde(default)]
    pub agent_options: BTreeMap<String, String>,
    /// Credential data, `username` and `password` keys.
    #[serde(default)]
    pub agent_secret: BTreeMap<String, String>,
}

impl FencingConfig {
    pub fn username(&self) -> Result<&str> {
        self.secret_field("username")
    }

    pub fn password(&self) -> Result<&str> {
        self.secret_field("password")
    }

    fn secret_field(&self, key: &str) -> Result<&str> {
        self.agent_secret
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ActuatorError::MissingSecretField(key.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineProviderConfig {
    /// Namespace the machine's jobs run in.
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub roles: Vec<MachineRole>,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub disks: Vec<Disk>,
    /// Node backing this machine when it differs from the machine name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crud_primitives: Option<ActionTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fencing_config: Option<FencingConfig>,
}

// ---------------------------------------------------------------------------
// Cluster provider config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterProviderConfig {
    #[serde(default)]
    pub project: String,
    /// Candidate templates, scanned in order.
    #[serde(default)]
    pub crud_primitives: Vec<ActionTemplate>,
}

// ---------------------------------------------------------------------------
// Machine provider status
// ---------------------------------------------------------------------------

pub const INSTANCE_ON: &str = "ON";
pub const INSTANCE_OFF: &str = "OFF";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineProviderStatus {
    #[serde(rename = "instanceUUID", default, skip_serializing_if = "Option::is_none")]
    pub instance_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_state: Option<String>,
    #[serde(default)]
    pub conditions: Vec<MachineProviderCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineProviderCondition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}
