//! Provider-config codec: typed configs to and from the opaque payload
//! carried in `providerSpec.value` / `status.providerStatus`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ActuatorError, Result};
use crate::provider::{ClusterProviderConfig, MachineProviderConfig, MachineProviderStatus};
use crate::resources::{Cluster, Machine, ProviderSpec};

pub fn decode<T: DeserializeOwned>(raw: &[u8]) -> Result<T> {
    serde_json::from_slice(raw).map_err(|e| ActuatorError::InvalidProviderConfig(e.to_string()))
}

pub fn encode<T: Serialize>(config: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(config)?)
}

pub fn decode_spec<T: DeserializeOwned>(spec: &ProviderSpec) -> Result<T> {
    let value = spec
        .value
        .clone()
        .ok_or_else(|| ActuatorError::InvalidProviderConfig("no value in providerSpec".into()))?;
    serde_json::from_value(value).map_err(|e| ActuatorError::InvalidProviderConfig(e.to_string()))
}

pub fn encode_spec<T: Serialize>(config: &T) -> Result<ProviderSpec> {
    Ok(ProviderSpec {
        value: Some(serde_json::to_value(config)?),
    })
}

pub fn machine_config(machine: &Machine) -> Result<MachineProviderConfig> {
    decode_spec(&machine.spec.provider_spec)
}

pub fn cluster_config(cluster: &Cluster) -> Result<ClusterProviderConfig> {
    decode_spec(&cluster.spec.provider_spec)
}

/// Decode the machine's provider status; a machine without one yields the default.
pub fn machine_status(machine: &Machine) -> Result<MachineProviderStatus> {
    match machine
        .status
        .as_ref()
        .and_then(|s| s.provider_status.clone())
    {
        Some(value) => serde_json::from_value(value)
            .map_err(|e| ActuatorError::InvalidProviderConfig(e.to_string())),
        None => Ok(MachineProviderStatus::default()),
    }
}
