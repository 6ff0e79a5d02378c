//! Setup-template catalog.
//!
//! The lowest-precedence source of action templates: a YAML document listing
//! machine setups, each matched by OS, role set and versions.
//!
//! ```yaml
//! items:
//!   - machineParams:
//!       - os: fedora
//!         roles: [Node]
//!         versions: { kubelet: 1.12.0 }
//!     metadata:
//!       crudPrimitives:
//!         name: ipmi
//!         ...
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{ActuatorError, Result};
use crate::resources::MachineVersionInfo;
use crate::template::ActionTemplate;
use crate::types::MachineRole;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigParams {
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub roles: Vec<MachineRole>,
    #[serde(default)]
    pub versions: MachineVersionInfo,
}

impl ConfigParams {
    /// Role order and duplicates do not matter.
    pub fn matches(&self, other: &ConfigParams) -> bool {
        let mine: BTreeSet<_> = self.roles.iter().collect();
        let theirs: BTreeSet<_> = other.roles.iter().collect();
        self.os == other.os && mine == theirs && self.versions == other.versions
    }
}

impl std::fmt::Display for ConfigParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "os={} roles={:?} kubelet={}",
            self.os, self.roles, self.versions.kubelet
        )?;
        if let Some(cp) = &self.versions.control_plane {
            write!(f, " controlPlane={cp}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crud_primitives: Option<ActionTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupEntry {
    #[serde(default)]
    pub machine_params: Vec<ConfigParams>,
    #[serde(default)]
    pub metadata: SetupMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetupCatalog {
    #[serde(default)]
    pub items: Vec<SetupEntry>,
}

impl SetupCatalog {
    pub fn parse(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Metadata of the first entry with a matching parameter set.
    pub fn get_metadata(&self, params: &ConfigParams) -> Result<&SetupMetadata> {
        self.items
            .iter()
            .find(|entry| entry.machine_params.iter().any(|p| p.matches(params)))
            .map(|entry| &entry.metadata)
            .ok_or_else(|| ActuatorError::CatalogNoMatch(params.to_string()))
    }

    pub fn template_for(&self, params: &ConfigParams) -> Result<Option<ActionTemplate>> {
        Ok(self.get_metadata(params)?.crud_primitives.clone())
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

pub trait CatalogSource: Send + Sync {
    fn setup_catalog(&self) -> Result<SetupCatalog>;
}

/// Reads the catalog file on every lookup, so edits apply without a restart.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for FileCatalog {
    fn setup_catalog(&self) -> Result<SetupCatalog> {
        let raw = std::fs::read_to_string(&self.path)?;
        SetupCatalog::parse(&raw)
    }
}

/// A fixed in-memory catalog.
impl CatalogSource for SetupCatalog {
    fn setup_catalog(&self) -> Result<SetupCatalog> {
        Ok(self.clone())
    }
}
