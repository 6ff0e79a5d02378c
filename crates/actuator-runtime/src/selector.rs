//! Config selection: which action template drives a given machine.
//!
//! Precedence, highest first:
//! 1. the machine's inline template (or, lacking one, its inline fencing config);
//! 2. the cluster template with the largest node selector whose nodes include
//!    the machine (first maximal match wins);
//! 3. the setup-template catalog, matched by OS, roles and versions.

use actuator_core::catalog::{CatalogSource, ConfigParams};
use actuator_core::config::ProvisionConfig;
use actuator_core::fence::provision_template;
use actuator_core::provider::{ClusterProviderConfig, MachineProviderConfig};
use actuator_core::resources::Machine;
use actuator_core::{ActionTemplate, ActuatorError};
use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::client::{node_in_list, PlatformClient};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSource {
    Inline,
    /// Built from the machine's inline fencing config; always runs locally.
    Fencing,
    Cluster,
    Catalog,
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub template: ActionTemplate,
    pub source: TemplateSource,
}

pub struct ConfigSelector<'a> {
    pub platform: &'a dyn PlatformClient,
    pub catalog: Option<&'a dyn CatalogSource>,
    pub provision: &'a ProvisionConfig,
}

impl ConfigSelector<'_> {
    pub async fn select(
        &self,
        machine: &Machine,
        machine_cfg: &MachineProviderConfig,
        cluster_cfg: &ClusterProviderConfig,
    ) -> Result<Selection> {
        let name = machine.name_any();

        if let Some(template) = &machine_cfg.crud_primitives {
            info!(machine = %name, template = template.display_name(), "using inline primitives");
            return Ok(Selection {
                template: template.clone(),
                source: TemplateSource::Inline,
            });
        }

        if let Some(fencing) = &machine_cfg.fencing_config {
            let template = provision_template(
                fencing,
                &self.provision.executable,
                &self.provision.playbook,
            )?;
            info!(machine = %name, agent = %fencing.agent_type, "using inline fencing config");
            return Ok(Selection {
                template,
                source: TemplateSource::Fencing,
            });
        }

        if let Some(template) = self.best_cluster_match(&name, cluster_cfg).await {
            info!(machine = %name, template = template.display_name(), "chose primitives from cluster list");
            return Ok(Selection {
                template,
                source: TemplateSource::Cluster,
            });
        }

        if let Some(template) = self.catalog_match(machine, machine_cfg) {
            info!(machine = %name, template = template.display_name(), "chose primitives from setup catalog");
            return Ok(Selection {
                template,
                source: TemplateSource::Catalog,
            });
        }

        Err(ActuatorError::NoValidConfig(name).into())
    }

    /// Scans the whole list; a later template only wins with a strictly
    /// larger selector.
    async fn best_cluster_match(
        &self,
        name: &str,
        cluster_cfg: &ClusterProviderConfig,
    ) -> Option<ActionTemplate> {
        let mut threshold: i64 = -1;
        let mut chosen = None;
        for template in &cluster_cfg.crud_primitives {
            let size = template.node_selector.len() as i64;
            if size <= threshold {
                continue;
            }
            match self.platform.list_nodes(&template.node_selector).await {
                Ok(nodes) if node_in_list(name, &nodes) => {
                    debug!(machine = %name, template = template.display_name(), size, "selector matches");
                    chosen = Some(template.clone());
                    threshold = size;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(template = template.display_name(), "node lookup failed: {e}");
                }
            }
        }
        chosen
    }

    fn catalog_match(
        &self,
        machine: &Machine,
        machine_cfg: &MachineProviderConfig,
    ) -> Option<ActionTemplate> {
        let catalog = self.catalog?;
        let params = ConfigParams {
            os: machine_cfg.os.clone(),
            roles: machine_cfg.roles.clone(),
            versions: machine.spec.versions.clone(),
        };
        let setups = match catalog.setup_catalog() {
            Ok(setups) => setups,
            Err(e) => {
                warn!(machine = %machine.name_any(), "no machine setup config: {e}");
                return None;
            }
        };
        match setups.template_for(&params) {
            Ok(template) => template,
            Err(e) => {
                info!(machine = %machine.name_any(), "no matching machine setup: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockPlatformClient;
    use actuator_core::catalog::SetupCatalog;
    use actuator_core::provider::FencingConfig;
    use actuator_core::resources::{MachineSpec, MachineVersionInfo};
    use actuator_core::types::MachineRole;
    use k8s_openapi::api::core::v1::Node;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn node(name: &str) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn template(name: &str, selector: &[(&str, &str)]) -> ActionTemplate {
        ActionTemplate {
            name: name.into(),
            create_args: Some(vec!["on".into()]),
            node_selector: selector
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    fn machine(name: &str) -> Machine {
        let mut spec = MachineSpec::default();
        spec.versions = MachineVersionInfo {
            kubelet: "1.12.0".into(),
            control_plane: None,
        };
        Machine::new(name, spec)
    }

    /// Nodes carrying labels; list_nodes returns those matching the selector.
    fn platform_with(nodes: Vec<(&'static str, Vec<(&'static str, &'static str)>)>) -> MockPlatformClient {
        let mut platform = MockPlatformClient::new();
        platform.expect_list_nodes().returning(move |selector| {
            Ok(nodes
                .iter()
                .filter(|(_, labels)| {
                    selector
                        .iter()
                        .all(|(k, v)| labels.iter().any(|(lk, lv)| lk == k && lv == v))
                })
                .map(|(name, _)| node(name))
                .collect())
        });
        platform
    }

    async fn select(
        platform: &MockPlatformClient,
        catalog: Option<&dyn CatalogSource>,
        machine_cfg: &MachineProviderConfig,
        cluster_cfg: &ClusterProviderConfig,
        name: &str,
    ) -> Result<Selection> {
        let provision = ProvisionConfig::default();
        ConfigSelector {
            platform,
            catalog,
            provision: &provision,
        }
        .select(&machine(name), machine_cfg, cluster_cfg)
        .await
    }

    #[tokio::test]
    async fn inline_template_wins_over_cluster_list() {
        let platform = platform_with(vec![("m1", vec![("role", "master")])]);
        let machine_cfg = MachineProviderConfig {
            crud_primitives: Some(template("A", &[])),
            ..Default::default()
        };
        let cluster_cfg = ClusterProviderConfig {
            crud_primitives: vec![template("B", &[("role", "master")])],
            ..Default::default()
        };
        let sel = select(&platform, None, &machine_cfg, &cluster_cfg, "m1")
            .await
            .unwrap();
        assert_eq!(sel.template.name, "A");
        assert_eq!(sel.source, TemplateSource::Inline);
    }

    #[tokio::test]
    async fn larger_selector_wins() {
        let platform = platform_with(vec![("m1", vec![("zone", "us"), ("rack", "1")])]);
        let cluster_cfg = ClusterProviderConfig {
            crud_primitives: vec![
                template("narrow", &[("zone", "us")]),
                template("wide", &[("zone", "us"), ("rack", "1")]),
            ],
            ..Default::default()
        };
        let sel = select(
            &platform,
            None,
            &MachineProviderConfig::default(),
            &cluster_cfg,
            "m1",
        )
        .await
        .unwrap();
        assert_eq!(sel.template.name, "wide");
        assert_eq!(sel.source, TemplateSource::Cluster);
    }

    #[tokio::test]
    async fn first_maximal_match_wins_ties() {
        let platform = platform_with(vec![("m1", vec![("zone", "us"), ("rack", "1")])]);
        let cluster_cfg = ClusterProviderConfig {
            crud_primitives: vec![
                template("first", &[("zone", "us")]),
                template("second", &[("rack", "1")]),
            ],
            ..Default::default()
        };
        let sel = select(
            &platform,
            None,
            &MachineProviderConfig::default(),
            &cluster_cfg,
            "m1",
        )
        .await
        .unwrap();
        assert_eq!(sel.template.name, "first");
    }

    #[tokio::test]
    async fn selector_must_include_the_machine() {
        let platform = platform_with(vec![
            ("m1", vec![("zone", "us")]),
            ("m2", vec![("zone", "us"), ("rack", "1")]),
        ]);
        let cluster_cfg = ClusterProviderConfig {
            crud_primitives: vec![
                template("wide", &[("zone", "us"), ("rack", "1")]),
                template("narrow", &[("zone", "us")]),
            ],
            ..Default::default()
        };
        let sel = select(
            &platform,
            None,
            &MachineProviderConfig::default(),
            &cluster_cfg,
            "m1",
        )
        .await
        .unwrap();
        assert_eq!(sel.template.name, "narrow");
    }

    #[tokio::test]
    async fn node_lookup_errors_skip_the_template() {
        let mut platform = MockPlatformClient::new();
        platform
            .expect_list_nodes()
            .returning(|_| Err(crate::Error::AlreadyExists("boom".into())));
        let cluster_cfg = ClusterProviderConfig {
            crud_primitives: vec![template("any", &[])],
            ..Default::default()
        };
        let err = select(
            &platform,
            None,
            &MachineProviderConfig::default(),
            &cluster_cfg,
            "m1",
        )
        .await
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("m1"));
    }

    #[tokio::test]
    async fn catalog_is_the_last_resort() {
        let platform = platform_with(vec![]);
        let catalog = SetupCatalog::parse(
            r#"
items:
  - machineParams:
      - os: fedora
        roles: [Node]
        versions: { kubelet: 1.12.0 }
    metadata:
      crudPrimitives:
        name: from-catalog
        createArgs: [on]
"#,
        )
        .unwrap();
        let machine_cfg = MachineProviderConfig {
            os: "fedora".into(),
            roles: vec![MachineRole::Node],
            ..Default::default()
        };
        let cluster_cfg = ClusterProviderConfig {
            crud_primitives: vec![template("elsewhere", &[("zone", "eu")])],
            ..Default::default()
        };
        let sel = select(&platform, Some(&catalog), &machine_cfg, &cluster_cfg, "m1")
            .await
            .unwrap();
        assert_eq!(sel.template.name, "from-catalog");
        assert_eq!(sel.source, TemplateSource::Catalog);
    }

    #[tokio::test]
    async fn nothing_matches_is_no_valid_config() {
        let platform = platform_with(vec![]);
        let err = select(
            &platform,
            Some(&SetupCatalog::default()),
            &MachineProviderConfig::default(),
            &ClusterProviderConfig::default(),
            "m9",
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "no valid configuration for machine m9");
    }

    #[tokio::test]
    async fn fencing_config_yields_local_template() {
        let platform = MockPlatformClient::new();
        let machine_cfg = MachineProviderConfig {
            fencing_config: Some(FencingConfig {
                agent_type: "ipmilan".into(),
                agent_address: "10.0.0.5".into(),
                agent_options: BTreeMap::new(),
                agent_secret: BTreeMap::from([
                    ("username".to_string(), "admin".to_string()),
                    ("password".to_string(), "pw".to_string()),
                ]),
            }),
            ..Default::default()
        };
        let sel = select(
            &platform,
            None,
            &machine_cfg,
            &ClusterProviderConfig::default(),
            "m1",
        )
        .await
        .unwrap();
        assert_eq!(sel.source, TemplateSource::Fencing);
        assert_eq!(
            sel.template.container.command.as_deref(),
            Some(&["ansible-playbook".to_string()][..])
        );
    }
}
