use actuator_core::resources::Machine;
use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, GetParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use tracing::debug;

use crate::client::{label_selector, MachineStore, PlatformClient};
use crate::error::{Error, Result};

fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.reason == "AlreadyExists" || ae.code == 409)
}

// ─── KubePlatform ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct KubePlatform {
    client: Client,
}

impl KubePlatform {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlatformClient for KubePlatform {
    async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        match api.create(&PostParams::default(), job).await {
            Ok(created) => Ok(created),
            Err(e) if is_already_exists(&e) => {
                let name = job
                    .metadata
                    .name
                    .clone()
                    .or_else(|| job.metadata.generate_name.clone())
                    .unwrap_or_default();
                Err(Error::AlreadyExists(format!("job {namespace}/{name}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_job(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<String>,
    ) -> Result<Job> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        let job = match resource_version {
            Some(rv) => api.get_with(name, &GetParams::at(&rv)).await?,
            None => api.get(name).await?,
        };
        Ok(job)
    }

    async fn list_nodes(&self, selector: &BTreeMap<String, String>) -> Result<Vec<Node>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let selector = label_selector(selector);
        debug!(%selector, "listing nodes");
        let params = if selector.is_empty() {
            ListParams::default()
        } else {
            ListParams::default().labels(&selector)
        };
        Ok(api.list(&params).await?.items)
    }

    async fn get_node(&self, name: &str) -> Result<Option<Node>> {
        let api: Api<Node> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }
}

// ─── KubeMachineStore ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct KubeMachineStore {
    client: Client,
}

impl KubeMachineStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, machine: &Machine) -> Api<Machine> {
        let namespace = machine.namespace().unwrap_or_else(|| "default".to_string());
        Api::namespaced(self.client.clone(), &namespace)
    }
}

#[async_trait]
impl MachineStore for KubeMachineStore {
    async fn update(&self, machine: &Machine) -> Result<Machine> {
        let updated = self
            .api(machine)
            .replace(&machine.name_any(), &PostParams::default(), machine)
            .await?;
        Ok(updated)
    }

    async fn update_status(&self, machine: &Machine) -> Result<Machine> {
        let patch = serde_json::json!({ "status": machine.status });
        let updated = self
            .api(machine)
            .patch_status(
                &machine.name_any(),
                &PatchParams::default(),
                &Patch::Merge(&patch),
            )
            .await?;
        Ok(updated)
    }
}
