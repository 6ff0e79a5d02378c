//! Machine event recording.

use actuator_core::resources::Machine;
use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::core::v1::{Event, EventSource};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::api::{Api, PostParams};
use kube::{Client, Resource, ResourceExt};
use std::fmt;
use tracing::{info, warn};

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Normal => "Normal",
            EventType::Warning => "Warning",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records events against a machine. Recording is best effort: failures
/// are logged, never returned.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn record(&self, machine: &Machine, event_type: EventType, reason: &str, message: &str);
}

// ─── TracingRecorder ──────────────────────────────────────────────────────

/// Writes events to the log only.
#[derive(Debug, Clone, Default)]
pub struct TracingRecorder;

#[async_trait]
impl EventRecorder for TracingRecorder {
    async fn record(&self, machine: &Machine, event_type: EventType, reason: &str, message: &str) {
        match event_type {
            EventType::Normal => info!(machine = %machine.name_any(), %reason, "{message}"),
            EventType::Warning => warn!(machine = %machine.name_any(), %reason, "{message}"),
        }
    }
}

// ─── KubeEventRecorder ────────────────────────────────────────────────────

/// Creates `core/v1` Events in the machine's namespace.
#[derive(Clone)]
pub struct KubeEventRecorder {
    client: Client,
    component: String,
}

impl KubeEventRecorder {
    pub fn new(client: Client, component: impl Into<String>) -> Self {
        Self {
            client,
            component: component.into(),
        }
    }
}

pub fn build_event(
    machine: &Machine,
    component: &str,
    event_type: EventType,
    reason: &str,
    message: &str,
) -> Event {
    let now = Time(Utc::now());
    let name = machine.name_any();
    Event {
        metadata: ObjectMeta {
            name: Some(format!("{name}.{}", uuid::Uuid::new_v4().simple())),
            namespace: machine.namespace(),
            ..Default::default()
        },
        involved_object: machine.object_ref(&()),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        type_: Some(event_type.as_str().to_string()),
        source: Some(EventSource {
            component: Some(component.to_string()),
            host: None,
        }),
        count: Some(1),
        first_timestamp: Some(now.clone()),
        last_timestamp: Some(now),
        ..Default::default()
    }
}

#[async_trait]
impl EventRecorder for KubeEventRecorder {
    async fn record(&self, machine: &Machine, event_type: EventType, reason: &str, message: &str) {
        let namespace = machine.namespace().unwrap_or_else(|| "default".to_string());
        let event = build_event(machine, &self.component, event_type, reason, message);
        let api: Api<Event> = Api::namespaced(self.client.clone(), &namespace);
        match api.create(&PostParams::default(), &event).await {
            Ok(_) => info!(machine = %machine.name_any(), %reason, "recorded event"),
            Err(e) => warn!(machine = %machine.name_any(), %reason, "failed to record event: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actuator_core::resources::MachineSpec;

    #[test]
    fn event_references_machine() {
        let mut machine = Machine::new("m1", MachineSpec::default());
        machine.metadata.namespace = Some("lab".into());

        let event = build_event(
            &machine,
            "machine-actuator",
            EventType::Warning,
            "FailedCreate",
            "CreateError",
        );
        assert!(event.metadata.name.as_deref().unwrap().starts_with("m1."));
        assert_eq!(event.metadata.namespace.as_deref(), Some("lab"));
        assert_eq!(event.involved_object.name.as_deref(), Some("m1"));
        assert_eq!(event.involved_object.kind.as_deref(), Some("Machine"));
        assert_eq!(event.type_.as_deref(), Some("Warning"));
        assert_eq!(event.reason.as_deref(), Some("FailedCreate"));
        assert_eq!(
            event.source.unwrap().component.as_deref(),
            Some("machine-actuator")
        );
    }

    #[tokio::test]
    async fn tracing_recorder_never_fails() {
        let machine = Machine::new("m1", MachineSpec::default());
        TracingRecorder
            .record(&machine, EventType::Normal, "Created", "Created Machine m1")
            .await;
    }
}
