//! Action templates (a.k.a. CRUD primitives).
//!
//! A template describes how one class of machines is driven: which container
//! or executable to run, the argument fragment for each lifecycle action, and
//! how static config, per-target values, secrets, the target name and the
//! action name are handed to the command.

use k8s_openapi::api::core::v1::{Container, Volume};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::Action;

// ---------------------------------------------------------------------------
// DynamicField
// ---------------------------------------------------------------------------

/// A template parameter whose value depends on the target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicField {
    pub field: String,
    /// Target name → value.
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl DynamicField {
    pub fn lookup(&self, target: &str) -> Option<&str> {
        self.values
            .get(target)
            .or(self.default.as_ref())
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// ActionTemplate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTemplate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub container: Container,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reboot_args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_args: Option<Vec<String>>,

    /// `cli` or `env`; anything else fails at synthesis time.
    #[serde(default = "default_argument_format")]
    pub argument_format: String,

    #[serde(default)]
    pub config: BTreeMap<String, String>,
    #[serde(default)]
    pub dynamic_config: Vec<DynamicField>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_target_as: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_action_as: Option<String>,

    /// Job backoff limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<i32>,

    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,

    /// Logical field name → secret name.
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,

    #[serde(default)]
    pub volumes: Vec<Volume>,
}

fn default_argument_format() -> String {
    "cli".to_string()
}

impl Default for ActionTemplate {
    fn default() -> Self {
        Self {
            name: String::new(),
            container: Container::default(),
            create_args: None,
            delete_args: None,
            reboot_args: None,
            check_args: None,
            argument_format: default_argument_format(),
            config: BTreeMap::new(),
            dynamic_config: Vec::new(),
            pass_target_as: None,
            pass_action_as: None,
            retries: None,
            node_selector: BTreeMap::new(),
            secrets: BTreeMap::new(),
            volumes: Vec::new(),
        }
    }
}

impl ActionTemplate {
    /// The argument fragment declared for `action`, if any.
    pub fn args_for(&self, action: Action) -> Option<&[String]> {
        let args = match action {
            Action::Create => &self.create_args,
            Action::Delete => &self.delete_args,
            Action::Reboot => &self.reboot_args,
            Action::Check => &self.check_args,
        };
        args.as_deref()
    }

    /// An action is defined when the template carries an argument fragment
    /// for it or passes the action name to the command itself.
    pub fn defines(&self, action: Action) -> bool {
        self.args_for(action).is_some() || self.pass_action_as.is_some()
    }

    /// Display name: the template name, else the container name.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.container.name
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_lookup_prefers_target_value_then_default() {
        let field = DynamicField {
            field: "port".into(),
            values: BTreeMap::from([("m1".to_string(), "1".to_string())]),
            default: Some("9".into()),
        };
        assert_eq!(field.lookup("m1"), Some("1"));
        assert_eq!(field.lookup("m2"), Some("9"));

        let strict = DynamicField {
            default: None,
            ..field
        };
        assert_eq!(strict.lookup("m2"), None);
    }

    #[test]
    fn deserializes_camel_case_yaml() {
        let yaml = r#"
name: ipmi
container:
  name: fence
  image: quay.io/fence/agents
  args: ["/sbin/fence_ipmilan"]
createArgs: ["--action", "on"]
checkArgs: ["--action", "status"]
argumentFormat: env
config:
  lanplus: "1"
dynamicConfig:
  - field: ipport
    values:
      m1: "623"
passTargetAs: ip
retries: 2
nodeSelector:
  rack: "1"
secrets:
  password: ipmi-secret
"#;
        let t: ActionTemplate = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(t.display_name(), "ipmi");
        assert_eq!(t.container.image.as_deref(), Some("quay.io/fence/agents"));
        assert_eq!(t.argument_format, "env");
        assert_eq!(t.args_for(Action::Create).unwrap(), ["--action", "on"]);
        assert!(t.args_for(Action::Delete).is_none());
        assert!(t.defines(Action::Check));
        assert!(!t.defines(Action::Reboot));
        assert_eq!(t.pass_target_as.as_deref(), Some("ip"));
        assert_eq!(t.retries, Some(2));
        assert_eq!(t.secrets["password"], "ipmi-secret");
    }

    #[test]
    fn pass_action_as_defines_every_action() {
        let t = ActionTemplate {
            pass_action_as: Some("action".into()),
            ..Default::default()
        };
        for action in Action::all() {
            assert!(t.defines(*action));
        }
    }

    #[test]
    fn argument_format_defaults_to_cli() {
        let t: ActionTemplate = serde_yaml::from_str("name: x").unwrap();
        assert_eq!(t.argument_format, "cli");
        assert_eq!(ActionTemplate::default().argument_format, "cli");
    }
}
