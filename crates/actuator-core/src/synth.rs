//! Command/environment synthesis.
//!
//! Renders an [`ActionTemplate`] plus a target into the argument list and
//! environment a command receives. The output says nothing about where the
//! command will run; job and process executors both consume it.
//!
//! # Argument formats
//! - `cli`: static config, dynamic fields, the action and the target become
//!   `--key value` pairs (the target is positional when no flag is named).
//! - `env`: the same values become environment entries; the target is
//!   appended positionally to the arguments when no variable is named.
//!
//! The environment always starts with `ARG_FORMAT=<format>`.

use k8s_openapi::api::core::v1::EnvVar;
use tracing::debug;

use crate::error::{ActuatorError, Result};
use crate::template::ActionTemplate;
use crate::types::{Action, ArgumentFormat};

pub const ARG_FORMAT_ENV: &str = "ARG_FORMAT";

/// A rendered command line: arguments and environment, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    pub args: Vec<String>,
    pub env: Vec<EnvVar>,
}

impl Invocation {
    /// Literal `(name, value)` pairs. Entries sourced from `valueFrom` only
    /// resolve inside a pod and are skipped.
    pub fn literal_env(&self) -> Vec<(String, String)> {
        self.env
            .iter()
            .filter_map(|e| e.value.as_ref().map(|v| (e.name.clone(), v.clone())))
            .collect()
    }

    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.value.as_deref())
    }
}

pub fn env_var(name: impl Into<String>, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.into(),
        value: Some(value.into()),
        value_from: None,
    }
}

/// Render `template` for `action` against `target`.
pub fn synthesize(template: &ActionTemplate, action: Action, target: &str) -> Result<Invocation> {
    let format: ArgumentFormat = template.argument_format.parse()?;

    if !template.defines(action) {
        return Err(ActuatorError::ActionNotDefined {
            template: template.display_name().to_string(),
            action: action.to_string(),
        });
    }

    // All per-target values resolve before anything is rendered.
    let dynamic = resolve_dynamic(template, target)?;

    let mut args: Vec<String> = template.container.args.clone().unwrap_or_default();
    if let Some(fragment) = template.args_for(action) {
        args.extend(fragment.iter().cloned());
    }

    let mut env = vec![env_var(ARG_FORMAT_ENV, format.as_str())];
    env.extend(template.container.env.iter().flatten().cloned());

    match format {
        ArgumentFormat::Cli => {
            for (key, value) in &template.config {
                push_flag(&mut args, key, value);
            }
            for (field, value) in &dynamic {
                push_flag(&mut args, field, value);
            }
            if let Some(key) = &template.pass_action_as {
                push_flag(&mut args, key, action.as_str());
            }
            match &template.pass_target_as {
                Some(key) => push_flag(&mut args, key, target),
                None => args.push(target.to_string()),
            }
        }
        ArgumentFormat::Env => {
            for (key, value) in &template.config {
                env.push(env_var(key, value));
            }
            for (field, value) in dynamic {
                env.push(env_var(field, value));
            }
            match &template.pass_target_as {
                Some(key) => env.push(env_var(key, target)),
                None => args.push(target.to_string()),
            }
            if let Some(key) = &template.pass_action_as {
                env.push(env_var(key, action.as_str()));
            }
        }
    }

    debug!(
        template = template.display_name(),
        %action,
        %target,
        ?args,
        "synthesized command"
    );
    Ok(Invocation { args, env })
}

fn resolve_dynamic(template: &ActionTemplate, target: &str) -> Result<Vec<(String, String)>> {
    template
        .dynamic_config
        .iter()
        .map(|dc| {
            dc.lookup(target)
                .map(|v| (dc.field.clone(), v.to_string()))
                .ok_or_else(|| ActuatorError::MissingDynamicValue {
                    field: dc.field.clone(),
                    target: target.to_string(),
                })
        })
        .collect()
}

fn push_flag(args: &mut Vec<String>, key: &str, value: &str) {
    args.push(format!("--{key}"));
    args.push(value.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::DynamicField;
    use k8s_openapi::api::core::v1::Container;
    use std::collections::BTreeMap;

    fn template(format: &str) -> ActionTemplate {
        ActionTemplate {
            name: "ipmi".into(),
            container: Container {
                name: "fence".into(),
                image: Some("fence-agents".into()),
                args: Some(vec!["/sbin/fence_ipmilan".into()]),
                env: Some(vec![env_var("DEBUG", "1")]),
                ..Default::default()
            },
            create_args: Some(vec!["--action".into(), "on".into()]),
            delete_args: Some(vec!["--action".into(), "off".into()]),
            reboot_args: Some(vec!["--action".into(), "reboot".into()]),
            check_args: Some(vec!["--action".into(), "status".into()]),
            argument_format: format.into(),
            config: BTreeMap::from([("lanplus".to_string(), "1".to_string())]),
            dynamic_config: vec![DynamicField {
                field: "ipport".into(),
                values: BTreeMap::from([("m1".to_string(), "623".to_string())]),
                default: None,
            }],
            ..Default::default()
        }
    }

    fn names(inv: &Invocation) -> Vec<&str> {
        inv.env.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn cli_appends_config_dynamic_and_positional_target() {
        let inv = synthesize(&template("cli"), Action::Create, "m1").unwrap();
        assert_eq!(
            inv.args,
            [
                "/sbin/fence_ipmilan",
                "--action",
                "on",
                "--lanplus",
                "1",
                "--ipport",
                "623",
                "m1"
            ]
        );
        assert_eq!(names(&inv), ["ARG_FORMAT", "DEBUG"]);
        assert_eq!(inv.env_value(ARG_FORMAT_ENV), Some("cli"));
    }

    #[test]
    fn cli_uses_named_flags_for_action_and_target() {
        let mut t = template("cli");
        t.pass_action_as = Some("op".into());
        t.pass_target_as = Some("ip".into());
        let inv = synthesize(&t, Action::Reboot, "m1").unwrap();
        let tail = &inv.args[inv.args.len() - 4..];
        assert_eq!(tail, ["--op", "reboot", "--ip", "m1"]);
        assert_eq!(inv.args.iter().filter(|a| *a == "m1").count(), 1);
    }

    #[test]
    fn cli_never_emits_empty_command_for_defined_actions() {
        let t = template("cli");
        for action in Action::all() {
            let inv = synthesize(&t, *action, "m1").unwrap();
            assert!(!inv.args.is_empty());
            assert_eq!(inv.args.last().map(String::as_str), Some("m1"));
        }
    }

    #[test]
    fn env_moves_parameters_into_environment() {
        let mut t = template("env");
        t.pass_action_as = Some("ACTION".into());
        t.pass_target_as = Some("TARGET".into());
        let inv = synthesize(&t, Action::Delete, "m1").unwrap();
        assert_eq!(inv.args, ["/sbin/fence_ipmilan", "--action", "off"]);
        assert_eq!(
            names(&inv),
            ["ARG_FORMAT", "DEBUG", "lanplus", "ipport", "TARGET", "ACTION"]
        );
        assert_eq!(inv.env_value("ARG_FORMAT"), Some("env"));
        assert_eq!(inv.env_value("TARGET"), Some("m1"));
        assert_eq!(inv.env_value("ACTION"), Some("delete"));
    }

    #[test]
    fn env_without_target_key_puts_target_in_args() {
        let inv = synthesize(&template("env"), Action::Check, "m1").unwrap();
        assert_eq!(inv.args.last().map(String::as_str), Some("m1"));
        assert!(inv.env.iter().all(|e| e.value.as_deref() != Some("m1")));
        assert_eq!(inv.env[0].name, ARG_FORMAT_ENV);
    }

    #[test]
    fn missing_dynamic_value_aborts_synthesis() {
        for format in ["cli", "env"] {
            let err = synthesize(&template(format), Action::Create, "m2").unwrap_err();
            assert!(
                matches!(err, ActuatorError::MissingDynamicValue { ref field, ref target }
                    if field == "ipport" && target == "m2"),
                "{format}: {err}"
            );
        }
    }

    #[test]
    fn unsupported_format_is_an_error() {
        let err = synthesize(&template("xml"), Action::Create, "m1").unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn default_template_synthesizes_as_cli() {
        let t = ActionTemplate {
            create_args: Some(vec!["on".into()]),
            ..Default::default()
        };
        let inv = synthesize(&t, Action::Create, "m1").unwrap();
        assert_eq!(inv.args, ["on", "m1"]);
        assert_eq!(inv.env_value(ARG_FORMAT_ENV), Some("cli"));
    }

    #[test]
    fn undefined_action_is_an_error() {
        let mut t = template("cli");
        t.reboot_args = None;
        let err = synthesize(&t, Action::Reboot, "m1").unwrap_err();
        assert!(matches!(err, ActuatorError::ActionNotDefined { .. }));
    }

    #[test]
    fn value_from_entries_are_not_literal() {
        let mut inv = Invocation::default();
        inv.env.push(env_var("A", "1"));
        inv.env.push(EnvVar {
            name: "B".into(),
            value: None,
            value_from: Some(Default::default()),
        });
        assert_eq!(inv.literal_env(), vec![("A".to_string(), "1".to_string())]);
    }
}
