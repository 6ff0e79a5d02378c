//! Secret materialization.
//!
//! Each `logical field → secret name` entry of a template becomes a secret
//! volume, a read-only mount at `<secrets_dir>/<secret>-<field>` and a
//! `SECRETPATH_<field>` environment entry pointing at the file the
//! container entrypoint reads the value from. Secret contents are never
//! read here.

use k8s_openapi::api::core::v1::{EnvVar, SecretVolumeSource, Volume, VolumeMount};
use std::collections::BTreeMap;

use crate::synth::env_var;

pub const DEFAULT_SECRETS_DIR: &str = "/etc/fencing/secrets";
pub const SECRET_PATH_PREFIX: &str = "SECRETPATH_";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecretMaterials {
    pub volumes: Vec<Volume>,
    pub mounts: Vec<VolumeMount>,
    pub env: Vec<EnvVar>,
}

/// Volume names may only hold `a-z`, `0-9` and `-`. Upper-case ASCII is
/// lowered, everything else becomes `-`.
pub fn sanitize_volume_name(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            'A'..='Z' => c.to_ascii_lowercase(),
            'a'..='z' | '0'..='9' => c,
            _ => '-',
        })
        .collect()
}

pub fn volume_name(field: &str) -> String {
    sanitize_volume_name(&format!("secret-{field}"))
}

pub fn mount_path(secrets_dir: &str, secret: &str, field: &str) -> String {
    format!("{}/{secret}-{field}", secrets_dir.trim_end_matches('/'))
}

pub fn materialize(secrets: &BTreeMap<String, String>, secrets_dir: &str) -> SecretMaterials {
    let mut out = SecretMaterials::default();
    for (field, secret) in secrets {
        let name = volume_name(field);
        let mount = mount_path(secrets_dir, secret, field);

        out.env.push(env_var(
            format!("{SECRET_PATH_PREFIX}{field}"),
            format!("{mount}/{field}"),
        ));
        out.mounts.push(VolumeMount {
            name: name.clone(),
            mount_path: mount,
            read_only: Some(true),
            ..Default::default()
        });
        out.volumes.push(Volume {
            name,
            secret: Some(SecretVolumeSource {
                secret_name: Some(secret.clone()),
                ..Default::default()
            }),
            ..Default::default()
        });
    }
    out
}

/// Template volumes followed by secret volumes. Among secret volumes the
/// first one with a given name wins.
pub fn merge_volumes(template: &[Volume], secret: Vec<Volume>) -> Vec<Volume> {
    let mut volumes = template.to_vec();
    let mut seen = std::collections::BTreeSet::new();
    for v in secret {
        if seen.insert(v.name.clone()) {
            volumes.push(v);
        }
    }
    volumes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_volume_names() {
        assert_eq!(sanitize_volume_name("secret-Password_1"), "secret-password-1");
        assert_eq!(sanitize_volume_name("a.b/c"), "a-b-c");
        assert_eq!(sanitize_volume_name("é"), "-");
    }

    #[test]
    fn materializes_volume_mount_and_env() {
        let secrets = BTreeMap::from([("password".to_string(), "ipmi-creds".to_string())]);
        let m = materialize(&secrets, DEFAULT_SECRETS_DIR);

        assert_eq!(m.volumes.len(), 1);
        assert_eq!(m.volumes[0].name, "secret-password");
        assert_eq!(
            m.volumes[0].secret.as_ref().unwrap().secret_name.as_deref(),
            Some("ipmi-creds")
        );

        assert_eq!(m.mounts[0].mount_path, "/etc/fencing/secrets/ipmi-creds-password");
        assert_eq!(m.mounts[0].read_only, Some(true));

        assert_eq!(m.env[0].name, "SECRETPATH_password");
        assert_eq!(
            m.env[0].value.as_deref(),
            Some("/etc/fencing/secrets/ipmi-creds-password/password")
        );
    }

    #[test]
    fn empty_secrets_produce_nothing() {
        let m = materialize(&BTreeMap::new(), DEFAULT_SECRETS_DIR);
        assert_eq!(m, SecretMaterials::default());
    }

    #[test]
    fn colliding_sanitized_names_keep_first_volume() {
        let secrets = BTreeMap::from([
            ("Pass".to_string(), "first".to_string()),
            ("pass".to_string(), "second".to_string()),
        ]);
        let m = materialize(&secrets, "/s/");
        assert_eq!(m.mounts[0].mount_path, "/s/first-Pass");

        let volumes = merge_volumes(&[], m.volumes);
        assert_eq!(volumes.len(), 1);
        assert_eq!(
            volumes[0].secret.as_ref().unwrap().secret_name.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn template_volumes_come_first() {
        let tpl = vec![Volume {
            name: "scratch".into(),
            ..Default::default()
        }];
        let secrets = BTreeMap::from([("user".to_string(), "s".to_string())]);
        let volumes = merge_volumes(&tpl, materialize(&secrets, "/s").volumes);
        let names: Vec<_> = volumes.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["scratch", "secret-user"]);
    }
}
