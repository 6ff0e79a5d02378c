use crate::output::print_json;
use actuator_core::config::{ActuatorConfig, WarnLevel};
use anyhow::Context;
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Validate the config for common mistakes
    Validate {
        /// Actuator config file
        #[arg(long, env = "ACTUATOR_CONFIG", default_value = "actuator.yaml")]
        config: PathBuf,
    },

    /// Print the effective config, defaults filled in
    Show {
        /// Actuator config file
        #[arg(long, env = "ACTUATOR_CONFIG", default_value = "actuator.yaml")]
        config: PathBuf,
    },
}

pub fn run(subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Validate { config } => validate(&config, json),
        ConfigSubcommand::Show { config } => show(&config, json),
    }
}

fn load(path: &Path) -> anyhow::Result<ActuatorConfig> {
    ActuatorConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))
}

fn validate(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load(path)?;
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

fn show(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load(path)?;
    if json {
        print_json(&serde_json::to_value(&config)?)?;
    } else {
        print!("{}", serde_yaml::to_string(&config)?);
    }
    Ok(())
}
