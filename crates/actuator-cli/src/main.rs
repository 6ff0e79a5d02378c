mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{
    cluster::ClusterSubcommand, config::ConfigSubcommand, fence::FenceArgs,
    machine::MachineSubcommand, provision::ProvisionArgs,
};

#[derive(Parser)]
#[command(
    name = "actuator",
    about = "Machine lifecycle actuator and fence agent runner",
    version,
    propagate_version = true
)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log at debug level
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a fence agent against a host
    Fence(FenceArgs),

    /// Run a fence_<type> agent with credentials from a secret directory
    Provision(ProvisionArgs),

    /// Run an actuator verb against a Machine manifest
    Machine {
        #[command(subcommand)]
        subcommand: MachineSubcommand,
    },

    /// Reconcile or delete a Cluster manifest
    Cluster {
        #[command(subcommand)]
        subcommand: ClusterSubcommand,
    },

    /// Inspect the actuator configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        match &cli.command {
            Commands::Machine { .. } | Commands::Cluster { .. } => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Fence(args) => cmd::fence::run(args, cli.json),
        Commands::Provision(args) => cmd::provision::run(args, cli.json),
        Commands::Machine { subcommand } => cmd::machine::run(subcommand, cli.json),
        Commands::Cluster { subcommand } => cmd::cluster::run(subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
