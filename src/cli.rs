use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Service Warden - Install, start, stop and watch OS services")]
pub struct Cli {
    /// Config file path (defaults to warden.yaml in this or a parent directory)
    #[arg(short, long, env = "WARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show every service with its status and the actions it allows
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Register a service with the host's service manager
    Install {
        /// Service name
        service: String,
    },
    /// Remove a stopped service from the host's service manager
    Uninstall {
        /// Service name
        service: String,
    },
    /// Start an installed service
    Start {
        /// Service name
        service: String,
    },
    /// Stop a running service
    Stop {
        /// Service name
        service: String,
    },
    /// Stop, pause for the settle delay, then start a service
    Restart {
        /// Service name
        service: String,
    },
    /// Print status changes as they happen (Ctrl-C to exit)
    Watch,
    /// Run the background tasks of a managed service until signalled
    Worker {
        /// Name written to the event log (defaults to the first configured service)
        #[arg(long, env = "WARDEN_SERVICE")]
        service: Option<String>,
    },
    /// Validate configuration without touching any service
    Validate,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_name = "SHELL")]
        shell: clap_complete::Shell,
    },
}

impl Commands {
    /// The lifecycle operation and target service, for the five lifecycle subcommands.
    pub fn lifecycle(&self) -> Option<(service_warden::LifecycleOp, &str)> {
        use service_warden::LifecycleOp;
        match self {
            Commands::Install { service } => Some((LifecycleOp::Install, service)),
            Commands::Uninstall { service } => Some((LifecycleOp::Uninstall, service)),
            Commands::Start { service } => Some((LifecycleOp::Start, service)),
            Commands::Stop { service } => Some((LifecycleOp::Stop, service)),
            Commands::Restart { service } => Some((LifecycleOp::Restart, service)),
            _ => None,
        }
    }
}
