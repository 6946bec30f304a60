mod cli;
mod commands;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use service_warden::{Error as WardenError, Orchestrator, Parser as ConfigParser};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => {
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(e) => {
            // Print with suggestions
            if let Some(warden_error) = e.downcast_ref::<WardenError>() {
                eprintln!("Error: {}", warden_error);
                if let Some(suggestion) = warden_error.suggestion() {
                    eprintln!("\nHint: {}", suggestion);
                }
            } else {
                eprintln!("Error: {:#}", e);
            }
            std::process::exit(1);
        }
    }
}

/// Returns the process exit code.
async fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();

    init_tracing();

    // ── Commands that need NO config ──────────────────────────────────
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        clap_complete::generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
        return Ok(0);
    }

    let parser = ConfigParser::new();
    let config_path = parser.locate(cli.config.as_deref())?;

    if let Commands::Validate = &cli.command {
        commands::run_validate(&config_path, &output::CliOutput)?;
        return Ok(0);
    }

    // ── Commands that need config but NOT orchestrator ────────────────
    let config = parser.load_config(&config_path)?;
    config.validate()?;
    tracing::debug!("Loaded config from {}", config_path.display());

    if let Commands::Worker { service } = cli.command {
        commands::run_worker(&config, service, &output::CliOutput).await?;
        return Ok(0);
    }

    // ── Commands that need orchestrator ───────────────────────────────
    let orchestrator = Orchestrator::builder().config(config).build()?;

    let code = if let Some((op, service)) = cli.command.lifecycle() {
        let result = commands::run_lifecycle(&orchestrator, op, service, &output::CliOutput).await?;
        if result.success {
            0
        } else {
            1
        }
    } else {
        match &cli.command {
            Commands::Status { json } => {
                commands::run_status(&orchestrator, *json, &output::CliOutput).await?;
            }
            Commands::Watch => {
                commands::run_watch(&orchestrator, &output::CliOutput).await?;
            }
            // Lifecycle commands and the config-only commands are handled above.
            _ => {}
        }
        0
    };

    orchestrator.cleanup().await;
    Ok(code)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
