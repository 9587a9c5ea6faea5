use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rc_cli::commands::{absence, replay, run, setup, status};
use rc_cli::{Cli, Commands, Config};

fn load_config(cli: &Cli) -> Result<Config> {
    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Run) => {
            let config = load_config(&cli)?;
            let report = run::run(&config).await?;
            println!(
                "Recorded {} session(s): {} acknowledged, {} spilled.",
                report.recorded, report.acknowledged, report.spilled
            );
            if report.spilled > 0 {
                println!("Run `rollcall replay` to redeliver spilled records.");
            }
        }
        Some(Commands::Replay) => {
            let config = load_config(&cli)?;
            let report = replay::run(&config).await?;
            println!(
                "Redelivered {} record(s), {} still queued.",
                report.redelivered, report.remaining
            );
        }
        Some(Commands::Absence {
            id,
            username,
            display_name,
        }) => {
            let config = load_config(&cli)?;
            match absence::run(&config, id, username, display_name).await? {
                absence::Outcome::Accepted { date } => {
                    println!("Absence recorded for {date}.");
                }
                absence::Outcome::Rejected { message } => {
                    eprintln!("{message}");
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Setup) => {
            let config = load_config(&cli)?;
            setup::run(&config).await?;
            println!("Ledger tables initialized.");
        }
        Some(Commands::Status) => {
            let config = load_config(&cli)?;
            let mut stdout = std::io::stdout();
            status::run(&mut stdout, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
