use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use landr::core::{ConfigManager, Database};
use landr::start_web_server;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "landr")]
#[command(about = "Landr job info API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Create or upgrade the database schema and exit
    Migrate,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("landr=info,rocket=warn"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;

            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(Mutex::new(file))
                        .with_current_span(false)
                        .with_span_list(false),
                )
                .with(filter)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .init();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigManager::load(&cli.config)?;
    config.ensure_directories().await?;
    init_logging(config.app.log_file.as_ref())?;

    info!("Loaded configuration for environment: {}", config.environment);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => start_web_server(&config).await,
        Command::Migrate => {
            let db = Database::new(&config.app.database_path).await?;
            db.health_check().await?;
            info!("Database ready: {}", config.app.database_path.display());
            Ok(())
        }
    }
}
