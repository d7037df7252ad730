mod client;
mod commands;
mod config;
mod error;
mod stream;
mod types;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::AppConfig;

/// Terminal client for an R2R-style RAG service.
#[derive(Debug, Parser)]
#[command(name = "r2r-cli", version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so streamed answers own stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load env
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    debug!(
        api_url = %config.api_url,
        user_id = %config.user_id,
        search_limit = config.search_limit,
        "Configuration resolved"
    );

    commands::dispatch(cli.command, &config).await
}
