pub mod ask;
pub mod ingest;
pub mod logs;
pub mod manage;
pub mod search;
pub mod sources;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;

use crate::client::R2rClient;
use crate::config::AppConfig;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask a question and stream the answer; with no query, read queries
    /// interactively (each new line supersedes the running one)
    Ask { query: Option<String> },
    /// Upload local files for ingestion
    Ingest { files: Vec<PathBuf> },
    /// List your uploaded documents
    Sources,
    /// Retrieval-only search, no generation
    Search { query: String },
    /// Show pipeline logs
    Logs {
        /// Restrict to one pipeline type (search, rag, ...)
        #[arg(long)]
        pipeline: Option<String>,
        #[arg(long)]
        filter: Option<String>,
    },
    /// Administrative operations
    Manage {
        #[command(subcommand)]
        action: manage::ManageAction,
    },
}

pub async fn dispatch(command: Command, config: &AppConfig) -> anyhow::Result<()> {
    let client = Arc::new(R2rClient::new(config.api_url.clone())?);

    match command {
        Command::Ask { query } => ask::run(client, config, query).await,
        Command::Ingest { files } => ingest::run(client, config, files).await,
        Command::Sources => sources::run(client, config).await,
        Command::Search { query } => search::run(client, config, &query).await,
        Command::Logs { pipeline, filter } => {
            logs::run(client, pipeline.as_deref(), filter.as_deref()).await
        }
        Command::Manage { action } => manage::run(client, action).await,
    }
}
