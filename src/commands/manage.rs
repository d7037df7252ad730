use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use tracing::info;

use crate::client::R2rClient;

#[derive(Debug, Subcommand)]
pub enum ManageAction {
    /// Delete a document by id
    Delete { document_id: String },
    /// List user ids known to the service
    Users,
}

pub async fn run(client: Arc<R2rClient>, action: ManageAction) -> Result<()> {
    match action {
        ManageAction::Delete { document_id } => {
            client.delete("document_id", &document_id).await?;
            info!(document_id = %document_id, "Document deleted");
            println!("Deleted document {document_id}");
        }
        ManageAction::Users => {
            let users = client.user_ids().await?;
            if users.is_empty() {
                println!("No users known to the service yet.");
                return Ok(());
            }
            println!("{} user(s):", users.len());
            for user in &users {
                println!("  - {user}");
            }
        }
    }
    Ok(())
}
