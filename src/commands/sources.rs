use std::sync::Arc;

use anyhow::Result;

use crate::client::R2rClient;
use crate::config::AppConfig;

/// List the documents uploaded under the configured user id.
pub async fn run(client: Arc<R2rClient>, config: &AppConfig) -> Result<()> {
    let documents = client.user_documents(&config.user_id).await?;

    if documents.is_empty() {
        println!("No documents uploaded yet. Use `r2r-cli ingest <files>` to add some.");
        return Ok(());
    }

    println!("{} document(s) for user {}:", documents.len(), config.user_id);
    for document in &documents {
        println!("  - {document}");
    }
    Ok(())
}
