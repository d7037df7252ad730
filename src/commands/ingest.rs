use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::client::R2rClient;
use crate::config::AppConfig;

/// Upload local files for ingestion under the configured user id.
/// Document ids are derived from file names, so re-uploading the same
/// file addresses the same server-side record.
pub async fn run(
    client: Arc<R2rClient>,
    config: &AppConfig,
    paths: Vec<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(!paths.is_empty(), "No files given. Usage: r2r-cli ingest <files>");

    let mut files = Vec::new();
    let mut metadatas = Vec::new();
    let mut ids = Vec::new();

    for path in &paths {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Bad file name: {}", path.display()))?
            .to_string();
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        metadatas.push(serde_json::json!({
            "user_id": config.user_id,
            "title": name,
        }));
        ids.push(R2rClient::generate_id_from_label(&name));
        files.push((name, content));
    }

    let summaries: Vec<(String, usize)> = files
        .iter()
        .map(|(name, content)| (name.clone(), content.len()))
        .collect();

    info!(
        count = files.len(),
        user_id = %config.user_id,
        "Uploading files"
    );
    client.ingest_files(files, metadatas, ids).await?;

    println!("Uploaded {} file(s):", summaries.len());
    for (name, size) in &summaries {
        println!("  - {} ({} bytes)", name, size);
    }
    Ok(())
}
