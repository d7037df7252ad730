use std::sync::Arc;

use anyhow::Result;

use crate::client::R2rClient;
use crate::config::AppConfig;
use crate::types::SourceResult;

/// Retrieval-only query: rank passages without generating an answer.
pub async fn run(client: Arc<R2rClient>, config: &AppConfig, query: &str) -> Result<()> {
    anyhow::ensure!(!query.trim().is_empty(), "Please submit a query.");

    let filters = serde_json::json!({ "user_id": config.user_id });
    let response = client
        .search(query.trim(), filters, config.search_limit)
        .await?;

    let items = response["results"]
        .as_array()
        .or_else(|| response.as_array())
        .cloned()
        .unwrap_or_default();

    if items.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!("{} result(s):", items.len());
    for item in items {
        match serde_json::from_value::<SourceResult>(item.clone()) {
            Ok(source) => println!("  [{:.2}] {}", source.score, source.label()),
            Err(_) => println!("  {item}"),
        }
    }
    Ok(())
}
