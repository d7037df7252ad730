use std::sync::Arc;

use anyhow::Result;

use crate::client::R2rClient;

const MAX_VALUE_CHARS: usize = 200;

/// Fetch pipeline logs and print each run with its entries.
pub async fn run(
    client: Arc<R2rClient>,
    pipeline_type: Option<&str>,
    filter: Option<&str>,
) -> Result<()> {
    let runs = client.logs(pipeline_type, filter).await?;

    if runs.is_empty() {
        println!("No log entries.");
        return Ok(());
    }

    for run in &runs {
        println!("run {} [{}]", run.run_id, run.run_type);
        for entry in &run.entries {
            println!("  {}: {}", entry.key, render_value(&entry.value));
        }
        println!();
    }
    Ok(())
}

/// Compact single-line rendering, truncated so one oversized payload
/// doesn't drown the listing.
fn render_value(value: &serde_json::Value) -> String {
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let mut compact: String = text.chars().take(MAX_VALUE_CHARS).collect();
    if compact.len() < text.len() {
        compact.push_str("...");
    }
    compact.replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_value_keeps_short_strings() {
        assert_eq!(render_value(&serde_json::json!("rag_completion")), "rag_completion");
    }

    #[test]
    fn test_render_value_truncates_long_payloads() {
        let long = "x".repeat(500);
        let rendered = render_value(&serde_json::json!(long));
        assert!(rendered.ends_with("..."));
        assert!(rendered.len() <= MAX_VALUE_CHARS + 3);
    }

    #[test]
    fn test_render_value_flattens_newlines() {
        assert_eq!(render_value(&serde_json::json!("a\nb")), "a b");
    }

    #[test]
    fn test_render_value_serializes_objects() {
        let rendered = render_value(&serde_json::json!({"k": 1}));
        assert_eq!(rendered, r#"{"k":1}"#);
    }
}
