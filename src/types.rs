use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One retrieval result from the sources payload.
///
/// The metadata mapping carries whatever the pipeline attached: `title` and
/// `text` for uploaded documents, `link` and `snippet` for web-sourced
/// results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResult {
    pub id: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl SourceResult {
    /// Best display label available in the metadata.
    pub fn label(&self) -> &str {
        for key in ["title", "link", "text", "snippet"] {
            if let Some(v) = self.metadata.get(key).and_then(|v| v.as_str()) {
                return v;
            }
        }
        &self.id
    }
}

/// Decode a raw sources payload (the text between the search sentinels).
pub fn parse_sources(payload: &str) -> anyhow::Result<Vec<SourceResult>> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Ok(vec![]);
    }
    Ok(serde_json::from_str(trimmed)?)
}

/// Generation parameters forwarded to the completion endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

/// One RAG completion request: a query plus the identity and knobs that
/// scope it. Immutable once issued — a changed query is a new request.
#[derive(Debug, Clone)]
pub struct RagRequest {
    pub query: String,
    /// Identity token, folded into the search filters as `user_id`.
    pub user_id: String,
    /// Extra search filters merged alongside `user_id`.
    pub filters: HashMap<String, serde_json::Value>,
    pub search_limit: u32,
    pub generation: GenerationConfig,
}

impl RagRequest {
    pub fn new(query: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: user_id.into(),
            filters: HashMap::new(),
            search_limit: 10,
            generation: GenerationConfig::default(),
        }
    }

    /// The search-filter object sent on the wire: caller filters plus the
    /// identity token.
    pub fn search_filters(&self) -> serde_json::Value {
        let mut filters = serde_json::Map::new();
        for (k, v) in &self.filters {
            filters.insert(k.clone(), v.clone());
        }
        filters.insert(
            "user_id".to_string(),
            serde_json::Value::String(self.user_id.clone()),
        );
        serde_json::Value::Object(filters)
    }
}

/// One pipeline run from the logs endpoint, entries post-processed.
#[derive(Debug, Clone)]
pub struct LogRun {
    pub run_id: String,
    pub run_type: String,
    pub entries: Vec<LogEntry>,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub key: String,
    pub value: serde_json::Value,
}

impl LogEntry {
    /// Entry values arrive as strings that usually contain JSON. Decode when
    /// possible, keep the string otherwise. `search_results` arrays get the
    /// same treatment element-wise — the server double-encodes them.
    pub fn from_raw(key: String, raw: &str) -> Self {
        let mut value = match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(v) => v,
            Err(_) => serde_json::Value::String(raw.to_string()),
        };

        if key == "search_results" {
            if let serde_json::Value::Array(items) = &mut value {
                for item in items.iter_mut() {
                    if let serde_json::Value::String(s) = item {
                        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(s) {
                            *item = parsed;
                        }
                    }
                }
            }
        }

        Self { key, value }
    }
}
