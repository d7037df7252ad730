use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use tracing::debug;
use uuid::Uuid;

use crate::error::RagError;
use crate::types::{LogEntry, LogRun, RagRequest};

/// HTTP client for an R2R-style RAG service.
pub struct R2rClient {
    client: reqwest::Client,
    base_url: String,
}

impl R2rClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        // No overall request timeout: a completion stream stays open as
        // long as generation runs, and abandonment is the caller's call.
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Resolve an endpoint path against the base URL. The service routes
    /// all end in a trailing slash.
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/", self.base_url.trim_end_matches('/'), path)
    }

    /// Request body for the completion endpoint. `search_filters` and
    /// `generation_config` travel as JSON-encoded strings inside the JSON
    /// body — the service contract, not a quirk of this client.
    fn rag_body(&self, request: &RagRequest, streaming: bool) -> Result<serde_json::Value> {
        let mut generation = request.generation.clone();
        generation.stream = streaming;
        let generation =
            serde_json::to_string(&generation).context("Failed to encode generation config")?;

        Ok(serde_json::json!({
            "message": request.query,
            "search_filters": request.search_filters().to_string(),
            "search_limit": request.search_limit,
            "streaming": streaming,
            "generation_config": generation,
        }))
    }

    /// Open a streaming completion request. On a 2xx response, returns the
    /// raw byte-chunk stream; any non-success status is an `Http` error and
    /// nothing is read.
    pub async fn rag_stream(
        &self,
        request: &RagRequest,
    ) -> Result<impl Stream<Item = Result<Vec<u8>, RagError>>, RagError> {
        let body = self
            .rag_body(request, true)
            .map_err(|e| RagError::Stream(e.to_string()))?;

        debug!(query = %request.query, "Opening completion stream");
        let resp = self
            .client
            .post(self.endpoint("rag"))
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::Stream(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RagError::Http {
                status: status.as_u16(),
            });
        }

        Ok(resp
            .bytes_stream()
            .map(|chunk| match chunk {
                Ok(bytes) => Ok(bytes.to_vec()),
                Err(e) => Err(RagError::Stream(e.to_string())),
            }))
    }

    /// Non-streaming completion: same body, whole JSON response at once.
    pub async fn rag(&self, request: &RagRequest) -> Result<serde_json::Value> {
        let body = self.rag_body(request, false)?;
        let resp = self
            .client
            .post(self.endpoint("rag"))
            .json(&body)
            .send()
            .await
            .context("RAG request failed")?
            .error_for_status()
            .context("RAG request rejected")?;
        resp.json().await.context("Failed to parse RAG response")
    }

    /// Retrieval only, no generation.
    pub async fn search(
        &self,
        query: &str,
        search_filters: serde_json::Value,
        search_limit: u32,
    ) -> Result<serde_json::Value> {
        let body = serde_json::json!({
            "query": query,
            "search_filters": search_filters.to_string(),
            "search_limit": search_limit,
        });
        let resp = self
            .client
            .post(self.endpoint("search"))
            .json(&body)
            .send()
            .await
            .context("Search request failed")?
            .error_for_status()
            .context("Search request rejected")?;
        resp.json().await.context("Failed to parse search response")
    }

    /// Upload files for ingestion. `metadatas` and `ids` ride along as
    /// JSON-encoded form fields next to the file parts.
    pub async fn ingest_files(
        &self,
        files: Vec<(String, Vec<u8>)>,
        metadatas: Vec<serde_json::Value>,
        ids: Vec<String>,
    ) -> Result<serde_json::Value> {
        let mut form = reqwest::multipart::Form::new()
            .text(
                "metadatas",
                serde_json::to_string(&metadatas).context("Failed to encode metadatas")?,
            )
            .text(
                "ids",
                serde_json::to_string(&ids).context("Failed to encode ids")?,
            );
        for (name, content) in files {
            form = form.part(
                "files",
                reqwest::multipart::Part::bytes(content).file_name(name),
            );
        }

        let resp = self
            .client
            .post(self.endpoint("ingest_files"))
            .multipart(form)
            .send()
            .await
            .context("Ingest request failed")?
            .error_for_status()
            .context("Ingest request rejected")?;
        resp.json().await.context("Failed to parse ingest response")
    }

    /// Documents the given user has uploaded.
    pub async fn user_documents(&self, user_id: &str) -> Result<Vec<String>> {
        let body = serde_json::json!({ "user_id": user_id });
        let resp = self
            .client
            .post(self.endpoint("get_user_document_data"))
            .json(&body)
            .send()
            .await
            .context("Document listing request failed")?
            .error_for_status()
            .context("Document listing rejected")?;
        let value: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse document listing")?;
        Ok(extract_string_array(&value))
    }

    /// Delete server-side records matching a metadata key/value pair.
    pub async fn delete(&self, key: &str, value: &str) -> Result<()> {
        let body = serde_json::json!({ "key": key, "value": value });
        self.client
            .delete(self.endpoint("delete"))
            .json(&body)
            .send()
            .await
            .context("Delete request failed")?
            .error_for_status()
            .context("Delete request rejected")?;
        Ok(())
    }

    /// All user ids the service has seen.
    pub async fn user_ids(&self) -> Result<Vec<String>> {
        let resp = self
            .client
            .get(self.endpoint("get_user_ids"))
            .send()
            .await
            .context("User id request failed")?
            .error_for_status()
            .context("User id request rejected")?;
        let value: serde_json::Value =
            resp.json().await.context("Failed to parse user ids")?;
        Ok(extract_string_array(&value))
    }

    /// Fetch pipeline logs, post-processing entry values (see `LogEntry`).
    pub async fn logs(
        &self,
        pipeline_type: Option<&str>,
        filter: Option<&str>,
    ) -> Result<Vec<LogRun>> {
        let body = serde_json::json!({
            "pipeline_type": pipeline_type,
            "filter": filter,
        });
        let resp = self
            .client
            .post(self.endpoint("get_logs"))
            .json(&body)
            .send()
            .await
            .context("Log request failed")?
            .error_for_status()
            .context("Log request rejected")?;
        let value: serde_json::Value = resp.json().await.context("Failed to parse logs")?;

        let mut runs = Vec::new();
        for run in value["results"].as_array().into_iter().flatten() {
            let entries = run["entries"]
                .as_array()
                .into_iter()
                .flatten()
                .map(|entry| {
                    let key = entry["key"].as_str().unwrap_or_default().to_string();
                    let raw = entry["value"].as_str().map(str::to_string).unwrap_or_else(
                        || entry["value"].to_string(),
                    );
                    LogEntry::from_raw(key, &raw)
                })
                .collect();
            runs.push(LogRun {
                run_id: run["run_id"].as_str().unwrap_or_default().to_string(),
                run_type: run["run_type"].as_str().unwrap_or_default().to_string(),
                entries,
            });
        }
        Ok(runs)
    }

    /// Fresh correlation id for one query/answer interaction.
    pub fn generate_run_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Deterministic id derived from a label (file name, user handle).
    pub fn generate_id_from_label(label: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_DNS, label.as_bytes()).to_string()
    }
}

/// Pull a flat list of strings out of a response that is either a bare
/// array or wraps one under `results`.
fn extract_string_array(value: &serde_json::Value) -> Vec<String> {
    let items = value["results"]
        .as_array()
        .or_else(|| value.as_array());
    items
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RagRequest;

    #[test]
    fn test_endpoint_trailing_slash() {
        let client = R2rClient::new("http://localhost:8000").unwrap();
        assert_eq!(client.endpoint("rag"), "http://localhost:8000/rag/");

        let client = R2rClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.endpoint("rag"), "http://localhost:8000/rag/");
    }

    #[test]
    fn test_rag_body_folds_identity_into_filters() {
        let client = R2rClient::new("http://localhost:8000").unwrap();
        let request = RagRequest::new("what is a lease?", "user-9");
        let body = client.rag_body(&request, true).unwrap();

        assert_eq!(body["message"], "what is a lease?");
        assert_eq!(body["streaming"], true);
        assert_eq!(body["search_limit"], 10);

        // Filters travel as an encoded JSON string
        let filters: serde_json::Value =
            serde_json::from_str(body["search_filters"].as_str().unwrap()).unwrap();
        assert_eq!(filters["user_id"], "user-9");

        let generation: serde_json::Value =
            serde_json::from_str(body["generation_config"].as_str().unwrap()).unwrap();
        assert_eq!(generation["stream"], true);
    }

    #[test]
    fn test_rag_body_streaming_flag_overrides_config() {
        let client = R2rClient::new("http://localhost:8000").unwrap();
        let mut request = RagRequest::new("q", "u");
        request.generation.stream = true;
        let body = client.rag_body(&request, false).unwrap();
        assert_eq!(body["streaming"], false);
        let generation: serde_json::Value =
            serde_json::from_str(body["generation_config"].as_str().unwrap()).unwrap();
        assert_eq!(generation["stream"], false);
    }

    #[test]
    fn test_label_ids_are_deterministic() {
        let a = R2rClient::generate_id_from_label("report.pdf");
        let b = R2rClient::generate_id_from_label("report.pdf");
        let c = R2rClient::generate_id_from_label("other.pdf");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(R2rClient::generate_run_id(), R2rClient::generate_run_id());
    }

    #[test]
    fn test_extract_string_array_variants() {
        let wrapped = serde_json::json!({ "results": ["a", "b"] });
        assert_eq!(extract_string_array(&wrapped), vec!["a", "b"]);

        let bare = serde_json::json!(["x"]);
        assert_eq!(extract_string_array(&bare), vec!["x"]);

        let neither = serde_json::json!({ "status": "ok" });
        assert!(extract_string_array(&neither).is_empty());
    }
}
