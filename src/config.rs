use uuid::Uuid;

use crate::types::RagRequest;

/// Runtime configuration, resolved once at startup.
pub struct AppConfig {
    pub api_url: String,
    /// Identity token scoping searches and uploads. Generated fresh when
    /// the environment doesn't pin one.
    pub user_id: String,
    pub search_limit: u32,
    pub model: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let api_url = dotenv::var("R2R_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let user_id =
            dotenv::var("R2R_USER_ID").unwrap_or_else(|_| Uuid::new_v4().to_string());
        let search_limit = dotenv::var("R2R_SEARCH_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        let model = dotenv::var("R2R_MODEL").ok().filter(|m| !m.is_empty());

        Self {
            api_url,
            user_id,
            search_limit,
            model,
        }
    }

    /// A completion request for one query, carrying this config's identity
    /// and generation defaults.
    pub fn request(&self, query: impl Into<String>) -> RagRequest {
        let mut request = RagRequest::new(query, self.user_id.clone());
        request.search_limit = self.search_limit;
        request.generation.model = self.model.clone();
        request
    }
}
