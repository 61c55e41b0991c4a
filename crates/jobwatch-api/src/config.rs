use std::time::Duration;

use crate::errors::ApiError;

/// Default backend location when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration shared by the REST clients.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Base URL of the backend, without the `/api` prefix.
    pub base_url: String,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub(crate) fn api_root(&self) -> Result<reqwest::Url, ApiError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ApiError::Config("base_url must not be empty".into()));
        }
        reqwest::Url::parse(&format!("{trimmed}/api/"))
            .map_err(|e| ApiError::Config(format!("invalid base_url {trimmed:?}: {e}")))
    }
}
