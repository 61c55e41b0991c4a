use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ApiConfig;
use crate::errors::ApiError;

/// Shared request plumbing: URL building, sending, status and body mapping.
#[derive(Clone)]
pub(crate) struct HttpCore {
    client: reqwest::Client,
    root: Url,
}

impl HttpCore {
    pub(crate) fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let root = config.api_root()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, root })
    }

    /// Joins path segments under `/api/`, percent-encoding each one.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.root.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Config(format!("base_url {} cannot carry a path", self.root)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn request(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<(RequestBuilder, String), ApiError> {
        let url = self.url(segments)?;
        let endpoint = format!("{method} {}", url.path());
        Ok((self.client.request(method, url), endpoint))
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, ApiError> {
        debug!(event = "api.request", domain = "api", endpoint = %endpoint);
        let response = builder.send().await.map_err(|e| ApiError::Transport {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| ApiError::Transport {
            endpoint: endpoint.to_string(),
            message: format!("failed to read body: {e}"),
        })?;
        if !status.is_success() {
            debug!(
                event = "api.request_failed",
                domain = "api",
                endpoint = %endpoint,
                status = status.as_u16()
            );
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}
