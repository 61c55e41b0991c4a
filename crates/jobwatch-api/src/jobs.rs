use std::collections::BTreeMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::errors::ApiError;
use crate::transport::HttpCore;

/// Job status labels reported by the backend.
pub const STATUS_QUEUED: &str = "queued";
pub const STATUS_RUNNING: &str = "running";
pub const STATUS_SUCCEEDED: &str = "succeeded";
pub const STATUS_FAILED: &str = "failed";

/// Current state of a job as returned by `GET /api/jobs/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: String,
    pub status: String,
    pub job_type: String,
    /// Free-form progress map (`current_step`/`detail`, or `error` after a failure).
    #[serde(default)]
    pub progress: Option<BTreeMap<String, serde_json::Value>>,
    pub created_at: String,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
    #[serde(default)]
    pub book_summary: Option<String>,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self.status.as_str(), STATUS_SUCCEEDED | STATUS_FAILED)
    }

    /// Failure message recorded by the worker, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.progress.as_ref()?.get("error")?.as_str()
    }
}

/// One passage cited as evidence for a theme.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub segment_id: String,
    pub score: f64,
    pub text: String,
    #[serde(default)]
    pub chapter: Option<String>,
    pub paragraph_index: u32,
}

/// Artifacts of a succeeded job (`GET /api/jobs/{id}/result`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    pub themes: Vec<String>,
    #[serde(default)]
    pub evidence: BTreeMap<String, Vec<Evidence>>,
    pub essay_markdown: String,
    #[serde(default)]
    pub book_summary: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookAuthor {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GutenbergBook {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<BookAuthor>,
    #[serde(default)]
    pub subjects: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GutenbergSearch {
    pub count: u64,
    #[serde(default)]
    pub results: Vec<GutenbergBook>,
}

#[derive(Serialize)]
struct CreateJobBody {
    gutenberg_id: u64,
}

/// Client for the public job and search endpoints.
#[derive(Clone)]
pub struct JobsClient {
    http: HttpCore,
}

impl JobsClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        Ok(Self {
            http: HttpCore::new(&config)?,
        })
    }

    /// Queues an essay job for a Gutenberg book id (must be ≥ 1).
    pub async fn create_job(&self, gutenberg_id: u64) -> Result<JobStatus, ApiError> {
        if gutenberg_id == 0 {
            return Err(ApiError::Validation(
                "gutenberg_id must be at least 1".into(),
            ));
        }
        let (builder, endpoint) = self.http.request(Method::POST, &["jobs"])?;
        self.http
            .send_json(builder.json(&CreateJobBody { gutenberg_id }), &endpoint)
            .await
    }

    pub async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        let job_id = require_id(job_id)?;
        let (builder, endpoint) = self.http.request(Method::GET, &["jobs", job_id])?;
        self.http.send_json(builder, &endpoint).await
    }

    /// Fetches the result of a succeeded job. The backend answers 400 while
    /// the job is still running.
    pub async fn job_result(&self, job_id: &str) -> Result<JobResult, ApiError> {
        let job_id = require_id(job_id)?;
        let (builder, endpoint) = self
            .http
            .request(Method::GET, &["jobs", job_id, "result"])?;
        self.http.send_json(builder, &endpoint).await
    }

    pub async fn search_gutenberg(&self, query: &str) -> Result<GutenbergSearch, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::Validation("search query must not be empty".into()));
        }
        let (builder, endpoint) = self
            .http
            .request(Method::GET, &["gutenberg", "search"])?;
        self.http
            .send_json(builder.query(&[("q", query)]), &endpoint)
            .await
    }
}

pub(crate) fn require_id(id: &str) -> Result<&str, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::Validation("id must not be empty".into()));
    }
    Ok(id)
}
