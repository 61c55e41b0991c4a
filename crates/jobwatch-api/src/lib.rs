//! REST clients for the analysis backend's job, search and admin endpoints.
//!
//! These are stateless request/response wrappers. Progress streaming lives in
//! `jobwatch-stream`.

/// Admin API client and its explicitly passed credentials.
pub mod admin;
/// Client configuration.
pub mod config;
/// Error type shared by the clients.
pub mod errors;
/// Navigation guard for admin-only views.
pub mod guard;
/// Job and search API client.
pub mod jobs;
mod transport;

pub use admin::{ALL_JOBS, AdminClient, AdminCredentials, AdminDocument, AdminJob, OrphanNamespace};
pub use config::{ApiConfig, DEFAULT_BASE_URL};
pub use errors::ApiError;
pub use guard::{Access, Route, guard};
pub use jobs::{
    BookAuthor, Evidence, GutenbergBook, GutenbergSearch, JobResult, JobStatus, JobsClient,
    STATUS_FAILED, STATUS_QUEUED, STATUS_RUNNING, STATUS_SUCCEEDED,
};
