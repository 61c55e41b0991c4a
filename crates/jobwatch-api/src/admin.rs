//! Admin endpoints under `/api/admin`, authenticated with HTTP Basic.

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ApiConfig;
use crate::errors::ApiError;
use crate::jobs::require_id;
use crate::transport::HttpCore;

/// Admin session credentials, passed explicitly to [`AdminClient`].
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminDocument {
    pub id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub source_ref: String,
    pub ingest_status: String,
    pub has_summary: bool,
    pub pinecone_namespace: String,
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminJob {
    pub id: String,
    pub status: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub created_at: Option<String>,
}

/// Vector namespace with no owning document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanNamespace {
    pub namespace: String,
    pub vector_count: u64,
}

#[derive(Deserialize)]
struct DocumentsBody {
    documents: Vec<AdminDocument>,
}

#[derive(Deserialize)]
struct JobsBody {
    jobs: Vec<AdminJob>,
}

#[derive(Deserialize)]
struct NamespacesBody {
    namespaces: Vec<OrphanNamespace>,
}

#[derive(Deserialize)]
struct DeletedBody {
    deleted: u64,
}

#[derive(Deserialize)]
struct OkBody {
    ok: bool,
}

#[derive(Serialize)]
struct BulkDeleteJobsBody<'a> {
    status: &'a str,
}

/// Status filter accepted by `bulk_delete_jobs` that matches every job.
pub const ALL_JOBS: &str = "all";

/// Client for the admin API. Every request carries the credentials it was
/// built with.
#[derive(Clone)]
pub struct AdminClient {
    http: HttpCore,
    credentials: AdminCredentials,
}

impl AdminClient {
    pub fn new(config: ApiConfig, credentials: AdminCredentials) -> Result<Self, ApiError> {
        if credentials.username.is_empty() {
            return Err(ApiError::Validation("admin username must not be empty".into()));
        }
        Ok(Self {
            http: HttpCore::new(&config)?,
            credentials,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let mut path = vec!["admin"];
        path.extend_from_slice(segments);
        let (builder, endpoint) = self.http.request(method, &path)?;
        let mut builder = builder.basic_auth(
            &self.credentials.username,
            Some(&self.credentials.password),
        );
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        self.http.send_json(builder, &endpoint).await
    }

    pub async fn list_documents(&self) -> Result<Vec<AdminDocument>, ApiError> {
        let body: DocumentsBody = self.call(Method::GET, &["documents"], None).await?;
        Ok(body.documents)
    }

    pub async fn list_jobs(&self) -> Result<Vec<AdminJob>, ApiError> {
        let body: JobsBody = self.call(Method::GET, &["jobs"], None).await?;
        Ok(body.jobs)
    }

    pub async fn list_orphan_namespaces(&self) -> Result<Vec<OrphanNamespace>, ApiError> {
        let body: NamespacesBody = self.call(Method::GET, &["orphan-namespaces"], None).await?;
        Ok(body.namespaces)
    }

    /// Deletes one orphan namespace. The name is sent as a single encoded
    /// path segment.
    pub async fn delete_orphan_namespace(&self, namespace: &str) -> Result<u64, ApiError> {
        if namespace.is_empty() {
            return Err(ApiError::Validation("namespace must not be empty".into()));
        }
        let body: DeletedBody = self
            .call(Method::DELETE, &["orphan-namespaces", namespace], None)
            .await?;
        info!(event = "admin.namespace_deleted", domain = "admin", namespace = %namespace);
        Ok(body.deleted)
    }

    pub async fn bulk_delete_orphan_namespaces(&self) -> Result<u64, ApiError> {
        self.bulk(&["bulk", "delete-orphan-namespaces"], None).await
    }

    pub async fn delete_document_summary(&self, document_id: &str) -> Result<bool, ApiError> {
        let id = require_id(document_id)?;
        let body: OkBody = self
            .call(Method::DELETE, &["documents", id, "summary"], None)
            .await?;
        Ok(body.ok)
    }

    pub async fn delete_document_vectors(&self, document_id: &str) -> Result<bool, ApiError> {
        let id = require_id(document_id)?;
        let body: OkBody = self
            .call(Method::DELETE, &["documents", id, "vectors"], None)
            .await?;
        Ok(body.ok)
    }

    pub async fn delete_document(&self, document_id: &str) -> Result<u64, ApiError> {
        let id = require_id(document_id)?;
        let body: DeletedBody = self.call(Method::DELETE, &["documents", id], None).await?;
        info!(event = "admin.document_deleted", domain = "admin", document_id = %id);
        Ok(body.deleted)
    }

    pub async fn delete_job(&self, job_id: &str) -> Result<u64, ApiError> {
        let id = require_id(job_id)?;
        let body: DeletedBody = self.call(Method::DELETE, &["jobs", id], None).await?;
        info!(event = "admin.job_deleted", domain = "admin", job_id = %id);
        Ok(body.deleted)
    }

    /// Deletes every job with the given status, or all jobs for [`ALL_JOBS`].
    pub async fn bulk_delete_jobs(&self, status: &str) -> Result<u64, ApiError> {
        let status = status.trim();
        if status.is_empty() {
            return Err(ApiError::Validation("status filter must not be empty".into()));
        }
        let body = serde_json::to_value(BulkDeleteJobsBody { status }).map_err(|e| {
            ApiError::Validation(format!("failed to encode bulk delete body: {e}"))
        })?;
        self.bulk(&["bulk", "delete-jobs"], Some(body)).await
    }

    pub async fn bulk_delete_summaries(&self) -> Result<u64, ApiError> {
        self.bulk(&["bulk", "delete-summaries"], None).await
    }

    pub async fn bulk_delete_vectors(&self) -> Result<u64, ApiError> {
        self.bulk(&["bulk", "delete-vectors"], None).await
    }

    /// Wipes vectors, summaries, jobs and artifacts.
    pub async fn bulk_nuke(&self) -> Result<bool, ApiError> {
        let body: OkBody = self.call(Method::POST, &["bulk", "nuke"], None).await?;
        info!(event = "admin.nuked", domain = "admin");
        Ok(body.ok)
    }

    async fn bulk(
        &self,
        segments: &[&str],
        body: Option<serde_json::Value>,
    ) -> Result<u64, ApiError> {
        let deleted: DeletedBody = self.call(Method::POST, segments, body).await?;
        info!(
            event = "admin.bulk_deleted",
            domain = "admin",
            operation = segments.last().copied().unwrap_or_default(),
            deleted = deleted.deleted
        );
        Ok(deleted.deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // base64("admin:secret")
    const BASIC: &str = "Basic YWRtaW46c2VjcmV0";

    async fn admin_for(server: &MockServer) -> AdminClient {
        AdminClient::new(
            ApiConfig::new(server.uri()),
            AdminCredentials::new("admin", "secret"),
        )
        .expect("client")
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", AdminCredentials::new("admin", "secret"));
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("secret"));
    }

    #[tokio::test]
    async fn list_documents_sends_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/documents"))
            .and(header("authorization", BASIC))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "documents": [{
                    "id": "d1",
                    "title": "Emma",
                    "author": "Jane Austen",
                    "source_ref": "158",
                    "ingest_status": "ready",
                    "has_summary": true,
                    "pinecone_namespace": "doc-d1",
                    "created_at": null
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let docs = admin_for(&server).await.list_documents().await.expect("docs");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title.as_deref(), Some("Emma"));
    }

    #[tokio::test]
    async fn rejected_credentials_are_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/jobs"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid credentials"))
            .mount(&server)
            .await;

        let err = admin_for(&server).await.list_jobs().await.expect_err("401");
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn orphan_namespace_is_one_encoded_segment() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/admin/orphan-namespaces/old%20book"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "deleted": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        let deleted = admin_for(&server)
            .await
            .delete_orphan_namespace("old book")
            .await
            .expect("delete");
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn bulk_delete_jobs_posts_status_filter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/bulk/delete-jobs"))
            .and(body_json(serde_json::json!({ "status": "failed" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "deleted": 3 })))
            .mount(&server)
            .await;

        let deleted = admin_for(&server)
            .await
            .bulk_delete_jobs("failed")
            .await
            .expect("bulk");
        assert_eq!(deleted, 3);
    }

    #[tokio::test]
    async fn document_summary_delete_returns_ok_flag() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/admin/documents/d1/summary"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
            .mount(&server)
            .await;

        assert!(admin_for(&server)
            .await
            .delete_document_summary("d1")
            .await
            .expect("delete"));
    }

    #[tokio::test]
    async fn empty_ids_never_reach_the_server() {
        let server = MockServer::start().await;
        let admin = admin_for(&server).await;
        assert!(matches!(admin.delete_job(" ").await, Err(ApiError::Validation(_))));
        assert!(matches!(admin.bulk_delete_jobs("").await, Err(ApiError::Validation(_))));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}
