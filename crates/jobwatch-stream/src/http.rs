use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use futures::StreamExt as _;
use futures::stream;
use tracing::debug;

use crate::errors::StreamError;
use crate::job::JobId;
use crate::source::{Connection, EventSource};
use crate::sse::{SseDecoder, SseFrame};

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// Configuration for the HTTP event source.
#[derive(Clone, Debug)]
pub struct HttpSourceConfig {
    /// Base URL of the backend, without the `/api` prefix.
    pub base_url: String,
    /// Time allowed to establish the TCP/TLS connection. No whole-request
    /// timeout is applied: a progress stream stays open while the job runs.
    pub connect_timeout: Duration,
    pub user_agent: Option<String>,
}

impl HttpSourceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(10),
            user_agent: None,
        }
    }

    /// Full stream endpoint for `job_id`. The id is trimmed and sent as one
    /// percent-encoded path segment, so `/`, `?` and `..` stay inside it.
    pub(crate) fn stream_url(&self, job_id: &JobId) -> Result<reqwest::Url, StreamError> {
        let id = job_id.as_str().trim();
        if id.is_empty() {
            return Err(StreamError::Config("job id must not be empty".into()));
        }
        let base = self.base_url.trim();
        let mut url = reqwest::Url::parse(base)
            .map_err(|e| StreamError::Config(format!("invalid base_url {base:?}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StreamError::Config(format!("base_url {base} cannot carry a path")))?
            .pop_if_empty()
            .extend(["api", "jobs", id, "stream"]);
        Ok(url)
    }
}

/// Event source backed by a `GET /api/jobs/{id}/stream` SSE endpoint.
pub struct HttpEventSource {
    client: reqwest::Client,
    config: HttpSourceConfig,
}

impl HttpEventSource {
    pub fn new(config: HttpSourceConfig) -> Result<Self, StreamError> {
        if config.base_url.trim().is_empty() {
            return Err(StreamError::Config("base_url must not be empty".into()));
        }
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("jobwatch/{}", env!("CARGO_PKG_VERSION")));
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| StreamError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait::async_trait]
impl EventSource for HttpEventSource {
    async fn connect(&self, job_id: &JobId) -> Result<Connection, StreamError> {
        let url = self.config.stream_url(job_id)?;
        debug!(event = "stream.connecting", domain = "stream", job_id = %job_id, url = %url);

        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| StreamError::transport(job_id.clone(), format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StreamError::Status {
                job_id: job_id.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let bytes_stream: ByteStream = Box::pin(response.bytes_stream());
        let frames = sse_frame_stream(job_id.clone(), bytes_stream);
        Ok(Connection::new(job_id.clone(), Box::pin(frames)))
    }
}

fn sse_frame_stream(
    job_id: JobId,
    bytes_stream: ByteStream,
) -> impl futures::Stream<Item = Result<SseFrame, StreamError>> + Send {
    struct State {
        job_id: JobId,
        bytes_stream: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<SseFrame>,
        done: bool,
    }

    stream::try_unfold(
        State {
            job_id,
            bytes_stream,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(frame) = state.pending.pop_front() {
                    return Ok(Some((frame, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        state.pending.extend(state.decoder.push_chunk(&chunk));
                    }
                    Some(Err(e)) => {
                        return Err(StreamError::transport(
                            state.job_id,
                            format!("stream read failed: {e}"),
                        ));
                    }
                    None => {
                        if state.decoder.has_pending() {
                            debug!(job_id = %state.job_id, "stream ended with a partial frame");
                        }
                        state.done = true;
                    }
                }
            }
        },
    )
}
