use crate::job::JobId;

/// Errors produced while opening or reading a job progress stream.
///
/// None of these reach the UI directly: the client folds every terminal
/// failure into the `status`/`done` fields of its snapshot. They exist for
/// event sources, logging and construction failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// Invalid event source configuration.
    #[error("config error: {0}")]
    Config(String),
    /// No async runtime was available to drive the connection.
    #[error("runtime error: {0}")]
    Runtime(String),
    /// Connecting or reading the stream failed at the transport level.
    #[error("transport error ({job_id}): {message}")]
    Transport { job_id: JobId, message: String },
    /// The stream endpoint answered with a non-success HTTP status.
    #[error("stream request for {job_id} failed with status {status}: {body}")]
    Status {
        job_id: JobId,
        status: u16,
        body: String,
    },
    /// An event payload could not be decoded.
    #[error("invalid `{event}` payload: {message}")]
    Decode { event: String, message: String },
}

impl StreamError {
    /// Creates a transport-level error.
    pub fn transport(job_id: impl Into<JobId>, message: impl Into<String>) -> Self {
        Self::Transport {
            job_id: job_id.into(),
            message: message.into(),
        }
    }

    /// Creates a payload decode error.
    pub fn decode(event: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            event: event.into(),
            message: message.into(),
        }
    }
}
