use std::pin::Pin;

use futures::StreamExt as _;
use tracing::debug;

use crate::errors::StreamError;
use crate::job::JobId;
use crate::sse::SseFrame;

/// Ordered stream of decoded SSE frames for one job.
pub type FrameStream =
    Pin<Box<dyn futures::Stream<Item = Result<SseFrame, StreamError>> + Send + 'static>>;

/// Why a connection was closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// A `done` event was observed.
    Completed,
    /// The transport failed or the server reported an error.
    Failed,
    /// The owner disposed of the client.
    Disposed,
}

/// A live push-event subscription. Dropping it releases the underlying
/// transport; `close` does the same with a log line.
pub struct Connection {
    job_id: JobId,
    frames: FrameStream,
}

impl Connection {
    /// Wraps an open frame stream. The connection owns `frames` and drops it
    /// on close.
    pub fn new(job_id: JobId, frames: FrameStream) -> Self {
        Self { job_id, frames }
    }

    /// Job this connection is subscribed to.
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Waits for the next frame. `None` means the server ended the stream.
    pub async fn next_frame(&mut self) -> Option<Result<SseFrame, StreamError>> {
        self.frames.next().await
    }

    /// Releases the transport. Consuming `self` makes a second close
    /// impossible.
    pub fn close(self, reason: CloseReason) {
        debug!(
            event = "stream.connection_closed",
            domain = "stream",
            job_id = %self.job_id,
            reason = ?reason
        );
    }
}

/// Opens push-event connections addressed by job id.
///
/// Implemented by `HttpEventSource` for the real backend; tests plug in
/// channel-backed sources.
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    /// Opens a subscription for `job_id`. An `Err` means no connection was
    /// established; the caller treats it as a transport failure.
    async fn connect(&self, job_id: &JobId) -> Result<Connection, StreamError>;
}
