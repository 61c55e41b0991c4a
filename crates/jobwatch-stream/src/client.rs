use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::StreamError;
use crate::event::{Decoded, StreamEvent, decode_frame};
use crate::job::JobId;
use crate::source::{CloseReason, EventSource};
use crate::sse::SseFrame;
use crate::state::{StreamMachine, StreamState, Transition};

/// Live view of one job's progress stream.
///
/// Opening the client starts the connection immediately. The snapshot is
/// published through a `watch` channel, so `snapshot()` and every
/// `subscribe()` receiver observe whole states in delivery order.
///
/// Dropping the client disposes of it: the connection is closed whether or
/// not a terminal event was ever received.
pub struct StreamClient {
    job_id: JobId,
    state_rx: watch::Receiver<StreamState>,
    stop_tx: Option<watch::Sender<bool>>,
}

impl StreamClient {
    /// Opens a progress stream for `job_id` on the current tokio runtime.
    pub fn open(
        job_id: impl Into<JobId>,
        source: Arc<dyn EventSource>,
    ) -> Result<Self, StreamError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| StreamError::Runtime(format!("no tokio runtime available: {e}")))?;
        let job_id = job_id.into();
        let (state_tx, state_rx) = watch::channel(StreamState::default());
        let (stop_tx, stop_rx) = watch::channel(false);

        debug!(event = "stream.opened", domain = "stream", job_id = %job_id);
        runtime.spawn(drive_stream(job_id.clone(), source, state_tx, stop_rx));

        Ok(Self {
            job_id,
            state_rx,
            stop_tx: Some(stop_tx),
        })
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Returns a copy of the current snapshot.
    pub fn snapshot(&self) -> StreamState {
        self.state_rx.borrow().clone()
    }

    /// Returns a receiver that is notified on every snapshot change.
    ///
    /// The receiver outlives the client; after disposal it keeps the last
    /// published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<StreamState> {
        self.state_rx.clone()
    }

    /// Waits until the stream terminates and returns the final snapshot.
    ///
    /// If the client is stopped first, returns the snapshot as of disposal
    /// (with `done == false`).
    pub async fn wait_until_done(&self) -> StreamState {
        let mut rx = self.state_rx.clone();
        if let Ok(state) = rx.wait_for(|state| state.done).await {
            return state.clone();
        }
        rx.borrow().clone()
    }

    /// True once `stop()` has been called (or the client was dropped).
    pub fn is_stopped(&self) -> bool {
        self.stop_tx.is_none()
    }

    /// Closes the connection if it is still open. Idempotent.
    ///
    /// Never fabricates a terminal state: `done` keeps whatever value the
    /// stream produced.
    pub fn stop(&mut self) {
        let Some(stop_tx) = self.stop_tx.take() else {
            return;
        };
        debug!(event = "stream.stop_requested", domain = "stream", job_id = %self.job_id);
        let _ = stop_tx.send(true);
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Resolves once disposal is requested or the owning client is gone.
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow_and_update() {
            return;
        }
        if stop_rx.changed().await.is_err() {
            return;
        }
    }
}

enum Step {
    Stop,
    Frame(Option<Result<SseFrame, StreamError>>),
}

async fn drive_stream(
    job_id: JobId,
    source: Arc<dyn EventSource>,
    state_tx: watch::Sender<StreamState>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut machine = StreamMachine::new();

    let connected = tokio::select! {
        biased;
        _ = stop_requested(&mut stop_rx) => {
            debug!(event = "stream.disposed", domain = "stream", job_id = %job_id, "disposed before connecting");
            return;
        }
        result = source.connect(&job_id) => result,
    };
    let mut connection = match connected {
        Ok(connection) => {
            info!(event = "stream.connected", domain = "stream", job_id = %job_id);
            connection
        }
        Err(err) => {
            warn!(event = "stream.connect_failed", domain = "stream", job_id = %job_id, error = %err);
            machine.apply(StreamEvent::transport_error(err.to_string()));
            publish(&state_tx, &machine);
            return;
        }
    };

    loop {
        let step = tokio::select! {
            biased;
            _ = stop_requested(&mut stop_rx) => Step::Stop,
            next = connection.next_frame() => Step::Frame(next),
        };

        let event = match step {
            Step::Stop => {
                connection.close(CloseReason::Disposed);
                return;
            }
            Step::Frame(Some(Ok(frame))) => match decode_frame(&frame) {
                Decoded::Event(event) => event,
                Decoded::Skipped(err) => {
                    warn!(event = "stream.payload_skipped", domain = "stream", job_id = %job_id, error = %err);
                    continue;
                }
                Decoded::Ignored => {
                    debug!(job_id = %job_id, name = frame.event_name(), "ignoring unrelated event");
                    continue;
                }
            },
            Step::Frame(Some(Err(err))) => StreamEvent::transport_error(err.to_string()),
            Step::Frame(None) => StreamEvent::transport_error("stream ended before a done event"),
        };

        match &event {
            StreamEvent::Progress { step, .. } => {
                debug!(event = "stream.progress", domain = "stream", job_id = %job_id, step = %step);
            }
            StreamEvent::TransportError { message } => {
                warn!(event = "stream.transport_error", domain = "stream", job_id = %job_id, error = %message);
            }
            StreamEvent::Done { .. } => {}
        }
        let reason = if matches!(event, StreamEvent::Done { .. }) {
            CloseReason::Completed
        } else {
            CloseReason::Failed
        };

        match machine.apply(event) {
            Transition::Updated => publish(&state_tx, &machine),
            Transition::Terminated => {
                publish(&state_tx, &machine);
                info!(
                    event = "stream.terminated",
                    domain = "stream",
                    job_id = %job_id,
                    status = %machine.state().status
                );
                connection.close(reason);
                return;
            }
            Transition::Ignored => {}
        }
    }
}

fn publish(state_tx: &watch::Sender<StreamState>, machine: &StreamMachine) {
    state_tx.send_replace(machine.state().clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Connection;
    use crate::state::{ERROR_STATUS, StreamPhase};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    type FrameTx = mpsc::UnboundedSender<Result<SseFrame, StreamError>>;
    type FrameRx = mpsc::UnboundedReceiver<Result<SseFrame, StreamError>>;

    struct ChannelSource {
        frames: Mutex<Option<FrameRx>>,
        connects: AtomicUsize,
    }

    impl ChannelSource {
        fn new() -> (Arc<Self>, FrameTx) {
            let (tx, rx) = mpsc::unbounded_channel();
            let source = Arc::new(Self {
                frames: Mutex::new(Some(rx)),
                connects: AtomicUsize::new(0),
            });
            (source, tx)
        }
    }

    #[async_trait::async_trait]
    impl EventSource for ChannelSource {
        async fn connect(&self, job_id: &JobId) -> Result<Connection, StreamError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let rx = self.frames.lock().unwrap().take();
            let rx = rx.ok_or_else(|| StreamError::transport(job_id.clone(), "already connected"))?;
            let frames = futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            });
            Ok(Connection::new(job_id.clone(), Box::pin(frames)))
        }
    }

    struct RefusingSource;

    #[async_trait::async_trait]
    impl EventSource for RefusingSource {
        async fn connect(&self, job_id: &JobId) -> Result<Connection, StreamError> {
            Err(StreamError::transport(job_id.clone(), "connection refused"))
        }
    }

    struct PendingSource;

    #[async_trait::async_trait]
    impl EventSource for PendingSource {
        async fn connect(&self, _job_id: &JobId) -> Result<Connection, StreamError> {
            futures::future::pending().await
        }
    }

    fn progress(step: &str, detail: &str) -> Result<SseFrame, StreamError> {
        Ok(SseFrame::named(
            "progress",
            serde_json::json!({ "step": step, "detail": detail }).to_string(),
        ))
    }

    fn done(status: &str) -> Result<SseFrame, StreamError> {
        Ok(SseFrame::named(
            "done",
            serde_json::json!({ "status": status }).to_string(),
        ))
    }

    fn expected(step: &str, detail: &str, status: &str, done: bool, phase: StreamPhase) -> StreamState {
        StreamState {
            step: step.into(),
            detail: detail.into(),
            status: status.into(),
            done,
            phase,
        }
    }

    async fn wait_for_step(client: &StreamClient, step: &str) {
        let mut rx = client.subscribe();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| s.step == step))
            .await
            .expect("timed out waiting for step")
            .expect("state channel closed");
    }

    async fn wait_closed(tx: &FrameTx) {
        tokio::time::timeout(Duration::from_secs(2), tx.closed())
            .await
            .expect("connection was not closed");
    }

    async fn finish(client: &StreamClient) -> StreamState {
        tokio::time::timeout(Duration::from_secs(2), client.wait_until_done())
            .await
            .expect("timed out waiting for termination")
    }

    #[tokio::test]
    async fn progress_updates_snapshot() {
        let (source, tx) = ChannelSource::new();
        let client = StreamClient::open("j1", source.clone()).expect("open");
        assert_eq!(client.job_id().as_str(), "j1");

        tx.send(progress("fetch", "downloading")).unwrap();
        wait_for_step(&client, "fetch").await;

        assert_eq!(
            client.snapshot(),
            expected("fetch", "downloading", "", false, StreamPhase::Streaming)
        );
        assert_eq!(source.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn done_terminates_and_closes_connection() {
        let (source, tx) = ChannelSource::new();
        let client = StreamClient::open("j1", source).expect("open");

        tx.send(progress("fetch", "downloading")).unwrap();
        tx.send(done("complete")).unwrap();

        assert_eq!(
            finish(&client).await,
            expected("fetch", "downloading", "complete", true, StreamPhase::Terminated)
        );
        wait_closed(&tx).await;
        assert!(tx.send(progress("late", "late")).is_err());
        assert_eq!(client.snapshot().status, "complete");
    }

    #[tokio::test]
    async fn transport_error_before_progress_sets_sentinel() {
        let (source, tx) = ChannelSource::new();
        let client = StreamClient::open("j2", source).expect("open");

        tx.send(Err(StreamError::transport("j2", "connection reset")))
            .unwrap();

        assert_eq!(
            finish(&client).await,
            expected("", "", ERROR_STATUS, true, StreamPhase::Terminated)
        );
        wait_closed(&tx).await;
    }

    #[tokio::test]
    async fn failed_connect_is_terminal_error() {
        let client = StreamClient::open("j2", Arc::new(RefusingSource)).expect("open");
        let state = finish(&client).await;
        assert!(state.is_error());
        assert_eq!(state.step, "");
    }

    #[tokio::test]
    async fn server_error_event_is_terminal_error() {
        let (source, tx) = ChannelSource::new();
        let client = StreamClient::open("missing", source).expect("open");
        tx.send(Ok(SseFrame::named("error", "Job not found"))).unwrap();
        assert!(finish(&client).await.is_error());
        wait_closed(&tx).await;
    }

    #[tokio::test]
    async fn stream_end_without_done_is_terminal_error() {
        let (source, tx) = ChannelSource::new();
        let client = StreamClient::open("j3", source).expect("open");
        tx.send(progress("essay", "drafting")).unwrap();
        drop(tx);

        assert_eq!(
            finish(&client).await,
            expected("essay", "drafting", ERROR_STATUS, true, StreamPhase::Terminated)
        );
    }

    #[tokio::test]
    async fn stop_closes_connection_without_terminal_state() {
        let (source, tx) = ChannelSource::new();
        let mut client = StreamClient::open("j4", source).expect("open");

        tx.send(progress("fetch", "downloading")).unwrap();
        wait_for_step(&client, "fetch").await;

        client.stop();
        assert!(client.is_stopped());
        wait_closed(&tx).await;

        let state = client.snapshot();
        assert!(!state.done);
        assert_eq!(state.status, "");
        assert_eq!(state.phase, StreamPhase::Streaming);

        client.stop();
        assert!(!finish(&client).await.done);
    }

    #[tokio::test]
    async fn stop_after_termination_is_noop() {
        let (source, tx) = ChannelSource::new();
        let mut client = StreamClient::open("j5", source).expect("open");
        tx.send(done("failed")).unwrap();
        let final_state = finish(&client).await;

        client.stop();
        client.stop();
        assert_eq!(client.snapshot(), final_state);
        assert_eq!(final_state.status, "failed");
    }

    #[tokio::test]
    async fn dropping_client_closes_connection() {
        let (source, tx) = ChannelSource::new();
        let client = StreamClient::open("j6", source).expect("open");
        let observer = client.subscribe();
        tx.send(progress("fetch", "downloading")).unwrap();
        wait_for_step(&client, "fetch").await;

        drop(client);
        wait_closed(&tx).await;
        assert!(!observer.borrow().done);
    }

    #[tokio::test]
    async fn stop_before_connect_completes() {
        let mut client = StreamClient::open("j7", Arc::new(PendingSource)).expect("open");
        client.stop();
        let state = finish(&client).await;
        assert_eq!(state, StreamState::default());
    }

    #[tokio::test]
    async fn malformed_progress_is_skipped() {
        let (source, tx) = ChannelSource::new();
        let client = StreamClient::open("j8", source).expect("open");
        tx.send(progress("fetch", "downloading")).unwrap();
        tx.send(Ok(SseFrame::named("progress", "{broken"))).unwrap();
        tx.send(progress("segment", "chapter 1")).unwrap();

        wait_for_step(&client, "segment").await;
        let state = client.snapshot();
        assert_eq!(state.detail, "chapter 1");
        assert!(!state.done);
    }

    #[tokio::test]
    async fn malformed_done_is_terminal_error() {
        let (source, tx) = ChannelSource::new();
        let client = StreamClient::open("j9", source).expect("open");
        tx.send(Ok(SseFrame::named("done", "not json"))).unwrap();
        assert!(finish(&client).await.is_error());
        wait_closed(&tx).await;
    }

    #[test]
    fn open_requires_a_runtime() {
        let (source, _tx) = ChannelSource::new();
        assert!(matches!(
            StreamClient::open("j1", source),
            Err(StreamError::Runtime(_))
        ));
    }
}
