use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use jobwatch_stream::{EventSource, StreamClient, StreamState};
use tracing::info;

use crate::render;

/// How a watch ended.
#[derive(Debug, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The stream reached a terminal state.
    Finished(StreamState),
    /// The shutdown signal fired first; the stream was disposed.
    Interrupted(StreamState),
}

impl WatchOutcome {
    pub fn state(&self) -> &StreamState {
        match self {
            Self::Finished(state) | Self::Interrupted(state) => state,
        }
    }
}

/// Streams a job's progress to `out` until it terminates or `shutdown`
/// resolves. The client is dropped, and its connection closed, on return.
pub async fn watch_job<W, F>(
    job_id: &str,
    source: Arc<dyn EventSource>,
    shutdown: F,
    out: &mut W,
) -> anyhow::Result<WatchOutcome>
where
    W: Write,
    F: Future<Output = ()>,
{
    let client = StreamClient::open(job_id, source)?;
    let mut updates = client.subscribe();
    let mut shown = StreamState::default();
    tokio::pin!(shutdown);

    loop {
        let state = updates.borrow_and_update().clone();
        if let Some(line) = render::progress_line(&shown, &state) {
            writeln!(out, "{line}")?;
        }
        shown = state;
        if shown.done {
            writeln!(out, "{}", render::final_line(&shown))?;
            return Ok(WatchOutcome::Finished(shown));
        }

        tokio::select! {
            _ = &mut shutdown => {
                info!(event = "watch.interrupted", domain = "cli", job_id = %job_id);
                let state = client.snapshot();
                writeln!(out, "{}", render::final_line(&state))?;
                return Ok(WatchOutcome::Interrupted(state));
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    let state = client.snapshot();
                    writeln!(out, "{}", render::final_line(&state))?;
                    return Ok(WatchOutcome::Finished(state));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobwatch_stream::{Connection, JobId, SseFrame, StreamError};
    use pretty_assertions::assert_eq;

    struct ScriptedSource {
        frames: Vec<SseFrame>,
        hold_open: bool,
    }

    #[async_trait::async_trait]
    impl EventSource for ScriptedSource {
        async fn connect(&self, job_id: &JobId) -> Result<Connection, StreamError> {
            let frames = futures::stream::iter(self.frames.clone().into_iter().map(Ok));
            let stream: jobwatch_stream::FrameStream = if self.hold_open {
                Box::pin(futures::StreamExt::chain(frames, futures::stream::pending()))
            } else {
                Box::pin(frames)
            };
            Ok(Connection::new(job_id.clone(), stream))
        }
    }

    #[tokio::test]
    async fn prints_progress_then_final_status() {
        let source = Arc::new(ScriptedSource {
            frames: vec![
                SseFrame::named("progress", r#"{"step":"fetch","detail":"downloading"}"#),
                SseFrame::named("done", r#"{"status":"succeeded"}"#),
            ],
            hold_open: false,
        });
        let mut out = Vec::new();
        let outcome = watch_job("j1", source, std::future::pending(), &mut out)
            .await
            .expect("watch");

        assert!(matches!(outcome, WatchOutcome::Finished(_)));
        assert!(render::succeeded(outcome.state()));
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.ends_with("finished: succeeded\n"));
    }

    #[tokio::test]
    async fn shutdown_disposes_without_terminal_state() {
        let source = Arc::new(ScriptedSource {
            frames: vec![],
            hold_open: true,
        });
        let mut out = Vec::new();
        let outcome = watch_job("j2", source, async {}, &mut out)
            .await
            .expect("watch");

        assert_eq!(outcome, WatchOutcome::Interrupted(StreamState::default()));
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "stopped before the job finished\n"
        );
    }
}
