use tracing::debug;

use crate::event::StreamEvent;

/// Status label used for every transport-level terminal transition.
pub const ERROR_STATUS: &str = "error";

/// Position of a stream in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamPhase {
    /// No event observed yet.
    #[default]
    Connecting,
    /// At least one progress event observed.
    Streaming,
    /// A terminal event was observed. Final.
    Terminated,
}

/// Observable snapshot of a job's progress.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct StreamState {
    /// Last reported coarse phase name.
    pub step: String,
    /// Last reported human-readable sub-status.
    pub detail: String,
    /// Terminal outcome label; empty while running.
    pub status: String,
    /// Set once, at the terminal transition.
    pub done: bool,
    /// Lifecycle position; `Terminated` exactly when `done` is set.
    pub phase: StreamPhase,
}

impl StreamState {
    /// True when the stream ended on a transport failure rather than a
    /// `done` event.
    pub fn is_error(&self) -> bool {
        self.done && self.status == ERROR_STATUS
    }
}

/// Result of applying one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Snapshot changed, stream continues.
    Updated,
    /// Snapshot changed and the stream reached `Terminated`.
    Terminated,
    /// Event arrived after termination; snapshot untouched.
    Ignored,
}

/// The progress state machine, free of any I/O.
#[derive(Debug, Default)]
pub struct StreamMachine {
    state: StreamState,
}

impl StreamMachine {
    /// Creates a machine in `Connecting` with an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Folds one event into the snapshot.
    ///
    /// Progress overwrites `step`/`detail`. `Done` and `TransportError` set
    /// the status once and move to `Terminated`; anything after that is
    /// reported as [`Transition::Ignored`].
    pub fn apply(&mut self, event: StreamEvent) -> Transition {
        if self.state.phase == StreamPhase::Terminated {
            debug!(?event, "event after termination ignored");
            return Transition::Ignored;
        }
        match event {
            StreamEvent::Progress { step, detail } => {
                self.state.step = step;
                self.state.detail = detail;
                self.state.phase = StreamPhase::Streaming;
                Transition::Updated
            }
            StreamEvent::Done { status } => self.terminate(status),
            StreamEvent::TransportError { .. } => self.terminate(ERROR_STATUS.to_string()),
        }
    }

    fn terminate(&mut self, status: String) -> Transition {
        self.state.status = status;
        self.state.done = true;
        self.state.phase = StreamPhase::Terminated;
        Transition::Terminated
    }
}
