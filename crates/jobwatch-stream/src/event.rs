use serde::Deserialize;

use crate::errors::StreamError;
use crate::sse::SseFrame;

/// Event names emitted by the job progress endpoint.
pub const PROGRESS_EVENT: &str = "progress";
pub const DONE_EVENT: &str = "done";
pub const ERROR_EVENT: &str = "error";

/// Typed event applied to a stream's state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// Non-terminal progress report.
    Progress { step: String, detail: String },
    /// Terminal completion with the job's final status label.
    Done { status: String },
    /// Terminal connection-level failure.
    TransportError { message: String },
}

impl StreamEvent {
    pub fn progress(step: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Progress {
            step: step.into(),
            detail: detail.into(),
        }
    }

    pub fn done(status: impl Into<String>) -> Self {
        Self::Done {
            status: status.into(),
        }
    }

    pub fn transport_error(message: impl Into<String>) -> Self {
        Self::TransportError {
            message: message.into(),
        }
    }
}

#[derive(Deserialize)]
struct ProgressPayload {
    step: String,
    #[serde(default)]
    detail: String,
}

#[derive(Deserialize)]
struct DonePayload {
    status: String,
}

/// Outcome of decoding one frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Decoded {
    /// The frame maps to a state machine event.
    Event(StreamEvent),
    /// A `progress` payload was malformed; the update is skipped.
    Skipped(StreamError),
    /// The frame is not part of the progress contract.
    Ignored,
}

/// Maps a raw frame onto the progress contract.
///
/// A malformed `done` payload cannot be retried on the same connection, so it
/// becomes a transport error; a malformed `progress` payload is only skipped.
pub fn decode_frame(frame: &SseFrame) -> Decoded {
    match frame.event_name() {
        PROGRESS_EVENT => match serde_json::from_str::<ProgressPayload>(&frame.data) {
            Ok(payload) => Decoded::Event(StreamEvent::Progress {
                step: payload.step,
                detail: payload.detail,
            }),
            Err(e) => Decoded::Skipped(StreamError::decode(PROGRESS_EVENT, e.to_string())),
        },
        DONE_EVENT => match serde_json::from_str::<DonePayload>(&frame.data) {
            Ok(payload) => Decoded::Event(StreamEvent::Done {
                status: payload.status,
            }),
            Err(e) => Decoded::Event(StreamEvent::transport_error(
                StreamError::decode(DONE_EVENT, e.to_string()).to_string(),
            )),
        },
        ERROR_EVENT => {
            let message = frame.data.trim();
            Decoded::Event(StreamEvent::transport_error(if message.is_empty() {
                "server reported a stream error"
            } else {
                message
            }))
        }
        _ => Decoded::Ignored,
    }
}
