//! Client-side view of a long-running job's progress stream.
//!
//! A [`StreamClient`] subscribes to the server-sent events published for one
//! job, folds `progress`/`done`/`error` events into a [`StreamState`]
//! snapshot and guarantees a single terminal transition followed by
//! connection teardown.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use jobwatch_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), StreamError> {
//! let source = Arc::new(HttpEventSource::new(HttpSourceConfig::new("http://localhost:8000"))?);
//! let client = StreamClient::open("0b7c6d1e-job", source)?;
//!
//! let mut updates = client.subscribe();
//! while updates.changed().await.is_ok() {
//!     let state = updates.borrow_and_update().clone();
//!     println!("{}: {}", state.step, state.detail);
//!     if state.done {
//!         println!("finished with {}", state.status);
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Stream client handle and the task driving its connection.
pub mod client;
/// Error types for opening and reading streams.
pub mod errors;
/// Typed progress events and frame decoding.
pub mod event;
/// Reqwest-backed event source.
pub mod http;
/// Job identifiers.
pub mod job;
/// Common imports for typical usage.
pub mod prelude;
/// Connection ownership and the event source seam.
pub mod source;
/// `text/event-stream` framing.
pub mod sse;
/// Snapshot type and the progress state machine.
pub mod state;

pub use client::StreamClient;
pub use errors::StreamError;
pub use event::StreamEvent;
pub use http::{HttpEventSource, HttpSourceConfig};
pub use job::JobId;
pub use source::{CloseReason, Connection, EventSource, FrameStream};
pub use sse::{SseDecoder, SseFrame};
pub use state::{ERROR_STATUS, StreamMachine, StreamPhase, StreamState, Transition};
