pub use crate::client::StreamClient;
pub use crate::errors::StreamError;
pub use crate::http::{HttpEventSource, HttpSourceConfig};
pub use crate::job::JobId;
pub use crate::source::EventSource;
pub use crate::state::{ERROR_STATUS, StreamPhase, StreamState};
