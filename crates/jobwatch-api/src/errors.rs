/// Errors returned by the REST clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input, rejected before any request is sent.
    #[error("validation error: {0}")]
    Validation(String),
    /// The request could not be sent or the body could not be read.
    #[error("transport error ({endpoint}): {message}")]
    Transport { endpoint: String, message: String },
    /// The backend answered with a non-success status.
    #[error("HTTP {status} from {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The response body did not match the expected shape.
    #[error("invalid response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl ApiError {
    /// Returns the HTTP status for `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 401/403 answers, which mean the admin credentials were refused.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}
