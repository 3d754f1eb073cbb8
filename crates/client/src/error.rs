//! The error type of the engine.

use fluo_core::{DecodeError, IdParseError};

/// The result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any error the engine can surface.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No access token is available, or the server invalidated the session
    /// and it cannot be recovered by refreshing.
    #[error("not logged in")]
    LoginRequired,

    /// The server returned a Matrix error object.
    #[error("{errcode} ({http_status}): {}", .error.as_deref().unwrap_or("no message"))]
    MatrixApi {
        /// The Matrix error code, e.g. `M_FORBIDDEN`.
        errcode: String,

        /// The human-readable message, if the server sent one.
        error: Option<String>,

        /// The HTTP status of the response.
        http_status: u16,

        /// Whether an `M_UNKNOWN_TOKEN` can be recovered by refreshing.
        soft_logout: bool,
    },

    /// A non-success response without a valid Matrix error body.
    #[error("HTTP {status}")]
    Http {
        /// The HTTP status of the response.
        status: u16,

        /// The raw response body.
        body: Vec<u8>,
    },

    /// Malformed JSON or a wire schema violation on a required field.
    #[error("decode failed at {}: {}", .0.path, .0.reason)]
    Decode(#[from] DecodeError),

    /// The HTTP transport failed before a response was produced.
    #[error("transport: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The operation should be re-dispatched; consumed by the retry wrapper
    /// and never surfaced to callers.
    #[error("retry requested")]
    Retry,

    /// The API was used incorrectly.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// A broken internal invariant.
    #[error("internal invariant broken: {0}")]
    Internal(&'static str),
}

impl From<IdParseError> for Error {
    fn from(e: IdParseError) -> Self {
        Self::Decode(DecodeError::new("", e.to_string()))
    }
}

impl Error {
    /// Whether this is an `M_UNKNOWN_TOKEN` Matrix error.
    pub(crate) fn is_unknown_token(&self) -> Option<bool> {
        match self {
            Self::MatrixApi { errcode, soft_logout, .. } if errcode == "M_UNKNOWN_TOKEN" => {
                Some(*soft_logout)
            }
            _ => None,
        }
    }
}

/// Re-executes `operation` for as long as it asks for a retry.
///
/// The soft-logout path refreshes the access token and returns
/// [`Error::Retry`]; this wrapper turns that into a re-dispatch. The loop is
/// unbounded on purpose: a second `M_UNKNOWN_TOKEN` without `soft_logout`
/// terminates with [`Error::LoginRequired`] instead of another retry.
pub(crate) async fn with_retry<T, F, Fut>(mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    loop {
        match operation().await {
            Err(Error::Retry) => continue,
            other => return other,
        }
    }
}
