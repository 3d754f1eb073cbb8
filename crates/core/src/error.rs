//! Wire-level errors: the Matrix error body and decode failures.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// The standard error body returned by a homeserver with a non-success
/// status.
///
/// `errcode` is kept as the raw string: a client dispatches on the handful of
/// codes it understands and surfaces the rest verbatim. Fields other than the
/// structured ones are preserved in `extra` so callers can inspect
/// e.g. `retry_after_ms` without this crate naming every errcode.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MatrixErrorBody {
    /// The Matrix error code, e.g. `M_UNKNOWN_TOKEN`.
    pub errcode: String,

    /// A human-readable error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Whether the client can recover from an `M_UNKNOWN_TOKEN` by
    /// refreshing its access token.
    #[serde(default, skip_serializing_if = "crate::serde::is_default")]
    pub soft_logout: bool,

    /// Any additional fields of the error body.
    #[serde(flatten)]
    pub extra: JsonMap<String, JsonValue>,
}

impl MatrixErrorBody {
    /// Attempts to parse a Matrix error body out of raw response bytes.
    pub fn from_bytes(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }
}

/// A wire schema violation: a required field is missing or has the wrong
/// primitive type.
///
/// Unknown discriminator values are not decode errors; they fall back to the
/// designated unknown variants.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[error("{path}: {reason}")]
pub struct DecodeError {
    /// Dotted path to the offending field, e.g. `content.body`.
    pub path: String,

    /// What went wrong at that path.
    pub reason: String,
}

impl DecodeError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { path: path.into(), reason: reason.into() }
    }

    /// Prefixes the path with an enclosing field name.
    pub fn nested(self, outer: &str) -> Self {
        let path = if self.path.is_empty() {
            outer.to_owned()
        } else {
            format!("{outer}.{}", self.path)
        };
        Self { path, ..self }
    }
}

/// An error occurred while validating an identifier string.
#[derive(Clone, Copy, Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdParseError {
    /// The identifier is empty.
    #[error("identifier is empty")]
    Empty,

    /// The identifier does not start with the required sigil.
    #[error("identifier is missing its leading sigil")]
    MissingLeadingSigil,

    /// The identifier is missing a required delimiter.
    #[error("identifier is missing a required delimiter")]
    MissingDelimiter,

    /// The `mxc://` URI does not match `mxc://<server_name>/<media_id>`.
    #[error("malformed mxc:// URI")]
    MalformedMxcUri,

    /// The identifier contains invalid characters.
    #[error("identifier contains invalid characters")]
    InvalidCharacters,
}
