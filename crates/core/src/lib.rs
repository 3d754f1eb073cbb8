//! Wire-level vocabulary for the fluo Matrix client.
//!
//! This crate holds everything that crosses the wire unchanged: identifier
//! newtypes, the polymorphic event model and its codec, the request and
//! response bodies for the client-server endpoints the sync engine uses, and
//! the Matrix error body. It contains no I/O and no engine state.

pub mod client;
pub mod error;
pub mod events;
pub mod identifiers;
pub mod presence;
pub mod serde;
mod time;

pub use self::error::{DecodeError, IdParseError, MatrixErrorBody};
pub use self::identifiers::*;
pub use self::time::UnixMillis;

use ::serde::{Deserialize, Serialize};

/// The direction to return events from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Direction {
    /// Return events backwards in time from the requested `from` token.
    #[default]
    #[serde(rename = "b")]
    Backward,

    /// Return events forwards in time from the requested `from` token.
    #[serde(rename = "f")]
    Forward,
}

impl Direction {
    /// The query-parameter form, `"b"` or `"f"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backward => "b",
            Self::Forward => "f",
        }
    }
}
