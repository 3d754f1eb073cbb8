//! Serde helpers shared across the wire types.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::DecodeError;

/// Check whether a value is equal to its default, for use with
/// `skip_serializing_if`.
pub fn is_default<T: Default + PartialEq>(val: &T) -> bool {
    *val == T::default()
}

/// Simply returns `true`, for use with `serde(default = ...)`.
pub fn default_true() -> bool {
    true
}

/// Check whether a boolean is `true`, for use with `skip_serializing_if`.
#[allow(clippy::trivially_copy_pass_by_ref)]
pub fn is_true(b: &bool) -> bool {
    *b
}

/// (De)serialize an `Option<Duration>` as an optional number of milliseconds.
pub mod duration_opt_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(opt: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match opt {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

/// A JSON value that decodes into `T` on demand.
///
/// Events inside `/sync` and `/messages` responses are carried raw and
/// decoded one by one by the engine, so a single malformed event yields a
/// precise [`DecodeError`] instead of poisoning the surrounding response
/// decode.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(transparent, bound(serialize = "", deserialize = ""))]
pub struct RawJson<T> {
    json: JsonValue,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> RawJson<T> {
    /// Wraps an already-parsed JSON value.
    pub fn new(json: JsonValue) -> Self {
        Self { json, _marker: PhantomData }
    }

    /// The raw JSON value.
    pub fn json(&self) -> &JsonValue {
        &self.json
    }

    /// Consumes the wrapper, returning the raw JSON value.
    pub fn into_json(self) -> JsonValue {
        self.json
    }
}

impl<T: FromRawJson> RawJson<T> {
    /// Decodes the wrapped value.
    pub fn deserialize(&self) -> Result<T, DecodeError> {
        T::from_raw_json(&self.json)
    }
}

/// Hand-written decoding from a raw JSON value.
///
/// The event envelopes implement this instead of `serde::Deserialize` because
/// their content decoding is driven by discriminators on the enclosing object
/// and needs to report field paths on failure.
pub trait FromRawJson: Sized {
    fn from_raw_json(json: &JsonValue) -> Result<Self, DecodeError>;
}
