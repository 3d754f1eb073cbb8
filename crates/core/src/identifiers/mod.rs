//! Owned identifier newtypes.
//!
//! Matrix identifiers are opaque to clients: they are validated on the way in
//! and displayed verbatim, never decomposed by the engine. Each type wraps
//! the canonical string form; equality and ordering are plain string
//! equality and ordering.

mod mxc_uri;
pub mod validation;

pub use mxc_uri::MxcUri;

use std::borrow::Borrow;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::IdParseError;

macro_rules! owned_identifier {
    ($(#[doc = $docs:literal])* $id:ident, $validate:path) => {
        $(#[doc = $docs])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $id(Box<str>);

        impl $id {
            /// Validates `s` and wraps it.
            pub fn parse(s: impl AsRef<str>) -> Result<Self, IdParseError> {
                let s = s.as_ref();
                $validate(s)?;
                Ok(Self(s.into()))
            }

            /// The identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $id {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $id {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($id), "({})"), &self.0)
            }
        }

        impl AsRef<str> for $id {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $id {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<&str> for $id {
            type Error = IdParseError;

            fn try_from(s: &str) -> Result<Self, Self::Error> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $id {
            type Error = IdParseError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                $validate(&s)?;
                Ok(Self(s.into()))
            }
        }

        impl Serialize for $id {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $id {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::try_from(s).map_err(de::Error::custom)
            }
        }
    };
}

owned_identifier! {
    /// A Matrix user ID, `@localpart:server`.
    UserId, validation::user_id
}

owned_identifier! {
    /// A Matrix room ID, `!opaque:server`.
    RoomId, validation::room_id
}

owned_identifier! {
    /// A Matrix event ID, `$opaque`.
    EventId, validation::event_id
}

owned_identifier! {
    /// A Matrix room alias, `#localpart:server`.
    RoomAliasId, validation::room_alias_id
}

owned_identifier! {
    /// Either a room ID or a room alias, as accepted by `/join/{}`.
    RoomOrAliasId, validation::room_or_alias_id
}

owned_identifier! {
    /// The server part of a Matrix identifier.
    ServerName, validation::server_name
}

owned_identifier! {
    /// A device ID, assigned by the homeserver at login.
    DeviceId, validation::device_id
}

impl From<RoomId> for RoomOrAliasId {
    fn from(id: RoomId) -> Self {
        Self(id.0)
    }
}

impl From<RoomAliasId> for RoomOrAliasId {
    fn from(alias: RoomAliasId) -> Self {
        Self(alias.0)
    }
}

/// A client-chosen idempotency key for state-changing requests.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TransactionId(Box<str>);

impl TransactionId {
    /// Generates a fresh UUIDv4 transaction ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string().into())
    }

    /// The transaction ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for TransactionId {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
