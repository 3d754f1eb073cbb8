//! The content of an `m.room.member` event.

use std::fmt;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize, Serializer};

use crate::MxcUri;

/// The content of an `m.room.member` event.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MemberContent {
    /// The membership state of the user.
    pub membership: Membership,

    /// The display name for this user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayname: Option<String>,

    /// The avatar URL for this user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<MxcUri>,

    /// Whether the room is a direct chat, on invite events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_direct: Option<bool>,

    /// A reason for the membership change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl MemberContent {
    /// Content for a plain membership change with no profile data.
    pub fn new(membership: Membership) -> Self {
        Self { membership, displayname: None, avatar_url: None, is_direct: None, reason: None }
    }
}

/// A membership state.
///
/// Unknown values are preserved verbatim rather than rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Membership {
    Invite,
    Join,
    Knock,
    Leave,
    Ban,
    Unknown(String),
}

impl Membership {
    /// The wire form of the membership state.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Invite => "invite",
            Self::Join => "join",
            Self::Knock => "knock",
            Self::Leave => "leave",
            Self::Ban => "ban",
            Self::Unknown(other) => other,
        }
    }
}

impl From<&str> for Membership {
    fn from(s: &str) -> Self {
        match s {
            "invite" => Self::Invite,
            "join" => Self::Join,
            "knock" => Self::Knock,
            "leave" => Self::Leave,
            "ban" => Self::Ban,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Membership {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Membership {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}
