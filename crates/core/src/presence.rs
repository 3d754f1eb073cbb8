//! Presence of users on the homeserver.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::DecodeError;
use crate::serde::FromRawJson;
use crate::{MxcUri, UserId};

/// A presence state as understood by `/sync`'s `set_presence` parameter and
/// presence events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    /// Disconnected from the server.
    Offline,

    /// Connected to the server.
    #[default]
    Online,

    /// Connected to the server but not available for chat.
    Unavailable,
}

impl PresenceState {
    /// The query-parameter form of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
            Self::Unavailable => "unavailable",
        }
    }
}

/// The content of an `m.presence` event.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PresenceContent {
    /// The presence state.
    #[serde(default)]
    pub presence: PresenceState,

    /// Whether the user is currently active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currently_active: Option<bool>,

    /// The last time since the user performed some action, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active_ago: Option<u64>,

    /// An optional description to accompany the presence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_msg: Option<String>,

    /// The current display name of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayname: Option<String>,

    /// The current avatar URL of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<MxcUri>,
}

/// An `m.presence` event as delivered in the `presence` section of `/sync`.
#[derive(Clone, Debug)]
pub struct PresenceEvent {
    /// The user whose presence this describes.
    pub sender: UserId,

    /// The presence data.
    pub content: PresenceContent,
}

impl FromRawJson for PresenceEvent {
    fn from_raw_json(json: &JsonValue) -> Result<Self, DecodeError> {
        let sender = json
            .get("sender")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| DecodeError::new("sender", "missing or not a string"))?;
        let sender = UserId::parse(sender).map_err(|e| DecodeError::new("sender", e.to_string()))?;
        let content = json
            .get("content")
            .ok_or_else(|| DecodeError::new("content", "missing"))?;
        let content = serde_json::from_value(content.clone())
            .map_err(|e| DecodeError::new("content", e.to_string()))?;
        Ok(Self { sender, content })
    }
}
