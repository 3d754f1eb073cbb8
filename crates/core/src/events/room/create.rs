//! The content of an `m.room.create` event.

use serde::{Deserialize, Serialize};

use crate::{EventId, RoomId};

/// The content of an `m.room.create` event, the first event in any room.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CreateContent {
    /// Whether users on other servers can join this room.
    #[serde(
        rename = "m.federate",
        default = "crate::serde::default_true",
        skip_serializing_if = "crate::serde::is_true"
    )]
    pub federate: bool,

    /// The version of the room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_version: Option<String>,

    /// A reference to the room this room replaces, if the previous room was
    /// upgraded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predecessor: Option<PreviousRoom>,

    /// The room type; currently only used for spaces.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub room_type: Option<String>,
}

impl Default for CreateContent {
    fn default() -> Self {
        Self { federate: true, room_version: None, predecessor: None, room_type: None }
    }
}

/// A reference to an old room replaced during a room upgrade.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PreviousRoom {
    /// The ID of the old room.
    pub room_id: RoomId,

    /// The event ID of the last known event in the old room.
    pub event_id: EventId,
}
