//! `POST /_matrix/client/v3/createRoom`
//!
//! [spec]: https://spec.matrix.org/latest/client-server-api/#post_matrixclientv3createroom

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::events::room::create::CreateContent;
use crate::events::room::power_levels::PowerLevelsContent;
use crate::{RoomId, UserId};

/// Request type for the `create_room` endpoint.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CreateRoomReqBody {
    /// Extra keys to be added to the content of the `m.room.create` event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_content: Option<CreationContent>,

    /// List of state events to send to the new room.
    ///
    /// Takes precedence over events set by preset, but gets overridden by
    /// name and topic keys.
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub initial_state: Vec<InitialStateEvent>,

    /// A list of user IDs to invite to the room.
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub invite: Vec<UserId>,

    /// If set, this sets the `is_direct` flag on room invites.
    #[serde(skip_serializing_if = "crate::serde::is_default")]
    pub is_direct: bool,

    /// If this is included, an `m.room.name` event will be sent into the
    /// room to indicate the name of the room.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Power level content to override in the default power level event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_level_content_override: Option<PowerLevelsContent>,

    /// Convenience parameter for setting various default state events based
    /// on a preset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<RoomPreset>,

    /// The desired room alias local part.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_alias_name: Option<String>,

    /// Room version to set for the room.
    ///
    /// Defaults to the homeserver's default if not specified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_version: Option<String>,

    /// If this is included, an `m.room.topic` event will be sent into the
    /// room to indicate the topic for the room.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// Whether the room will be shown in the published room list.
    #[serde(skip_serializing_if = "crate::serde::is_default")]
    pub visibility: Visibility,
}

/// Response type for the `create_room` endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct CreateRoomResBody {
    /// The created room's ID.
    pub room_id: RoomId,
}

/// Extra options to be added to the `m.room.create` event.
///
/// This is the same as the event content struct for `m.room.create`, but
/// without the fields servers fill in themselves.
pub type CreationContent = CreateContent;

/// A state event to send into a newly created room.
#[derive(Clone, Debug, Serialize)]
pub struct InitialStateEvent {
    /// The type of the event.
    #[serde(rename = "type")]
    pub event_type: String,

    /// The state key of the event.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state_key: String,

    /// The content of the event.
    pub content: JsonValue,
}

/// A convenience parameter for setting a few default state events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPreset {
    /// `join_rules` is set to `invite` and `history_visibility` is set to
    /// `shared`.
    PrivateChat,

    /// `join_rules` is set to `public` and `history_visibility` is set to
    /// `shared`.
    PublicChat,

    /// Same as `PrivateChat`, but all initial invitees get the same power
    /// level as the creator.
    TrustedPrivateChat,
}

/// Whether or not a newly created room will be listed in the room directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Indicates that the room will be shown in the published room list.
    Public,

    /// Indicates that the room will not be shown in the published room list.
    #[default]
    Private,
}
