//! Membership endpoints: `/joined_rooms`, `/rooms/{room_id}/invite`,
//! `/join/{room_id_or_alias}` and `/rooms/{room_id}/leave`.
//!
//! [spec]: https://spec.matrix.org/latest/client-server-api/#room-membership

use serde::{Deserialize, Serialize};

use crate::{RoomId, ServerName, UserId};

/// Response type for the `joined_rooms` endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct JoinedRoomsResBody {
    /// A list of the rooms the user is in, i.e. the rooms whose membership
    /// for the user is `join`.
    pub joined_rooms: Vec<RoomId>,
}

/// Request type for the `invite_user` endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct InviteUserReqBody {
    /// The user to invite.
    pub user_id: UserId,

    /// An optional reason for the invite.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Request type for the `join_room_by_id_or_alias` endpoint.
#[derive(Clone, Debug, Default, Serialize)]
pub struct JoinRoomReqBody {
    /// An optional reason for joining the room.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl JoinRoomReqBody {
    /// The `via` query parameters naming servers to join through.
    pub fn via_query(via: &[ServerName]) -> Vec<(&'static str, String)> {
        via.iter().map(|server| ("via", server.as_str().to_owned())).collect()
    }
}

/// Response type for the `join_room_by_id_or_alias` endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct JoinRoomResBody {
    /// The room that the user joined.
    pub room_id: RoomId,
}

/// Request type for the `leave_room` endpoint.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LeaveRoomReqBody {
    /// An optional reason for leaving the room.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
