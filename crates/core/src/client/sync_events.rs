//! `GET /_matrix/client/v3/sync`
//!
//! [spec]: https://spec.matrix.org/latest/client-server-api/#get_matrixclientv3sync

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::events::{BasicEvent, ClientEvent, StrippedStateEvent};
use crate::presence::{PresenceEvent, PresenceState};
use crate::serde::RawJson;
use crate::{EventId, RoomId};

/// Request type for the `sync` endpoint.
#[derive(Clone, Debug, Default)]
pub struct SyncEventsReqArgs {
    /// A filter represented either as its full JSON definition or the ID of
    /// a saved filter.
    pub filter: Option<String>,

    /// A point in time to continue a sync from.
    ///
    /// Should be a token from the `next_batch` field of a previous `/sync`
    /// response.
    pub since: Option<String>,

    /// Controls whether to include the full state for all rooms the user is
    /// a member of.
    pub full_state: bool,

    /// Controls whether the client is automatically marked as online by
    /// polling this API.
    pub set_presence: PresenceState,

    /// The maximum time to poll before returning this request.
    pub timeout: Option<Duration>,
}

impl SyncEventsReqArgs {
    /// The query parameters in wire order.
    ///
    /// `full_state` is sent as the literal strings `"true"`/`"false"`;
    /// homeservers reject Python-style capitalized booleans.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(filter) = &self.filter {
            query.push(("filter", filter.clone()));
        }
        if let Some(since) = &self.since {
            query.push(("since", since.clone()));
        }
        query.push(("full_state", if self.full_state { "true" } else { "false" }.to_owned()));
        query.push(("set_presence", self.set_presence.as_str().to_owned()));
        if let Some(timeout) = self.timeout {
            query.push(("timeout", (timeout.as_millis() as u64).to_string()));
        }
        query
    }
}

/// Response type for the `sync` endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct SyncEventsResBody {
    /// The batch token to supply in the `since` param of the next `/sync`
    /// request.
    pub next_batch: String,

    /// Updates to rooms.
    #[serde(default)]
    pub rooms: Rooms,

    /// Updates to the presence status of other users.
    #[serde(default)]
    pub presence: Presence,

    /// The global private data created by this user.
    #[serde(default)]
    pub account_data: AccountData,
}

/// Updates to rooms.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Rooms {
    /// The rooms that the user has left or been banned from.
    #[serde(default)]
    pub leave: BTreeMap<RoomId, LeftRoom>,

    /// The rooms that the user has joined.
    #[serde(default)]
    pub join: BTreeMap<RoomId, JoinedRoom>,

    /// The rooms that the user has been invited to.
    #[serde(default)]
    pub invite: BTreeMap<RoomId, InvitedRoom>,

    /// The rooms that the user has knocked on.
    #[serde(default)]
    pub knock: BTreeMap<RoomId, KnockedRoom>,
}

/// Updates to joined rooms.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct JoinedRoom {
    /// Information about the room which clients may need to correctly render
    /// it to users.
    #[serde(default)]
    pub summary: RoomSummary,

    /// Counts of unread notifications for this room.
    #[serde(default)]
    pub unread_notifications: UnreadNotificationsCount,

    /// Counts of unread notifications for threads in this room, keyed by the
    /// ID of the thread root.
    #[serde(default)]
    pub unread_thread_notifications: BTreeMap<EventId, UnreadNotificationsCount>,

    /// The timeline of messages and state changes in the room.
    #[serde(default)]
    pub timeline: Timeline,

    /// Updates to the state between the `since` parameter and the start of
    /// the `timeline`.
    #[serde(default)]
    pub state: State,

    /// The private data that this user has attached to this room.
    #[serde(default)]
    pub account_data: AccountData,

    /// The ephemeral events in the room that aren't recorded in the timeline
    /// or state of the room.
    #[serde(default)]
    pub ephemeral: Ephemeral,
}

/// Historical updates to left rooms.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LeftRoom {
    /// The timeline of messages and state changes up to the point when the
    /// user left.
    #[serde(default)]
    pub timeline: Timeline,

    /// The state updates for the room up to the start of the timeline.
    #[serde(default)]
    pub state: State,

    /// The private data that this user has attached to this room.
    #[serde(default)]
    pub account_data: AccountData,
}

/// Updates to a room the user has been invited to.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct InvitedRoom {
    /// The stripped state of the room.
    #[serde(default)]
    pub invite_state: InviteState,
}

/// Updates to a room the user has knocked on.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct KnockedRoom {
    /// The stripped state of the room.
    #[serde(default)]
    pub knock_state: KnockState,
}

/// A list of stripped state events.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct InviteState {
    /// The list of events.
    #[serde(default)]
    pub events: Vec<RawJson<StrippedStateEvent>>,
}

/// A list of stripped state events.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct KnockState {
    /// The list of events.
    #[serde(default)]
    pub events: Vec<RawJson<StrippedStateEvent>>,
}

/// Events in the room.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Timeline {
    /// True if the number of events returned was limited by the `limit` on
    /// the filter.
    #[serde(default)]
    pub limited: bool,

    /// A token that can be supplied to the `from` parameter of the
    /// `/rooms/{room_id}/messages` endpoint.
    #[serde(default)]
    pub prev_batch: Option<String>,

    /// A list of events.
    #[serde(default)]
    pub events: Vec<RawJson<ClientEvent>>,
}

/// State events in the room.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct State {
    /// A list of state events.
    #[serde(default)]
    pub events: Vec<RawJson<ClientEvent>>,
}

/// Private data attached by this user.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AccountData {
    /// A list of events.
    #[serde(default)]
    pub events: Vec<RawJson<BasicEvent>>,
}

/// Ephemeral events not recorded in the timeline or state of the room.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Ephemeral {
    /// A list of events.
    #[serde(default)]
    pub events: Vec<RawJson<BasicEvent>>,
}

/// Updates to the presence status of other users.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Presence {
    /// A list of events.
    #[serde(default)]
    pub events: Vec<RawJson<PresenceEvent>>,
}

/// Information about a room for rendering to clients.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RoomSummary {
    /// Users which can be used to generate a room name if the room does not
    /// have one.
    #[serde(rename = "m.heroes", default, skip_serializing_if = "Vec::is_empty")]
    pub heroes: Vec<String>,

    /// Number of users whose membership status is `join`.
    #[serde(rename = "m.joined_member_count", skip_serializing_if = "Option::is_none")]
    pub joined_member_count: Option<u64>,

    /// Number of users whose membership status is `invite`.
    #[serde(rename = "m.invited_member_count", skip_serializing_if = "Option::is_none")]
    pub invited_member_count: Option<u64>,
}

impl RoomSummary {
    /// Returns true if there are no room summary updates.
    pub fn is_empty(&self) -> bool {
        self.heroes.is_empty()
            && self.joined_member_count.is_none()
            && self.invited_member_count.is_none()
    }
}

/// Counts of unread notifications for a room or thread.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct UnreadNotificationsCount {
    /// The number of unread notifications with the highlight flag set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_count: Option<u64>,

    /// The total number of unread notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_count: Option<u64>,
}

impl UnreadNotificationsCount {
    /// Returns true if there are no notification count updates.
    pub fn is_empty(&self) -> bool {
        self.highlight_count.is_none() && self.notification_count.is_none()
    }
}
