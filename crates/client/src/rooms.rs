//! Per-room stored structures.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use fluo_core::client::sync_events::{RoomSummary, UnreadNotificationsCount};
use fluo_core::events::EventContent;
use fluo_core::EventId;

use crate::state::StateSnapshot;
use crate::timeline::Timeline;

/// Everything the client stores about a joined room.
#[derive(Debug, Default)]
pub(crate) struct JoinedRoomState {
    /// Name-generation data delivered by `/sync`.
    pub summary: RoomSummary,

    /// The gap-tracked timeline.
    pub timeline: Timeline,

    /// The current state of the room.
    ///
    /// Equal to the snapshot of the last timeline event whenever the
    /// timeline has any; otherwise the state most recently delivered by
    /// `/sync`.
    pub state: StateSnapshot,

    /// Room account data, by event type.
    pub account_data: BTreeMap<String, JsonValue>,

    /// Ephemeral events, by event type.
    pub ephemeral: BTreeMap<String, JsonValue>,

    /// Unread notification counts for the main timeline.
    pub unread_notifications: UnreadNotificationsCount,

    /// Unread notification counts per thread root.
    pub unread_thread_notifications: BTreeMap<EventId, UnreadNotificationsCount>,
}

/// Everything the client stores about a left room.
#[derive(Debug, Default)]
pub(crate) struct LeftRoomState {
    /// The timeline up to the point the user left.
    pub timeline: Timeline,

    /// The state of the room as last known.
    pub state: StateSnapshot,

    /// Room account data, by event type.
    pub account_data: BTreeMap<String, JsonValue>,
}

impl From<JoinedRoomState> for LeftRoomState {
    fn from(joined: JoinedRoomState) -> Self {
        Self { timeline: joined.timeline, state: joined.state, account_data: joined.account_data }
    }
}

impl LeftRoomState {
    /// Re-promotes a left room on rejoin, keeping its history.
    pub fn into_joined(self) -> JoinedRoomState {
        JoinedRoomState {
            timeline: self.timeline,
            state: self.state,
            account_data: self.account_data,
            ..Default::default()
        }
    }
}

/// The display name of a room, resolved the way clients are expected to:
/// explicit name, then canonical alias, then the summary heroes.
pub(crate) fn display_name(state: &StateSnapshot, summary: &RoomSummary) -> Option<String> {
    if let Some(EventContent::RoomName(name)) = state.get("m.room.name", "") {
        if !name.name.is_empty() {
            return Some(name.name.clone());
        }
    }
    if let Some(EventContent::Unknown(content)) = state.get("m.room.canonical_alias", "") {
        if let Some(alias) = content.get("alias").and_then(JsonValue::as_str) {
            return Some(alias.to_owned());
        }
    }
    if !summary.heroes.is_empty() {
        return Some(summary.heroes.join(", "));
    }
    None
}
