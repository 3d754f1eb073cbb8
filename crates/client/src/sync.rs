//! The sync engine: merging one `/sync` response into the stored view.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value as JsonValue;
use tracing::{debug, trace, warn};

use fluo_core::client::sync_events as wire;
use fluo_core::events::{ClientEvent, UnsignedRoomRedactionEvent};
use fluo_core::presence::PresenceContent;
use fluo_core::serde::RawJson;
use fluo_core::{EventId, RoomId, UserId};

use crate::error::Result;
use crate::rooms::{JoinedRoomState, LeftRoomState};
use crate::state::{fold_stripped, resolve, EventWithState, ResolvableEvent, StateSnapshot};
use crate::timeline::{NodeKey, NodeKeyAllocator, Timeline};

/// Where the canonical live node of an event sits.
#[derive(Clone, Debug)]
pub(crate) struct EventLocation {
    /// The room whose timeline holds the node.
    pub room_id: RoomId,

    /// The node inside that timeline.
    pub node: NodeKey,
}

/// All shared mutable state of a client, guarded by the client mutex.
#[derive(Debug, Default)]
pub(crate) struct ClientState {
    /// The `next_batch` of the last merged sync.
    pub next_batch: Option<String>,

    /// Joined rooms.
    pub joined_rooms: BTreeMap<RoomId, JoinedRoomState>,

    /// Left rooms.
    pub left_rooms: BTreeMap<RoomId, LeftRoomState>,

    /// Stripped state of rooms the user is invited to.
    pub invited_state: BTreeMap<RoomId, StateSnapshot>,

    /// Stripped state of rooms the user has knocked on.
    pub knock_state: BTreeMap<RoomId, StateSnapshot>,

    /// Latest presence per user.
    pub presence_state: BTreeMap<UserId, PresenceContent>,

    /// Global account data, by event type.
    pub account_data: BTreeMap<String, JsonValue>,

    /// The global deduplication index: at most one live node per event ID.
    pub events_by_id: HashMap<EventId, EventLocation>,

    /// Node key allocator shared by all timelines.
    pub alloc: NodeKeyAllocator,
}

impl ClientState {
    /// The timeline of `room_id` that actually contains `node`, joined rooms
    /// first.
    pub fn timeline_containing(&self, room_id: &RoomId, node: NodeKey) -> Option<&Timeline> {
        if let Some(room) = self.joined_rooms.get(room_id) {
            if room.timeline.contains(node) {
                return Some(&room.timeline);
            }
        }
        self.left_rooms.get(room_id).map(|room| &room.timeline).filter(|t| t.contains(node))
    }

    pub fn timeline_containing_mut(
        &mut self,
        room_id: &RoomId,
        node: NodeKey,
    ) -> Option<&mut Timeline> {
        if self
            .joined_rooms
            .get(room_id)
            .is_some_and(|room| room.timeline.contains(node))
        {
            return self.joined_rooms.get_mut(room_id).map(|room| &mut room.timeline);
        }
        self.left_rooms
            .get_mut(room_id)
            .map(|room| &mut room.timeline)
            .filter(|t| t.contains(node))
    }

    /// Any timeline of `room_id`, joined rooms first.
    pub fn any_timeline(&self, room_id: &RoomId) -> Option<&Timeline> {
        self.joined_rooms
            .get(room_id)
            .map(|room| &room.timeline)
            .or_else(|| self.left_rooms.get(room_id).map(|room| &room.timeline))
    }
}

/// Registers an event node in the deduplication index.
///
/// If the ID was already registered, the previously registered node is
/// removed from its timeline; handles that referenced it re-resolve through
/// the index on next use.
pub(crate) fn register_event(
    state: &mut ClientState,
    room_id: &RoomId,
    event_id: &EventId,
    node: NodeKey,
) {
    let location = EventLocation { room_id: room_id.clone(), node };
    if let Some(old) = state.events_by_id.insert(event_id.clone(), location) {
        if old.node != node {
            trace!(%event_id, "duplicate event, displacing previously registered node");
            if let Some(timeline) = state.timeline_containing_mut(&old.room_id, old.node) {
                timeline.remove(old.node);
            }
        }
    }
}

/// Applies an `m.room.redaction` to its target, if the target is known.
///
/// The target event is rewritten in place: its content becomes `None` and
/// `unsigned.redacted_because` references the redaction. Node identity and
/// timeline position are untouched.
pub(crate) fn apply_redaction(state: &mut ClientState, redaction: &ClientEvent) {
    let Some(target) = redaction.redacts().cloned() else {
        return;
    };
    let Some(location) = state.events_by_id.get(&target).cloned() else {
        warn!(%target, "redaction for an unknown event");
        return;
    };
    let Some(timeline) = state.timeline_containing_mut(&location.room_id, location.node) else {
        return;
    };
    let Some(target_event) = timeline.event_mut(location.node) else {
        return;
    };
    if target_event.event.is_redacted() {
        return;
    }

    let reason = match redaction.content.as_ref() {
        Some(fluo_core::events::EventContent::RoomRedaction(content)) => content.clone(),
        _ => Default::default(),
    };
    target_event.event.content = None;
    target_event.event.unsigned.redacted_because = Some(Box::new(UnsignedRoomRedactionEvent {
        content: reason,
        event_id: redaction.event_id.clone(),
        sender: redaction.sender.clone(),
        origin_server_ts: redaction.origin_server_ts,
    }));
}

fn decode_client_events(events: &[RawJson<ClientEvent>]) -> Result<Vec<ClientEvent>> {
    events.iter().map(|raw| Ok(raw.deserialize()?)).collect()
}

/// Appends one `/sync` timeline chunk to a room's timeline.
///
/// When the chunk's `prev_batch` differs from the batch the client last
/// synced to, the unknown range in between is recorded as a hole before the
/// new events.
fn merge_timeline(
    alloc: &mut NodeKeyAllocator,
    timeline: &mut Timeline,
    base: &StateSnapshot,
    api_timeline: &wire::Timeline,
    original_batch: Option<&str>,
) -> Result<(StateSnapshot, Vec<(EventId, NodeKey)>)> {
    if let (Some(original), Some(prev_batch)) = (original_batch, api_timeline.prev_batch.as_deref())
    {
        if original != prev_batch {
            trace!(from = original, to = prev_batch, "gap detected, recording hole");
            timeline.push_gap(alloc, Some(original.to_owned()), Some(prev_batch.to_owned()));
        }
    }

    let events = decode_client_events(&api_timeline.events)?;
    let (resolved, snapshot) =
        resolve(events.into_iter().map(ResolvableEvent::Client), Some(base), false)?;

    let mut inserted = Vec::with_capacity(resolved.len());
    for event_with_state in resolved {
        let event_id = event_with_state.event.event_id.clone();
        let node = timeline.push_event(alloc, event_with_state);
        inserted.push((event_id, node));
    }
    Ok((snapshot, inserted))
}

/// Post-insertion bookkeeping shared by sync merge and hole filling:
/// deduplication registration and local redaction application.
pub(crate) fn index_inserted_events(
    state: &mut ClientState,
    room_id: &RoomId,
    inserted: &[(EventId, NodeKey)],
) {
    for (event_id, node) in inserted {
        register_event(state, room_id, event_id, *node);
    }
    // Redactions take effect after registration so a redaction and its
    // target arriving in one chunk resolve in order.
    for (event_id, _) in inserted {
        let Some(location) = state.events_by_id.get(event_id).cloned() else { continue };
        let redaction = state
            .timeline_containing(&location.room_id, location.node)
            .and_then(|timeline| timeline.event(location.node))
            .filter(|e| e.event.redacts().is_some())
            .map(|e| e.event.clone());
        if let Some(event) = redaction {
            apply_redaction(state, &event);
        }
    }
}

/// Merges one `/sync` response.
pub(crate) fn merge_sync_response(
    state: &mut ClientState,
    response: &wire::SyncEventsResBody,
) -> Result<()> {
    let original_batch = state.next_batch.replace(response.next_batch.clone());

    for raw in &response.presence.events {
        let event = raw.deserialize()?;
        state.presence_state.insert(event.sender, event.content);
    }
    for raw in &response.account_data.events {
        let event = raw.deserialize()?;
        state.account_data.insert(event.event_type, event.content);
    }

    for (room_id, invited) in &response.rooms.invite {
        let events = invited
            .invite_state
            .events
            .iter()
            .map(|raw| Ok(raw.deserialize()?))
            .collect::<Result<Vec<_>>>()?;
        let prior = state.invited_state.get(room_id);
        let snapshot = fold_stripped(events, prior);
        state.invited_state.insert(room_id.clone(), snapshot);
    }

    for (room_id, knocked) in &response.rooms.knock {
        let events = knocked
            .knock_state
            .events
            .iter()
            .map(|raw| Ok(raw.deserialize()?))
            .collect::<Result<Vec<_>>>()?;
        let prior = state.knock_state.get(room_id);
        let snapshot = fold_stripped(events, prior);
        state.knock_state.insert(room_id.clone(), snapshot);
    }

    for (room_id, update) in &response.rooms.join {
        merge_joined_room(state, room_id, update, original_batch.as_deref())?;
    }

    for (room_id, update) in &response.rooms.leave {
        merge_left_room(state, room_id, update, original_batch.as_deref())?;
    }

    debug!(
        next_batch = %response.next_batch,
        joined = response.rooms.join.len(),
        left = response.rooms.leave.len(),
        invited = response.rooms.invite.len(),
        "sync response merged"
    );
    Ok(())
}

fn merge_joined_room(
    state: &mut ClientState,
    room_id: &RoomId,
    update: &wire::JoinedRoom,
    original_batch: Option<&str>,
) -> Result<()> {
    // A rejoin after a leave keeps the room's history.
    if !state.joined_rooms.contains_key(room_id) {
        let revived = state.left_rooms.remove(room_id).map(LeftRoomState::into_joined);
        state.joined_rooms.insert(room_id.clone(), revived.unwrap_or_default());
    }

    let inserted;
    {
        let room = state.joined_rooms.get_mut(room_id).expect("just inserted");

        for raw in &update.account_data.events {
            let event = raw.deserialize()?;
            room.account_data.insert(event.event_type, event.content);
        }
        for raw in &update.ephemeral.events {
            let event = raw.deserialize()?;
            room.ephemeral.insert(event.event_type, event.content);
        }
        if !update.summary.is_empty() {
            let summary = &mut room.summary;
            if !update.summary.heroes.is_empty() {
                summary.heroes = update.summary.heroes.clone();
            }
            if update.summary.joined_member_count.is_some() {
                summary.joined_member_count = update.summary.joined_member_count;
            }
            if update.summary.invited_member_count.is_some() {
                summary.invited_member_count = update.summary.invited_member_count;
            }
        }

        // State between the previous sync and the start of the timeline;
        // folded but not emitted anywhere.
        let state_events = decode_client_events(&update.state.events)?;
        let (_, base) = resolve(
            state_events.into_iter().map(ResolvableEvent::Client),
            Some(&room.state),
            false,
        )?;

        let (delivered, new_nodes) = merge_timeline(
            &mut state.alloc,
            &mut room.timeline,
            &base,
            &update.timeline,
            original_batch,
        )?;
        inserted = new_nodes;

        room.state = match room.timeline.last_event_state()? {
            Some(last) => last.state.clone(),
            None => delivered,
        };

        if !update.unread_notifications.is_empty() {
            room.unread_notifications = update.unread_notifications;
        }
        for (thread_root, counts) in &update.unread_thread_notifications {
            room.unread_thread_notifications.insert(thread_root.clone(), *counts);
        }
    }

    index_inserted_events(state, room_id, &inserted);

    // Deduplication may have displaced this room's former last event; the
    // room state invariant is re-established against the final shape.
    if let Some(room) = state.joined_rooms.get_mut(room_id) {
        if let Some(last) = room.timeline.last_event_state()? {
            room.state = last.state.clone();
        }
    }
    Ok(())
}

fn merge_left_room(
    state: &mut ClientState,
    room_id: &RoomId,
    update: &wire::LeftRoom,
    original_batch: Option<&str>,
) -> Result<()> {
    // Leaving demotes the joined entry, keeping its history.
    if !state.left_rooms.contains_key(room_id) {
        let demoted = state.joined_rooms.remove(room_id).map(LeftRoomState::from);
        state.left_rooms.insert(room_id.clone(), demoted.unwrap_or_default());
    } else if let Some(stale) = state.joined_rooms.remove(room_id) {
        // A joined entry next to an existing left entry is stale; evicting
        // its timeline must also evict its index registrations.
        for event_id in stale.timeline.event_ids() {
            state.events_by_id.remove(&event_id);
        }
    }

    let inserted;
    {
        let room = state.left_rooms.get_mut(room_id).expect("just inserted");

        for raw in &update.account_data.events {
            let event = raw.deserialize()?;
            room.account_data.insert(event.event_type, event.content);
        }

        let state_events = decode_client_events(&update.state.events)?;
        let (_, base) = resolve(
            state_events.into_iter().map(ResolvableEvent::Client),
            Some(&room.state),
            false,
        )?;

        let (delivered, new_nodes) = merge_timeline(
            &mut state.alloc,
            &mut room.timeline,
            &base,
            &update.timeline,
            original_batch,
        )?;
        inserted = new_nodes;

        room.state = match room.timeline.last_event_state()? {
            Some(last) => last.state.clone(),
            None => delivered,
        };
    }

    index_inserted_events(state, room_id, &inserted);
    Ok(())
}

/// Resolves and splices the result of a `/messages` call into a hole.
///
/// `chunk_events` must already be in chronological order with matching
/// state snapshots; `leading`/`trailing` are the remaining unfetched ranges.
pub(crate) fn fill_hole(
    state: &mut ClientState,
    room_id: &RoomId,
    hole_key: NodeKey,
    leading: Option<crate::timeline::Hole>,
    chunk_events: Vec<EventWithState>,
    trailing: Option<crate::timeline::Hole>,
) -> Result<Vec<(EventId, NodeKey)>> {
    let inserted = {
        let ClientState { joined_rooms, left_rooms, alloc, .. } = state;
        let timeline = joined_rooms
            .get_mut(room_id)
            .map(|room| &mut room.timeline)
            .filter(|t| t.contains(hole_key))
            .or_else(|| {
                left_rooms
                    .get_mut(room_id)
                    .map(|room| &mut room.timeline)
                    .filter(|t| t.contains(hole_key))
            })
            .ok_or(crate::error::Error::Internal("hole vanished during fill"))?;
        timeline.replace_hole(alloc, hole_key, leading, chunk_events, trailing)?
    };

    let located: Vec<(EventId, NodeKey)> = {
        let timeline = state
            .any_timeline(room_id)
            .ok_or(crate::error::Error::Internal("room vanished during fill"))?;
        inserted
            .iter()
            .filter_map(|key| {
                timeline.event(*key).map(|e| (e.event.event_id.clone(), *key))
            })
            .collect()
    };

    index_inserted_events(state, room_id, &located);
    Ok(located)
}
