//! Room state snapshots and the state resolver.
//!
//! A snapshot is a persistent map: folding an event into it produces a new
//! snapshot while every previously handed-out snapshot stays valid. Each
//! timeline event carries the snapshot in force at that event, so sharing
//! must be free.

use imbl::HashMap as PersistentMap;

use fluo_core::events::{ClientEvent, EventContent, StrippedStateEvent};

use crate::error::{Error, Result};

/// The key of one entry of room state: `(type, state_key)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    /// The event type, e.g. `m.room.member`.
    pub event_type: String,

    /// The state key; the empty string for singleton state like the room
    /// name.
    pub state_key: String,
}

impl StateKey {
    pub fn new(event_type: impl Into<String>, state_key: impl Into<String>) -> Self {
        Self { event_type: event_type.into(), state_key: state_key.into() }
    }
}

/// An immutable snapshot of room state.
#[derive(Clone, Debug, Default)]
pub struct StateSnapshot {
    map: PersistentMap<StateKey, EventContent>,
}

impl StateSnapshot {
    /// The empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The content at `(event_type, state_key)`, if present.
    pub fn get(&self, event_type: &str, state_key: &str) -> Option<&EventContent> {
        self.map.get(&StateKey::new(event_type, state_key))
    }

    /// A new snapshot with `key` set to `content`.
    pub fn with(&self, key: StateKey, content: EventContent) -> Self {
        Self { map: self.map.update(key, content) }
    }

    /// A new snapshot with `key` removed.
    pub fn without(&self, key: &StateKey) -> Self {
        Self { map: self.map.without(key) }
    }

    /// The number of state entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the snapshot holds no state.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over all `(key, content)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &EventContent)> {
        self.map.iter()
    }
}

/// An event paired with the state snapshot in force at that event.
///
/// If the event is state-bearing the snapshot already includes it; otherwise
/// it is the state under which the event was accepted.
#[derive(Clone, Debug)]
pub struct EventWithState {
    /// The event.
    pub event: ClientEvent,

    /// The state at this event.
    pub state: StateSnapshot,
}

/// An input to [`resolve`]: either a full client event or stripped state.
#[derive(Clone, Debug)]
pub enum ResolvableEvent {
    /// A full event; emitted with its snapshot.
    Client(ClientEvent),

    /// Stripped state; contributes to the snapshot but is not emitted.
    Stripped(StrippedStateEvent),
}

/// Folds an event stream into state snapshots.
///
/// Forward (`rewind = false`): starting from `prior` (empty if absent), each
/// state-bearing event updates the snapshot at `(type, state_key)`, and each
/// client event is emitted paired with the snapshot current at that point.
///
/// Backward (`rewind = true`): events arrive newest-first, each is emitted
/// with the snapshot still containing it, and afterwards the snapshot
/// *before* the event is reconstructed from `unsigned.prev_content` (absent
/// or null removes the key). Stripped events cannot be rewound; they carry
/// no `unsigned`.
pub fn resolve(
    events: impl IntoIterator<Item = ResolvableEvent>,
    prior: Option<&StateSnapshot>,
    rewind: bool,
) -> Result<(Vec<EventWithState>, StateSnapshot)> {
    let mut snapshot = prior.cloned().unwrap_or_default();
    let mut emitted = Vec::new();

    for event in events {
        match event {
            ResolvableEvent::Client(event) => {
                if rewind {
                    let prev = event.state_key.clone().map(|state_key| {
                        let key = StateKey::new(event.event_type.clone(), state_key);
                        (key, event.unsigned.prev_content.clone())
                    });
                    emitted.push(EventWithState { event, state: snapshot.clone() });
                    if let Some((key, prev_content)) = prev {
                        snapshot = match prev_content {
                            Some(content) => snapshot.with(key, content),
                            None => snapshot.without(&key),
                        };
                    }
                } else {
                    if let Some(state_key) = &event.state_key {
                        let key = StateKey::new(event.event_type.clone(), state_key.clone());
                        snapshot = match &event.content {
                            Some(content) => snapshot.with(key, content.clone()),
                            // A redacted state event leaves no content to
                            // hold; the key is cleared.
                            None => snapshot.without(&key),
                        };
                    }
                    emitted.push(EventWithState { event, state: snapshot.clone() });
                }
            }
            ResolvableEvent::Stripped(event) => {
                if rewind {
                    return Err(Error::InvalidOperation("cannot rewind stripped state events"));
                }
                let key = StateKey::new(event.event_type, event.state_key);
                snapshot = snapshot.with(key, event.content);
            }
        }
    }

    Ok((emitted, snapshot))
}

/// Folds stripped state into a snapshot; nothing is emitted.
pub fn fold_stripped(
    events: impl IntoIterator<Item = StrippedStateEvent>,
    prior: Option<&StateSnapshot>,
) -> StateSnapshot {
    let (_, snapshot) = resolve(
        events.into_iter().map(ResolvableEvent::Stripped),
        prior,
        false,
    )
    .expect("forward resolution of stripped events cannot fail");
    snapshot
}

#[cfg(test)]
mod tests {
    use assert_matches2::assert_matches;
    use serde_json::json;

    use fluo_core::events::ClientEvent;
    use fluo_core::serde::FromRawJson;

    use super::*;

    fn state_event(id: &str, event_type: &str, state_key: &str, content: serde_json::Value, prev: Option<serde_json::Value>) -> ClientEvent {
        let mut json = json!({
            "event_id": id,
            "sender": "@alice:example.org",
            "origin_server_ts": 1_700_000_000_000u64,
            "type": event_type,
            "state_key": state_key,
            "content": content,
        });
        if let Some(prev) = prev {
            json["unsigned"] = json!({ "prev_content": prev });
        }
        ClientEvent::from_raw_json(&json).unwrap()
    }

    fn message_event(id: &str, body: &str) -> ClientEvent {
        ClientEvent::from_raw_json(&json!({
            "event_id": id,
            "sender": "@alice:example.org",
            "origin_server_ts": 1_700_000_000_000u64,
            "type": "m.room.message",
            "content": { "msgtype": "m.text", "body": body },
        }))
        .unwrap()
    }

    #[test]
    fn forward_resolution_pairs_events_with_running_state() {
        let events = vec![
            ResolvableEvent::Client(state_event("$1", "m.room.name", "", json!({ "name": "one" }), None)),
            ResolvableEvent::Client(message_event("$2", "hello")),
            ResolvableEvent::Client(state_event("$3", "m.room.name", "", json!({ "name": "two" }), None)),
        ];

        let (emitted, final_snapshot) = resolve(events, None, false).unwrap();
        assert_eq!(emitted.len(), 3);

        // The first event sees itself applied.
        assert_matches!(emitted[0].state.get("m.room.name", ""), Some(EventContent::RoomName(name)));
        assert_eq!(name.name, "one");

        // The message sees the state in force when it was accepted.
        assert_matches!(emitted[1].state.get("m.room.name", ""), Some(EventContent::RoomName(name)));
        assert_eq!(name.name, "one");

        assert_matches!(final_snapshot.get("m.room.name", ""), Some(EventContent::RoomName(name)));
        assert_eq!(name.name, "two");
    }

    #[test]
    fn snapshots_are_persistent_values() {
        let (emitted, final_snapshot) = resolve(
            vec![
                ResolvableEvent::Client(state_event("$1", "m.room.name", "", json!({ "name": "one" }), None)),
                ResolvableEvent::Client(state_event("$2", "m.room.name", "", json!({ "name": "two" }), None)),
            ],
            None,
            false,
        )
        .unwrap();

        // The snapshot attached to the first event still sees the old value
        // after later folds.
        assert_matches!(emitted[0].state.get("m.room.name", ""), Some(EventContent::RoomName(name)));
        assert_eq!(name.name, "one");
        assert_matches!(final_snapshot.get("m.room.name", ""), Some(EventContent::RoomName(name)));
        assert_eq!(name.name, "two");
    }

    #[test]
    fn rewind_round_trips_forward_resolution() {
        let prior = StateSnapshot::new().with(
            StateKey::new("m.room.topic", ""),
            EventContent::decode("m.room.topic", &json!({ "topic": "base" })).unwrap(),
        );

        let forward_events = vec![
            state_event("$1", "m.room.name", "", json!({ "name": "one" }), None),
            state_event("$2", "m.room.name", "", json!({ "name": "two" }), Some(json!({ "name": "one" }))),
            state_event("$3", "m.room.topic", "", json!({ "topic": "new" }), Some(json!({ "topic": "base" }))),
        ];

        let (emitted, final_snapshot) = resolve(
            forward_events.into_iter().map(ResolvableEvent::Client),
            Some(&prior),
            false,
        )
        .unwrap();

        // Rewind consumes the emitted events newest-first, starting from the
        // forward output snapshot.
        let (_, rewound) = resolve(
            emitted.into_iter().rev().map(|e| ResolvableEvent::Client(e.event)),
            Some(&final_snapshot),
            true,
        )
        .unwrap();

        assert_eq!(rewound.len(), prior.len());
        assert_matches!(rewound.get("m.room.topic", ""), Some(EventContent::RoomTopic(topic)));
        assert_eq!(topic.topic, "base");
        assert!(rewound.get("m.room.name", "").is_none());
    }

    #[test]
    fn rewind_emits_state_still_containing_the_event() {
        let start = StateSnapshot::new().with(
            StateKey::new("m.room.name", ""),
            EventContent::decode("m.room.name", &json!({ "name": "latest" })).unwrap(),
        );

        let (emitted, _) = resolve(
            vec![ResolvableEvent::Client(state_event(
                "$1",
                "m.room.name",
                "",
                json!({ "name": "latest" }),
                Some(json!({ "name": "older" })),
            ))],
            Some(&start),
            true,
        )
        .unwrap();

        assert_matches!(emitted[0].state.get("m.room.name", ""), Some(EventContent::RoomName(name)));
        assert_eq!(name.name, "latest");
    }

    #[test]
    fn rewind_rejects_stripped_events() {
        let stripped = fluo_core::events::StrippedStateEvent::from_raw_json(&json!({
            "sender": "@alice:example.org",
            "type": "m.room.name",
            "state_key": "",
            "content": { "name": "x" },
        }))
        .unwrap();

        let result = resolve(vec![ResolvableEvent::Stripped(stripped)], None, true);
        assert_matches!(result, Err(Error::InvalidOperation(_)));
    }
}
