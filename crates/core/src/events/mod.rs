//! The event model and its wire codec.
//!
//! An event's concrete content type is chosen by two levels of string
//! discriminators: the envelope's `type` selects the content codec, and for
//! `m.room.message` the content's own `msgtype` selects the message variant.
//! Both discriminators may appear at any position in their JSON object, and
//! unknown values never fail a decode; they fall back to the designated
//! unknown variants.

mod content;
pub mod room;

pub use content::EventContent;

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::DecodeError;
use crate::serde::FromRawJson;
use crate::{EventId, TransactionId, UnixMillis, UserId};

use room::redaction::RedactionContent;

pub(crate) fn as_object<'a>(
    json: &'a JsonValue,
    path: &str,
) -> Result<&'a JsonMap<String, JsonValue>, DecodeError> {
    json.as_object().ok_or_else(|| DecodeError::new(path, "not an object"))
}

fn req_str<'a>(map: &'a JsonMap<String, JsonValue>, key: &str) -> Result<&'a str, DecodeError> {
    map.get(key)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| DecodeError::new(key, "missing or not a string"))
}

fn opt_str<'a>(
    map: &'a JsonMap<String, JsonValue>,
    key: &str,
) -> Result<Option<&'a str>, DecodeError> {
    match map.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(_) => Err(DecodeError::new(key, "not a string")),
    }
}

/// An event as delivered in `/sync` timelines, `/sync` state sections and
/// `/messages` chunks.
#[derive(Clone, Debug)]
pub struct ClientEvent {
    /// The globally unique event identifier.
    pub event_id: EventId,

    /// The user who sent this event.
    pub sender: UserId,

    /// Timestamp on the originating homeserver when this event was sent.
    pub origin_server_ts: UnixMillis,

    /// The wire `type` of the event, kept verbatim.
    pub event_type: String,

    /// Present iff this is a state event.
    pub state_key: Option<String>,

    /// The decoded content. `None` iff the event has been redacted.
    pub content: Option<EventContent>,

    /// Data added by the homeserver that is not part of the signed event.
    pub unsigned: Unsigned,
}

impl ClientEvent {
    /// Whether this is a state event.
    pub fn is_state(&self) -> bool {
        self.state_key.is_some()
    }

    /// Whether this event has been redacted.
    pub fn is_redacted(&self) -> bool {
        self.content.is_none() && self.unsigned.redacted_because.is_some()
    }

    /// For `m.room.redaction` events, the ID of the event being redacted.
    pub fn redacts(&self) -> Option<&EventId> {
        match &self.content {
            Some(EventContent::RoomRedaction(redaction)) => redaction.redacts.as_ref(),
            _ => None,
        }
    }
}

impl FromRawJson for ClientEvent {
    fn from_raw_json(json: &JsonValue) -> Result<Self, DecodeError> {
        let map = as_object(json, "")?;

        let event_id = EventId::parse(req_str(map, "event_id")?)
            .map_err(|e| DecodeError::new("event_id", e.to_string()))?;
        let sender = UserId::parse(req_str(map, "sender")?)
            .map_err(|e| DecodeError::new("sender", e.to_string()))?;
        let origin_server_ts = map
            .get("origin_server_ts")
            .and_then(JsonValue::as_u64)
            .map(UnixMillis)
            .ok_or_else(|| DecodeError::new("origin_server_ts", "missing or not an integer"))?;
        let event_type = req_str(map, "type")?.to_owned();
        let state_key = opt_str(map, "state_key")?.map(str::to_owned);

        let unsigned = match map.get("unsigned") {
            None | Some(JsonValue::Null) => Unsigned::default(),
            Some(value) => Unsigned::decode(value, &event_type).map_err(|e| e.nested("unsigned"))?,
        };

        // A redacted event's content has been stripped server-side; decoding
        // the leftover husk would misreport fields as missing.
        let content = if unsigned.redacted_because.is_some() {
            None
        } else {
            let mut content = map
                .get("content")
                .cloned()
                .ok_or_else(|| DecodeError::new("content", "missing"))?;
            // Pre-v11 rooms carry `redacts` on the envelope instead of in the
            // content; fold it in so lookups have one place to go.
            if event_type == "m.room.redaction" {
                if let (Some(obj), Some(redacts)) = (content.as_object_mut(), map.get("redacts")) {
                    obj.entry("redacts").or_insert_with(|| redacts.clone());
                }
            }
            Some(EventContent::decode(&event_type, &content).map_err(|e| e.nested("content"))?)
        };

        Ok(Self { event_id, sender, origin_server_ts, event_type, state_key, content, unsigned })
    }
}

/// A reduced-form state event, delivered with invited and knocked rooms.
#[derive(Clone, Debug)]
pub struct StrippedStateEvent {
    /// The user who sent this event.
    pub sender: UserId,

    /// The wire `type` of the event.
    pub event_type: String,

    /// The state key; always present on stripped state.
    pub state_key: String,

    /// The decoded content.
    pub content: EventContent,
}

impl FromRawJson for StrippedStateEvent {
    fn from_raw_json(json: &JsonValue) -> Result<Self, DecodeError> {
        let map = as_object(json, "")?;
        let sender = UserId::parse(req_str(map, "sender")?)
            .map_err(|e| DecodeError::new("sender", e.to_string()))?;
        let event_type = req_str(map, "type")?.to_owned();
        let state_key = req_str(map, "state_key")?.to_owned();
        let content = map
            .get("content")
            .ok_or_else(|| DecodeError::new("content", "missing"))?;
        let content = EventContent::decode(&event_type, content).map_err(|e| e.nested("content"))?;
        Ok(Self { sender, event_type, state_key, content })
    }
}

/// A typeless event carrying only `type` and raw `content`, as found in
/// account data and ephemeral sections.
#[derive(Clone, Debug)]
pub struct BasicEvent {
    /// The wire `type` of the event.
    pub event_type: String,

    /// The raw content.
    pub content: JsonValue,
}

impl FromRawJson for BasicEvent {
    fn from_raw_json(json: &JsonValue) -> Result<Self, DecodeError> {
        let map = as_object(json, "")?;
        let event_type = req_str(map, "type")?.to_owned();
        let content = map.get("content").cloned().unwrap_or(JsonValue::Null);
        Ok(Self { event_type, content })
    }
}

/// Extra information about an event that is not part of the signed payload.
#[derive(Clone, Debug, Default)]
pub struct Unsigned {
    /// Time in milliseconds since the event was sent, per the local server.
    pub age: Option<i64>,

    /// The client-supplied transaction ID, if this client sent the event.
    pub transaction_id: Option<TransactionId>,

    /// For state events, the content the event replaced. `None` both when
    /// the server omitted it and when it sent an explicit `null`.
    pub prev_content: Option<EventContent>,

    /// The event that redacted this event, if any.
    pub redacted_because: Option<Box<UnsignedRoomRedactionEvent>>,
}

impl Unsigned {
    fn decode(json: &JsonValue, event_type: &str) -> Result<Self, DecodeError> {
        let map = as_object(json, "")?;

        let age = match map.get("age") {
            None | Some(JsonValue::Null) => None,
            Some(v) => Some(v.as_i64().ok_or_else(|| DecodeError::new("age", "not an integer"))?),
        };
        let transaction_id = opt_str(map, "transaction_id")?.map(TransactionId::from);

        let prev_content = match map.get("prev_content") {
            None | Some(JsonValue::Null) => None,
            Some(v) => {
                Some(EventContent::decode(event_type, v).map_err(|e| e.nested("prev_content"))?)
            }
        };

        let redacted_because = match map.get("redacted_because") {
            None | Some(JsonValue::Null) => None,
            Some(v) => Some(Box::new(
                UnsignedRoomRedactionEvent::from_raw_json(v)
                    .map_err(|e| e.nested("redacted_because"))?,
            )),
        };

        Ok(Self { age, transaction_id, prev_content, redacted_because })
    }
}

/// A redaction event as found in `unsigned.redacted_because`.
#[derive(Clone, Debug)]
pub struct UnsignedRoomRedactionEvent {
    /// The redaction reason, if any.
    pub content: RedactionContent,

    /// The ID of the redaction event.
    pub event_id: EventId,

    /// The user who performed the redaction.
    pub sender: UserId,

    /// When the redaction was sent.
    pub origin_server_ts: UnixMillis,
}

impl FromRawJson for UnsignedRoomRedactionEvent {
    fn from_raw_json(json: &JsonValue) -> Result<Self, DecodeError> {
        let map = as_object(json, "")?;
        let event_id = EventId::parse(req_str(map, "event_id")?)
            .map_err(|e| DecodeError::new("event_id", e.to_string()))?;
        let sender = UserId::parse(req_str(map, "sender")?)
            .map_err(|e| DecodeError::new("sender", e.to_string()))?;
        let origin_server_ts = map
            .get("origin_server_ts")
            .and_then(JsonValue::as_u64)
            .map(UnixMillis)
            .ok_or_else(|| DecodeError::new("origin_server_ts", "missing or not an integer"))?;
        let content = match map.get("content") {
            None | Some(JsonValue::Null) => RedactionContent::default(),
            Some(v) => serde_json::from_value(v.clone())
                .map_err(|e| DecodeError::new("content", e.to_string()))?,
        };
        Ok(Self { content, event_id, sender, origin_server_ts })
    }
}
