//! The sum of event content types the engine understands.

use serde::{Serialize, Serializer};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::DecodeError;

use super::room::create::CreateContent;
use super::room::member::MemberContent;
use super::room::message::MessageContent;
use super::room::name::NameContent;
use super::room::power_levels::PowerLevelsContent;
use super::room::redaction::RedactionContent;
use super::room::topic::TopicContent;

/// Decoded event content, keyed by the envelope's `type`.
///
/// Unknown event types decode to [`EventContent::Unknown`] carrying the raw
/// content; decoding an event never fails because of an unrecognized type.
#[derive(Clone, Debug)]
pub enum EventContent {
    /// `m.room.message`
    RoomMessage(MessageContent),

    /// `m.room.member`
    RoomMember(MemberContent),

    /// `m.room.redaction`
    RoomRedaction(RedactionContent),

    /// `m.room.create`
    RoomCreate(CreateContent),

    /// `m.room.power_levels`
    RoomPowerLevels(PowerLevelsContent),

    /// `m.room.name`
    RoomName(NameContent),

    /// `m.room.topic`
    RoomTopic(TopicContent),

    /// Content of an event type this crate has no schema for.
    Unknown(JsonMap<String, JsonValue>),
}

impl EventContent {
    /// Decodes `content` according to the envelope's `type`.
    pub fn decode(event_type: &str, content: &JsonValue) -> Result<Self, DecodeError> {
        Ok(match event_type {
            "m.room.message" => Self::RoomMessage(MessageContent::decode(content)?),
            "m.room.member" => Self::RoomMember(from_value(content)?),
            "m.room.redaction" => Self::RoomRedaction(from_value(content)?),
            "m.room.create" => Self::RoomCreate(from_value(content)?),
            "m.room.power_levels" => Self::RoomPowerLevels(from_value(content)?),
            "m.room.name" => Self::RoomName(from_value(content)?),
            "m.room.topic" => Self::RoomTopic(from_value(content)?),
            _ => Self::Unknown(super::as_object(content, "")?.clone()),
        })
    }

    /// The content as a JSON value, in the shape it is sent over the wire.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::RoomMessage(c) => c.to_json(),
            Self::RoomMember(c) => to_value(c),
            Self::RoomRedaction(c) => to_value(c),
            Self::RoomCreate(c) => to_value(c),
            Self::RoomPowerLevels(c) => to_value(c),
            Self::RoomName(c) => to_value(c),
            Self::RoomTopic(c) => to_value(c),
            Self::Unknown(map) => JsonValue::Object(map.clone()),
        }
    }
}

impl Serialize for EventContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn from_value<T: serde::de::DeserializeOwned>(content: &JsonValue) -> Result<T, DecodeError> {
    serde_json::from_value(content.clone()).map_err(|e| DecodeError::new("", e.to_string()))
}

fn to_value<T: Serialize>(content: &T) -> JsonValue {
    serde_json::to_value(content).expect("event content serializes to JSON")
}
