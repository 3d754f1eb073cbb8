//! The content of an `m.room.message` event.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map as JsonMap, Value as JsonValue};

use crate::error::DecodeError;
use crate::events::as_object;
use crate::MxcUri;

/// The content of an `m.room.message` event, keyed by its `msgtype`.
///
/// The discriminator may appear anywhere in the content object. Unknown
/// `msgtype`s keep the full raw content in [`MessageContent::Unknown`].
#[derive(Clone, Debug)]
pub enum MessageContent {
    /// `m.text`
    Text(TextMessage),

    /// `m.image`
    Image(ImageMessage),

    /// A message type this crate has no schema for.
    Unknown(UnknownMessage),
}

impl MessageContent {
    /// A plain text message.
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(TextMessage { body: body.into(), formatted_body: None, format: None })
    }

    /// The `body` of the message, for any known message type.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(&text.body),
            Self::Image(image) => Some(&image.body),
            Self::Unknown(unknown) => {
                unknown.data.get("body").and_then(JsonValue::as_str)
            }
        }
    }

    pub(crate) fn decode(content: &JsonValue) -> Result<Self, DecodeError> {
        let map = as_object(content, "")?;
        let msgtype = map
            .get("msgtype")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| DecodeError::new("msgtype", "missing or not a string"))?;
        match msgtype {
            "m.text" => Ok(Self::Text(TextMessage::decode(map)?)),
            "m.image" => Ok(Self::Image(ImageMessage::decode(map)?)),
            _ => Ok(Self::Unknown(UnknownMessage { msgtype: msgtype.to_owned(), data: map.clone() })),
        }
    }

    /// The wire form of the content, with `msgtype` included.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Text(text) => {
                let mut value = serde_json::to_value(text).expect("text message serializes");
                value["msgtype"] = json!("m.text");
                value
            }
            Self::Image(image) => {
                let mut value = serde_json::to_value(image).expect("image message serializes");
                value["msgtype"] = json!("m.image");
                value
            }
            Self::Unknown(unknown) => JsonValue::Object(unknown.data.clone()),
        }
    }
}

impl Serialize for MessageContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// An `m.text` message.
#[derive(Clone, Debug, Serialize)]
pub struct TextMessage {
    /// The body of the message.
    pub body: String,

    /// Formatted alternative to `body`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_body: Option<String>,

    /// The format of `formatted_body`, e.g. `org.matrix.custom.html`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl TextMessage {
    fn decode(map: &JsonMap<String, JsonValue>) -> Result<Self, DecodeError> {
        let body = map
            .get("body")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| DecodeError::new("body", "missing or not a string"))?
            .to_owned();
        let formatted_body = map.get("formatted_body").and_then(JsonValue::as_str).map(str::to_owned);
        let format = map.get("format").and_then(JsonValue::as_str).map(str::to_owned);
        Ok(Self { body, formatted_body, format })
    }
}

/// An `m.image` message.
#[derive(Clone, Debug, Serialize)]
pub struct ImageMessage {
    /// A textual representation of the image.
    pub body: String,

    /// The URL of the image, for unencrypted rooms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<MxcUri>,

    /// Metadata about the image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<ImageInfo>,
}

impl ImageMessage {
    fn decode(map: &JsonMap<String, JsonValue>) -> Result<Self, DecodeError> {
        let body = map
            .get("body")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| DecodeError::new("body", "missing or not a string"))?
            .to_owned();
        let url = match map.get("url") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) => {
                Some(s.parse().map_err(|e: crate::IdParseError| DecodeError::new("url", e.to_string()))?)
            }
            Some(_) => return Err(DecodeError::new("url", "not a string")),
        };
        let info = match map.get("info") {
            None | Some(JsonValue::Null) => None,
            Some(v) => Some(
                serde_json::from_value(v.clone()).map_err(|e| DecodeError::new("info", e.to_string()))?,
            ),
        };
        Ok(Self { body, url, info })
    }
}

/// Metadata about an image.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ImageInfo {
    /// The height of the image in pixels.
    #[serde(rename = "h", default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,

    /// The width of the image in pixels.
    #[serde(rename = "w", default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,

    /// The mimetype of the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,

    /// The size of the image in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A message of a type this crate has no schema for, kept raw.
#[derive(Clone, Debug)]
pub struct UnknownMessage {
    /// The wire `msgtype`.
    pub msgtype: String,

    /// The full raw content, including the discriminator.
    pub data: JsonMap<String, JsonValue>,
}
