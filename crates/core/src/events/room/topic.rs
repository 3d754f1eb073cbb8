//! The content of an `m.room.topic` event.

use serde::{Deserialize, Serialize};

/// The content of an `m.room.topic` event.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TopicContent {
    /// The topic of the room.
    pub topic: String,
}
