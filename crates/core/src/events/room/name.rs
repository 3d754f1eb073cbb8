//! The content of an `m.room.name` event.

use serde::{Deserialize, Serialize};

/// The content of an `m.room.name` event.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct NameContent {
    /// The name of the room.
    pub name: String,
}
