//! The content of an `m.room.redaction` event.

use serde::{Deserialize, Serialize};

use crate::EventId;

/// The content of an `m.room.redaction` event.
///
/// Rooms before version 11 carry `redacts` on the event envelope instead; the
/// envelope decoder folds it in here so there is a single place to look.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RedactionContent {
    /// The ID of the event being redacted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redacts: Option<EventId>,

    /// The reason for the redaction, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
