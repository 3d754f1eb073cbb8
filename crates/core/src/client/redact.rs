//! `PUT /_matrix/client/v3/rooms/{room_id}/redact/{event_id}/{txn_id}`
//!
//! [spec]: https://spec.matrix.org/latest/client-server-api/#put_matrixclientv3roomsroomidredacteventidtxnid

use serde::{Deserialize, Serialize};

use crate::EventId;

/// Request type for the `redact_event` endpoint.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RedactEventReqBody {
    /// The reason for the redaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Response type for the `redact_event` endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct RedactEventResBody {
    /// The ID of the redaction event.
    pub event_id: EventId,
}
