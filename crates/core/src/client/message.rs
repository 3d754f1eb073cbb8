//! `GET /_matrix/client/v3/rooms/{room_id}/messages` and
//! `PUT /_matrix/client/v3/rooms/{room_id}/send/{event_type}/{txn_id}`
//!
//! [messages]: https://spec.matrix.org/latest/client-server-api/#get_matrixclientv3roomsroomidmessages
//! [send]: https://spec.matrix.org/latest/client-server-api/#put_matrixclientv3roomsroomidsendeventtypetxnid

use serde::Deserialize;

use crate::events::ClientEvent;
use crate::serde::RawJson;
use crate::{Direction, EventId, RoomId};

/// Request type for the `get_message_events` endpoint.
#[derive(Clone, Debug)]
pub struct MessageEventsReqArgs {
    /// The room to get events from.
    pub room_id: RoomId,

    /// The token to start returning events from.
    ///
    /// This token can be obtained from a `prev_batch` token returned for each
    /// room by the sync endpoint, or from a `start` or `end` token returned
    /// by a previous request to this endpoint.
    ///
    /// If this is `None`, the server will return messages from the start or
    /// end of the history visible to the user, depending on `dir`.
    pub from: Option<String>,

    /// The token to stop returning events at.
    pub to: Option<String>,

    /// The direction to return events from.
    pub dir: Direction,

    /// The maximum number of events to return.
    pub limit: Option<usize>,
}

impl MessageEventsReqArgs {
    /// The query parameters in wire order.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("dir", self.dir.as_str().to_owned())];
        if let Some(from) = &self.from {
            query.push(("from", from.clone()));
        }
        if let Some(to) = &self.to {
            query.push(("to", to.clone()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        query
    }
}

/// Response type for the `get_message_events` endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MessageEventsResBody {
    /// The token the pagination starts from.
    #[serde(default)]
    pub start: Option<String>,

    /// The token the pagination ends at.
    ///
    /// Absent when there are no further events in the requested direction.
    #[serde(default)]
    pub end: Option<String>,

    /// A list of room events, in the order of the requested direction.
    #[serde(default)]
    pub chunk: Vec<RawJson<ClientEvent>>,

    /// A list of state events relevant to showing the `chunk`.
    #[serde(default)]
    pub state: Vec<RawJson<ClientEvent>>,
}

/// Response type for the `send_message_event` endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct SendMessageEventResBody {
    /// A unique identifier for the event.
    pub event_id: EventId,
}
