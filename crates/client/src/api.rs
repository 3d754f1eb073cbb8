//! Thin typed surface over the REST endpoints the engine uses.
//!
//! Every authenticated call fetches its bearer token at dispatch time and
//! maps `M_UNKNOWN_TOKEN` responses through the session, turning soft
//! logouts into [`Error::Retry`] for the retry wrapper upstream.

use std::sync::Arc;

use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::trace;
use url::Url;

use fluo_core::client::membership::{
    InviteUserReqBody, JoinRoomReqBody, JoinRoomResBody, JoinedRoomsResBody, LeaveRoomReqBody,
};
use fluo_core::client::message::{
    MessageEventsReqArgs, MessageEventsResBody, SendMessageEventResBody,
};
use fluo_core::client::redact::{RedactEventReqBody, RedactEventResBody};
use fluo_core::client::room::{CreateRoomReqBody, CreateRoomResBody};
use fluo_core::client::sync_events::{SyncEventsReqArgs, SyncEventsResBody};
use fluo_core::{DecodeError, EventId, MatrixErrorBody, RoomId, RoomOrAliasId, ServerName, TransactionId, UserId};

use crate::error::{Error, Result};
use crate::http::{HttpRequest, HttpTransport};
use crate::session::Session;

/// URL building and raw request dispatch, shared by the session (for the
/// unauthenticated login/refresh endpoints) and the API client.
#[derive(Clone)]
pub(crate) struct Requester {
    homeserver: Url,
    transport: Arc<dyn HttpTransport>,
}

impl Requester {
    pub(crate) fn new(homeserver: Url, transport: Arc<dyn HttpTransport>) -> Self {
        Self { homeserver, transport }
    }

    pub(crate) fn homeserver(&self) -> &Url {
        &self.homeserver
    }

    /// Builds `<homeserver>/_matrix/client/v3/<segments>?<query>`.
    pub(crate) fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.homeserver.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidOperation("homeserver URL cannot be a base"))?
            .pop_if_empty()
            .extend(["_matrix", "client", "v3"])
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Dispatches one request and decodes the response.
    ///
    /// A non-success status with a parseable Matrix error body becomes
    /// [`Error::MatrixApi`]; otherwise [`Error::Http`].
    pub(crate) async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        bearer: Option<String>,
        body: Option<&impl Serialize>,
    ) -> Result<T> {
        let body = body
            .map(|b| serde_json::to_vec(b).map_err(|e| DecodeError::new("", e.to_string())))
            .transpose()?;
        trace!(%method, %url, "dispatching request");

        let response =
            self.transport.execute(HttpRequest { method, url, bearer, body }).await?;

        if (200..300).contains(&response.status) {
            serde_json::from_slice(&response.body)
                .map_err(|e| Error::Decode(DecodeError::new("", e.to_string())))
        } else if let Some(matrix_error) = MatrixErrorBody::from_bytes(&response.body) {
            Err(Error::MatrixApi {
                errcode: matrix_error.errcode,
                error: matrix_error.error,
                http_status: response.status,
                soft_logout: matrix_error.soft_logout,
            })
        } else {
            Err(Error::Http { status: response.status, body: response.body })
        }
    }
}

/// The typed API client.
pub(crate) struct Api {
    requester: Requester,
    session: Arc<Session>,
}

impl Api {
    pub(crate) fn new(requester: Requester, session: Arc<Session>) -> Self {
        Self { requester, session }
    }

    async fn authed<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&impl Serialize>,
    ) -> Result<T> {
        let token = self.session.ensure_access_token().await?;
        match self.requester.request(method, url, Some(token.clone()), body).await {
            Err(e) => match e.is_unknown_token() {
                Some(soft_logout) => {
                    Err(self.session.handle_unknown_token(soft_logout, &token).await)
                }
                None => Err(e),
            },
            ok => ok,
        }
    }

    /// `GET /sync`
    pub(crate) async fn sync(&self, args: &SyncEventsReqArgs) -> Result<SyncEventsResBody> {
        let url = self.requester.endpoint(&["sync"], &args.to_query())?;
        self.authed(Method::GET, url, None::<&()>).await
    }

    /// `GET /joined_rooms`
    pub(crate) async fn joined_rooms(&self) -> Result<JoinedRoomsResBody> {
        let url = self.requester.endpoint(&["joined_rooms"], &[])?;
        self.authed(Method::GET, url, None::<&()>).await
    }

    /// `PUT /rooms/{room_id}/send/{event_type}/{txn_id}`
    pub(crate) async fn send_event(
        &self,
        room_id: &RoomId,
        event_type: &str,
        txn_id: &TransactionId,
        content: &JsonValue,
    ) -> Result<SendMessageEventResBody> {
        let url = self.requester.endpoint(
            &["rooms", room_id.as_str(), "send", event_type, txn_id.as_str()],
            &[],
        )?;
        self.authed(Method::PUT, url, Some(content)).await
    }

    /// `PUT /rooms/{room_id}/redact/{event_id}/{txn_id}`
    pub(crate) async fn redact_event(
        &self,
        room_id: &RoomId,
        event_id: &EventId,
        txn_id: &TransactionId,
        body: &RedactEventReqBody,
    ) -> Result<RedactEventResBody> {
        let url = self.requester.endpoint(
            &["rooms", room_id.as_str(), "redact", event_id.as_str(), txn_id.as_str()],
            &[],
        )?;
        self.authed(Method::PUT, url, Some(body)).await
    }

    /// `GET /rooms/{room_id}/messages`
    pub(crate) async fn room_messages(
        &self,
        args: &MessageEventsReqArgs,
    ) -> Result<MessageEventsResBody> {
        let url = self
            .requester
            .endpoint(&["rooms", args.room_id.as_str(), "messages"], &args.to_query())?;
        self.authed(Method::GET, url, None::<&()>).await
    }

    /// `POST /createRoom`
    pub(crate) async fn create_room(&self, body: &CreateRoomReqBody) -> Result<CreateRoomResBody> {
        let url = self.requester.endpoint(&["createRoom"], &[])?;
        self.authed(Method::POST, url, Some(body)).await
    }

    /// `POST /rooms/{room_id}/invite`
    pub(crate) async fn invite_user(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        reason: Option<String>,
    ) -> Result<()> {
        let url = self.requester.endpoint(&["rooms", room_id.as_str(), "invite"], &[])?;
        let body = InviteUserReqBody { user_id: user_id.clone(), reason };
        let _: JsonValue = self.authed(Method::POST, url, Some(&body)).await?;
        Ok(())
    }

    /// `POST /join/{room_id_or_alias}`
    pub(crate) async fn join_room(
        &self,
        room_id_or_alias: &RoomOrAliasId,
        reason: Option<String>,
        via: &[ServerName],
    ) -> Result<JoinRoomResBody> {
        let query = JoinRoomReqBody::via_query(via);
        let url = self.requester.endpoint(&["join", room_id_or_alias.as_str()], &query)?;
        let body = JoinRoomReqBody { reason };
        self.authed(Method::POST, url, Some(&body)).await
    }

    /// `POST /rooms/{room_id}/leave`
    pub(crate) async fn leave_room(&self, room_id: &RoomId, reason: Option<String>) -> Result<()> {
        let url = self.requester.endpoint(&["rooms", room_id.as_str(), "leave"], &[])?;
        let body = LeaveRoomReqBody { reason };
        let _: JsonValue = self.authed(Method::POST, url, Some(&body)).await?;
        Ok(())
    }
}
