//! The client facade: one object tying together session, API surface, the
//! stored room view and the concurrency gates.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures_util::Stream;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::Notify;
use tracing::debug;

use fluo_core::client::message::MessageEventsReqArgs;
use fluo_core::client::redact::RedactEventReqBody;
use fluo_core::client::room::{
    CreateRoomReqBody, InitialStateEvent, RoomPreset, Visibility,
};
use fluo_core::client::sync_events::{
    RoomSummary, SyncEventsReqArgs, UnreadNotificationsCount,
};
use fluo_core::events::room::create::{CreateContent, PreviousRoom};
use fluo_core::events::room::message::MessageContent;
use fluo_core::events::room::power_levels::PowerLevelsContent;
use fluo_core::presence::PresenceContent;
use fluo_core::{
    DecodeError, Direction, EventId, RoomId, RoomOrAliasId, ServerName, TransactionId, UserId,
};
use url::Url;

use crate::api::{Api, Requester};
use crate::error::{with_retry, Error, Result};
use crate::http::{HttpTransport, ReqwestTransport};
use crate::rooms;
use crate::session::{LoginData, Session};
use crate::state::{resolve, EventWithState, ResolvableEvent, StateSnapshot};
use crate::sync::{fill_hole, merge_sync_response, ClientState};
use crate::timeline::{Adjacent, Hole, NodeKey, TimelinePoint};

/// The two condition-variable gates coordinating `/sync` and hole filling.
#[derive(Debug, Default)]
struct Gates {
    /// A `/sync` is in flight.
    syncing: bool,

    /// A hole fill is in flight.
    filling: bool,

    /// Bumped when a sync completes, so collapsed callers know "their"
    /// sync is done.
    sync_epoch: u64,
}

struct ClientInner {
    session: Arc<Session>,
    api: Api,
    state: StdMutex<ClientState>,
    gates: StdMutex<Gates>,
    notify: Notify,
}

/// A Matrix client: login, sending, room lifecycle, and the stateful
/// synchronization engine.
///
/// Cheap to clone; all clones share one session and one stored view.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// A logged-out client for `homeserver`, using the reqwest transport.
    pub fn new(homeserver: Url) -> Self {
        Self::restore(LoginData::new(homeserver), Arc::new(ReqwestTransport::new()))
    }

    /// Resumes a session from persisted [`LoginData`] over the given
    /// transport.
    pub fn restore(data: LoginData, transport: Arc<dyn HttpTransport>) -> Self {
        let requester = Requester::new(data.homeserver.clone(), transport);
        let session = Arc::new(Session::new(requester.clone(), &data));
        let api = Api::new(requester, session.clone());
        Self {
            inner: Arc::new(ClientInner {
                session,
                api,
                state: StdMutex::new(ClientState::default()),
                gates: StdMutex::new(Gates::default()),
                notify: Notify::new(),
            }),
        }
    }

    /// The session: tokens, login state, expiry.
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// The persistable form of the current session.
    pub fn to_login_data(&self) -> LoginData {
        self.inner.session.to_login_data()
    }

    /// Logs in with a username (or full user ID) and password.
    pub async fn password_login(
        &self,
        identifier: impl Into<String>,
        password: impl Into<String>,
        initial_device_display_name: Option<String>,
        device_id: Option<fluo_core::DeviceId>,
    ) -> Result<()> {
        self.inner
            .session
            .password_login(identifier, password, initial_device_display_name, device_id)
            .await
    }

    /// Logs in with a login token.
    pub async fn token_login(
        &self,
        token: impl Into<String>,
        initial_device_display_name: Option<String>,
        device_id: Option<fluo_core::DeviceId>,
    ) -> Result<()> {
        self.inner.session.token_login(token, initial_device_display_name, device_id).await
    }

    // ----- sync ----------------------------------------------------------

    /// Performs one `/sync` with the given long-poll timeout and merges the
    /// response into the stored view.
    ///
    /// Waits for any in-flight hole fill first. If another `sync` is already
    /// running, no second request is issued: this call waits for the running
    /// one to complete and returns, having observed the latest batch either
    /// way.
    pub async fn sync(&self, timeout: Duration) -> Result<()> {
        self.sync_with(SyncEventsReqArgs { timeout: Some(timeout), ..Default::default() }).await
    }

    /// Like [`Client::sync`], with full control over the query parameters.
    ///
    /// `since` is always overwritten with the stored `next_batch`.
    pub async fn sync_with(&self, mut args: SyncEventsReqArgs) -> Result<()> {
        enum Entry {
            Perform,
            Follow(u64),
        }

        let entry = loop {
            // Register for wakeups before inspecting the gates, so a
            // notification between the check and the await is not lost.
            let mut notified = std::pin::pin!(self.inner.notify.notified());
            notified.as_mut().enable();
            {
                let mut gates = self.inner.gates.lock().unwrap();
                if !gates.filling {
                    if gates.syncing {
                        break Entry::Follow(gates.sync_epoch);
                    }
                    gates.syncing = true;
                    break Entry::Perform;
                }
            }
            notified.await;
        };

        match entry {
            Entry::Follow(epoch) => loop {
                let mut notified = std::pin::pin!(self.inner.notify.notified());
                notified.as_mut().enable();
                {
                    let gates = self.inner.gates.lock().unwrap();
                    if gates.sync_epoch != epoch {
                        return Ok(());
                    }
                }
                notified.await;
            },
            Entry::Perform => {
                // Restores the gate on every exit path, cancellation
                // included; a cancelled sync leaves `next_batch` untouched.
                let inner = self.inner.clone();
                let _gate = scopeguard::guard((), move |_| {
                    let mut gates = inner.gates.lock().unwrap();
                    gates.syncing = false;
                    gates.sync_epoch = gates.sync_epoch.wrapping_add(1);
                    inner.notify.notify_waiters();
                });

                args.since = self.inner.state.lock().unwrap().next_batch.clone();
                let response = with_retry(|| self.inner.api.sync(&args)).await?;
                let mut state = self.inner.state.lock().unwrap();
                merge_sync_response(&mut state, &response)
            }
        }
    }

    // ----- sending and room lifecycle ------------------------------------

    /// Sends an event of the given type and returns its event ID.
    ///
    /// The transaction ID is chosen once per call, so server-side
    /// idempotency holds across soft-logout retries.
    pub async fn send_event(
        &self,
        room_id: &RoomId,
        event_type: &str,
        content: &impl Serialize,
    ) -> Result<EventId> {
        let txn_id = TransactionId::new();
        let content = serde_json::to_value(content)
            .map_err(|e| Error::Decode(DecodeError::new("", e.to_string())))?;
        let response =
            with_retry(|| self.inner.api.send_event(room_id, event_type, &txn_id, &content)).await?;
        Ok(response.event_id)
    }

    /// Sends an `m.room.message` event.
    pub async fn send_message(&self, room_id: &RoomId, content: &MessageContent) -> Result<EventId> {
        self.send_event(room_id, "m.room.message", content).await
    }

    /// Sends a plain `m.text` message.
    pub async fn send_text_message(
        &self,
        room_id: &RoomId,
        body: impl Into<String>,
    ) -> Result<EventId> {
        self.send_message(room_id, &MessageContent::text(body)).await
    }

    /// Redacts an event, returning the ID of the redaction event.
    pub async fn redact(
        &self,
        room_id: &RoomId,
        event_id: &EventId,
        reason: Option<String>,
    ) -> Result<EventId> {
        let txn_id = TransactionId::new();
        let body = RedactEventReqBody { reason };
        let response =
            with_retry(|| self.inner.api.redact_event(room_id, event_id, &txn_id, &body)).await?;
        Ok(response.event_id)
    }

    /// Creates a room and returns its ID.
    pub async fn create_room(&self, options: CreateRoomOptions) -> Result<RoomId> {
        let body = options.into_body();
        let response = with_retry(|| self.inner.api.create_room(&body)).await?;
        Ok(response.room_id)
    }

    /// Invites a user into a room.
    pub async fn invite_user(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        reason: Option<String>,
    ) -> Result<()> {
        with_retry(|| self.inner.api.invite_user(room_id, user_id, reason.clone())).await
    }

    /// Joins a room by ID or alias, optionally through the given servers.
    pub async fn join_room(
        &self,
        room_id_or_alias: &RoomOrAliasId,
        reason: Option<String>,
        via: &[ServerName],
    ) -> Result<RoomId> {
        let response =
            with_retry(|| self.inner.api.join_room(room_id_or_alias, reason.clone(), via)).await?;
        Ok(response.room_id)
    }

    /// Leaves a room.
    pub async fn leave_room(&self, room_id: &RoomId, reason: Option<String>) -> Result<()> {
        with_retry(|| self.inner.api.leave_room(room_id, reason.clone())).await
    }

    /// Asks the server for the list of joined rooms.
    ///
    /// Prefer the locally synced [`Client::joined_rooms`]; this endpoint
    /// round-trips to the server on every call.
    pub async fn get_joined_rooms(&self) -> Result<Vec<RoomId>> {
        let response = with_retry(|| self.inner.api.joined_rooms()).await?;
        Ok(response.joined_rooms)
    }

    // ----- stored view accessors -----------------------------------------

    /// The `next_batch` token of the last merged sync.
    pub fn next_batch(&self) -> Option<String> {
        self.inner.state.lock().unwrap().next_batch.clone()
    }

    /// The IDs of all joined rooms in the stored view.
    pub fn joined_rooms(&self) -> Vec<RoomId> {
        self.inner.state.lock().unwrap().joined_rooms.keys().cloned().collect()
    }

    /// The IDs of all left rooms in the stored view.
    pub fn left_rooms(&self) -> Vec<RoomId> {
        self.inner.state.lock().unwrap().left_rooms.keys().cloned().collect()
    }

    /// Stripped state of rooms the user is invited to.
    pub fn invited_state(&self) -> BTreeMap<RoomId, StateSnapshot> {
        self.inner.state.lock().unwrap().invited_state.clone()
    }

    /// Stripped state of rooms the user has knocked on.
    pub fn knock_state(&self) -> BTreeMap<RoomId, StateSnapshot> {
        self.inner.state.lock().unwrap().knock_state.clone()
    }

    /// Latest presence per user.
    pub fn presence_state(&self) -> BTreeMap<UserId, PresenceContent> {
        self.inner.state.lock().unwrap().presence_state.clone()
    }

    /// Global account data, by event type.
    pub fn account_data(&self) -> BTreeMap<String, JsonValue> {
        self.inner.state.lock().unwrap().account_data.clone()
    }

    /// The current state of a joined room.
    pub fn room_state(&self, room_id: &RoomId) -> Option<StateSnapshot> {
        self.inner.state.lock().unwrap().joined_rooms.get(room_id).map(|room| room.state.clone())
    }

    /// The last known state of a left room.
    pub fn left_room_state(&self, room_id: &RoomId) -> Option<StateSnapshot> {
        self.inner.state.lock().unwrap().left_rooms.get(room_id).map(|room| room.state.clone())
    }

    /// The summary of a joined room.
    pub fn room_summary(&self, room_id: &RoomId) -> Option<RoomSummary> {
        self.inner.state.lock().unwrap().joined_rooms.get(room_id).map(|room| room.summary.clone())
    }

    /// A human-readable room name: explicit name, then canonical alias,
    /// then the summary heroes.
    pub fn room_display_name(&self, room_id: &RoomId) -> Option<String> {
        let state = self.inner.state.lock().unwrap();
        let room = state.joined_rooms.get(room_id)?;
        rooms::display_name(&room.state, &room.summary)
    }

    /// Unread notification counts of a joined room.
    pub fn room_unread_notifications(&self, room_id: &RoomId) -> Option<UnreadNotificationsCount> {
        self.inner
            .state
            .lock()
            .unwrap()
            .joined_rooms
            .get(room_id)
            .map(|room| room.unread_notifications)
    }

    /// Per-thread unread notification counts of a joined room.
    pub fn room_thread_notifications(
        &self,
        room_id: &RoomId,
    ) -> Option<BTreeMap<EventId, UnreadNotificationsCount>> {
        self.inner
            .state
            .lock()
            .unwrap()
            .joined_rooms
            .get(room_id)
            .map(|room| room.unread_thread_notifications.clone())
    }

    /// Room account data of a joined room, by event type.
    pub fn room_account_data(&self, room_id: &RoomId) -> Option<BTreeMap<String, JsonValue>> {
        self.inner
            .state
            .lock()
            .unwrap()
            .joined_rooms
            .get(room_id)
            .map(|room| room.account_data.clone())
    }

    /// Ephemeral events of a joined room, by event type.
    pub fn room_ephemeral(&self, room_id: &RoomId) -> Option<BTreeMap<String, JsonValue>> {
        self.inner
            .state
            .lock()
            .unwrap()
            .joined_rooms
            .get(room_id)
            .map(|room| room.ephemeral.clone())
    }

    /// A snapshot of a room's timeline points, holes included. No I/O.
    pub fn room_timeline_points(&self, room_id: &RoomId) -> Vec<TimelinePoint> {
        let state = self.inner.state.lock().unwrap();
        state
            .any_timeline(room_id)
            .map(|timeline| timeline.iter().map(|(_, point)| point.clone()).collect())
            .unwrap_or_default()
    }

    /// A handle to the live node of `event_id`, if the event is known.
    pub fn event_by_id(&self, event_id: &EventId) -> Option<TimelineHandle> {
        let state = self.inner.state.lock().unwrap();
        let location = state.events_by_id.get(event_id)?;
        Some(TimelineHandle {
            client: self.clone(),
            room_id: location.room_id.clone(),
            node: location.node,
            event_id: event_id.clone(),
        })
    }

    // ----- timeline traversal --------------------------------------------

    /// A handle to the first event of a room's timeline, skipping holes.
    pub fn timeline_first(&self, room_id: &RoomId) -> Result<Option<TimelineHandle>> {
        self.timeline_edge(room_id, Direction::Forward)
    }

    /// A handle to the last event of a room's timeline, skipping holes.
    pub fn timeline_last(&self, room_id: &RoomId) -> Result<Option<TimelineHandle>> {
        self.timeline_edge(room_id, Direction::Backward)
    }

    fn timeline_edge(&self, room_id: &RoomId, direction: Direction) -> Result<Option<TimelineHandle>> {
        let state = self.inner.state.lock().unwrap();
        let Some(timeline) = state.any_timeline(room_id) else {
            return Ok(None);
        };
        let key = match direction {
            Direction::Forward => timeline.first_event()?,
            Direction::Backward => timeline.last_event()?,
        };
        Ok(key.map(|key| {
            let event_id = timeline
                .event(key)
                .map(|e| e.event.event_id.clone())
                .expect("edge key is an event");
            TimelineHandle { client: self.clone(), room_id: room_id.clone(), node: key, event_id }
        }))
    }

    /// Lazily walks a room's timeline oldest-to-newest, filling holes on
    /// demand.
    pub fn enumerate_forward(
        &self,
        room_id: &RoomId,
    ) -> impl Stream<Item = Result<EventWithState>> + '_ {
        self.enumerate(room_id.clone(), Direction::Forward)
    }

    /// Lazily walks a room's timeline newest-to-oldest, filling holes on
    /// demand.
    pub fn enumerate_backward(
        &self,
        room_id: &RoomId,
    ) -> impl Stream<Item = Result<EventWithState>> + '_ {
        self.enumerate(room_id.clone(), Direction::Backward)
    }

    fn enumerate(
        &self,
        room_id: RoomId,
        direction: Direction,
    ) -> impl Stream<Item = Result<EventWithState>> + '_ {
        async_stream::try_stream! {
            let mut cursor = self.timeline_edge(&room_id, direction)?;
            while let Some(mut handle) = cursor {
                yield handle.event()?;
                cursor = handle.step(direction, true).await?;
            }
        }
    }

    // ----- hole filling ---------------------------------------------------

    /// Waits for `syncing == false && filling == false`, then claims the
    /// fill gate.
    async fn begin_fill(&self) -> FillGuard {
        loop {
            let mut notified = std::pin::pin!(self.inner.notify.notified());
            notified.as_mut().enable();
            {
                let mut gates = self.inner.gates.lock().unwrap();
                if !gates.syncing && !gates.filling {
                    gates.filling = true;
                    return FillGuard { inner: self.inner.clone() };
                }
            }
            notified.await;
        }
    }

    /// One traversal step from a handle, filling a hole if one is adjacent
    /// and `fill` is set.
    async fn step_handle(
        &self,
        handle: &mut TimelineHandle,
        direction: Direction,
        fill: bool,
    ) -> Result<Option<TimelineHandle>> {
        // Fast path: the neighbor is already materialized.
        match self.adjacent_of(handle, direction)?.1 {
            Adjacent::Event(key) => return Ok(Some(self.handle_at(&handle.room_id, key)?)),
            Adjacent::End => return Ok(None),
            Adjacent::Hole(..) if !fill => return Ok(None),
            Adjacent::Hole(..) => {}
        }

        let _fill_gate = self.begin_fill().await;

        // Re-check under the gate: a concurrent fill may have resolved the
        // hole while we waited.
        let (hole_key, hole, snapshot) = match self.adjacent_of(handle, direction)? {
            (_, Adjacent::Event(key)) => return Ok(Some(self.handle_at(&handle.room_id, key)?)),
            (_, Adjacent::End) => return Ok(None),
            (state_at_handle, Adjacent::Hole(key, hole)) => (key, hole, state_at_handle),
        };

        debug!(
            room_id = %handle.room_id,
            ?direction,
            from = ?hole.from,
            to = ?hole.to,
            "filling timeline hole"
        );

        let args = match direction {
            Direction::Forward => MessageEventsReqArgs {
                room_id: handle.room_id.clone(),
                from: hole.from.clone(),
                to: hole.to.clone(),
                dir: Direction::Forward,
                limit: None,
            },
            Direction::Backward => MessageEventsReqArgs {
                room_id: handle.room_id.clone(),
                from: hole.to.clone(),
                to: hole.from.clone(),
                dir: Direction::Backward,
                limit: None,
            },
        };
        let response = with_retry(|| self.inner.api.room_messages(&args)).await?;

        let mut state = self.inner.state.lock().unwrap();

        // Pre-chunk state: the delivered state events folded onto the state
        // at the handle.
        let state_events = response
            .state
            .iter()
            .map(|raw| Ok(raw.deserialize()?))
            .collect::<Result<Vec<_>>>()?;
        let (_, pre_chunk) = resolve(
            state_events.into_iter().map(ResolvableEvent::Client),
            Some(&snapshot),
            false,
        )?;

        let chunk = response
            .chunk
            .iter()
            .map(|raw| Ok(raw.deserialize()?))
            .collect::<Result<Vec<_>>>()?;
        let chunk_is_empty = chunk.is_empty();

        let (resolved, _) = resolve(
            chunk.into_iter().map(ResolvableEvent::Client),
            Some(&pre_chunk),
            matches!(direction, Direction::Backward),
        )?;

        // Splice in chronological order, with the remaining unfetched range
        // on the far side.
        let (leading, chronological, trailing) = match direction {
            Direction::Forward => {
                let trailing = response
                    .end
                    .as_ref()
                    .map(|end| Hole { from: Some(end.clone()), to: hole.to.clone() });
                (None, resolved, trailing)
            }
            Direction::Backward => {
                let leading = response
                    .end
                    .as_ref()
                    .map(|end| Hole { from: hole.from.clone(), to: Some(end.clone()) });
                let mut chronological = resolved;
                chronological.reverse();
                (leading, chronological, None)
            }
        };

        let located = fill_hole(&mut state, &handle.room_id, hole_key, leading, chronological, trailing)?;

        if chunk_is_empty {
            return Ok(None);
        }
        let nearest = match direction {
            Direction::Forward => located.first(),
            Direction::Backward => located.last(),
        };
        Ok(nearest.map(|(event_id, node)| TimelineHandle {
            client: self.clone(),
            room_id: handle.room_id.clone(),
            node: *node,
            event_id: event_id.clone(),
        }))
    }

    /// Re-resolves a handle (healing orphans) and classifies its neighbor,
    /// returning the state snapshot at the handle alongside.
    fn adjacent_of(
        &self,
        handle: &mut TimelineHandle,
        direction: Direction,
    ) -> Result<(StateSnapshot, Adjacent)> {
        let state = self.inner.state.lock().unwrap();
        heal_handle(&state, handle)?;
        let timeline = state
            .timeline_containing(&handle.room_id, handle.node)
            .ok_or(Error::Internal("handle resolved to a missing timeline"))?;
        let snapshot = timeline
            .event(handle.node)
            .map(|e| e.state.clone())
            .ok_or(Error::Internal("handle does not point at an event"))?;
        let adjacent = timeline.adjacent(handle.node, direction)?;
        Ok((snapshot, adjacent))
    }

    fn handle_at(&self, room_id: &RoomId, key: NodeKey) -> Result<TimelineHandle> {
        let state = self.inner.state.lock().unwrap();
        let timeline = state
            .timeline_containing(room_id, key)
            .ok_or(Error::Internal("timeline vanished"))?;
        let event_id = timeline
            .event(key)
            .map(|e| e.event.event_id.clone())
            .ok_or(Error::Internal("expected an event node"))?;
        Ok(TimelineHandle {
            client: self.clone(),
            room_id: room_id.clone(),
            node: key,
            event_id,
        })
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("session", &self.inner.session).finish_non_exhaustive()
    }
}

/// Clears the `filling` gate on drop, cancellation included.
struct FillGuard {
    inner: Arc<ClientInner>,
}

impl Drop for FillGuard {
    fn drop(&mut self) {
        let mut gates = self.inner.gates.lock().unwrap();
        gates.filling = false;
        self.inner.notify.notify_waiters();
    }
}

/// Re-resolves an orphaned handle through the global event index.
fn heal_handle(state: &ClientState, handle: &mut TimelineHandle) -> Result<()> {
    if state.timeline_containing(&handle.room_id, handle.node).is_some() {
        return Ok(());
    }
    let location = state
        .events_by_id
        .get(&handle.event_id)
        .ok_or(Error::Internal("handle's event is no longer known"))?;
    handle.room_id = location.room_id.clone();
    handle.node = location.node;
    Ok(())
}

/// A handle onto one event node of a timeline.
///
/// Handles stay usable when deduplication displaces their node: the next use
/// re-resolves the event ID through the client's global index.
#[derive(Clone)]
pub struct TimelineHandle {
    client: Client,
    room_id: RoomId,
    node: NodeKey,
    event_id: EventId,
}

impl TimelineHandle {
    /// The ID of the event this handle points at.
    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    /// The room whose timeline holds the event.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// The event and its state snapshot. No I/O; heals orphaned handles.
    pub fn event(&mut self) -> Result<EventWithState> {
        let client = self.client.clone();
        let state = client.inner.state.lock().unwrap();
        heal_handle(&state, self)?;
        state
            .timeline_containing(&self.room_id, self.node)
            .and_then(|timeline| timeline.event(self.node))
            .cloned()
            .ok_or(Error::Internal("handle does not point at an event"))
    }

    /// The next (newer) event, fetching the intervening range if a hole is
    /// in the way. `None` at the live edge of the timeline.
    pub async fn next(&mut self) -> Result<Option<TimelineHandle>> {
        self.step(Direction::Forward, true).await
    }

    /// The previous (older) event, fetching the intervening range if a hole
    /// is in the way. `None` at the start of known history.
    pub async fn previous(&mut self) -> Result<Option<TimelineHandle>> {
        self.step(Direction::Backward, true).await
    }

    /// The next event if it is already materialized; `None` across a hole.
    /// Never performs I/O.
    pub fn next_sync(&mut self) -> Result<Option<TimelineHandle>> {
        self.step_sync(Direction::Forward)
    }

    /// The previous event if it is already materialized; `None` across a
    /// hole. Never performs I/O.
    pub fn previous_sync(&mut self) -> Result<Option<TimelineHandle>> {
        self.step_sync(Direction::Backward)
    }

    pub(crate) async fn step(
        &mut self,
        direction: Direction,
        fill: bool,
    ) -> Result<Option<TimelineHandle>> {
        let client = self.client.clone();
        client.step_handle(self, direction, fill).await
    }

    fn step_sync(&mut self, direction: Direction) -> Result<Option<TimelineHandle>> {
        let client = self.client.clone();
        match client.adjacent_of(self, direction)?.1 {
            Adjacent::Event(key) => Ok(Some(client.handle_at(&self.room_id, key)?)),
            _ => Ok(None),
        }
    }
}

impl std::fmt::Debug for TimelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineHandle")
            .field("room_id", &self.room_id)
            .field("event_id", &self.event_id)
            .finish_non_exhaustive()
    }
}

/// The recognized options of [`Client::create_room`].
#[derive(Debug, Default)]
pub struct CreateRoomOptions {
    /// The room type, e.g. `m.space`.
    pub room_type: Option<String>,

    /// The room version; the server's default when absent.
    pub room_version: Option<String>,

    /// Whether users on other servers can join. Defaults to federated.
    pub federate: Option<bool>,

    /// Users to invite immediately.
    pub invite: Vec<UserId>,

    /// Marks invites as direct-chat invites.
    pub is_direct: bool,

    /// The room name.
    pub name: Option<String>,

    /// State events to install at creation.
    pub initial_state: Vec<InitialStateEvent>,

    /// Overrides for the default power level event.
    pub power_level_content_override: Option<PowerLevelsContent>,

    /// The preset selecting default join rules and history visibility.
    pub preset: Option<RoomPreset>,

    /// The desired local part of the room alias.
    pub room_alias_name: Option<String>,

    /// The room topic.
    pub topic: Option<String>,

    /// Whether the room appears in the published room directory.
    pub visibility: Visibility,

    /// With `predecessor_room_id`, records the room this one replaces.
    /// Ignored unless both are given.
    pub predecessor_event_id: Option<EventId>,

    /// With `predecessor_event_id`, records the room this one replaces.
    /// Ignored unless both are given.
    pub predecessor_room_id: Option<RoomId>,
}

impl CreateRoomOptions {
    fn into_body(self) -> CreateRoomReqBody {
        let predecessor = match (self.predecessor_room_id, self.predecessor_event_id) {
            (Some(room_id), Some(event_id)) => Some(PreviousRoom { room_id, event_id }),
            _ => None,
        };
        let creation_content = CreateContent {
            federate: self.federate.unwrap_or(true),
            room_version: None,
            predecessor,
            room_type: self.room_type,
        };
        let creation_content = (!creation_content.federate
            || creation_content.predecessor.is_some()
            || creation_content.room_type.is_some())
        .then_some(creation_content);

        CreateRoomReqBody {
            creation_content,
            initial_state: self.initial_state,
            invite: self.invite,
            is_direct: self.is_direct,
            name: self.name,
            power_level_content_override: self.power_level_content_override,
            preset: self.preset,
            room_alias_name: self.room_alias_name,
            room_version: self.room_version,
            topic: self.topic,
            visibility: self.visibility,
        }
    }
}
