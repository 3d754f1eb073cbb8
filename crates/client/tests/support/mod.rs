//! A scripted in-memory transport: tests enqueue responders, the engine
//! consumes them in request order, and every dispatched request is recorded
//! for assertions.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use fluo::{HttpRequest, HttpResponse, HttpTransport, LoginData};

type Responder = Box<dyn FnOnce(&HttpRequest) -> HttpResponse + Send>;

/// One dispatched request, as recorded for assertions.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: Option<JsonValue>,
}

#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<(Option<Duration>, Responder)>>,
    log: Mutex<Vec<Recorded>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Enqueues a responder for the next unanswered request.
    pub fn respond(&self, f: impl FnOnce(&HttpRequest) -> HttpResponse + Send + 'static) {
        self.script.lock().unwrap().push_back((None, Box::new(f)));
    }

    /// Enqueues a fixed JSON response.
    pub fn respond_json(&self, status: u16, body: JsonValue) {
        self.respond(move |_| json_response(status, &body));
    }

    /// Enqueues a fixed JSON response that arrives after `delay`.
    pub fn respond_json_delayed(&self, delay: Duration, status: u16, body: JsonValue) {
        self.script
            .lock()
            .unwrap()
            .push_back((Some(delay), Box::new(move |_| json_response(status, &body))));
    }

    /// Every request dispatched so far, in order.
    pub fn recorded(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    /// The recorded requests whose path ends with `suffix`.
    pub fn recorded_matching(&self, suffix: &str) -> Vec<Recorded> {
        self.recorded().into_iter().filter(|r| r.path.ends_with(suffix)).collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> fluo::Result<HttpResponse> {
        self.log.lock().unwrap().push(Recorded {
            method: request.method.to_string(),
            path: request.url.path().to_owned(),
            query: request
                .url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
            bearer: request.bearer.clone(),
            body: request.body.as_deref().map(|b| serde_json::from_slice(b).unwrap()),
        });

        let (delay, responder) = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request: {} {}", request.method, request.url));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(responder(&request))
    }
}

pub fn json_response(status: u16, body: &JsonValue) -> HttpResponse {
    HttpResponse { status, body: serde_json::to_vec(body).unwrap() }
}

/// A client restored as already logged in, pointing at the mock transport.
pub fn logged_in_client(transport: Arc<MockTransport>) -> fluo::Client {
    let data = LoginData {
        access_token: Some("A".to_owned()),
        refresh_token: Some("R".to_owned()),
        user_id: "@alice:h".try_into().ok(),
        device_id: "D".try_into().ok(),
        expires_at: None,
        ..LoginData::new("https://h.example".parse().unwrap())
    };
    fluo::Client::restore(data, transport)
}

/// A minimal `m.text` message event.
pub fn text_event(event_id: &str, body: &str, ts: u64) -> JsonValue {
    json!({
        "event_id": event_id,
        "sender": "@alice:h",
        "origin_server_ts": ts,
        "type": "m.room.message",
        "content": { "msgtype": "m.text", "body": body },
    })
}

/// A state event, optionally with `prev_content`.
pub fn state_event(
    event_id: &str,
    event_type: &str,
    state_key: &str,
    content: JsonValue,
    prev_content: Option<JsonValue>,
    ts: u64,
) -> JsonValue {
    let mut event = json!({
        "event_id": event_id,
        "sender": "@alice:h",
        "origin_server_ts": ts,
        "type": event_type,
        "state_key": state_key,
        "content": content,
    });
    if let Some(prev) = prev_content {
        event["unsigned"] = json!({ "prev_content": prev });
    }
    event
}

/// An `m.room.redaction` event.
pub fn redaction_event(event_id: &str, redacts: &str, ts: u64) -> JsonValue {
    json!({
        "event_id": event_id,
        "sender": "@alice:h",
        "origin_server_ts": ts,
        "type": "m.room.redaction",
        "content": { "redacts": redacts },
    })
}

/// A `/sync` response with a single joined room.
pub fn sync_response(
    next_batch: &str,
    room_id: &str,
    prev_batch: Option<&str>,
    timeline_events: Vec<JsonValue>,
) -> JsonValue {
    json!({
        "next_batch": next_batch,
        "rooms": {
            "join": {
                room_id: {
                    "timeline": {
                        "events": timeline_events,
                        "prev_batch": prev_batch,
                        "limited": prev_batch.is_some(),
                    },
                },
            },
        },
    })
}
