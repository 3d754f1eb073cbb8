//! Gap detection, hole filling, deduplication and redaction, end to end
//! against a scripted transport.

mod support;

use std::time::Duration;

use assert_matches2::assert_matches;
use serde_json::json;

use fluo::TimelinePoint;
use fluo_core::events::EventContent;
use fluo_core::RoomId;

use support::{redaction_event, state_event, sync_response, text_event, MockTransport};

const ROOM: &str = "!r:h";

fn room_id() -> RoomId {
    RoomId::parse(ROOM).unwrap()
}

fn point_labels(points: &[TimelinePoint]) -> Vec<String> {
    points
        .iter()
        .map(|point| match point {
            TimelinePoint::Event(e) => e.event.event_id.as_str().to_owned(),
            TimelinePoint::Hole(h) => {
                format!("hole({}..{})", h.from.as_deref().unwrap_or("-"), h.to.as_deref().unwrap_or("-"))
            }
        })
        .collect()
}

#[tokio::test]
async fn first_sync_without_prior_batch_records_no_hole() {
    let transport = MockTransport::new();
    transport.respond_json(
        200,
        sync_response("b1", ROOM, Some("b0"), vec![text_event("$a", "hi", 1)]),
    );

    let client = support::logged_in_client(transport.clone());
    client.sync(Duration::from_secs(0)).await.unwrap();

    assert_eq!(point_labels(&client.room_timeline_points(&room_id())), ["$a"]);
    assert_eq!(client.next_batch().as_deref(), Some("b1"));
}

#[tokio::test]
async fn gap_between_syncs_becomes_a_hole() {
    let transport = MockTransport::new();
    transport.respond_json(
        200,
        sync_response("b1", ROOM, Some("b0"), vec![text_event("$a", "one", 1)]),
    );
    transport.respond_json(
        200,
        sync_response("b3", ROOM, Some("b2"), vec![text_event("$d", "four", 4)]),
    );

    let client = support::logged_in_client(transport.clone());
    client.sync(Duration::from_secs(0)).await.unwrap();
    client.sync(Duration::from_secs(0)).await.unwrap();

    assert_eq!(
        point_labels(&client.room_timeline_points(&room_id())),
        ["$a", "hole(b1..b2)", "$d"]
    );

    // The second request carried since=b1.
    let syncs = transport.recorded_matching("/sync");
    assert_eq!(syncs.len(), 2);
    assert!(!syncs[0].query.iter().any(|(k, _)| k == "since"));
    assert!(syncs[1].query.contains(&("since".to_owned(), "b1".to_owned())));
    // full_state is the literal lowercase string.
    assert!(syncs[0].query.contains(&("full_state".to_owned(), "false".to_owned())));
}

#[tokio::test]
async fn matching_prev_batch_records_no_hole() {
    let transport = MockTransport::new();
    transport.respond_json(
        200,
        sync_response("b1", ROOM, Some("b0"), vec![text_event("$a", "one", 1)]),
    );
    transport.respond_json(
        200,
        sync_response("b2", ROOM, Some("b1"), vec![text_event("$b", "two", 2)]),
    );

    let client = support::logged_in_client(transport.clone());
    client.sync(Duration::from_secs(0)).await.unwrap();
    client.sync(Duration::from_secs(0)).await.unwrap();

    assert_eq!(point_labels(&client.room_timeline_points(&room_id())), ["$a", "$b"]);
}

#[tokio::test]
async fn traversing_forward_fills_the_hole() {
    let transport = MockTransport::new();
    transport.respond_json(
        200,
        sync_response("b1", ROOM, Some("b0"), vec![text_event("$a", "one", 1)]),
    );
    transport.respond_json(
        200,
        sync_response("b3", ROOM, Some("b2"), vec![text_event("$d", "four", 4)]),
    );
    transport.respond_json(
        200,
        json!({
            "start": "b1",
            "end": "b1.5",
            "chunk": [text_event("$b", "two", 2), text_event("$c", "three", 3)],
            "state": [],
        }),
    );

    let client = support::logged_in_client(transport.clone());
    client.sync(Duration::from_secs(0)).await.unwrap();
    client.sync(Duration::from_secs(0)).await.unwrap();

    let mut first = client.timeline_first(&room_id()).unwrap().unwrap();
    assert_eq!(first.event_id().as_str(), "$a");

    let next = first.next().await.unwrap().unwrap();
    assert_eq!(next.event_id().as_str(), "$b");

    assert_eq!(
        point_labels(&client.room_timeline_points(&room_id())),
        ["$a", "$b", "$c", "hole(b1.5..b2)", "$d"]
    );

    let messages = transport.recorded_matching(&format!("/rooms/{ROOM}/messages"));
    assert_eq!(messages.len(), 1);
    assert!(messages[0].query.contains(&("dir".to_owned(), "f".to_owned())));
    assert!(messages[0].query.contains(&("from".to_owned(), "b1".to_owned())));
    assert!(messages[0].query.contains(&("to".to_owned(), "b2".to_owned())));
}

#[tokio::test]
async fn traversing_backward_fills_the_hole() {
    let transport = MockTransport::new();
    transport.respond_json(
        200,
        sync_response("b1", ROOM, Some("b0"), vec![text_event("$a", "one", 1)]),
    );
    transport.respond_json(
        200,
        sync_response("b3", ROOM, Some("b2"), vec![text_event("$d", "four", 4)]),
    );
    // Backward chunks arrive newest-first.
    transport.respond_json(
        200,
        json!({
            "start": "b2",
            "end": "b1.5",
            "chunk": [text_event("$c", "three", 3), text_event("$b", "two", 2)],
            "state": [],
        }),
    );

    let client = support::logged_in_client(transport.clone());
    client.sync(Duration::from_secs(0)).await.unwrap();
    client.sync(Duration::from_secs(0)).await.unwrap();

    let mut last = client.timeline_last(&room_id()).unwrap().unwrap();
    assert_eq!(last.event_id().as_str(), "$d");

    let previous = last.previous().await.unwrap().unwrap();
    assert_eq!(previous.event_id().as_str(), "$c");

    assert_eq!(
        point_labels(&client.room_timeline_points(&room_id())),
        ["$a", "hole(b1..b1.5)", "$b", "$c", "$d"]
    );

    let messages = transport.recorded_matching(&format!("/rooms/{ROOM}/messages"));
    assert_eq!(messages.len(), 1);
    assert!(messages[0].query.contains(&("dir".to_owned(), "b".to_owned())));
    assert!(messages[0].query.contains(&("from".to_owned(), "b2".to_owned())));
    assert!(messages[0].query.contains(&("to".to_owned(), "b1".to_owned())));
}

#[tokio::test]
async fn empty_chunk_shrinks_the_hole_and_yields_none() {
    let transport = MockTransport::new();
    transport.respond_json(
        200,
        sync_response("b1", ROOM, Some("b0"), vec![text_event("$a", "one", 1)]),
    );
    transport.respond_json(
        200,
        sync_response("b3", ROOM, Some("b2"), vec![text_event("$d", "four", 4)]),
    );
    transport.respond_json(200, json!({ "start": "b1", "end": "b1.9", "chunk": [], "state": [] }));

    let client = support::logged_in_client(transport.clone());
    client.sync(Duration::from_secs(0)).await.unwrap();
    client.sync(Duration::from_secs(0)).await.unwrap();

    let mut first = client.timeline_first(&room_id()).unwrap().unwrap();
    assert!(first.next().await.unwrap().is_none());

    assert_eq!(
        point_labels(&client.room_timeline_points(&room_id())),
        ["$a", "hole(b1.9..b2)", "$d"]
    );
}

#[tokio::test]
async fn next_sync_never_crosses_holes() {
    let transport = MockTransport::new();
    transport.respond_json(
        200,
        sync_response("b1", ROOM, Some("b0"), vec![text_event("$a", "one", 1)]),
    );
    transport.respond_json(
        200,
        sync_response("b3", ROOM, Some("b2"), vec![text_event("$d", "four", 4)]),
    );

    let client = support::logged_in_client(transport.clone());
    client.sync(Duration::from_secs(0)).await.unwrap();
    client.sync(Duration::from_secs(0)).await.unwrap();

    let mut first = client.timeline_first(&room_id()).unwrap().unwrap();
    assert!(first.next_sync().unwrap().is_none());
    // No /messages request was made.
    assert!(transport.recorded_matching("/messages").is_empty());
}

#[tokio::test]
async fn duplicate_events_are_deduplicated_and_handles_heal() {
    let transport = MockTransport::new();
    transport.respond_json(
        200,
        sync_response("b1", ROOM, Some("b0"), vec![text_event("$a", "one", 1)]),
    );
    transport.respond_json(
        200,
        sync_response("b3", ROOM, Some("b2"), vec![text_event("$d", "four", 4)]),
    );
    // The backfill chunk overlaps the live edge: it repeats $d.
    transport.respond_json(
        200,
        json!({
            "start": "b1",
            "end": "b1.5",
            "chunk": [text_event("$b", "two", 2), text_event("$d", "four", 4)],
            "state": [],
        }),
    );

    let client = support::logged_in_client(transport.clone());
    client.sync(Duration::from_secs(0)).await.unwrap();
    client.sync(Duration::from_secs(0)).await.unwrap();

    // Hold a handle to the node that is about to be displaced.
    let mut stale = client.event_by_id(&"$d".try_into().unwrap()).unwrap();

    let mut first = client.timeline_first(&room_id()).unwrap().unwrap();
    first.next().await.unwrap();

    // Exactly one $d point remains.
    let labels = point_labels(&client.room_timeline_points(&room_id()));
    assert_eq!(labels.iter().filter(|l| *l == "$d").count(), 1);
    assert_eq!(labels, ["$a", "$b", "$d", "hole(b1.5..b2)"]);

    // The orphaned handle re-resolves through the index.
    let healed = stale.event().unwrap();
    assert_eq!(healed.event.event_id.as_str(), "$d");
    assert_eq!(
        client.event_by_id(&"$d".try_into().unwrap()).unwrap().event_id().as_str(),
        "$d"
    );
}

#[tokio::test]
async fn redaction_rewrites_target_in_place() {
    let transport = MockTransport::new();
    transport.respond_json(
        200,
        sync_response("b1", ROOM, Some("b0"), vec![text_event("$e1", "x", 1)]),
    );
    transport.respond_json(
        200,
        sync_response("b2", ROOM, Some("b1"), vec![redaction_event("$r", "$e1", 2)]),
    );

    let client = support::logged_in_client(transport.clone());
    client.sync(Duration::from_secs(0)).await.unwrap();

    {
        let points = client.room_timeline_points(&room_id());
        assert_matches!(&points[0], TimelinePoint::Event(e));
        assert_matches!(&e.event.content, Some(EventContent::RoomMessage(_)));
    }

    client.sync(Duration::from_secs(0)).await.unwrap();

    let points = client.room_timeline_points(&room_id());
    assert_eq!(point_labels(&points), ["$e1", "$r"]);

    // Same position, rewritten in place.
    assert_matches!(&points[0], TimelinePoint::Event(redacted));
    assert_eq!(redacted.event.event_id.as_str(), "$e1");
    assert!(redacted.event.content.is_none());
    assert!(redacted.event.is_redacted());
    let because = redacted.event.unsigned.redacted_because.as_ref().unwrap();
    assert_eq!(because.event_id.as_str(), "$r");
}

#[tokio::test]
async fn room_state_follows_the_last_timeline_event() {
    let transport = MockTransport::new();
    transport.respond_json(
        200,
        json!({
            "next_batch": "b1",
            "rooms": { "join": { ROOM: {
                "state": { "events": [
                    state_event("$n0", "m.room.name", "", json!({ "name": "before" }), None, 1),
                ] },
                "timeline": {
                    "events": [
                        state_event("$n1", "m.room.name", "", json!({ "name": "after" }), Some(json!({ "name": "before" })), 2),
                        text_event("$m", "hi", 3),
                    ],
                    "prev_batch": "b0",
                },
            } } },
        }),
    );

    let client = support::logged_in_client(transport.clone());
    client.sync(Duration::from_secs(0)).await.unwrap();

    let state = client.room_state(&room_id()).unwrap();
    assert_matches!(state.get("m.room.name", ""), Some(EventContent::RoomName(name)));
    assert_eq!(name.name, "after");

    // Every event carries the state in force at it.
    let points = client.room_timeline_points(&room_id());
    assert_matches!(&points[0], TimelinePoint::Event(first));
    assert_matches!(first.state.get("m.room.name", ""), Some(EventContent::RoomName(name)));
    assert_eq!(name.name, "after");
}

#[tokio::test]
async fn state_only_sync_sets_state_when_timeline_is_empty() {
    let transport = MockTransport::new();
    transport.respond_json(
        200,
        json!({
            "next_batch": "b1",
            "rooms": { "join": { ROOM: {
                "state": { "events": [
                    state_event("$n0", "m.room.topic", "", json!({ "topic": "t" }), None, 1),
                ] },
            } } },
        }),
    );

    let client = support::logged_in_client(transport.clone());
    client.sync(Duration::from_secs(0)).await.unwrap();

    let state = client.room_state(&room_id()).unwrap();
    assert_matches!(state.get("m.room.topic", ""), Some(EventContent::RoomTopic(topic)));
    assert_eq!(topic.topic, "t");
    assert!(client.room_timeline_points(&room_id()).is_empty());
}

#[tokio::test]
async fn invited_rooms_fold_stripped_state() {
    let transport = MockTransport::new();
    transport.respond_json(
        200,
        json!({
            "next_batch": "b1",
            "rooms": { "invite": { "!inv:h": { "invite_state": { "events": [
                { "sender": "@bob:h", "type": "m.room.name", "state_key": "", "content": { "name": "secret club" } },
                { "sender": "@bob:h", "type": "m.room.member", "state_key": "@alice:h", "content": { "membership": "invite" } },
            ] } } } },
        }),
    );

    let client = support::logged_in_client(transport.clone());
    client.sync(Duration::from_secs(0)).await.unwrap();

    let invited = client.invited_state();
    let room: RoomId = "!inv:h".try_into().unwrap();
    let state = invited.get(&room).unwrap();
    assert_matches!(state.get("m.room.name", ""), Some(EventContent::RoomName(name)));
    assert_eq!(name.name, "secret club");
    assert_matches!(
        state.get("m.room.member", "@alice:h"),
        Some(EventContent::RoomMember(member))
    );
    assert_eq!(member.membership.as_str(), "invite");
}

#[tokio::test]
async fn leaving_a_room_moves_it_with_its_history() {
    let transport = MockTransport::new();
    transport.respond_json(
        200,
        sync_response("b1", ROOM, Some("b0"), vec![text_event("$a", "one", 1)]),
    );
    transport.respond_json(
        200,
        json!({
            "next_batch": "b2",
            "rooms": { "leave": { ROOM: {
                "timeline": {
                    "events": [state_event(
                        "$l", "m.room.member", "@alice:h",
                        json!({ "membership": "leave" }), None, 2,
                    )],
                    "prev_batch": "b1",
                },
            } } },
        }),
    );

    let client = support::logged_in_client(transport.clone());
    client.sync(Duration::from_secs(0)).await.unwrap();
    client.sync(Duration::from_secs(0)).await.unwrap();

    assert!(client.joined_rooms().is_empty());
    assert_eq!(client.left_rooms(), [room_id()]);
    // History survived the move, and the leave event landed after it.
    assert_eq!(point_labels(&client.room_timeline_points(&room_id())), ["$a", "$l"]);

    let state = client.left_room_state(&room_id()).unwrap();
    assert_matches!(
        state.get("m.room.member", "@alice:h"),
        Some(EventContent::RoomMember(member))
    );
    assert_eq!(member.membership.as_str(), "leave");
}

#[tokio::test]
async fn unread_counts_replace_and_threads_merge() {
    let transport = MockTransport::new();
    transport.respond_json(
        200,
        json!({
            "next_batch": "b1",
            "rooms": { "join": { ROOM: {
                "unread_notifications": { "notification_count": 5, "highlight_count": 1 },
                "unread_thread_notifications": {
                    "$t1": { "notification_count": 2 },
                    "$t2": { "notification_count": 3 },
                },
            } } },
        }),
    );
    transport.respond_json(
        200,
        json!({
            "next_batch": "b2",
            "rooms": { "join": { ROOM: {
                "unread_notifications": { "notification_count": 0, "highlight_count": 0 },
                "unread_thread_notifications": {
                    "$t2": { "notification_count": 7 },
                },
            } } },
        }),
    );

    let client = support::logged_in_client(transport.clone());
    client.sync(Duration::from_secs(0)).await.unwrap();
    client.sync(Duration::from_secs(0)).await.unwrap();

    let unread = client.room_unread_notifications(&room_id()).unwrap();
    assert_eq!(unread.notification_count, Some(0));

    let threads = client.room_thread_notifications(&room_id()).unwrap();
    // $t1 persists, $t2 was overwritten by key.
    assert_eq!(threads["$t1"].notification_count, Some(2));
    assert_eq!(threads["$t2"].notification_count, Some(7));
}

#[tokio::test]
async fn send_and_redact_use_fresh_transaction_ids() {
    let transport = MockTransport::new();
    transport.respond_json(200, json!({ "event_id": "$sent" }));
    transport.respond_json(200, json!({ "event_id": "$redaction" }));

    let client = support::logged_in_client(transport.clone());
    let sent = client.send_text_message(&room_id(), "hello").await.unwrap();
    assert_eq!(sent.as_str(), "$sent");

    let redaction =
        client.redact(&room_id(), &sent, Some("mistake".to_owned())).await.unwrap();
    assert_eq!(redaction.as_str(), "$redaction");

    let recorded = transport.recorded();
    assert_eq!(recorded[0].method, "PUT");
    assert!(recorded[0].path.starts_with(&format!("/_matrix/client/v3/rooms/{ROOM}/send/m.room.message/")));
    assert_eq!(
        recorded[0].body.as_ref().unwrap(),
        &json!({ "msgtype": "m.text", "body": "hello" })
    );
    assert_eq!(recorded[1].method, "PUT");
    assert!(recorded[1].path.starts_with(&format!("/_matrix/client/v3/rooms/{ROOM}/redact/$sent/")));

    // Transaction ids are fresh UUIDs, distinct per request.
    let txn = |path: &str| path.rsplit('/').next().unwrap().to_owned();
    assert_ne!(txn(&recorded[0].path), txn(&recorded[1].path));
}

#[tokio::test]
async fn enumerate_forward_walks_across_filled_holes() {
    use futures_util::TryStreamExt;

    let transport = MockTransport::new();
    transport.respond_json(
        200,
        sync_response("b1", ROOM, Some("b0"), vec![text_event("$a", "one", 1)]),
    );
    transport.respond_json(
        200,
        sync_response("b3", ROOM, Some("b2"), vec![text_event("$c", "three", 3)]),
    );
    transport.respond_json(
        200,
        json!({ "start": "b1", "chunk": [text_event("$b", "two", 2)], "state": [] }),
    );

    let client = support::logged_in_client(transport.clone());
    client.sync(Duration::from_secs(0)).await.unwrap();
    client.sync(Duration::from_secs(0)).await.unwrap();

    let events: Vec<_> = client.enumerate_forward(&room_id()).try_collect().await.unwrap();
    let ids: Vec<_> = events.iter().map(|e| e.event.event_id.as_str().to_owned()).collect();
    assert_eq!(ids, ["$a", "$b", "$c"]);
}

#[tokio::test]
async fn unknown_room_has_no_timeline_edges() {
    let transport = MockTransport::new();
    let client = support::logged_in_client(transport);
    assert!(client.timeline_first(&room_id()).unwrap().is_none());
    assert_matches!(
        client.event_by_id(&"$nope".try_into().unwrap()),
        None
    );
}
