//! The per-room timeline: an ordered sequence of events interleaved with
//! explicit holes.
//!
//! A hole carries two pagination tokens and means "more events exist between
//! these"; either end may be open. The structure is a doubly-linked list
//! backed by a key arena, so node identity survives insertions around it and
//! a removed node is observably detached (its key no longer resolves), which
//! is what lets displaced handles heal through the global event index.
//!
//! This module is pure structure; traversal that fills holes over the
//! network lives on the client.

use std::collections::HashMap;

use fluo_core::{Direction, EventId};

use crate::error::{Error, Result};
use crate::state::EventWithState;

/// The identity of one timeline node.
///
/// Keys are unique across all timelines of a client, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeKey(u64);

/// Allocates node keys; one per client.
#[derive(Debug, Default)]
pub(crate) struct NodeKeyAllocator(u64);

impl NodeKeyAllocator {
    fn next_key(&mut self) -> NodeKey {
        self.0 += 1;
        NodeKey(self.0)
    }
}

/// A known-unknown range between two pagination tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hole {
    /// The token at the chronologically earlier edge, if bounded there.
    pub from: Option<String>,

    /// The token at the chronologically later edge, if bounded there.
    pub to: Option<String>,
}

/// One point of a timeline: an event with its state, or a hole.
#[derive(Clone, Debug)]
pub enum TimelinePoint {
    /// An event and the state in force at it.
    Event(EventWithState),

    /// A range of not-yet-fetched events.
    Hole(Hole),
}

impl TimelinePoint {
    /// The event, if this point is one.
    pub fn as_event(&self) -> Option<&EventWithState> {
        match self {
            Self::Event(event) => Some(event),
            Self::Hole(_) => None,
        }
    }

    fn is_hole(&self) -> bool {
        matches!(self, Self::Hole(_))
    }
}

#[derive(Debug)]
struct Node {
    prev: Option<NodeKey>,
    next: Option<NodeKey>,
    point: TimelinePoint,
}

/// What sits next to a node in a given direction.
#[derive(Debug)]
pub(crate) enum Adjacent {
    /// An event node.
    Event(NodeKey),

    /// A hole that would have to be filled to continue.
    Hole(NodeKey, Hole),

    /// The edge of the timeline.
    End,
}

/// A doubly-linked sequence of [`TimelinePoint`]s.
///
/// Invariant: no two adjacent points are both holes. Every mutator below
/// preserves it by coalescing.
#[derive(Debug, Default)]
pub struct Timeline {
    nodes: HashMap<NodeKey, Node>,
    head: Option<NodeKey>,
    tail: Option<NodeKey>,
}

impl Timeline {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is still linked into this timeline.
    pub(crate) fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// The point at `key`, if the node is still linked.
    pub(crate) fn point(&self, key: NodeKey) -> Option<&TimelinePoint> {
        self.nodes.get(&key).map(|node| &node.point)
    }

    /// The event at `key`, if the node is an event.
    pub(crate) fn event(&self, key: NodeKey) -> Option<&EventWithState> {
        self.point(key).and_then(TimelinePoint::as_event)
    }

    pub(crate) fn event_mut(&mut self, key: NodeKey) -> Option<&mut EventWithState> {
        match self.nodes.get_mut(&key).map(|node| &mut node.point) {
            Some(TimelinePoint::Event(event)) => Some(event),
            _ => None,
        }
    }

    /// The key of the first event, skipping leading holes.
    ///
    /// `Ok(None)` for an empty timeline; a timeline consisting only of holes
    /// is a broken invariant.
    pub(crate) fn first_event(&self) -> Result<Option<NodeKey>> {
        self.edge_event(self.head, Direction::Forward)
    }

    /// The key of the last event, skipping trailing holes.
    pub(crate) fn last_event(&self) -> Result<Option<NodeKey>> {
        self.edge_event(self.tail, Direction::Backward)
    }

    fn edge_event(&self, start: Option<NodeKey>, direction: Direction) -> Result<Option<NodeKey>> {
        let Some(start) = start else {
            return Ok(None);
        };
        let mut cursor = Some(start);
        while let Some(key) = cursor {
            let node = self.node(key)?;
            if !node.point.is_hole() {
                return Ok(Some(key));
            }
            cursor = match direction {
                Direction::Forward => node.next,
                Direction::Backward => node.prev,
            };
        }
        Err(Error::Internal("timeline contains only holes"))
    }

    /// The state snapshot of the last event, if any event exists.
    pub(crate) fn last_event_state(&self) -> Result<Option<&EventWithState>> {
        Ok(self.last_event()?.and_then(|key| self.event(key)))
    }

    /// What sits next to `key` in `direction`.
    pub(crate) fn adjacent(&self, key: NodeKey, direction: Direction) -> Result<Adjacent> {
        let node = self.node(key)?;
        let neighbor = match direction {
            Direction::Forward => node.next,
            Direction::Backward => node.prev,
        };
        Ok(match neighbor {
            None => Adjacent::End,
            Some(neighbor_key) => match &self.node(neighbor_key)?.point {
                TimelinePoint::Event(_) => Adjacent::Event(neighbor_key),
                TimelinePoint::Hole(hole) => Adjacent::Hole(neighbor_key, hole.clone()),
            },
        })
    }

    /// Appends an event at the end of the timeline.
    pub(crate) fn push_event(
        &mut self,
        alloc: &mut NodeKeyAllocator,
        event: EventWithState,
    ) -> NodeKey {
        let key = alloc.next_key();
        let node = Node { prev: self.tail, next: None, point: TimelinePoint::Event(event) };
        self.nodes.insert(key, node);
        match self.tail {
            Some(tail) => self.nodes.get_mut(&tail).expect("tail is linked").next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);
        key
    }

    /// Appends a hole `(from, to)` at the end of the timeline.
    ///
    /// If the timeline already ends in a hole the ranges are merged instead,
    /// keeping the earlier edge of the existing hole.
    pub(crate) fn push_gap(
        &mut self,
        alloc: &mut NodeKeyAllocator,
        from: Option<String>,
        to: Option<String>,
    ) {
        if let Some(tail) = self.tail {
            if let Some(Node { point: TimelinePoint::Hole(hole), .. }) = self.nodes.get_mut(&tail) {
                hole.to = to;
                return;
            }
        }
        let key = alloc.next_key();
        let node = Node { prev: self.tail, next: None, point: TimelinePoint::Hole(Hole { from, to }) };
        self.nodes.insert(key, node);
        match self.tail {
            Some(tail) => self.nodes.get_mut(&tail).expect("tail is linked").next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);
    }

    /// Replaces the hole at `hole_key` by, in chronological order: an
    /// optional remaining hole at the earlier edge, the events, and an
    /// optional remaining hole at the later edge.
    ///
    /// Returns the keys of the inserted event nodes, in chronological order.
    pub(crate) fn replace_hole(
        &mut self,
        alloc: &mut NodeKeyAllocator,
        hole_key: NodeKey,
        leading: Option<Hole>,
        events: Vec<EventWithState>,
        trailing: Option<Hole>,
    ) -> Result<Vec<NodeKey>> {
        let hole_node = self.nodes.remove(&hole_key).ok_or(Error::Internal("hole node vanished"))?;
        if !hole_node.point.is_hole() {
            return Err(Error::Internal("replace_hole on an event node"));
        }
        let (before, after) = (hole_node.prev, hole_node.next);

        let mut points: Vec<TimelinePoint> = Vec::with_capacity(events.len() + 2);
        if let Some(hole) = leading {
            points.push(TimelinePoint::Hole(hole));
        }
        points.extend(events.into_iter().map(TimelinePoint::Event));
        if let Some(hole) = trailing {
            points.push(TimelinePoint::Hole(hole));
        }

        let mut inserted = Vec::with_capacity(points.len());
        let mut prev = before;
        for point in points {
            let key = alloc.next_key();
            self.nodes.insert(key, Node { prev, next: None, point });
            match prev {
                Some(prev_key) => {
                    self.nodes.get_mut(&prev_key).expect("prev is linked").next = Some(key)
                }
                None => self.head = Some(key),
            }
            inserted.push(key);
            prev = Some(key);
        }

        // Reconnect the far side.
        match (prev, after) {
            (Some(last), Some(after_key)) => {
                self.nodes.get_mut(&last).expect("last is linked").next = Some(after_key);
                self.nodes.get_mut(&after_key).expect("after is linked").prev = Some(last);
            }
            (Some(last), None) => {
                self.nodes.get_mut(&last).expect("last is linked").next = None;
                self.tail = Some(last);
            }
            (None, Some(after_key)) => {
                self.head = Some(after_key);
                self.nodes.get_mut(&after_key).expect("after is linked").prev = None;
            }
            (None, None) => {
                self.head = None;
                self.tail = None;
            }
        }

        let event_keys = inserted
            .into_iter()
            .filter(|key| !self.nodes[key].point.is_hole())
            .collect();
        Ok(event_keys)
    }

    /// Unlinks the node at `key`, e.g. because its event was displaced by a
    /// duplicate.
    ///
    /// If the removal leaves two holes adjacent they are merged into one
    /// spanning range.
    pub(crate) fn remove(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.remove(&key) else {
            return;
        };
        match node.prev {
            Some(prev) => self.nodes.get_mut(&prev).expect("prev is linked").next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.nodes.get_mut(&next).expect("next is linked").prev = node.prev,
            None => self.tail = node.prev,
        }

        if let (Some(prev), Some(next)) = (node.prev, node.next) {
            let prev_is_hole = self.nodes[&prev].point.is_hole();
            let next_is_hole = self.nodes[&next].point.is_hole();
            if prev_is_hole && next_is_hole {
                let to = match &self.nodes[&next].point {
                    TimelinePoint::Hole(hole) => hole.to.clone(),
                    TimelinePoint::Event(_) => unreachable!(),
                };
                if let TimelinePoint::Hole(hole) =
                    &mut self.nodes.get_mut(&prev).expect("prev is linked").point
                {
                    hole.to = to;
                }
                self.remove(next);
            }
        }
    }

    /// Iterates over all points in order, without any I/O.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (NodeKey, &TimelinePoint)> {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let key = cursor?;
            let node = self.nodes.get(&key)?;
            cursor = node.next;
            Some((key, &node.point))
        })
    }

    /// Iterates over the events in order, skipping holes, without any I/O.
    pub(crate) fn iter_events(&self) -> impl Iterator<Item = (NodeKey, &EventWithState)> {
        self.iter().filter_map(|(key, point)| point.as_event().map(|event| (key, event)))
    }

    /// The event IDs of all event nodes, used when a whole timeline is
    /// evicted.
    pub(crate) fn event_ids(&self) -> Vec<EventId> {
        self.iter_events().map(|(_, event)| event.event.event_id.clone()).collect()
    }

    fn node(&self, key: NodeKey) -> Result<&Node> {
        self.nodes.get(&key).ok_or(Error::Internal("timeline node vanished"))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches2::assert_matches;
    use serde_json::json;

    use fluo_core::events::ClientEvent;
    use fluo_core::serde::FromRawJson;

    use super::*;
    use crate::state::StateSnapshot;

    fn new_event(event_id: &str) -> EventWithState {
        let event = ClientEvent::from_raw_json(&json!({
            "event_id": event_id,
            "sender": "@mnt_io:example.org",
            "origin_server_ts": 1_700_000_000_000u64,
            "type": "m.room.message",
            "content": { "msgtype": "m.text", "body": "" },
        }))
        .unwrap();
        EventWithState { event, state: StateSnapshot::new() }
    }

    fn ids(timeline: &Timeline) -> Vec<String> {
        timeline
            .iter()
            .map(|(_, point)| match point {
                TimelinePoint::Event(e) => e.event.event_id.as_str().to_owned(),
                TimelinePoint::Hole(h) => {
                    format!("hole({:?},{:?})", h.from.as_deref(), h.to.as_deref())
                }
            })
            .collect()
    }

    #[test]
    fn push_events_keeps_order() {
        let mut alloc = NodeKeyAllocator::default();
        let mut timeline = Timeline::new();
        timeline.push_event(&mut alloc, new_event("$ev0"));
        timeline.push_event(&mut alloc, new_event("$ev1"));
        assert_eq!(ids(&timeline), ["$ev0", "$ev1"]);
    }

    #[test]
    fn first_and_last_skip_holes() {
        let mut alloc = NodeKeyAllocator::default();
        let mut timeline = Timeline::new();
        timeline.push_event(&mut alloc, new_event("$ev0"));
        timeline.push_gap(&mut alloc, Some("a".into()), Some("b".into()));
        timeline.push_event(&mut alloc, new_event("$ev1"));
        timeline.push_gap(&mut alloc, Some("c".into()), None);

        let first = timeline.first_event().unwrap().unwrap();
        let last = timeline.last_event().unwrap().unwrap();
        assert_eq!(timeline.event(first).unwrap().event.event_id.as_str(), "$ev0");
        assert_eq!(timeline.event(last).unwrap().event.event_id.as_str(), "$ev1");
    }

    #[test]
    fn holes_only_timeline_is_internal_error() {
        let mut alloc = NodeKeyAllocator::default();
        let mut timeline = Timeline::new();
        timeline.push_gap(&mut alloc, Some("a".into()), Some("b".into()));
        assert_matches!(timeline.first_event(), Err(Error::Internal(_)));
    }

    #[test]
    fn empty_timeline_has_no_first() {
        let timeline = Timeline::new();
        assert_matches!(timeline.first_event(), Ok(None));
    }

    #[test]
    fn pushing_gap_onto_trailing_hole_coalesces() {
        let mut alloc = NodeKeyAllocator::default();
        let mut timeline = Timeline::new();
        timeline.push_event(&mut alloc, new_event("$ev0"));
        timeline.push_gap(&mut alloc, Some("b1".into()), Some("b2".into()));
        timeline.push_gap(&mut alloc, Some("b2'".into()), Some("b3".into()));

        assert_eq!(ids(&timeline), ["$ev0", "hole(Some(\"b1\"),Some(\"b3\"))"]);
    }

    #[test]
    fn replace_hole_with_events_and_trailing_hole() {
        let mut alloc = NodeKeyAllocator::default();
        let mut timeline = Timeline::new();
        timeline.push_event(&mut alloc, new_event("$ev0"));
        timeline.push_gap(&mut alloc, Some("b1".into()), Some("b2".into()));
        timeline.push_event(&mut alloc, new_event("$ev3"));

        let hole_key = timeline
            .iter()
            .find_map(|(key, point)| point.as_event().is_none().then_some(key))
            .unwrap();

        let inserted = timeline
            .replace_hole(
                &mut alloc,
                hole_key,
                None,
                vec![new_event("$ev1"), new_event("$ev2")],
                Some(Hole { from: Some("b1.5".into()), to: Some("b2".into()) }),
            )
            .unwrap();

        assert_eq!(inserted.len(), 2);
        assert_eq!(
            ids(&timeline),
            ["$ev0", "$ev1", "$ev2", "hole(Some(\"b1.5\"),Some(\"b2\"))", "$ev3"]
        );
    }

    #[test]
    fn replace_hole_with_nothing_just_removes_it() {
        let mut alloc = NodeKeyAllocator::default();
        let mut timeline = Timeline::new();
        timeline.push_event(&mut alloc, new_event("$ev0"));
        timeline.push_gap(&mut alloc, Some("b1".into()), Some("b2".into()));
        timeline.push_event(&mut alloc, new_event("$ev1"));

        let hole_key = timeline
            .iter()
            .find_map(|(key, point)| point.as_event().is_none().then_some(key))
            .unwrap();
        let inserted = timeline.replace_hole(&mut alloc, hole_key, None, vec![], None).unwrap();

        assert!(inserted.is_empty());
        assert_eq!(ids(&timeline), ["$ev0", "$ev1"]);
    }

    #[test]
    fn removing_an_event_between_holes_merges_them() {
        let mut alloc = NodeKeyAllocator::default();
        let mut timeline = Timeline::new();
        timeline.push_event(&mut alloc, new_event("$ev0"));
        timeline.push_gap(&mut alloc, Some("a".into()), Some("b".into()));
        let middle = timeline.push_event(&mut alloc, new_event("$ev1"));
        timeline.push_gap(&mut alloc, Some("c".into()), Some("d".into()));
        timeline.push_event(&mut alloc, new_event("$ev2"));

        timeline.remove(middle);

        assert_eq!(ids(&timeline), ["$ev0", "hole(Some(\"a\"),Some(\"d\"))", "$ev2"]);
        // No two adjacent holes anywhere.
        let mut previous_was_hole = false;
        for (_, point) in timeline.iter() {
            let is_hole = point.as_event().is_none();
            assert!(!(previous_was_hole && is_hole));
            previous_was_hole = is_hole;
        }
    }

    #[test]
    fn removed_nodes_are_detached() {
        let mut alloc = NodeKeyAllocator::default();
        let mut timeline = Timeline::new();
        let key = timeline.push_event(&mut alloc, new_event("$ev0"));
        assert!(timeline.contains(key));
        timeline.remove(key);
        assert!(!timeline.contains(key));
        assert_matches!(timeline.first_event(), Ok(None));
    }
}
