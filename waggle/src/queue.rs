//! Per-peer FIFO buffering of not-yet-consumed messages.

use std::collections::{BTreeMap, VecDeque};

use crate::error::RouterError;
use crate::message::{Message, PeerId, RecvFilter};

/// Ordered, unbounded FIFO of buffered messages for a single peer.
#[derive(Debug, Default)]
pub struct InboxQueue {
    items: VecDeque<Message>,
}

impl InboxQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the back.
    pub fn push(&mut self, msg: Message) {
        self.items.push_back(msg);
    }

    /// Remove and return the oldest message, if any.
    pub fn pop(&mut self) -> Option<Message> {
        self.items.pop_front()
    }

    /// Whether the queue holds no messages.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of buffered messages.
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Maps each known peer to its queue of not-yet-consumed messages.
///
/// Exactly one queue exists per known peer at all times: queues are created
/// with peer registration and dropped (buffered messages discarded) with
/// peer removal.
///
/// Backed by a `BTreeMap` so the any-child drain scans queues in ascending
/// identifier order. That scan order is the documented tie-break when
/// several peers have pending data.
#[derive(Debug, Default)]
pub struct InboxMap {
    inboxes: BTreeMap<PeerId, InboxQueue>,
}

impl InboxMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer with a fresh empty queue.
    pub fn register(&mut self, id: PeerId) {
        self.inboxes.insert(id, InboxQueue::new());
    }

    /// Drop a peer's queue, discarding anything still buffered.
    pub fn remove(&mut self, id: PeerId) -> Option<InboxQueue> {
        self.inboxes.remove(&id)
    }

    /// Whether a queue exists for `id`.
    pub fn contains(&self, id: PeerId) -> bool {
        self.inboxes.contains_key(&id)
    }

    /// Buffer a message in its source's queue.
    ///
    /// Returns `false` (message dropped) when the source is not registered.
    pub fn push(&mut self, source: PeerId, msg: Message) -> bool {
        match self.inboxes.get_mut(&source) {
            Some(queue) => {
                queue.push(msg);
                true
            }
            None => false,
        }
    }

    /// Pop the first buffered message satisfying `filter`.
    ///
    /// An `AnyChild` filter scans queues in ascending identifier order,
    /// skipping the coordinator's, and drains at most one message. A
    /// `From` filter pops from exactly that peer's queue and errors if
    /// the peer is unknown.
    pub fn pop_matching(&mut self, filter: RecvFilter) -> Result<Option<Message>, RouterError> {
        match filter {
            RecvFilter::From(id) => {
                let queue = self
                    .inboxes
                    .get_mut(&id)
                    .ok_or(RouterError::UnknownPeer { id })?;
                Ok(queue.pop())
            }
            RecvFilter::AnyChild => {
                for (id, queue) in self.inboxes.iter_mut() {
                    if id.is_parent() {
                        continue;
                    }
                    if let Some(msg) = queue.pop() {
                        return Ok(Some(msg));
                    }
                }
                Ok(None)
            }
        }
    }

    /// Drop every queue and everything buffered in them.
    pub fn clear(&mut self) {
        self.inboxes.clear();
    }
}
