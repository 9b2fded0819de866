//! Identity allocation and the live-peer table.

use std::collections::HashMap;

use crate::message::PeerId;
use crate::transport::PeerTransport;

/// Allocates monotonically increasing peer identifiers.
///
/// Identifier 0 is reserved for the coordinator and is never handed out;
/// allocation starts at 1.
#[derive(Debug)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    const FIRST: u32 = 1;

    /// Create an allocator starting at 1.
    pub fn new() -> Self {
        Self { next: Self::FIRST }
    }

    /// Hand out the next identifier.
    pub fn allocate(&mut self) -> PeerId {
        let id = PeerId(self.next);
        self.next += 1;
        id
    }

    /// Reset allocation back to 1.
    ///
    /// Live peers are unaffected. Resetting while peers are still registered
    /// can make future allocations collide with them; callers are expected
    /// to remove live peers first.
    pub fn reset(&mut self) {
        self.next = Self::FIRST;
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Live peers keyed by identifier, each holding its transport capability.
#[derive(Default)]
pub struct PeerTable {
    peers: HashMap<PeerId, Box<dyn PeerTransport>>,
}

impl PeerTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer's transport.
    pub fn insert(&mut self, id: PeerId, transport: Box<dyn PeerTransport>) {
        self.peers.insert(id, transport);
    }

    /// Look up a peer's transport.
    pub fn get(&self, id: PeerId) -> Option<&dyn PeerTransport> {
        self.peers.get(&id).map(Box::as_ref)
    }

    /// Remove a peer, returning its transport for teardown.
    pub fn remove(&mut self, id: PeerId) -> Option<Box<dyn PeerTransport>> {
        self.peers.remove(&id)
    }

    /// Whether a peer is registered.
    pub fn contains(&self, id: PeerId) -> bool {
        self.peers.contains_key(&id)
    }

    /// Number of registered peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether the table holds no peers.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Remove every peer, returning the transports for teardown.
    pub fn drain(&mut self) -> Vec<(PeerId, Box<dyn PeerTransport>)> {
        self.peers.drain().collect()
    }
}
