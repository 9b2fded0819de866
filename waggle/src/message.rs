//! Message and addressing types.
//!
//! This module provides the types exchanged between the coordinator and its
//! worker peers:
//!
//! - [`PeerId`]: small integer identity, `0` reserved for the coordinator
//! - [`Destination`]: stated target of a message, with the send-to-parent sentinel
//! - [`RecvFilter`]: source filter for a receive request
//! - [`ControlTag`]: out-of-band marker selecting special router handling
//! - [`Message`]: the routed unit itself
//!
//! Payloads are opaque [`serde_json::Value`]s; variadic log payloads are JSON
//! arrays of the logged values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a peer.
///
/// Identifiers are assigned by the router, starting at 1 and increasing
/// monotonically. `0` is reserved for the coordinator and is never allocated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct PeerId(pub u32);

impl PeerId {
    /// The coordinator's reserved identifier.
    pub const PARENT: PeerId = PeerId(0);

    /// Whether this is the coordinator's identifier.
    pub const fn is_parent(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stated destination of a message.
///
/// `Parent` is the send-to-parent sentinel (the `-1` of the wire convention):
/// it always resolves to peer 0 before routing, so senders can address the
/// coordinator without knowing anything about identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    /// The coordinator, whoever holds identifier 0.
    Parent,
    /// A specific peer.
    Peer(PeerId),
}

impl Destination {
    /// Resolve to a concrete peer identifier. `Parent` rewrites to id 0.
    pub const fn resolve(&self) -> PeerId {
        match self {
            Destination::Parent => PeerId::PARENT,
            Destination::Peer(id) => *id,
        }
    }
}

/// Source filter carried by a receive request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvFilter {
    /// Any peer except the coordinator (id 0).
    AnyChild,
    /// Exactly this peer.
    From(PeerId),
}

impl RecvFilter {
    /// Whether a message stamped with `source` satisfies this filter.
    pub fn matches(&self, source: PeerId) -> bool {
        match self {
            RecvFilter::AnyChild => !source.is_parent(),
            RecvFilter::From(id) => *id == source,
        }
    }
}

/// Out-of-band control tag selecting special router handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlTag {
    /// Diagnostic output that should surface at the top-level coordinator.
    Log,
    /// Request for a named value from the coordinator's import table.
    Import,
}

/// A routed message.
///
/// `source` is unset by the sender and stamped by the router at ingestion
/// with the true origin identifier; a peer cannot spoof where a message
/// came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Where the message is going.
    pub destination: Destination,

    /// Opaque payload.
    pub data: Value,

    /// True origin, stamped at ingestion. Never trusted from the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PeerId>,

    /// Optional control tag; absent for ordinary data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<ControlTag>,
}

impl Message {
    /// Create an ordinary data message.
    pub fn new(destination: Destination, data: Value) -> Self {
        Self {
            destination,
            data,
            source: None,
            control: None,
        }
    }

    /// Create a message carrying a control tag.
    pub fn with_control(destination: Destination, data: Value, control: ControlTag) -> Self {
        Self {
            destination,
            data,
            source: None,
            control: Some(control),
        }
    }

    /// A diagnostic message addressed to the top-level coordinator.
    ///
    /// The payload is the array of logged values.
    pub fn log(values: Vec<Value>) -> Self {
        Self::with_control(Destination::Parent, Value::Array(values), ControlTag::Log)
    }

    /// A request for a named value from the coordinator's import table.
    ///
    /// The router answers with an ordinary data message back to the sender.
    pub fn import(name: impl Into<String>) -> Self {
        Self::with_control(
            Destination::Parent,
            Value::String(name.into()),
            ControlTag::Import,
        )
    }
}
