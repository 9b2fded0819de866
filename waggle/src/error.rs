//! Error types for router operations.

use crate::message::PeerId;

/// Errors surfaced by router operations.
///
/// Delivery failures are recoverable and reported through [`Router::send`]'s
/// boolean result plus the diagnostic log; the variants here cover the
/// request/lifecycle paths that return `Result`.
///
/// [`Router::send`]: crate::Router::send
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// The operation referenced an identifier with no live peer behind it.
    #[error("unknown peer: {id}")]
    UnknownPeer {
        /// The identifier that was not found in the peer table.
        id: PeerId,
    },

    /// A receive was issued while another receive was still outstanding.
    ///
    /// The router holds at most one pending receive request. The existing
    /// request is left untouched; only the second caller fails.
    #[error("a receive request is already pending")]
    ReceivePending,

    /// The peer's delivery channel is closed (peer already terminated).
    #[error("transport closed")]
    TransportClosed,

    /// The router was torn down while the operation was in flight.
    #[error("router closed")]
    RouterClosed,
}
