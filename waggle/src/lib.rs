//! # Waggle
//!
//! Message router between a coordinating task and an open-ended set of
//! concurrently running worker peers, all co-located on one single-threaded
//! cooperative runtime.
//!
//! This crate provides:
//! - **Router**: inbound dispatch (redirect / import / match / buffer),
//!   fire-and-forget sends, and the peer create/remove/reset lifecycle
//! - **Receive requests**: at most one outstanding "receive from this peer
//!   or from any child" request, buffered per-peer until matched
//! - **WorkerChannel**: the peer-facing handle for consuming delivered
//!   messages and emitting messages back, including identity bootstrap and
//!   the diagnostic log channel
//! - **PeerTransport**: the capability boundary that decouples routing from
//!   the concrete in-process channel transport
//!
//! # Execution model
//!
//! Everything runs on a `tokio` current-thread runtime inside a `LocalSet`.
//! The coordinator suspends only inside [`Router::receive`]; worker peers
//! are independently scheduled local tasks with no shared memory, talking
//! exclusively by message passing. See the [`router`] module documentation
//! for the resumption discipline.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

// =============================================================================
// Modules
// =============================================================================

/// Error types for router operations.
pub mod error;

/// Message and addressing types.
pub mod message;

/// Per-peer FIFO buffering.
pub mod queue;

/// Identity allocation and the live-peer table.
pub mod registry;

/// The router itself.
pub mod router;

/// Task spawning seam for the cooperative run loop.
pub mod task;

/// Transport boundary between the router and its peers.
pub mod transport;

mod macros;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::RouterError;
pub use message::{ControlTag, Destination, Message, PeerId, RecvFilter};
pub use queue::{InboxMap, InboxQueue};
pub use registry::{IdAllocator, PeerTable};
pub use router::{Router, RouterBuilder};
pub use task::{TaskProvider, TokioTaskProvider};
pub use transport::{ChannelTransport, PeerTransport, WorkerChannel};
