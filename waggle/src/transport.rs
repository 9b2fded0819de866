//! Transport boundary between the router and its peers.
//!
//! The router never talks to a peer directly; it holds a [`PeerTransport`]
//! capability per live peer and posts messages through it. The concrete
//! implementation here, [`ChannelTransport`], runs over in-process unbounded
//! channels and optionally owns the peer's task so termination can stop it.
//!
//! [`WorkerChannel`] is the other side of that boundary: the handle a worker
//! task uses to consume delivered messages and emit messages back toward the
//! router.

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::RouterError;
use crate::message::{Message, PeerId};

/// Capability the router holds for each live peer.
///
/// Implementations queue messages for asynchronous delivery; `deliver` must
/// preserve the caller's order per peer (FIFO per destination).
pub trait PeerTransport {
    /// Queue a message for asynchronous delivery to the peer.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::TransportClosed`] when the peer can no longer
    /// accept messages (already terminated). Recoverable; the router reports
    /// it rather than crashing.
    fn deliver(&self, msg: Message) -> Result<(), RouterError>;

    /// Tear the peer down: stop its task and close its delivery channel.
    fn terminate(&mut self);
}

/// Transport over an in-process unbounded channel.
///
/// Optionally owns the peer task's join handle so [`terminate`] can abort it.
/// The channel's own FIFO order provides the per-destination ordering
/// guarantee.
///
/// [`terminate`]: PeerTransport::terminate
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Message>,
    task: Option<JoinHandle<()>>,
}

impl ChannelTransport {
    /// Wrap a bare sender, with no task to stop on termination.
    ///
    /// Used for the coordinator's own outer channel (peer 0), whose far end
    /// is owned by the embedder.
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { tx, task: None }
    }

    /// Wrap a sender together with the peer task it feeds.
    pub fn with_task(tx: mpsc::UnboundedSender<Message>, task: JoinHandle<()>) -> Self {
        Self {
            tx,
            task: Some(task),
        }
    }
}

impl PeerTransport for ChannelTransport {
    fn deliver(&self, msg: Message) -> Result<(), RouterError> {
        self.tx.send(msg).map_err(|_| RouterError::TransportClosed)
    }

    fn terminate(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// A worker peer's side of the transport.
///
/// Holds the inbox of messages the router delivered to this peer and the
/// outbox back toward the router. Everything emitted through the outbox is
/// stamped with this peer's identifier on arrival; the worker never declares
/// its own identity.
pub struct WorkerChannel {
    inbox: mpsc::UnboundedReceiver<Message>,
    outbox: mpsc::UnboundedSender<Message>,
}

impl WorkerChannel {
    pub(crate) fn new(
        inbox: mpsc::UnboundedReceiver<Message>,
        outbox: mpsc::UnboundedSender<Message>,
    ) -> Self {
        Self { inbox, outbox }
    }

    /// Receive the next message delivered to this peer.
    ///
    /// Returns `None` once the router has torn the channel down.
    pub async fn recv(&mut self) -> Option<Message> {
        self.inbox.recv().await
    }

    /// Fire-and-forget send toward the router.
    ///
    /// Returns `false` when the router side is gone.
    pub fn send(&self, msg: Message) -> bool {
        self.outbox.send(msg).is_ok()
    }

    /// Consume the identity-assignment message.
    ///
    /// The first message delivered after creation carries this peer's own
    /// assigned identifier as its payload. Returns `None` if the channel
    /// closed first or the payload is not an identifier.
    pub async fn recv_identity(&mut self) -> Option<PeerId> {
        let msg = self.inbox.recv().await?;
        serde_json::from_value(msg.data).ok()
    }

    /// Send a diagnostic line to the top-level coordinator.
    ///
    /// Equivalent to sending `{destination: Parent, control: log}` with the
    /// values as the payload array; the redirect rule surfaces it at the
    /// coordinator no matter how deeply nested the emitting peer is. See also
    /// the [`peer_log!`](crate::peer_log) macro for the variadic form.
    pub fn log(&self, values: Vec<Value>) -> bool {
        self.send(Message::log(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Destination;
    use serde_json::json;

    #[test]
    fn test_deliver_preserves_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let transport = ChannelTransport::new(tx);

        for n in 1..=3u64 {
            transport
                .deliver(Message::new(Destination::Parent, json!(n)))
                .expect("deliver should succeed");
        }

        for n in 1..=3u64 {
            let msg = rx.try_recv().expect("message should be queued");
            assert_eq!(msg.data, json!(n));
        }
    }

    #[test]
    fn test_deliver_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = ChannelTransport::new(tx);
        drop(rx);

        let err = transport
            .deliver(Message::new(Destination::Parent, json!(1)))
            .expect_err("closed channel should error");
        assert_eq!(err, RouterError::TransportClosed);
    }

    #[tokio::test]
    async fn test_worker_channel_identity() {
        let (to_peer_tx, to_peer_rx) = mpsc::unbounded_channel();
        let (from_peer_tx, _from_peer_rx) = mpsc::unbounded_channel();
        let mut chan = WorkerChannel::new(to_peer_rx, from_peer_tx);

        to_peer_tx
            .send(Message::new(Destination::Peer(PeerId(5)), json!(5)))
            .expect("send should succeed");

        assert_eq!(chan.recv_identity().await, Some(PeerId(5)));
    }

    #[tokio::test]
    async fn test_worker_channel_recv_none_after_close() {
        let (to_peer_tx, to_peer_rx) = mpsc::unbounded_channel();
        let (from_peer_tx, _from_peer_rx) = mpsc::unbounded_channel();
        let mut chan = WorkerChannel::new(to_peer_rx, from_peer_tx);

        drop(to_peer_tx);
        assert!(chan.recv().await.is_none());
    }
}
