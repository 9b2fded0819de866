//! The router: inbound handling, receive requests, sends, and peer lifecycle.
//!
//! One [`Router`] instance serves one coordinating task. The coordinator runs
//! cooperatively on a single-threaded run loop: it executes until it awaits
//! [`Router::receive`], at which point it suspends until a matching message
//! arrives. Worker peers are independently scheduled local tasks that only
//! communicate by message passing.
//!
//! # Flow
//!
//! 1. A peer emits a message through its [`WorkerChannel`]
//! 2. The peer's forwarder task replays it into [`Router::handle_incoming`],
//!    stamping the true source identifier (the marshalling point: all shared
//!    state is mutated on the coordinator's execution context)
//! 3. The router redirects it, answers an import, satisfies the pending
//!    receive request, or buffers it in the source's inbox queue
//!
//! # Resumption discipline
//!
//! A matched pending request is completed through a oneshot channel: the
//! handler only wakes the coordinator's task, and the coordinator resumes on
//! the run loop once its own call stack has unwound to the `receive` await.
//! The coordinator is never re-entered from inside the arrival handler.
//!
//! # Construction and teardown
//!
//! There is no process-wide singleton. Build a router explicitly with
//! [`Router::builder`], hand it the coordinator's own outer channel (peer 0),
//! and tear it down with [`Router::shutdown`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::RouterError;
use crate::message::{ControlTag, Destination, Message, PeerId, RecvFilter};
use crate::queue::InboxMap;
use crate::registry::{IdAllocator, PeerTable};
use crate::task::{TaskProvider, TokioTaskProvider};
use crate::transport::{ChannelTransport, PeerTransport, WorkerChannel};

/// A parked receive request waiting for a matching arrival.
///
/// At most one of these exists at any instant (single slot, not a queue).
struct PendingReceive {
    filter: RecvFilter,
    reply: oneshot::Sender<Message>,
}

struct RouterInner {
    ids: IdAllocator,
    peers: PeerTable,
    inboxes: InboxMap,
    pending: Option<PendingReceive>,
    imports: HashMap<String, Value>,
    closed: bool,
}

/// Builder for [`Router`]: import table and task provider.
pub struct RouterBuilder<T: TaskProvider = TokioTaskProvider> {
    imports: HashMap<String, Value>,
    tasks: T,
}

impl RouterBuilder<TokioTaskProvider> {
    fn new() -> Self {
        Self {
            imports: HashMap::new(),
            tasks: TokioTaskProvider,
        }
    }
}

impl<T: TaskProvider> RouterBuilder<T> {
    /// Expose a named value to peers through the import control tag.
    ///
    /// The import namespace is exactly the set of names exposed here; any
    /// other name is rejected at request time.
    pub fn expose(mut self, name: impl Into<String>, value: Value) -> Self {
        self.imports.insert(name.into(), value);
        self
    }

    /// Swap the task provider used for worker and forwarder tasks.
    pub fn task_provider<T2: TaskProvider>(self, tasks: T2) -> RouterBuilder<T2> {
        RouterBuilder {
            imports: self.imports,
            tasks,
        }
    }

    /// Build the router, registering `uplink` as the coordinator's own outer
    /// channel under the reserved identifier 0.
    pub fn build(self, uplink: Box<dyn PeerTransport>) -> Rc<Router<T>> {
        let mut peers = PeerTable::new();
        let mut inboxes = InboxMap::new();
        peers.insert(PeerId::PARENT, uplink);
        inboxes.register(PeerId::PARENT);

        Rc::new(Router {
            inner: RefCell::new(RouterInner {
                ids: IdAllocator::new(),
                peers,
                inboxes,
                pending: None,
                imports: self.imports,
                closed: false,
            }),
            tasks: self.tasks,
        })
    }
}

/// Message router between a coordinating task and its worker peers.
///
/// See the [module documentation](crate::router) for the execution model.
pub struct Router<T: TaskProvider = TokioTaskProvider> {
    inner: RefCell<RouterInner>,
    tasks: T,
}

impl Router {
    /// Start building a router with the default Tokio task provider.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }
}

impl<T: TaskProvider + 'static> Router<T> {
    // ---------------------------------------------------------------------
    // Inbound
    // ---------------------------------------------------------------------

    /// Ingest a message that arrived from `from`'s transport.
    ///
    /// The source is stamped with the delivering transport's identifier
    /// before anything else; a peer cannot spoof its origin. The message is
    /// then redirected toward its stated destination (when it neither came
    /// from nor targets the coordinator), answered as an import request,
    /// handed to the pending receive request, or buffered in the source's
    /// inbox queue.
    pub fn handle_incoming(&self, from: PeerId, mut msg: Message) {
        msg.source = Some(from);

        // A child's message not addressed to the coordinator passes straight
        // through toward its stated destination. This is how a nested peer's
        // log output climbs to the top-level handler.
        if !from.is_parent() && !msg.destination.resolve().is_parent() {
            self.send(msg);
            return;
        }

        if msg.control == Some(ControlTag::Import) {
            self.answer_import(from, &msg);
            return;
        }

        // The message is for the coordinator itself. "No pending request" is
        // a checked branch of its own, never an access on an absent slot.
        let mut inner = self.inner.borrow_mut();
        match inner.pending.take() {
            Some(pending) if pending.filter.matches(from) => {
                drop(inner);
                // Completing the oneshot only wakes the coordinator's task;
                // it resumes on the run loop, never inside this handler.
                // A dropped receive future hands the message back; it must
                // stay retrievable, so it goes to the buffer instead.
                if let Err(msg) = pending.reply.send(msg) {
                    warn!(source = %from, "receive abandoned before resumption; message buffered");
                    if !self.inner.borrow_mut().inboxes.push(from, msg) {
                        warn!(source = %from, "dropping message from unregistered peer");
                    }
                }
            }
            pending => {
                // Either no request is outstanding or the filter does not
                // match this source: leave the slot as it was and buffer.
                inner.pending = pending;
                if !inner.inboxes.push(from, msg) {
                    warn!(source = %from, "dropping message from unregistered peer");
                }
            }
        }
    }

    /// Ingest a message from the coordinator's own outer channel.
    ///
    /// Stamps the reserved source identifier 0.
    pub fn handle_parent_message(&self, msg: Message) {
        self.handle_incoming(PeerId::PARENT, msg);
    }

    /// Answer an import-tagged request with a value from the import table.
    ///
    /// The reply is an ordinary data message back to the requester. A name
    /// that was never exposed is rejected: logged, and answered with `null`
    /// so the requester is not left waiting.
    fn answer_import(&self, from: PeerId, msg: &Message) {
        let value = match msg.data.as_str() {
            Some(name) => {
                let resolved = self.inner.borrow().imports.get(name).cloned();
                match resolved {
                    Some(value) => value,
                    None => {
                        warn!(name, requester = %from, "import of unexposed name rejected");
                        Value::Null
                    }
                }
            }
            None => {
                warn!(requester = %from, "import request without a string name");
                Value::Null
            }
        };
        self.send(Message::new(Destination::Peer(from), value));
    }

    // ---------------------------------------------------------------------
    // Receive
    // ---------------------------------------------------------------------

    /// Receive the next message matching `filter`.
    ///
    /// If a buffered message already satisfies the filter it is consumed
    /// immediately (an `AnyChild` filter scans inboxes in ascending
    /// identifier order and drains exactly one message). Otherwise the
    /// request parks in the single pending slot and this future suspends
    /// until [`handle_incoming`](Self::handle_incoming) satisfies it.
    ///
    /// There is no timeout; an unmatched receive waits until a message
    /// arrives or the router is shut down.
    ///
    /// # Errors
    ///
    /// - [`RouterError::ReceivePending`] if another receive is already
    ///   outstanding. The existing request is left untouched. A request
    ///   whose future was dropped before resuming no longer counts as
    ///   outstanding; its slot is reclaimed.
    /// - [`RouterError::UnknownPeer`] if a `From` filter names a peer with
    ///   no inbox.
    /// - [`RouterError::RouterClosed`] if the router is torn down before a
    ///   match arrives.
    pub async fn receive(&self, filter: RecvFilter) -> Result<Message, RouterError> {
        let parked = {
            let mut inner = self.inner.borrow_mut();
            if inner.closed {
                return Err(RouterError::RouterClosed);
            }
            // A request whose future was dropped (caller-side timeout or
            // cancellation) leaves a closed oneshot in the slot; it no
            // longer counts as outstanding.
            match &inner.pending {
                Some(pending) if !pending.reply.is_closed() => {
                    return Err(RouterError::ReceivePending);
                }
                Some(_) => inner.pending = None,
                None => {}
            }
            if let Some(msg) = inner.inboxes.pop_matching(filter)? {
                return Ok(msg);
            }
            let (tx, rx) = oneshot::channel();
            inner.pending = Some(PendingReceive { filter, reply: tx });
            rx
        };
        parked.await.map_err(|_| RouterError::RouterClosed)
    }

    // ---------------------------------------------------------------------
    // Send
    // ---------------------------------------------------------------------

    /// Fire-and-forget send toward the message's stated destination.
    ///
    /// `Destination::Parent` resolves to peer 0. Delivery order to a single
    /// destination preserves the caller's send order; no ordering holds
    /// across destinations.
    ///
    /// An unknown destination or a closed transport is recoverable: it is
    /// reported on the diagnostic log and the call returns `false` instead
    /// of failing.
    pub fn send(&self, msg: Message) -> bool {
        let dest = msg.destination.resolve();
        let inner = self.inner.borrow();
        let Some(transport) = inner.peers.get(dest) else {
            warn!(destination = %dest, "could not send message: destination peer not found");
            return false;
        };
        match transport.deliver(msg) {
            Ok(()) => true,
            Err(err) => {
                warn!(destination = %dest, %err, "could not send message");
                false
            }
        }
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Spawn a new worker peer and return its assigned identifier.
    ///
    /// Allocates the next identifier, registers an empty inbox queue and a
    /// channel transport, spawns the worker from `init`, and spawns the
    /// forwarder that stamps everything the worker emits with its identifier
    /// and replays it into [`handle_incoming`](Self::handle_incoming).
    ///
    /// The first message delivered to the new peer carries its own assigned
    /// identifier as the payload; identity is assigned by the router, never
    /// self-declared. See [`WorkerChannel::recv_identity`].
    pub fn create_peer<F, Fut>(self: &Rc<Self>, init: F) -> PeerId
    where
        F: FnOnce(WorkerChannel) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        let (to_peer_tx, to_peer_rx) = mpsc::unbounded_channel();
        let (from_peer_tx, mut from_peer_rx) = mpsc::unbounded_channel();

        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.ids.allocate();
            inner.inboxes.register(id);
            id
        };

        let worker = self
            .tasks
            .spawn_task("peer-worker", init(WorkerChannel::new(to_peer_rx, from_peer_tx)));

        // Marshalling point: everything the peer emits reaches shared router
        // state from this task on the coordinator's execution context.
        let router = Rc::clone(self);
        self.tasks.spawn_task("peer-forwarder", async move {
            while let Some(msg) = from_peer_rx.recv().await {
                router.handle_incoming(id, msg);
            }
        });

        self.inner
            .borrow_mut()
            .peers
            .insert(id, Box::new(ChannelTransport::with_task(to_peer_tx, worker)));

        debug!(peer = %id, "created peer");

        // The peer learns its identity from its first message.
        self.send(Message::new(Destination::Peer(id), Value::from(id.0)));
        id
    }

    /// Remove a peer: terminate its transport, discard anything still
    /// buffered in its inbox queue, and drop its table entry.
    ///
    /// No delivery guarantee survives removal; unconsumed messages are gone.
    ///
    /// # Errors
    ///
    /// [`RouterError::UnknownPeer`] if no peer is registered under `id`.
    pub fn remove_peer(&self, id: PeerId) -> Result<(), RouterError> {
        let mut inner = self.inner.borrow_mut();
        let Some(mut transport) = inner.peers.remove(id) else {
            return Err(RouterError::UnknownPeer { id });
        };
        transport.terminate();

        let discarded = inner.inboxes.remove(id).map(|q| q.len()).unwrap_or(0);
        if discarded > 0 {
            debug!(peer = %id, discarded, "discarded buffered messages on peer removal");
        }
        debug!(peer = %id, "removed peer");
        Ok(())
    }

    /// Reset identifier allocation back to 1.
    ///
    /// Live peers are unaffected. Resetting while peers are still registered
    /// can make future identifiers collide with them; remove live peers
    /// first.
    pub fn reset_ids(&self) {
        self.inner.borrow_mut().ids.reset();
    }

    /// Tear the router down.
    ///
    /// Terminates every peer (including the peer-0 uplink), discards all
    /// buffered messages, and drops any parked receive request so a
    /// suspended [`receive`](Self::receive) resolves with
    /// [`RouterError::RouterClosed`]. Subsequent receives fail the same way;
    /// subsequent sends report failure.
    pub fn shutdown(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.closed {
            return;
        }
        inner.closed = true;
        for (_, mut transport) in inner.peers.drain() {
            transport.terminate();
        }
        inner.inboxes.clear();
        // Dropping the sender resolves the parked receive with RouterClosed.
        inner.pending = None;
        debug!("router shut down");
    }

    /// Whether the router has been shut down.
    pub fn is_closed(&self) -> bool {
        self.inner.borrow().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Router whose peer-0 uplink is a plain channel the test observes.
    fn test_router() -> (Rc<Router>, UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let router = Router::builder().build(Box::new(ChannelTransport::new(tx)));
        (router, rx)
    }

    /// Register a fake child peer without spawning any task.
    fn register_child(router: &Router) -> (PeerId, UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = router.inner.borrow_mut();
        let id = inner.ids.allocate();
        inner.inboxes.register(id);
        inner.peers.insert(id, Box::new(ChannelTransport::new(tx)));
        (id, rx)
    }

    #[test]
    fn test_send_to_parent_sentinel() {
        let (router, mut uplink) = test_router();

        assert!(router.send(Message::new(Destination::Parent, json!("up"))));
        let msg = uplink.try_recv().expect("uplink should have the message");
        assert_eq!(msg.data, json!("up"));
    }

    #[test]
    fn test_send_unknown_peer_reports_false() {
        let (router, _uplink) = test_router();
        assert!(!router.send(Message::new(Destination::Peer(PeerId(9)), json!(1))));
    }

    #[test]
    fn test_send_after_peer_channel_closed_reports_false() {
        let (router, _uplink) = test_router();
        let (id, rx) = register_child(&router);
        drop(rx);

        assert!(!router.send(Message::new(Destination::Peer(id), json!(1))));
    }

    #[test]
    fn test_incoming_stamps_source() {
        let (router, _uplink) = test_router();
        let (id, _rx) = register_child(&router);

        // Spoofed source must be overwritten at ingestion.
        let mut msg = Message::new(Destination::Parent, json!("hi"));
        msg.source = Some(PeerId(99));
        router.handle_incoming(id, msg);

        let mut inner = router.inner.borrow_mut();
        let buffered = inner
            .inboxes
            .pop_matching(RecvFilter::From(id))
            .expect("pop should succeed")
            .expect("message should be buffered");
        assert_eq!(buffered.source, Some(id));
    }

    #[test]
    fn test_child_to_child_message_is_redirected() {
        let (router, _uplink) = test_router();
        let (a, _a_rx) = register_child(&router);
        let (b, mut b_rx) = register_child(&router);

        router.handle_incoming(a, Message::new(Destination::Peer(b), json!("ping")));

        let msg = b_rx.try_recv().expect("peer b should get the message");
        assert_eq!(msg.source, Some(a));
        assert_eq!(msg.data, json!("ping"));
        // Nothing buffered for the coordinator.
        assert!(router
            .inner
            .borrow_mut()
            .inboxes
            .pop_matching(RecvFilter::AnyChild)
            .expect("pop should succeed")
            .is_none());
    }

    #[test]
    fn test_parent_originated_message_is_not_redirected() {
        let (router, _uplink) = test_router();
        let (id, mut rx) = register_child(&router);

        // Source 0 fails the redirect predicate even with a child destination;
        // the message is buffered for the coordinator instead.
        router.handle_parent_message(Message::new(Destination::Peer(id), json!("down")));

        assert!(rx.try_recv().is_err());
        let buffered = router
            .inner
            .borrow_mut()
            .inboxes
            .pop_matching(RecvFilter::From(PeerId::PARENT))
            .expect("pop should succeed");
        assert!(buffered.is_some());
    }

    #[tokio::test]
    async fn test_receive_buffered_message() {
        let (router, _uplink) = test_router();
        let (id, _rx) = register_child(&router);

        router.handle_incoming(id, Message::new(Destination::Parent, json!("early")));

        let msg = router
            .receive(RecvFilter::From(id))
            .await
            .expect("receive should succeed");
        assert_eq!(msg.data, json!("early"));
        assert_eq!(msg.source, Some(id));
    }

    #[tokio::test]
    async fn test_buffered_message_consumed_exactly_once() {
        let (router, _uplink) = test_router();
        let (id, _rx) = register_child(&router);

        router.handle_incoming(id, Message::new(Destination::Parent, json!(1)));

        router
            .receive(RecvFilter::From(id))
            .await
            .expect("first receive should succeed");

        // Queue is empty again: the same message is not retrievable twice.
        let buffered = router
            .inner
            .borrow_mut()
            .inboxes
            .pop_matching(RecvFilter::From(id))
            .expect("pop should succeed");
        assert!(buffered.is_none());
    }

    #[tokio::test]
    async fn test_receive_from_unknown_peer_errors() {
        let (router, _uplink) = test_router();
        let err = router
            .receive(RecvFilter::From(PeerId(4)))
            .await
            .expect_err("unknown peer should error");
        assert_eq!(err, RouterError::UnknownPeer { id: PeerId(4) });
    }

    #[tokio::test]
    async fn test_pending_request_matched_by_arrival() {
        let (router, _uplink) = test_router();
        let (id, _rx) = register_child(&router);

        let receive = router.receive(RecvFilter::From(id));
        tokio::pin!(receive);

        // Poll once so the request parks in the slot.
        assert!(futures_poll_once(receive.as_mut()).await.is_none());
        assert!(router.inner.borrow().pending.is_some());

        router.handle_incoming(id, Message::new(Destination::Parent, json!("late")));

        let msg = receive.await.expect("receive should resume");
        assert_eq!(msg.data, json!("late"));
        assert!(router.inner.borrow().pending.is_none());
    }

    #[tokio::test]
    async fn test_non_matching_arrival_leaves_request_parked() {
        let (router, _uplink) = test_router();
        let (a, _a_rx) = register_child(&router);
        let (b, _b_rx) = register_child(&router);

        let receive = router.receive(RecvFilter::From(a));
        tokio::pin!(receive);
        assert!(futures_poll_once(receive.as_mut()).await.is_none());

        // Wrong source: buffered, slot untouched.
        router.handle_incoming(b, Message::new(Destination::Parent, json!("b")));
        assert!(router.inner.borrow().pending.is_some());
        assert!(futures_poll_once(receive.as_mut()).await.is_none());

        router.handle_incoming(a, Message::new(Destination::Parent, json!("a")));
        let msg = receive.await.expect("receive should resume");
        assert_eq!(msg.data, json!("a"));

        // The non-matching message is still buffered for b.
        let buffered = router
            .inner
            .borrow_mut()
            .inboxes
            .pop_matching(RecvFilter::From(b))
            .expect("pop should succeed");
        assert_eq!(buffered.map(|m| m.data), Some(json!("b")));
    }

    #[tokio::test]
    async fn test_any_child_request_ignores_parent_arrival() {
        let (router, _uplink) = test_router();
        let (id, _rx) = register_child(&router);

        let receive = router.receive(RecvFilter::AnyChild);
        tokio::pin!(receive);
        assert!(futures_poll_once(receive.as_mut()).await.is_none());

        // A parent-sourced arrival must not satisfy an any-child request.
        router.handle_parent_message(Message::new(Destination::Parent, json!("parent")));
        assert!(futures_poll_once(receive.as_mut()).await.is_none());

        router.handle_incoming(id, Message::new(Destination::Parent, json!("child")));
        let msg = receive.await.expect("receive should resume");
        assert_eq!(msg.source, Some(id));
    }

    #[tokio::test]
    async fn test_second_receive_fails_fast() {
        let (router, _uplink) = test_router();
        let (id, _rx) = register_child(&router);

        let first = router.receive(RecvFilter::From(id));
        tokio::pin!(first);
        assert!(futures_poll_once(first.as_mut()).await.is_none());

        let err = router
            .receive(RecvFilter::AnyChild)
            .await
            .expect_err("second receive should fail");
        assert_eq!(err, RouterError::ReceivePending);

        // The original request is uncorrupted and still completes.
        router.handle_incoming(id, Message::new(Destination::Parent, json!("ok")));
        let msg = first.await.expect("first receive should resume");
        assert_eq!(msg.data, json!("ok"));
    }

    #[tokio::test]
    async fn test_dropped_receive_vacates_slot() {
        let (router, _uplink) = test_router();
        let (id, _rx) = register_child(&router);

        {
            let receive = router.receive(RecvFilter::From(id));
            tokio::pin!(receive);
            assert!(futures_poll_once(receive.as_mut()).await.is_none());
        }
        // The abandoned request is still in the slot, but it must not block
        // a fresh receive.
        assert!(router.inner.borrow().pending.is_some());

        let receive = router.receive(RecvFilter::From(id));
        tokio::pin!(receive);
        assert!(futures_poll_once(receive.as_mut()).await.is_none());

        router.handle_incoming(id, Message::new(Destination::Parent, json!("late")));
        let msg = receive.await.expect("fresh receive should resume");
        assert_eq!(msg.data, json!("late"));
    }

    #[tokio::test]
    async fn test_arrival_after_dropped_receive_is_buffered() {
        let (router, _uplink) = test_router();
        let (id, _rx) = register_child(&router);

        {
            let receive = router.receive(RecvFilter::From(id));
            tokio::pin!(receive);
            assert!(futures_poll_once(receive.as_mut()).await.is_none());
        }

        // Both arrivals hit the stale slot first; neither may be lost.
        router.handle_incoming(id, Message::new(Destination::Parent, json!("first")));
        router.handle_incoming(id, Message::new(Destination::Parent, json!("second")));

        for expected in ["first", "second"] {
            let msg = router
                .receive(RecvFilter::From(id))
                .await
                .expect("receive should succeed");
            assert_eq!(msg.data, json!(expected));
        }
    }

    #[tokio::test]
    async fn test_import_answered_from_table() {
        let (tx, _uplink) = mpsc::unbounded_channel();
        let router = Router::builder()
            .expose("threshold", json!(42))
            .build(Box::new(ChannelTransport::new(tx)));
        let (id, mut rx) = register_child(&router);

        router.handle_incoming(id, Message::import("threshold"));

        let reply = rx.try_recv().expect("requester should get a reply");
        assert_eq!(reply.data, json!(42));
        assert_eq!(reply.control, None);
    }

    #[tokio::test]
    async fn test_import_of_unexposed_name_rejected_with_null() {
        let (router, _uplink) = test_router();
        let (id, mut rx) = register_child(&router);

        router.handle_incoming(id, Message::import("secret"));

        let reply = rx.try_recv().expect("requester should still get a reply");
        assert_eq!(reply.data, Value::Null);
    }

    #[tokio::test]
    async fn test_remove_peer_discards_buffered() {
        let (router, _uplink) = test_router();
        let (id, _rx) = register_child(&router);

        router.handle_incoming(id, Message::new(Destination::Parent, json!(1)));
        router.remove_peer(id).expect("remove should succeed");

        // Buffered messages are unreachable after teardown.
        let err = router
            .receive(RecvFilter::From(id))
            .await
            .expect_err("removed peer should be unknown");
        assert_eq!(err, RouterError::UnknownPeer { id });

        let err = router.remove_peer(id).expect_err("double remove should error");
        assert_eq!(err, RouterError::UnknownPeer { id });
    }

    #[tokio::test]
    async fn test_shutdown_resolves_parked_receive() {
        let (router, _uplink) = test_router();
        let (id, _rx) = register_child(&router);

        let receive = router.receive(RecvFilter::From(id));
        tokio::pin!(receive);
        assert!(futures_poll_once(receive.as_mut()).await.is_none());

        router.shutdown();
        assert!(router.is_closed());

        let err = receive.await.expect_err("receive should resolve on shutdown");
        assert_eq!(err, RouterError::RouterClosed);

        let err = router
            .receive(RecvFilter::AnyChild)
            .await
            .expect_err("receive after shutdown should fail");
        assert_eq!(err, RouterError::RouterClosed);
        assert!(!router.send(Message::new(Destination::Parent, json!(1))));
    }

    #[test]
    fn test_reset_ids_restarts_allocation() {
        let (router, _uplink) = test_router();
        let (a, _a_rx) = register_child(&router);
        assert_eq!(a, PeerId(1));

        router.remove_peer(a).expect("remove should succeed");
        router.reset_ids();

        let (b, _b_rx) = register_child(&router);
        assert_eq!(b, PeerId(1));
    }

    /// Poll a future exactly once, returning its output if ready.
    async fn futures_poll_once<F: Future + Unpin>(mut fut: F) -> Option<F::Output> {
        use std::task::Poll;
        std::future::poll_fn(|cx| match std::pin::Pin::new(&mut fut).poll(cx) {
            Poll::Ready(out) => Poll::Ready(Some(out)),
            Poll::Pending => Poll::Ready(None),
        })
        .await
    }
}
