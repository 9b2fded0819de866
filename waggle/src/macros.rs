//! Convenience macros for worker peer code.

/// Send a variadic diagnostic line to the top-level coordinator.
///
/// Each argument must be serializable with `serde_json`. Expands to a single
/// log-tagged message addressed to the parent, so the line surfaces at the
/// top-level handler no matter which peer emitted it. Returns `false` when
/// the router side is gone, like [`WorkerChannel::send`].
///
/// # Example
///
/// ```rust,ignore
/// let id = chan.recv_identity().await.expect("identity");
/// peer_log!(chan, "worker ready", id);
/// ```
///
/// [`WorkerChannel::send`]: crate::WorkerChannel::send
#[macro_export]
macro_rules! peer_log {
    ($chan:expr $(, $arg:expr)* $(,)?) => {
        $chan.log(vec![$( ::serde_json::json!($arg) ),*])
    };
}
