//! Fan-in example: three workers report results, the coordinator drains them
//! with any-child receives.
//!
//! Run with:
//!
//! ```text
//! cargo run --example fan_in
//! ```

use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::LocalSet;
use waggle::{
    peer_log, ChannelTransport, ControlTag, Destination, Message, RecvFilter, Router,
    WorkerChannel,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    runtime.block_on(LocalSet::new().run_until(run()));
}

async fn run() {
    // The uplink is where a containing process would observe this
    // coordinator; here we just keep the receiver alive.
    let (uplink_tx, _uplink_rx) = mpsc::unbounded_channel();
    let router = Router::builder()
        .expose("scale", json!(10))
        .build(Box::new(ChannelTransport::new(uplink_tx)));

    for n in 1..=3u64 {
        router.create_peer(move |mut chan: WorkerChannel| async move {
            let me = chan.recv_identity().await.expect("identity");
            peer_log!(chan, "worker started", me.0);

            // Scale the input by the coordinator's exposed value.
            chan.send(Message::import("scale"));
            let scale = chan.recv().await.expect("import reply");
            let scale = scale.data.as_u64().unwrap_or(1);

            chan.send(Message::new(Destination::Parent, json!(n * scale)));
        });
    }

    let mut total = 0u64;
    let mut results = 0;
    while results < 3 {
        let msg = router
            .receive(RecvFilter::AnyChild)
            .await
            .expect("receive");
        match msg.control {
            Some(ControlTag::Log) => {
                println!("[peer {}] {}", msg.source.expect("stamped source"), msg.data);
            }
            _ => {
                total += msg.data.as_u64().unwrap_or(0);
                results += 1;
            }
        }
    }

    println!("total: {total}");
    router.shutdown();
}
