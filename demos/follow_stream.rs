//! # Example: follow-mode streaming from a blocking reader
//!
//! The source's follow is a blocking iterator (stand-in for a pipe or a
//! container runtime's log stream), offloaded onto the blocking pool via
//! `FollowStream::from_blocking`. Also shows the one-shot `fetch_tail`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use tailcast::{
    DeliveryError, Destination, FollowStream, LogSource, LogWriter, NotificationSink,
    SessionRegistry, SourceError, SourceRef, StreamConfig, Subscribe, SubscriberId, TailMode,
};

/// Source whose live output only exists as a blocking byte-chunk reader.
struct BlockingPipe;

#[async_trait]
impl LogSource for BlockingPipe {
    async fn tail(&self, source: &SourceRef, _limit: usize) -> Result<Vec<u8>, SourceError> {
        Ok(format!("{source}: boot complete\n").into_bytes())
    }

    async fn follow(&self, source: &SourceRef) -> Result<FollowStream, SourceError> {
        let name = source.to_string();
        let reader = (0..40u32).map(move |i| {
            // simulated blocking read
            std::thread::sleep(Duration::from_millis(150));
            Ok(format!("{name}: chunk {i}\n").into_bytes())
        });
        Ok(FollowStream::from_blocking(reader))
    }
}

struct Stdout;

#[async_trait]
impl NotificationSink for Stdout {
    async fn send(&self, dest: Destination, text: &str) -> Result<(), DeliveryError> {
        println!("--- to {dest} ---");
        println!("{text}");
        Ok(())
    }

    fn max_message_size(&self) -> usize {
        4096
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let registry = SessionRegistry::new(
        StreamConfig::default(),
        Arc::new(BlockingPipe),
        Arc::new(Stdout),
        subs,
    );

    let dest = Destination::new(42);
    let source = SourceRef::new("pipe");

    // One-shot snapshot before going live.
    registry.fetch_tail(dest, &source, 20).await?;

    let subscriber = SubscriberId::new(1);
    registry
        .start(subscriber, dest, source, TailMode::Follow)
        .await?;

    // Stream until ctrl-c, or until the demo window elapses.
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = tokio::time::sleep(Duration::from_secs(8)) => {}
    }
    registry.shutdown().await;
    Ok(())
}
