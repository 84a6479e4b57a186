//! # Example: cursor-polled streaming
//!
//! A background producer appends bursty lines to an in-memory log store;
//! a poll-mode session streams them to a stdout sink. Run with
//! `RUST_LOG=debug` to see the runtime events rendered by `LogWriter`.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use tailcast::{
    Cursor, DeliveryError, Destination, LogSource, LogWriter, NotificationSink, SessionRegistry,
    SourceError, SourceRef, StreamConfig, Subscribe, SubscriberId, TailMode,
};

/// In-memory log store; every appended line is timestamped.
#[derive(Default)]
struct MemoryLogs {
    lines: Mutex<Vec<(SystemTime, String)>>,
}

impl MemoryLogs {
    fn append(&self, line: String) {
        self.lines.lock().unwrap().push((SystemTime::now(), line));
    }
}

#[async_trait]
impl LogSource for MemoryLogs {
    async fn tail(&self, _source: &SourceRef, limit: usize) -> Result<Vec<u8>, SourceError> {
        let lines = self.lines.lock().unwrap();
        let start = lines.len().saturating_sub(limit);
        let text: String = lines[start..].iter().map(|(_, l)| format!("{l}\n")).collect();
        Ok(text.into_bytes())
    }

    async fn poll_since(
        &self,
        _source: &SourceRef,
        cursor: Cursor,
    ) -> Result<(Vec<u8>, Cursor), SourceError> {
        let lines = self.lines.lock().unwrap();
        let fresh: Vec<&(SystemTime, String)> = lines
            .iter()
            .filter(|(at, _)| *at > cursor.position())
            .collect();
        // advance only to the last delivered line, so a line appended
        // while we hold the lock is never skipped
        let next = fresh.last().map_or(cursor, |(at, _)| Cursor::at(*at));
        let text: String = fresh.iter().map(|(_, l)| format!("{l}\n")).collect();
        Ok((text.into_bytes(), next))
    }
}

/// Prints each delivered block instead of calling a chat API.
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

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let logs = Arc::new(MemoryLogs::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let registry = SessionRegistry::new(
        StreamConfig::default(),
        logs.clone(),
        Arc::new(Stdout),
        subs,
    );

    let producer = {
        let logs = logs.clone();
        tokio::spawn(async move {
            for i in 0..30u32 {
                logs.append(format!("request {i} handled in {}ms", 5 + i % 7));
                let pause = if i % 10 == 9 {
                    Duration::from_secs(2)
                } else {
                    Duration::from_millis(120)
                };
                tokio::time::sleep(pause).await;
            }
        })
    };

    let subscriber = SubscriberId::new(1);
    registry
        .start(
            subscriber,
            Destination::new(42),
            SourceRef::new("web"),
            TailMode::Poll,
        )
        .await?;

    producer.await?;
    tokio::time::sleep(Duration::from_secs(3)).await;
    registry.stop(subscriber).await;
    Ok(())
}
