//! Logging subscriber rendering events through the `log` facade.
//!
//! [`LogWriter`] turns runtime events into structured one-line log records:
//!
//! ```text
//! [running] subscriber=42 source=web
//! [flush-delivered] subscriber=42 lines=10 chunks=1
//! [flush-collapsed] subscriber=42 lines=10 dropped=7
//! [source-retry] source=web attempt=2 delay_ms=400 reason="transient source error: ..."
//! [stopped] subscriber=42 reason=stop_requested
//! ```
//!
//! Anomalies (delivery failures, lost sources, grace overruns) log at
//! `warn`/`error`; routine lifecycle logs at `info`, flush traffic at
//! `debug`.

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Renders runtime events via `log` macros.
#[derive(Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    fn fields(e: &Event) -> String {
        let mut out = String::new();
        if let Some(id) = e.subscriber {
            out.push_str(&format!(" subscriber={id}"));
        }
        if let Some(source) = &e.source {
            out.push_str(&format!(" source={source}"));
        }
        if let Some(lines) = e.lines {
            out.push_str(&format!(" lines={lines}"));
        }
        if let Some(dropped) = e.dropped {
            out.push_str(&format!(" dropped={dropped}"));
        }
        if let Some(attempt) = e.attempt {
            out.push_str(&format!(" attempt={attempt}"));
        }
        if let Some(ms) = e.delay_ms {
            out.push_str(&format!(" delay_ms={ms}"));
        }
        if let Some(reason) = &e.reason {
            out.push_str(&format!(" reason={reason:?}"));
        }
        out
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    fn name(&self) -> &'static str {
        "log-writer"
    }

    async fn on_event(&self, e: &Event) {
        let fields = Self::fields(e);
        match e.kind {
            EventKind::SessionStarting => log::info!("[starting]{fields}"),
            EventKind::SessionRunning => log::info!("[running]{fields}"),
            EventKind::SessionStopping => log::info!("[stopping]{fields}"),
            EventKind::SessionStopped => log::info!("[stopped]{fields}"),
            EventKind::SessionReplaced => log::info!("[replaced]{fields}"),
            EventKind::SessionRemoved => log::info!("[removed]{fields}"),
            EventKind::StopRequested => log::info!("[stop-requested]{fields}"),
            EventKind::FlushDelivered => log::debug!("[flush-delivered]{fields}"),
            EventKind::FlushCollapsed => log::debug!("[flush-collapsed]{fields}"),
            EventKind::DeliveryFailed => log::warn!("[delivery-failed]{fields}"),
            EventKind::SourceRetry => log::warn!("[source-retry]{fields}"),
            EventKind::SourceLost => log::error!("[source-lost]{fields}"),
            EventKind::StopGraceExceeded => log::error!("[stop-grace-exceeded]{fields}"),
            EventKind::SubscriberOverflow => log::warn!("[subscriber-overflow]{fields}"),
            EventKind::SubscriberPanicked => log::error!("[subscriber-panicked]{fields}"),
        }
    }
}
