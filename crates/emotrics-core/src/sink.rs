//! Usage sink trait and in-process implementations

use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

use crate::types::UsageEvent;

/// Destination for emote usage events.
///
/// Recording is fire-and-forget: the pipeline does not depend on any return
/// value, and a sink must not fail the message loop.
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn record(&self, event: UsageEvent);
}

/// Sink that emits one structured log line per event. Default wiring when no
/// external store is configured.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UsageSink for TracingSink {
    async fn record(&self, event: UsageEvent) {
        info!(
            target: "emotrics::usage",
            emote = %event.emote,
            channel = %event.channel,
            source = %event.source,
            timestamp_ms = event.timestamp_millis(),
            "emote used"
        );
    }
}

/// Sink that buffers events in memory, preserving record order. Used as a
/// test double and for ad-hoc inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<UsageEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, in record order.
    pub fn events(&self) -> Vec<UsageEvent> {
        self.events.lock().expect("sink mutex poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("sink mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UsageSink for MemorySink {
    async fn record(&self, event: UsageEvent) {
        self.events.lock().expect("sink mutex poisoned").push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EmoteSource;
    use chrono::Utc;

    fn event(emote: &str) -> UsageEvent {
        UsageEvent {
            emote: emote.to_string(),
            channel: "foo".to_string(),
            source: EmoteSource::Bttv,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_memory_sink_preserves_order() {
        let sink = MemorySink::new();
        sink.record(event("PogU")).await;
        sink.record(event("Kappa")).await;
        sink.record(event("Kappa")).await;

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].emote, "PogU");
        assert_eq!(events[1].emote, "Kappa");
        assert_eq!(events[2].emote, "Kappa");
    }

    #[tokio::test]
    async fn test_memory_sink_empty() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        assert_eq!(sink.events(), Vec::new());
    }
}
