use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;

#[derive(Debug, Default)]
pub struct Metrics {
    pub active_connections: AtomicU64,
    pub messages_processed: AtomicU64,
    pub parse_errors: AtomicU64,
    pub delivery_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_connections(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_connections(&self) {
        // Saturate so a racing double removal can never wrap the gauge.
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn increment_messages(&self) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_parse_errors(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_delivery_failures(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> BTreeMap<&'static str, u64> {
        BTreeMap::from([
            (
                "chat_active_connections",
                self.active_connections.load(Ordering::Relaxed),
            ),
            (
                "chat_messages_processed",
                self.messages_processed.load(Ordering::Relaxed),
            ),
            ("chat_parse_errors", self.parse_errors.load(Ordering::Relaxed)),
            (
                "chat_delivery_failures",
                self.delivery_failures.load(Ordering::Relaxed),
            ),
        ])
    }

    /// Prometheus text exposition of every counter.
    pub fn render(&self) -> String {
        let mut output = String::new();
        for (key, value) in self.get_stats() {
            let kind = if key == "chat_active_connections" {
                "gauge"
            } else {
                "counter"
            };
            output.push_str(&format!("# HELP {key} {key}\n"));
            output.push_str(&format!("# TYPE {key} {kind}\n"));
            output.push_str(&format!("{key} {value}\n"));
        }
        output
    }
}

// Global metrics instance
static METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

pub fn metrics() -> &'static Metrics {
    &METRICS
}
