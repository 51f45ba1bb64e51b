//! Feed metrics
//!
//! Counters for frames, feed anomalies and emitted snapshots, kept in a
//! private Prometheus registry.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::Result;

/// Recoverable feed anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Anomaly {
    /// Execute, delete or replace of an order id that is not live
    MissingOrder,
    /// Event missing a field it needs to be applied
    IncompleteEvent,
    /// Add for an order id that was already live
    DuplicateAdd,
    /// Add without quantity
    ZeroQuantity,
    /// Frame with no registered layout
    Unrecognized,
}

impl Anomaly {
    pub fn as_str(&self) -> &'static str {
        match self {
            Anomaly::MissingOrder => "missing_order",
            Anomaly::IncompleteEvent => "incomplete_event",
            Anomaly::DuplicateAdd => "duplicate_add",
            Anomaly::ZeroQuantity => "zero_quantity",
            Anomaly::Unrecognized => "unrecognized",
        }
    }
}

/// Metrics for one replay
pub struct FeedMetrics {
    registry: Registry,
    frames: IntCounterVec,
    anomalies: IntCounterVec,
    snapshots: IntCounter,
    live_orders: IntGauge,
}

impl FeedMetrics {
    /// Create and register the replay metrics
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let frames = IntCounterVec::new(
            Opts::new("itch_frames_total", "Frames read, by type tag"),
            &["tag"],
        )?;
        let anomalies = IntCounterVec::new(
            Opts::new("itch_anomalies_total", "Recoverable feed anomalies, by kind"),
            &["kind"],
        )?;
        let snapshots = IntCounter::new("itch_snapshots_total", "Depth snapshots emitted")?;
        let live_orders = IntGauge::new("itch_live_orders", "Orders currently in the store")?;

        registry.register(Box::new(frames.clone()))?;
        registry.register(Box::new(anomalies.clone()))?;
        registry.register(Box::new(snapshots.clone()))?;
        registry.register(Box::new(live_orders.clone()))?;

        Ok(Self {
            registry,
            frames,
            anomalies,
            snapshots,
            live_orders,
        })
    }

    pub fn record_frame(&self, tag: &str) {
        self.frames.with_label_values(&[tag]).inc();
    }

    pub fn record_anomaly(&self, anomaly: Anomaly) {
        self.anomalies.with_label_values(&[anomaly.as_str()]).inc();
    }

    pub fn record_snapshots(&self, count: usize) {
        self.snapshots.inc_by(count as u64);
    }

    pub fn set_live_orders(&self, count: usize) {
        self.live_orders.set(count as i64);
    }

    pub fn anomaly_count(&self, anomaly: Anomaly) -> u64 {
        self.anomalies.with_label_values(&[anomaly.as_str()]).get()
    }

    pub fn snapshot_count(&self) -> u64 {
        self.snapshots.get()
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_render() {
        let metrics = FeedMetrics::new().unwrap();
        metrics.record_frame("A");
        metrics.record_frame("A");
        metrics.record_anomaly(Anomaly::MissingOrder);
        metrics.record_snapshots(3);
        metrics.set_live_orders(12);

        assert_eq!(metrics.anomaly_count(Anomaly::MissingOrder), 1);
        assert_eq!(metrics.anomaly_count(Anomaly::DuplicateAdd), 0);
        assert_eq!(metrics.snapshot_count(), 3);

        let text = metrics.render().unwrap();
        assert!(text.contains("itch_frames_total{tag=\"A\"} 2"));
        assert!(text.contains("itch_anomalies_total{kind=\"missing_order\"} 1"));
        assert!(text.contains("itch_live_orders 12"));
    }

    #[test]
    fn test_separate_registries() {
        let first = FeedMetrics::new().unwrap();
        let second = FeedMetrics::new().unwrap();
        first.record_snapshots(1);
        assert_eq!(second.snapshot_count(), 0);
    }
}
