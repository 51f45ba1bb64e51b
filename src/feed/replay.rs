//! Replay engine
//!
//! Decodes frames ahead of time on a bounded set of tasks, then applies the
//! resulting events to the order store strictly in frame order.

use futures_util::StreamExt;
use std::collections::BTreeMap;
use std::future::Future;
use tokio::io::AsyncRead;
use tracing::{debug, info};

use super::FrameReader;
use crate::config::Config;
use crate::decoder::{tag_label, Decoder, Event};
use crate::error::{DepthError, Result};
use crate::metrics::{Anomaly, FeedMetrics};
use crate::orderbook::{Applied, DepthAggregator, OrderStore};
use crate::publisher::{SnapshotEmitter, SnapshotSink};

/// Tuning for a replay
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Price levels per side in each snapshot
    pub depth_levels: usize,
    /// Frames decoded concurrently ahead of the apply stage
    pub decode_workers: usize,
    /// Snapshots buffered between the emitter and the sink
    pub sink_capacity: usize,
    /// Frames between progress logs; 0 disables them
    pub progress_interval: u64,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ReplayOptions {
    fn from(config: &Config) -> Self {
        Self {
            depth_levels: config.depth_levels,
            decode_workers: config.decode_workers,
            sink_capacity: config.sink_capacity,
            progress_interval: config.progress_interval,
        }
    }
}

/// Outcome of a replay
#[derive(Debug, Clone, Default)]
pub struct ReplaySummary {
    /// Frames read and decoded
    pub frames: u64,
    /// Order events passed to the store, including no-ops
    pub events_applied: u64,
    /// Snapshots written by the sink
    pub snapshots: u64,
    /// Orders live when the replay stopped
    pub live_orders: usize,
    /// Symbols with live orders when the replay stopped
    pub symbols: usize,
    /// Frames per type tag
    pub frame_census: BTreeMap<String, u64>,
    /// Recoverable anomalies per kind
    pub anomalies: BTreeMap<String, u64>,
    /// Whether shutdown stopped the replay before end of input
    pub interrupted: bool,
}

/// Drives frames through the decoder into the order store
pub struct ReplayEngine {
    decoder: Decoder,
    store: OrderStore,
    options: ReplayOptions,
    metrics: FeedMetrics,
    frames: u64,
    events_applied: u64,
    /// Most recent timestamp seen on any event
    last_timestamp: u64,
    census: BTreeMap<String, u64>,
    anomalies: BTreeMap<Anomaly, u64>,
}

impl ReplayEngine {
    /// Create a new replay engine with an empty store
    pub fn new(decoder: Decoder, options: ReplayOptions) -> Result<Self> {
        Ok(Self {
            decoder,
            store: OrderStore::new(),
            options,
            metrics: FeedMetrics::new()?,
            frames: 0,
            events_applied: 0,
            last_timestamp: 0,
            census: BTreeMap::new(),
            anomalies: BTreeMap::new(),
        })
    }

    /// Current order store
    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    pub fn metrics(&self) -> &FeedMetrics {
        &self.metrics
    }

    /// Replay every frame from `reader`, emitting snapshots to `sink`
    ///
    /// Stops at end of input or when `shutdown` resolves, whichever comes
    /// first. The sink is drained and flushed before this returns.
    pub async fn run<R, S, F>(
        &mut self,
        reader: FrameReader<R>,
        sink: S,
        shutdown: F,
    ) -> Result<ReplaySummary>
    where
        R: AsyncRead + Unpin,
        S: SnapshotSink + 'static,
        F: Future<Output = ()>,
    {
        info!(
            depth_levels = self.options.depth_levels,
            decode_workers = self.options.decode_workers,
            layouts = self.decoder.table().len(),
            "Starting replay"
        );

        let aggregator = DepthAggregator::new(self.options.depth_levels);
        let (mut emitter, sink_handle) =
            SnapshotEmitter::spawn(sink, aggregator, self.options.sink_capacity);

        let outcome = self.drive(reader, &mut emitter, shutdown).await;
        drop(emitter);
        let written = sink_handle.finish().await;

        let (interrupted, snapshots) = match (outcome, written) {
            (Ok(interrupted), Ok(snapshots)) => (interrupted, snapshots),
            // the writer stopped first; its error explains the closed channel
            (Err(DepthError::ChannelClosed), Err(e)) => return Err(e),
            (Err(e), _) | (Ok(_), Err(e)) => return Err(e),
        };

        let summary = self.summary(interrupted, snapshots);
        info!(
            frames = summary.frames,
            snapshots = summary.snapshots,
            live_orders = summary.live_orders,
            symbols = summary.symbols,
            interrupted = summary.interrupted,
            "Replay finished"
        );
        Ok(summary)
    }

    async fn drive<R, F>(
        &mut self,
        reader: FrameReader<R>,
        emitter: &mut SnapshotEmitter,
        shutdown: F,
    ) -> Result<bool>
    where
        R: AsyncRead + Unpin,
        F: Future<Output = ()>,
    {
        let workers = self.options.decode_workers.max(1);
        let decoder = self.decoder.clone();

        // `buffered` yields results in input order regardless of completion order
        let events = reader
            .into_stream()
            .map(move |frame| {
                let decoder = decoder.clone();
                async move {
                    let frame = frame?;
                    let tag = frame.payload.first().copied();
                    let event = if workers > 1 {
                        tokio::spawn(async move { decoder.decode(&frame) }).await?
                    } else {
                        decoder.decode(&frame)
                    };
                    Ok::<_, DepthError>((tag, event))
                }
            })
            .buffered(workers);
        tokio::pin!(events);
        tokio::pin!(shutdown);

        loop {
            let next = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!(frames = self.frames, "Shutdown requested, stopping replay");
                    return Ok(true);
                }
                next = events.next() => next,
            };

            let Some(decoded) = next else {
                return Ok(false);
            };
            let (tag, event) = decoded?;

            self.frames += 1;
            let label = tag_label(tag);
            self.metrics.record_frame(&label);
            *self.census.entry(label).or_default() += 1;

            self.apply(event, emitter).await?;

            if self.options.progress_interval > 0 && self.frames % self.options.progress_interval == 0 {
                info!(
                    frames = self.frames,
                    live_orders = self.store.len(),
                    symbols = self.store.symbol_count(),
                    "Replay progress"
                );
            }
        }
    }

    async fn apply(&mut self, event: Event, emitter: &mut SnapshotEmitter) -> Result<()> {
        if let Some(timestamp) = event.timestamp() {
            self.last_timestamp = timestamp;
        }

        let applied = match event {
            Event::AddOrder(add) => match add.into_order() {
                Some((order_id, order)) => self.store.apply_add(order_id, order),
                None => {
                    self.incomplete("add_order");
                    return Ok(());
                }
            },
            Event::ExecuteOrder(exec) => match (exec.order_id, exec.executed_quantity) {
                (Some(order_id), Some(quantity)) => self.store.apply_execute(order_id, quantity),
                _ => {
                    self.incomplete("execute_order");
                    return Ok(());
                }
            },
            Event::DeleteOrder(delete) => match delete.order_id {
                Some(order_id) => self.store.apply_delete(order_id),
                None => {
                    self.incomplete("delete_order");
                    return Ok(());
                }
            },
            Event::ReplaceOrder(replace) => match (replace.old_order_id, replace.new_order_id) {
                (Some(old_order_id), Some(new_order_id)) => self.store.apply_replace(
                    old_order_id,
                    new_order_id,
                    replace.new_price,
                    replace.new_quantity,
                ),
                _ => {
                    self.incomplete("replace_order");
                    return Ok(());
                }
            },
            Event::SnapshotTrigger(trigger) => {
                let timestamp = trigger.timestamp.unwrap_or(self.last_timestamp);
                let count = emitter.emit(&self.store, timestamp).await?;
                self.metrics.record_snapshots(count);
                return Ok(());
            }
            Event::Unrecognized(unrecognized) => {
                debug!(
                    tag = %tag_label(unrecognized.type_tag),
                    length = unrecognized.length,
                    "Unrecognized frame"
                );
                self.record(Anomaly::Unrecognized);
                return Ok(());
            }
        };

        self.events_applied += 1;
        self.metrics.set_live_orders(self.store.len());

        match applied {
            Applied::NotFound => self.record(Anomaly::MissingOrder),
            Applied::Overwritten => self.record(Anomaly::DuplicateAdd),
            Applied::ZeroQuantity => self.record(Anomaly::ZeroQuantity),
            Applied::Inserted | Applied::Reduced | Applied::Retired | Applied::Replaced => {}
        }
        Ok(())
    }

    fn incomplete(&mut self, event: &'static str) {
        debug!(event, frame = self.frames, "Skipping event with missing fields");
        self.record(Anomaly::IncompleteEvent);
    }

    fn record(&mut self, anomaly: Anomaly) {
        self.metrics.record_anomaly(anomaly);
        *self.anomalies.entry(anomaly).or_default() += 1;
    }

    fn summary(&self, interrupted: bool, snapshots: u64) -> ReplaySummary {
        ReplaySummary {
            frames: self.frames,
            events_applied: self.events_applied,
            snapshots,
            live_orders: self.store.len(),
            symbols: self.store.symbol_count(),
            frame_census: self.census.clone(),
            anomalies: self
                .anomalies
                .iter()
                .map(|(anomaly, count)| (anomaly.as_str().to_string(), *count))
                .collect(),
            interrupted,
        }
    }
}
