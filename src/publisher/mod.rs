//! Publisher module for depth snapshots
//!
//! The emitter freezes one consistent depth view per symbol on each trigger and
//! hands the snapshots to a sink running on a blocking writer task, behind a
//! bounded channel.

mod sinks;

pub use sinks::{CsvSink, JsonLinesSink, MsgPackSink};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{DepthError, Result};
use crate::orderbook::{DepthAggregator, DepthSnapshot, OrderStore};

/// Destination for emitted snapshots
///
/// Called from a blocking thread, so implementations may do synchronous I/O.
#[cfg_attr(test, mockall::automock)]
pub trait SnapshotSink: Send {
    /// Persist one snapshot
    fn write(&mut self, snapshot: &DepthSnapshot) -> Result<()>;

    /// Flush buffered output
    fn flush(&mut self) -> Result<()>;
}

impl SnapshotSink for Box<dyn SnapshotSink> {
    fn write(&mut self, snapshot: &DepthSnapshot) -> Result<()> {
        (**self).write(snapshot)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Handle on the writer task owning the sink
pub struct SinkHandle {
    task: JoinHandle<Result<u64>>,
}

impl SinkHandle {
    /// Wait for the writer to drain and flush, returning snapshots written
    pub async fn finish(self) -> Result<u64> {
        self.task.await?
    }
}

/// Builds depth snapshots on trigger and forwards them to the sink
pub struct SnapshotEmitter {
    aggregator: DepthAggregator,
    tx: mpsc::Sender<DepthSnapshot>,
    emitted: u64,
}

impl SnapshotEmitter {
    /// Start the writer task for `sink` and return the emitter feeding it
    pub fn spawn<S>(sink: S, aggregator: DepthAggregator, capacity: usize) -> (Self, SinkHandle)
    where
        S: SnapshotSink + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let task = tokio::task::spawn_blocking(move || drain(sink, rx));

        (
            Self {
                aggregator,
                tx,
                emitted: 0,
            },
            SinkHandle { task },
        )
    }

    /// Snapshots of every symbol with live orders, in symbol order
    ///
    /// All snapshots are built from the same borrow of the store, so they
    /// observe one state.
    pub fn capture(&self, store: &OrderStore, timestamp: u64) -> Vec<DepthSnapshot> {
        store
            .symbols()
            .filter_map(|symbol| self.aggregator.snapshot(store, symbol, timestamp))
            .collect()
    }

    /// Capture and send the snapshots for one trigger
    ///
    /// Waits for channel capacity when the sink is behind.
    pub async fn emit(&mut self, store: &OrderStore, timestamp: u64) -> Result<usize> {
        let snapshots = self.capture(store, timestamp);
        let count = snapshots.len();

        for snapshot in snapshots {
            self.tx
                .send(snapshot)
                .await
                .map_err(|_| DepthError::ChannelClosed)?;
        }

        self.emitted += count as u64;
        debug!(timestamp, symbols = count, "Emitted depth snapshots");
        Ok(count)
    }

    /// Total snapshots handed to the sink
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

fn drain<S: SnapshotSink>(mut sink: S, mut rx: mpsc::Receiver<DepthSnapshot>) -> Result<u64> {
    let mut written = 0u64;
    while let Some(snapshot) = rx.blocking_recv() {
        if let Err(e) = sink.write(&snapshot) {
            error!(error = %e, symbol = %snapshot.symbol, "Snapshot sink write failed");
            return Err(e);
        }
        written += 1;
    }

    sink.flush()?;
    info!(written, "Snapshot sink closed");
    Ok(written)
}
