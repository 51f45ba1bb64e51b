//! ITCH depth replay library
//!
//! This crate reconstructs Level-2 depth from binary ITCH market data:
//! length-prefixed frames are decoded through a declarative layout table,
//! applied to an order-level store, and aggregated into per-symbol depth
//! snapshots on each snapshot trigger.

pub mod config;
pub mod decoder;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod orderbook;
pub mod publisher;

pub use config::{Config, OutputFormat};
pub use decoder::{Decoder, Event, LayoutTable};
pub use error::{DepthError, Result};
pub use feed::{FrameReader, RawFrame, ReplayEngine, ReplayOptions, ReplaySummary};
pub use metrics::{Anomaly, FeedMetrics};
pub use orderbook::{DepthAggregator, DepthSnapshot, LiveOrder, OrderStore, PriceLevel, Side};
pub use publisher::{CsvSink, JsonLinesSink, MsgPackSink, SnapshotEmitter, SnapshotSink};
