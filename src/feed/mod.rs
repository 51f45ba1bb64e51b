//! Feed module
//!
//! Reads length-prefixed frames from a byte stream and replays them through the
//! decoder, the order store and the snapshot emitter.

mod reader;
mod replay;

pub use reader::{FrameReader, RawFrame, LENGTH_PREFIX};
pub use replay::{ReplayEngine, ReplayOptions, ReplaySummary};
