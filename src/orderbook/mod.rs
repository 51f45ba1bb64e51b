//! Order book module
//!
//! Order-level state reconstructed from feed events, and the Level-2 depth
//! derived from it.

mod depth;
mod store;

pub use depth::DepthAggregator;
pub use store::{Applied, OrderStore};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Feed-assigned order identifier
pub type OrderId = u64;

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

/// A resting order as last reported by the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveOrder {
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: u64,
    pub timestamp: u64,
}

/// A single level in the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    /// Sum over every live order at this price
    pub quantity: u64,
}

/// Point-in-time depth for one symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    pub symbol: String,
    pub timestamp: u64,
    /// Best (highest) price first
    pub bids: Vec<PriceLevel>,
    /// Best (lowest) price first
    pub asks: Vec<PriceLevel>,
}

impl DepthSnapshot {
    /// Get best bid level
    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    /// Get best ask level
    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }
}
