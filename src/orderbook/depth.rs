//! Level-2 depth aggregation
//!
//! Uses BTreeMap for sorted price level grouping.

use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::BTreeMap;

use super::{DepthSnapshot, OrderStore, PriceLevel, Side};

/// Default number of price levels per side
pub const DEFAULT_DEPTH_LEVELS: usize = 5;

/// Derives per-side price levels for a symbol from the live orders
#[derive(Debug, Clone, Copy)]
pub struct DepthAggregator {
    levels: usize,
}

impl Default for DepthAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH_LEVELS)
    }
}

impl DepthAggregator {
    /// Create an aggregator keeping the best `levels` prices per side
    pub fn new(levels: usize) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Aggregate live orders of `symbol` into (bids, asks)
    ///
    /// Orders beyond the level count stay in the store; they are only left
    /// out of this view.
    pub fn aggregate(&self, store: &OrderStore, symbol: &str) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
        // Bids sorted by price descending (highest first)
        let mut bids: BTreeMap<Reverse<Decimal>, u64> = BTreeMap::new();
        // Asks sorted by price ascending (lowest first)
        let mut asks: BTreeMap<Decimal, u64> = BTreeMap::new();

        // level totals saturate at u64::MAX
        for order in store.orders_for(symbol) {
            let total = match order.side {
                Side::Bid => bids.entry(Reverse(order.price)).or_default(),
                Side::Ask => asks.entry(order.price).or_default(),
            };
            *total = total.saturating_add(order.quantity);
        }

        let bids = bids
            .into_iter()
            .take(self.levels)
            .map(|(Reverse(price), quantity)| PriceLevel { price, quantity })
            .collect();
        let asks = asks
            .into_iter()
            .take(self.levels)
            .map(|(price, quantity)| PriceLevel { price, quantity })
            .collect();

        (bids, asks)
    }

    /// Build a snapshot of `symbol`, or `None` if it has no live orders
    pub fn snapshot(&self, store: &OrderStore, symbol: &str, timestamp: u64) -> Option<DepthSnapshot> {
        let (bids, asks) = self.aggregate(store, symbol);
        if bids.is_empty() && asks.is_empty() {
            return None;
        }

        Some(DepthSnapshot {
            symbol: symbol.to_string(),
            timestamp,
            bids,
            asks,
        })
    }
}
