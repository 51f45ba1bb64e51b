//! Typed market events produced by the decoder
//!
//! Every wire-derived field is optional: a truncated frame carries only the
//! fields whose bytes were present.

use bytes::Bytes;
use rust_decimal::Decimal;

use crate::orderbook::{LiveOrder, OrderId, Side};

/// Add a new resting order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOrder {
    pub order_id: Option<OrderId>,
    pub symbol: Option<String>,
    pub side: Option<Side>,
    pub price: Option<Decimal>,
    pub quantity: Option<u64>,
    pub timestamp: Option<u64>,
}

impl AddOrder {
    /// Split into the order id and the order to store, if every required field is present
    ///
    /// A missing timestamp is not fatal and defaults to zero.
    pub fn into_order(self) -> Option<(OrderId, LiveOrder)> {
        Some((
            self.order_id?,
            LiveOrder {
                symbol: self.symbol?,
                side: self.side?,
                price: self.price?,
                quantity: self.quantity?,
                timestamp: self.timestamp.unwrap_or_default(),
            },
        ))
    }
}

/// Execution against a resting order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteOrder {
    pub order_id: Option<OrderId>,
    pub executed_quantity: Option<u64>,
    pub timestamp: Option<u64>,
}

/// Removal of a resting order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOrder {
    pub order_id: Option<OrderId>,
    pub timestamp: Option<u64>,
}

/// Cancel-replace of a resting order under a new id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceOrder {
    pub old_order_id: Option<OrderId>,
    pub new_order_id: Option<OrderId>,
    /// Absent means the old price carries forward
    pub new_price: Option<Decimal>,
    /// Absent means the old quantity carries forward
    pub new_quantity: Option<u64>,
    pub timestamp: Option<u64>,
}

/// Request to materialize depth for every symbol
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotTrigger {
    pub timestamp: Option<u64>,
}

/// A frame whose tag has no registered layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unrecognized {
    /// `None` only when the frame was empty
    pub type_tag: Option<u8>,
    pub raw_bytes: Bytes,
    pub length: usize,
}

/// Decoded market event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    AddOrder(AddOrder),
    ExecuteOrder(ExecuteOrder),
    DeleteOrder(DeleteOrder),
    ReplaceOrder(ReplaceOrder),
    SnapshotTrigger(SnapshotTrigger),
    Unrecognized(Unrecognized),
}

impl Event {
    /// Timestamp carried by the event, if any
    pub fn timestamp(&self) -> Option<u64> {
        match self {
            Event::AddOrder(e) => e.timestamp,
            Event::ExecuteOrder(e) => e.timestamp,
            Event::DeleteOrder(e) => e.timestamp,
            Event::ReplaceOrder(e) => e.timestamp,
            Event::SnapshotTrigger(e) => e.timestamp,
            Event::Unrecognized(_) => None,
        }
    }
}

/// Printable label for a type tag, used in logs and metric labels
pub fn tag_label(tag: Option<u8>) -> String {
    match tag {
        Some(b) if b.is_ascii_graphic() => (b as char).to_string(),
        Some(b) => format!("0x{:02X}", b),
        None => "empty".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_into_order_requires_fields() {
        let add = AddOrder {
            order_id: Some(7),
            symbol: Some("ABC".to_string()),
            side: Some(Side::Bid),
            price: Some(dec!(10.00)),
            quantity: None,
            timestamp: Some(1),
        };
        assert!(add.clone().into_order().is_none());

        let (id, order) = AddOrder {
            quantity: Some(100),
            timestamp: None,
            ..add
        }
        .into_order()
        .unwrap();
        assert_eq!(id, 7);
        assert_eq!(order.quantity, 100);
        assert_eq!(order.timestamp, 0);
    }

    #[test]
    fn test_tag_label() {
        assert_eq!(tag_label(Some(b'Z')), "Z");
        assert_eq!(tag_label(Some(0x01)), "0x01");
        assert_eq!(tag_label(None), "empty");
    }
}
