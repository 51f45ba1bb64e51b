//! Frame decoding driven by the layout table

use bytes::Buf;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::trace;

use super::event::{
    tag_label, AddOrder, DeleteOrder, Event, ExecuteOrder, ReplaceOrder, SnapshotTrigger,
    Unrecognized,
};
use super::layout::{EventKind, FieldKind, FieldRole, FieldSpec, LayoutTable, MessageLayout};
use crate::feed::RawFrame;
use crate::orderbook::Side;

/// Stateless frame decoder
///
/// Cloning shares the layout table, so one decoder can be handed to any
/// number of worker tasks.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    table: Arc<LayoutTable>,
}

impl Decoder {
    /// Create a decoder over a layout table
    pub fn new(table: LayoutTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &LayoutTable {
        &self.table
    }

    /// Decode one frame
    ///
    /// Never fails: unknown tags and empty frames become `Unrecognized`, and
    /// fields that do not fit in a short frame are left absent.
    pub fn decode(&self, frame: &RawFrame) -> Event {
        let payload = &frame.payload[..];

        let Some(&tag) = payload.first() else {
            return unrecognized(None, frame);
        };
        let Some(layout) = self.table.get(tag) else {
            return unrecognized(Some(tag), frame);
        };

        if let Some(expected) = layout.length {
            if payload.len() != expected {
                trace!(
                    tag = %tag_label(Some(tag)),
                    expected,
                    actual = payload.len(),
                    "Frame length differs from layout"
                );
            }
        }

        let fields = Fields { layout, payload };
        match layout.event {
            EventKind::AddOrder => Event::AddOrder(AddOrder {
                order_id: fields.unsigned(FieldRole::OrderId),
                symbol: fields.text(FieldRole::Symbol),
                side: fields.side(FieldRole::Side),
                price: fields.price(FieldRole::Price),
                quantity: fields.unsigned(FieldRole::Quantity),
                timestamp: fields.unsigned(FieldRole::Timestamp),
            }),
            EventKind::ExecuteOrder => Event::ExecuteOrder(ExecuteOrder {
                order_id: fields.unsigned(FieldRole::OrderId),
                executed_quantity: fields.unsigned(FieldRole::Quantity),
                timestamp: fields.unsigned(FieldRole::Timestamp),
            }),
            EventKind::DeleteOrder => Event::DeleteOrder(DeleteOrder {
                order_id: fields.unsigned(FieldRole::OrderId),
                timestamp: fields.unsigned(FieldRole::Timestamp),
            }),
            EventKind::ReplaceOrder => Event::ReplaceOrder(ReplaceOrder {
                old_order_id: fields.unsigned(FieldRole::OldOrderId),
                new_order_id: fields.unsigned(FieldRole::NewOrderId),
                new_price: fields.price(FieldRole::Price),
                new_quantity: fields.unsigned(FieldRole::Quantity),
                timestamp: fields.unsigned(FieldRole::Timestamp),
            }),
            EventKind::SnapshotTrigger => Event::SnapshotTrigger(SnapshotTrigger {
                timestamp: fields.unsigned(FieldRole::Timestamp),
            }),
        }
    }
}

fn unrecognized(type_tag: Option<u8>, frame: &RawFrame) -> Event {
    Event::Unrecognized(Unrecognized {
        type_tag,
        raw_bytes: frame.payload.clone(),
        length: frame.length as usize,
    })
}

/// Field accessor over one payload
struct Fields<'a> {
    layout: &'a MessageLayout,
    payload: &'a [u8],
}

impl<'a> Fields<'a> {
    fn bytes(&self, role: FieldRole) -> Option<(&'a FieldSpec, &'a [u8])> {
        let spec = self.layout.field(role)?;
        let bytes = self.payload.get(spec.offset..spec.end())?;
        Some((spec, bytes))
    }

    fn unsigned(&self, role: FieldRole) -> Option<u64> {
        let (spec, bytes) = self.bytes(role)?;
        match spec.kind {
            FieldKind::Unsigned => Some(be_unsigned(bytes)),
            FieldKind::Signed => u64::try_from(be_signed(bytes)).ok(),
            _ => None,
        }
    }

    fn price(&self, role: FieldRole) -> Option<Decimal> {
        let (spec, bytes) = self.bytes(role)?;
        match spec.kind {
            FieldKind::Price { scale } => Some(Decimal::new(be_signed(bytes), scale)),
            _ => None,
        }
    }

    fn text(&self, role: FieldRole) -> Option<String> {
        let (spec, bytes) = self.bytes(role)?;
        match spec.kind {
            FieldKind::Ascii => ascii(bytes),
            _ => None,
        }
    }

    fn side(&self, role: FieldRole) -> Option<Side> {
        match self.text(role)?.as_str() {
            "B" => Some(Side::Bid),
            "S" => Some(Side::Ask),
            _ => None,
        }
    }
}

fn be_unsigned(mut bytes: &[u8]) -> u64 {
    let width = bytes.len();
    bytes.get_uint(width)
}

fn be_signed(mut bytes: &[u8]) -> i64 {
    if bytes.is_empty() {
        return 0;
    }
    let width = bytes.len();
    bytes.get_int(width)
}

fn ascii(bytes: &[u8]) -> Option<String> {
    let end = bytes
        .iter()
        .rposition(|b| *b != b' ' && *b != 0)
        .map_or(0, |i| i + 1);
    let trimmed = &bytes[..end];
    if trimmed.is_empty() || !trimmed.is_ascii() {
        return None;
    }
    Some(String::from_utf8_lossy(trimmed).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::layout::MessageLayout;
    use bytes::Bytes;
    use rust_decimal_macros::dec;

    fn frame(payload: Vec<u8>) -> RawFrame {
        RawFrame::new(Bytes::from(payload))
    }

    fn add_payload(ts: u32, id: u64, symbol: &str, qty: u32, price: u32, side: u8) -> Vec<u8> {
        let mut b = vec![b'A'];
        b.extend_from_slice(&ts.to_be_bytes());
        b.extend_from_slice(&id.to_be_bytes());
        let mut sym = [b' '; 8];
        sym[..symbol.len()].copy_from_slice(symbol.as_bytes());
        b.extend_from_slice(&sym);
        b.extend_from_slice(&qty.to_be_bytes());
        b.extend_from_slice(&price.to_be_bytes());
        b.push(side);
        b
    }

    #[test]
    fn test_decode_add_order() {
        let decoder = Decoder::default();
        let event = decoder.decode(&frame(add_payload(34200, 1, "ABC", 100, 1000, b'B')));

        assert_eq!(
            event,
            Event::AddOrder(AddOrder {
                order_id: Some(1),
                symbol: Some("ABC".to_string()),
                side: Some(Side::Bid),
                price: Some(dec!(10.00)),
                quantity: Some(100),
                timestamp: Some(34200),
            })
        );
    }

    #[test]
    fn test_decode_truncated_add_keeps_leading_fields() {
        let decoder = Decoder::default();
        let mut payload = add_payload(5, 42, "ABC", 100, 1000, b'S');
        payload.truncate(16);

        let Event::AddOrder(add) = decoder.decode(&frame(payload)) else {
            panic!("Expected AddOrder");
        };
        assert_eq!(add.timestamp, Some(5));
        assert_eq!(add.order_id, Some(42));
        assert_eq!(add.symbol, None);
        assert_eq!(add.quantity, None);
        assert_eq!(add.side, None);
        assert!(add.into_order().is_none());
    }

    #[test]
    fn test_decode_unknown_tag() {
        let decoder = Decoder::default();
        let event = decoder.decode(&frame(b"Z\x00\x01\x02".to_vec()));

        let Event::Unrecognized(u) = event else {
            panic!("Expected Unrecognized");
        };
        assert_eq!(u.type_tag, Some(b'Z'));
        assert_eq!(u.length, 4);
        assert_eq!(&u.raw_bytes[..], b"Z\x00\x01\x02");
    }

    #[test]
    fn test_decode_unconfirmed_layout_is_unrecognized() {
        let decoder = Decoder::default();
        let mut payload = vec![b'R'];
        payload.resize(90, 0);

        assert!(matches!(
            decoder.decode(&frame(payload)),
            Event::Unrecognized(Unrecognized { type_tag: Some(b'R'), length: 90, .. })
        ));
    }

    #[test]
    fn test_decode_empty_frame() {
        let decoder = Decoder::default();
        assert!(matches!(
            decoder.decode(&frame(Vec::new())),
            Event::Unrecognized(Unrecognized { type_tag: None, length: 0, .. })
        ));
    }

    #[test]
    fn test_decode_replace_has_no_price() {
        let decoder = Decoder::default();
        let mut payload = vec![b'U'];
        payload.extend_from_slice(&9u32.to_be_bytes());
        payload.extend_from_slice(&1u64.to_be_bytes());
        payload.extend_from_slice(&2u64.to_be_bytes());
        payload.extend_from_slice(&200u32.to_be_bytes());

        assert_eq!(
            decoder.decode(&frame(payload)),
            Event::ReplaceOrder(ReplaceOrder {
                old_order_id: Some(1),
                new_order_id: Some(2),
                new_price: None,
                new_quantity: Some(200),
                timestamp: Some(9),
            })
        );
    }

    #[test]
    fn test_decode_execute_ignores_trailing_bytes() {
        let decoder = Decoder::default();
        let mut payload = vec![b'e'];
        payload.extend_from_slice(&1u32.to_be_bytes());
        payload.extend_from_slice(&77u64.to_be_bytes());
        payload.extend_from_slice(&40u32.to_be_bytes());
        payload.extend_from_slice(&1000u32.to_be_bytes());
        payload.extend_from_slice(&[0u8; 12]);

        assert_eq!(
            decoder.decode(&frame(payload)),
            Event::ExecuteOrder(ExecuteOrder {
                order_id: Some(77),
                executed_quantity: Some(40),
                timestamp: Some(1),
            })
        );
    }

    #[test]
    fn test_decode_invalid_side_is_absent() {
        let decoder = Decoder::default();
        let Event::AddOrder(add) = decoder.decode(&frame(add_payload(1, 1, "ABC", 1, 1, 0x7F)))
        else {
            panic!("Expected AddOrder");
        };
        assert_eq!(add.side, None);
        assert_eq!(add.symbol.as_deref(), Some("ABC"));
    }

    #[test]
    fn test_decode_trigger_without_timestamp() {
        let decoder = Decoder::default();
        assert_eq!(
            decoder.decode(&frame(b"T\x00\x00".to_vec())),
            Event::SnapshotTrigger(SnapshotTrigger { timestamp: None })
        );
    }

    #[test]
    fn test_decode_signed_price() {
        let layout = MessageLayout::new(
            b'a',
            "add_signed",
            EventKind::AddOrder,
            None,
            vec![
                FieldSpec::new(FieldRole::OrderId, 1, 2, FieldKind::Unsigned),
                FieldSpec::new(FieldRole::Symbol, 3, 3, FieldKind::Ascii),
                FieldSpec::new(FieldRole::Side, 6, 1, FieldKind::Ascii),
                FieldSpec::new(FieldRole::Price, 7, 2, FieldKind::Price { scale: 1 }),
                FieldSpec::new(FieldRole::Quantity, 9, 1, FieldKind::Unsigned),
            ],
        );
        let decoder = Decoder::new(LayoutTable::new(vec![layout]).unwrap());

        let mut payload = vec![b'a', 0x01, 0x02];
        payload.extend_from_slice(b"XY\0");
        payload.push(b'S');
        payload.extend_from_slice(&(-25i16).to_be_bytes());
        payload.push(3);

        let Event::AddOrder(add) = decoder.decode(&frame(payload)) else {
            panic!("Expected AddOrder");
        };
        assert_eq!(add.order_id, Some(0x0102));
        assert_eq!(add.symbol.as_deref(), Some("XY"));
        assert_eq!(add.side, Some(Side::Ask));
        assert_eq!(add.price, Some(dec!(-2.5)));
        assert_eq!(add.quantity, Some(3));
    }

    #[test]
    fn test_decode_signed_integer_fields() {
        let layout = MessageLayout::new(
            b'D',
            "delete_order",
            EventKind::DeleteOrder,
            Some(13),
            vec![
                FieldSpec::new(FieldRole::Timestamp, 1, 4, FieldKind::Signed),
                FieldSpec::new(FieldRole::OrderId, 5, 8, FieldKind::Signed),
            ],
        );
        let decoder = Decoder::new(LayoutTable::new(vec![layout]).unwrap());

        let mut payload = vec![b'D'];
        payload.extend_from_slice(&(-1i32).to_be_bytes());
        payload.extend_from_slice(&77i64.to_be_bytes());

        let Event::DeleteOrder(delete) = decoder.decode(&frame(payload)) else {
            panic!("Expected DeleteOrder");
        };
        // negative values cannot be timestamps or ids
        assert_eq!(delete.timestamp, None);
        assert_eq!(delete.order_id, Some(77));
    }

    #[test]
    fn test_be_helpers() {
        assert_eq!(be_unsigned(&[0x01, 0x00]), 256);
        assert_eq!(be_signed(&[0xFF, 0xFE]), -2);
        assert_eq!(be_signed(&[0x7F]), 127);
        assert_eq!(be_signed(&[0xFF; 8]), -1);
        assert_eq!(be_unsigned(&[0xFF; 8]), u64::MAX);
        assert_eq!(be_unsigned(&[]), 0);
        assert_eq!(ascii(b"AB  \0\0"), Some("AB".to_string()));
        assert_eq!(ascii(b"    "), None);
    }
}
