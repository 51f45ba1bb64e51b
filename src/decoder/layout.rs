//! Declarative message layouts
//!
//! One row per type tag describes where each field lives inside the payload
//! and how its bytes are interpreted. Adding or correcting a message type is a
//! change to this table, never to the decoder.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::event::tag_label;
use crate::error::{DepthError, Result};

/// Largest scale `rust_decimal` accepts
const MAX_PRICE_SCALE: u32 = 28;

/// Which event a layout decodes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AddOrder,
    ExecuteOrder,
    DeleteOrder,
    ReplaceOrder,
    SnapshotTrigger,
}

impl EventKind {
    /// Roles a row must declare for this event to be applicable
    fn required_roles(self) -> &'static [FieldRole] {
        match self {
            EventKind::AddOrder => &[
                FieldRole::OrderId,
                FieldRole::Symbol,
                FieldRole::Side,
                FieldRole::Price,
                FieldRole::Quantity,
            ],
            EventKind::ExecuteOrder => &[FieldRole::OrderId, FieldRole::Quantity],
            EventKind::DeleteOrder => &[FieldRole::OrderId],
            EventKind::ReplaceOrder => &[FieldRole::OldOrderId, FieldRole::NewOrderId],
            EventKind::SnapshotTrigger => &[],
        }
    }
}

/// Semantic meaning of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    Timestamp,
    OrderId,
    OldOrderId,
    NewOrderId,
    Symbol,
    Side,
    Price,
    Quantity,
}

/// How the bytes of a field are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Big-endian unsigned integer, 1-8 bytes
    Unsigned,
    /// Big-endian two's complement integer, 1-8 bytes
    Signed,
    /// Big-endian signed integer scaled by `10^scale`
    Price { scale: u32 },
    /// Fixed-width ASCII, trailing spaces and NULs stripped
    Ascii,
}

impl FieldKind {
    fn is_integer(self) -> bool {
        !matches!(self, FieldKind::Ascii)
    }
}

/// Position and interpretation of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub role: FieldRole,
    pub offset: usize,
    pub width: usize,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(role: FieldRole, offset: usize, width: usize, kind: FieldKind) -> Self {
        Self {
            role,
            offset,
            width,
            kind,
        }
    }

    /// Offset one past the last byte of the field
    pub fn end(&self) -> usize {
        self.offset + self.width
    }
}

/// Layout of a single message type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLayout {
    pub tag: u8,
    pub name: String,
    pub event: EventKind,
    /// Declared frame length; `None` for variable-length messages
    pub length: Option<usize>,
    pub fields: Vec<FieldSpec>,
}

impl MessageLayout {
    pub fn new(
        tag: u8,
        name: &str,
        event: EventKind,
        length: Option<usize>,
        fields: Vec<FieldSpec>,
    ) -> Self {
        Self {
            tag,
            name: name.to_string(),
            event,
            length,
            fields,
        }
    }

    /// Look up the field carrying a given role
    pub fn field(&self, role: FieldRole) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.role == role)
    }

    /// Smallest payload that holds every field
    pub fn min_length(&self) -> usize {
        self.fields.iter().map(FieldSpec::end).max().unwrap_or(1)
    }

    fn validate(&self) -> Result<()> {
        let tag = tag_label(Some(self.tag));
        let fail = |reason: String| -> Result<()> {
            Err(DepthError::Layout(format!("tag {}: {}", tag, reason)))
        };

        if !self.tag.is_ascii_graphic() {
            return fail("type tag must be a printable ASCII byte".to_string());
        }

        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.role == field.role) {
                return fail(format!("role {:?} declared twice", field.role));
            }
            if field.offset == 0 {
                return fail(format!("field {:?} overlaps the type tag", field.role));
            }
            if field.width == 0 || (field.kind.is_integer() && field.width > 8) {
                return fail(format!(
                    "field {:?} has unsupported width {}",
                    field.role, field.width
                ));
            }
            if let FieldKind::Price { scale } = field.kind {
                if scale > MAX_PRICE_SCALE {
                    return fail(format!("price scale {} exceeds {}", scale, MAX_PRICE_SCALE));
                }
            }
            if let Some(length) = self.length {
                if field.end() > length {
                    return fail(format!(
                        "field {:?} ends at {} beyond declared length {}",
                        field.role,
                        field.end(),
                        length
                    ));
                }
            }

            let compatible = match field.role {
                FieldRole::Symbol | FieldRole::Side => field.kind == FieldKind::Ascii,
                FieldRole::Price => matches!(field.kind, FieldKind::Price { .. }),
                _ => matches!(field.kind, FieldKind::Unsigned | FieldKind::Signed),
            };
            if !compatible {
                return fail(format!(
                    "field {:?} cannot be decoded as {:?}",
                    field.role, field.kind
                ));
            }
        }

        for role in self.event.required_roles() {
            if self.field(*role).is_none() {
                return fail(format!("{:?} requires a {:?} field", self.event, role));
            }
        }

        Ok(())
    }
}

/// Registered layouts keyed by type tag
#[derive(Debug, Clone)]
pub struct LayoutTable {
    layouts: HashMap<u8, MessageLayout>,
}

impl LayoutTable {
    /// Build a table, validating every row and rejecting duplicate tags
    pub fn new(rows: Vec<MessageLayout>) -> Result<Self> {
        let mut layouts = HashMap::with_capacity(rows.len());
        for row in rows {
            row.validate()?;
            let tag = row.tag;
            if layouts.insert(tag, row).is_some() {
                return Err(DepthError::Layout(format!(
                    "tag {} registered twice",
                    tag_label(Some(tag))
                )));
            }
        }
        Ok(Self { layouts })
    }

    /// Load a table from a TOML or JSON file
    ///
    /// ```toml
    /// [[messages]]
    /// tag = "D"
    /// name = "delete_order"
    /// event = "delete_order"
    /// length = 13
    /// fields = [
    ///   { role = "timestamp", offset = 1, width = 4, kind = "unsigned" },
    ///   { role = "order_id", offset = 5, width = 8, kind = "unsigned" },
    /// ]
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;
        let file: LayoutFile = settings.try_deserialize()?;

        let rows = file
            .messages
            .into_iter()
            .map(LayoutRow::into_layout)
            .collect::<Result<Vec<_>>>()?;
        Self::new(rows)
    }

    /// Look up the layout registered for a tag
    pub fn get(&self, tag: u8) -> Option<&MessageLayout> {
        self.layouts.get(&tag)
    }

    /// Registered tags in ascending order
    pub fn tags(&self) -> Vec<u8> {
        let mut tags: Vec<u8> = self.layouts.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

impl Default for LayoutTable {
    /// The confirmed PSE ITCH layouts
    fn default() -> Self {
        Self {
            layouts: pse_itch_layouts()
                .into_iter()
                .map(|layout| (layout.tag, layout))
                .collect(),
        }
    }
}

/// Message types of the PSE ITCH feed whose full layout is confirmed
///
/// Types seen on the wire with unresolved fields (`R`, `k`, `H`, `f`, `L`,
/// `s`, `M`, `S`) are left out and decode as unrecognized.
pub fn pse_itch_layouts() -> Vec<MessageLayout> {
    use FieldKind::{Ascii, Unsigned};
    use FieldRole::*;

    let price = FieldKind::Price { scale: 2 };

    vec![
        MessageLayout::new(
            b'A',
            "add_order",
            EventKind::AddOrder,
            Some(30),
            vec![
                FieldSpec::new(Timestamp, 1, 4, Unsigned),
                FieldSpec::new(OrderId, 5, 8, Unsigned),
                FieldSpec::new(Symbol, 13, 8, Ascii),
                FieldSpec::new(Quantity, 21, 4, Unsigned),
                FieldSpec::new(Price, 25, 4, price),
                FieldSpec::new(Side, 29, 1, Ascii),
            ],
        ),
        // trailing execution price is not needed for depth
        MessageLayout::new(
            b'e',
            "order_executed",
            EventKind::ExecuteOrder,
            None,
            vec![
                FieldSpec::new(Timestamp, 1, 4, Unsigned),
                FieldSpec::new(OrderId, 5, 8, Unsigned),
                FieldSpec::new(Quantity, 13, 4, Unsigned),
            ],
        ),
        MessageLayout::new(
            b'D',
            "delete_order",
            EventKind::DeleteOrder,
            Some(13),
            vec![
                FieldSpec::new(Timestamp, 1, 4, Unsigned),
                FieldSpec::new(OrderId, 5, 8, Unsigned),
            ],
        ),
        MessageLayout::new(
            b'U',
            "replace_order",
            EventKind::ReplaceOrder,
            Some(25),
            vec![
                FieldSpec::new(Timestamp, 1, 4, Unsigned),
                FieldSpec::new(OldOrderId, 5, 8, Unsigned),
                FieldSpec::new(NewOrderId, 13, 8, Unsigned),
                FieldSpec::new(Quantity, 21, 4, Unsigned),
            ],
        ),
        MessageLayout::new(
            b'T',
            "seconds",
            EventKind::SnapshotTrigger,
            Some(5),
            vec![FieldSpec::new(Timestamp, 1, 4, Unsigned)],
        ),
    ]
}

#[derive(Debug, Deserialize)]
struct LayoutFile {
    messages: Vec<LayoutRow>,
}

#[derive(Debug, Deserialize)]
struct LayoutRow {
    tag: String,
    name: Option<String>,
    event: EventKind,
    length: Option<usize>,
    #[serde(default)]
    fields: Vec<FieldRow>,
}

#[derive(Debug, Deserialize)]
struct FieldRow {
    role: FieldRole,
    offset: usize,
    width: usize,
    kind: FieldKindName,
    scale: Option<u32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FieldKindName {
    Unsigned,
    Signed,
    Price,
    Ascii,
}

impl LayoutRow {
    fn into_layout(self) -> Result<MessageLayout> {
        let tag = match self.tag.as_bytes() {
            [b] => *b,
            _ => {
                return Err(DepthError::Layout(format!(
                    "tag {:?} must be exactly one byte",
                    self.tag
                )))
            }
        };

        let fields = self
            .fields
            .into_iter()
            .map(|row| {
                let kind = match (row.kind, row.scale) {
                    (FieldKindName::Price, Some(scale)) => FieldKind::Price { scale },
                    (FieldKindName::Price, None) => {
                        return Err(DepthError::Layout(format!(
                            "tag {}: price field {:?} needs a scale",
                            self.tag, row.role
                        )))
                    }
                    (_, Some(_)) => {
                        return Err(DepthError::Layout(format!(
                            "tag {}: scale only applies to price fields",
                            self.tag
                        )))
                    }
                    (FieldKindName::Unsigned, None) => FieldKind::Unsigned,
                    (FieldKindName::Signed, None) => FieldKind::Signed,
                    (FieldKindName::Ascii, None) => FieldKind::Ascii,
                };
                Ok(FieldSpec::new(row.role, row.offset, row.width, kind))
            })
            .collect::<Result<Vec<_>>>()?;

        let name = self.name.unwrap_or_else(|| format!("type_{}", self.tag));
        Ok(MessageLayout::new(tag, &name, self.event, self.length, fields))
    }
}
