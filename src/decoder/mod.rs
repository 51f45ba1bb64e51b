//! Message decoder module
//!
//! Turns raw frames into typed events using a declarative per-tag layout table.

mod decode;
mod event;
mod layout;

pub use decode::Decoder;
pub use event::{
    tag_label, AddOrder, DeleteOrder, Event, ExecuteOrder, ReplaceOrder, SnapshotTrigger,
    Unrecognized,
};
pub use layout::{
    pse_itch_layouts, EventKind, FieldKind, FieldRole, FieldSpec, LayoutTable, MessageLayout,
};
