//! # Entity Wire Protocol
//!
//! One frame per entity per target client per cycle.
//!
//! ## Frame Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (32 bytes, little-endian)                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │ id u64 │ kind u64 │ x f32 │ y f32 │ z f32 │ range u32        │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Attribute extension (only when keys changed)                 │
//! │ count u16 │ { key_len u16 │ key │ tag u8 │ payload } * count │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Attribute Tags
//!
//! | tag | kind    | payload                 |
//! |-----|---------|-------------------------|
//! | 0   | removed | none                    |
//! | 1   | bool    | u8 (0 / 1)              |
//! | 2   | int     | i64                     |
//! | 3   | float   | f64                     |
//! | 4   | text    | u32 length + UTF-8      |
//! | 5   | bytes   | u32 length + raw        |
//! | 6   | vec3    | f32 x, f32 y, f32 z     |
//!
//! A frame that ends right after the header carries no attribute changes.
//! When the changed attributes do not fit one frame, they are spread over
//! several frames that each repeat the header.

mod frame;
mod reader;
mod writer;

pub use frame::{
    decode_entity_frame, encode_entity_frame, encode_entity_frames, AttributeTag, EntityFrame,
    EntityHeader, FrameBatch,
};
pub use reader::FrameReader;
pub use writer::FrameWriter;
