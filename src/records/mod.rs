//! # Record Serialization with Zero-Copy Field Access
//!
//! This module packs a record's typed fields into a single byte-string
//! payload and reads them back without copying. The payload is what the
//! main sub-database stores under the primary key id.
//!
//! ## Payload Binary Layout
//!
//! Fields appear in schema-declared order, nothing before or after:
//!
//! ```text
//! +----------------+---------------------+----------------------------+
//! | Fixed field    | Variable field      | Repeated field             |
//! | raw LE bytes   | u32 LE len + body   | u32 LE count + elements    |
//! +----------------+---------------------+----------------------------+
//! ```
//!
//! | Kind | Storage |
//! |------|---------|
//! | bool, u8, u16, u32, u64 | inline little-endian, fixed width |
//! | bytes, text | u32-LE length prefix, then the body |
//! | repeated u64 | u32-LE count, then packed 8-byte elements |
//! | repeated bytes/text | u32-LE count, then length-prefixed elements |
//!
//! ## Design Goals
//!
//! 1. **Zero-copy reads**: getters return slices into the payload, which
//!    the engine keeps stable for the transaction's lifetime
//! 2. **Schema-dependent**: kinds come from the schema, not the wire
//! 3. **Validated once**: `RecordView::parse` bounds-checks every length
//!    prefix up front; a bad payload is corruption, not a bad access
//!
//! ## Module Structure
//!
//! - `types`: `FieldKind` and `FieldDef`
//! - `schema`: ordered field list
//! - `view`: `RecordView` and the repeated-field views
//! - `builder`: `RecordBuilder`

pub mod builder;
pub mod schema;
pub mod types;
pub mod view;


pub use builder::RecordBuilder;
pub use schema::Schema;
pub use types::{FieldDef, FieldKind};
pub use view::{BytesSeqView, RecordView, TextSeqView, U64SeqView};
