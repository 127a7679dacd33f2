//! # stratadb - Schema-Driven Indexed Record Layer
//!
//! stratadb turns an embedded, ordered key-value engine into a typed,
//! multi-indexed record store: auto-increment or caller-supplied primary
//! keys, unique and non-unique secondary indexes, multi-valued
//! ("exploded") indexes, computed and filtered indexes, diff-based index
//! maintenance on partial updates, and ordered, restartable,
//! bidirectional iteration with zero-copy reads.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │   Generated per-schema surface (typed ops)    │
//! ├──────────────────────────────────────────────┤
//! │  Index Engine (table)  │  Iteration (scan)    │
//! ├────────────────────────┴─────────────────────┤
//! │  Record Codec (records)  │ Key Codec (encoding)│
//! ├──────────────────────────────────────────────┤
//! │  Environment / Transactions (env, txn)        │
//! ├──────────────────────────────────────────────┤
//! │  KV engine: redb (tables, multimaps, MVCC)    │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! One table is one main sub-database (8-byte big-endian id -> packed
//! payload) plus one sub-database per index. All sub-databases of a
//! transaction commit atomically; aborting (or dropping) a write
//! transaction leaves zero observable effects.
//!
//! ## Quick Start
//!
//! ```ignore
//! use stratadb::{Environment, FieldDef, FieldKind, IndexDef, Schema, TableDef};
//!
//! fn name_keys(view: &stratadb::RecordView) -> eyre::Result<stratadb::IndexKeys> {
//!     Ok(smallvec::smallvec![view.get_text(0)?.as_bytes().to_vec()])
//! }
//!
//! let users = TableDef::new(
//!     "User",
//!     Schema::new(vec![
//!         FieldDef::new("userName", FieldKind::Text),
//!         FieldDef::new("created", FieldKind::U64),
//!     ]),
//!     vec![IndexDef::unique("userName", "User__userName", name_keys)],
//! );
//!
//! let env = Environment::open("./db", &[&users])?;
//! let txn = env.txn_rw()?;
//! // build a payload with RecordBuilder, then:
//! // let id = users.insert(&txn, &payload, None)?;
//! txn.commit()?;
//! ```
//!
//! In practice the `TableDef`, extractor functions, and typed wrappers
//! are emitted by the schema compiler; this crate is the runtime they
//! call into.
//!
//! ## Module Overview
//!
//! - [`env`]: environment binding, builder, sub-database provisioning
//! - [`txn`]: read / write transaction wrappers
//! - [`encoding`]: byte-comparable key encoding
//! - [`records`]: payload packing and zero-copy views
//! - [`index`]: index definitions and key-set arithmetic
//! - [`table`]: insert / update / delete / lookup with index maintenance
//! - [`scan`]: ordered bidirectional scans
//! - [`error`]: typed error payloads

pub mod encoding;
pub mod env;
pub mod error;
pub mod index;
pub mod records;
pub mod row;
pub mod scan;
pub mod table;
pub mod txn;

pub use encoding::key::{decode_u64, encode_composite, encode_u64, split_subkey, PK_ID_LEN};
pub use env::{Environment, EnvironmentBuilder};
pub use error::{Corruption, UniqueConstraintViolation};
pub use index::{IndexDef, IndexKeys};
pub use records::{FieldDef, FieldKind, RecordBuilder, RecordView, Schema};
pub use row::Row;
pub use table::TableDef;
pub use txn::{ReadTxn, TxnRef, WriteTxn};
