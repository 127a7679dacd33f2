//! # Typed Error Payloads
//!
//! stratadb reports failures through `eyre::Result` like the rest of the
//! crate, but two conditions need to be machine-recognizable by callers,
//! so they are raised as typed structs wrapped in the `eyre::Report`:
//!
//! - [`UniqueConstraintViolation`]: an insert or update would create a
//!   second entry in a unique index. The transaction stays usable; the
//!   failing operation performs no visible mutation.
//! - [`Corruption`]: a stored payload failed to decode, or an index entry
//!   pointed at a missing record. Fatal for the transaction.
//!
//! Recover them with `report.downcast_ref::<UniqueConstraintViolation>()`.
//! Lookups of absent keys are `Ok(None)`, never errors, and deleting a
//! missing id is a no-op.

use thiserror::Error;

/// An insert or update would create a second entry in a unique index.
///
/// The operation that raised this performed no visible mutation; the
/// enclosing transaction remains usable and may be committed or aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unique constraint violated on {table}.{index}")]
pub struct UniqueConstraintViolation {
    /// Table whose index rejected the write.
    pub table: &'static str,
    /// Name of the unique index.
    pub index: &'static str,
}

/// Stored bytes that the layer itself wrote back failed to decode, or an
/// index entry referenced a primary key id with no record.
///
/// Either way the sub-databases no longer agree with each other and the
/// caller should abort the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("corruption detected: {detail}")]
pub struct Corruption {
    pub detail: String,
}

impl Corruption {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
