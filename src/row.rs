//! # Row - A Record Plus Its Identity
//!
//! A `Row` is what lookups and scans hand back: the primary key id plus
//! the packed payload. The payload is zero-copy wherever the engine can
//! hand out a stable borrow — read-transaction lookups hold an engine
//! access guard, scan visits borrow the cursor's current value — and an
//! owned buffer only for point lookups inside a write transaction, where
//! the engine's guards cannot outlive the table handle.
//!
//! A `Row` borrows from its transaction and cannot outlive it; the
//! schema-generated view types wrap a `Row` and add typed accessors.

use eyre::Result;

use crate::records::schema::Schema;
use crate::records::view::RecordView;

pub(crate) enum Payload<'a> {
    /// Engine access guard from a read-transaction lookup.
    Guard(redb::AccessGuard<'static, &'static [u8]>),
    /// Borrowed from a scan cursor's current entry.
    Slice(&'a [u8]),
    /// Copied out during a write transaction.
    Owned(Vec<u8>),
}

pub struct Row<'a> {
    id: u64,
    payload: Payload<'a>,
}

impl<'a> Row<'a> {
    pub(crate) fn from_guard(id: u64, guard: redb::AccessGuard<'static, &'static [u8]>) -> Self {
        Self {
            id,
            payload: Payload::Guard(guard),
        }
    }

    pub(crate) fn from_slice(id: u64, payload: &'a [u8]) -> Self {
        Self {
            id,
            payload: Payload::Slice(payload),
        }
    }

    pub(crate) fn from_owned(id: u64, payload: Vec<u8>) -> Self {
        Self {
            id,
            payload: Payload::Owned(payload),
        }
    }

    /// The record's primary key id. Derived from the main-table key,
    /// never stored in the payload.
    pub fn primary_key_id(&self) -> u64 {
        self.id
    }

    /// The packed payload bytes.
    pub fn payload(&self) -> &[u8] {
        match &self.payload {
            Payload::Guard(guard) => guard.value(),
            Payload::Slice(bytes) => bytes,
            Payload::Owned(bytes) => bytes,
        }
    }

    /// Whether the payload is a borrow into engine-owned memory rather
    /// than a copy. True everywhere except write-transaction lookups.
    pub fn is_zero_copy(&self) -> bool {
        !matches!(self.payload, Payload::Owned(_))
    }

    /// Parses the payload against `schema` for typed field access.
    pub fn view<'s>(&'s self, schema: &'s Schema) -> Result<RecordView<'s>> {
        RecordView::parse(self.payload(), schema)
    }
}
