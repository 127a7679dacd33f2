//! # Transactions
//!
//! Thin wrappers over the engine's transactions. A [`ReadTxn`] is a
//! consistent snapshot; any number may coexist. A [`WriteTxn`] is the
//! single writer; every mutation made through it becomes visible
//! atomically on [`WriteTxn::commit`], and dropping it without
//! committing aborts, leaving zero observable effects.
//!
//! Operations that only read take [`TxnRef`], so they work inside either
//! transaction kind: `table.lookup(&txn, id)` compiles for both. The
//! module also houses the internal `PlainTable` / `MultiTable` enums
//! that let the scan and lookup code treat read- and write-transaction
//! tables uniformly.

use std::ops::Bound;

use eyre::Result;
use redb::{
    MultimapTableDefinition, ReadableMultimapTable, ReadableTable, ReadableTableMetadata,
    TableDefinition,
};

pub(crate) type Bytes = &'static [u8];

pub(crate) fn plain_def(name: &'static str) -> TableDefinition<'static, Bytes, Bytes> {
    TableDefinition::new(name)
}

pub(crate) fn multi_def(name: &'static str) -> MultimapTableDefinition<'static, Bytes, Bytes> {
    MultimapTableDefinition::new(name)
}

/// Read-only snapshot transaction.
pub struct ReadTxn {
    pub(crate) inner: redb::ReadTransaction,
}

/// Read/write transaction. At most one exists at a time; the engine
/// blocks `txn_rw` callers until the current writer finishes.
pub struct WriteTxn {
    pub(crate) inner: redb::WriteTransaction,
}

impl WriteTxn {
    /// Makes every mutation of this transaction durable and visible,
    /// atomically.
    pub fn commit(self) -> Result<()> {
        self.inner.commit()?;
        Ok(())
    }

    /// Discards every mutation of this transaction. Dropping the
    /// transaction without committing has the same effect.
    pub fn abort(self) -> Result<()> {
        self.inner.abort()?;
        Ok(())
    }
}

/// Borrowed handle to either transaction kind, for read-side entry
/// points. Constructed implicitly: pass `&txn` where a `TxnRef` is
/// expected.
#[derive(Clone, Copy)]
pub enum TxnRef<'t> {
    Ro(&'t ReadTxn),
    Rw(&'t WriteTxn),
}

impl<'t> From<&'t ReadTxn> for TxnRef<'t> {
    fn from(txn: &'t ReadTxn) -> Self {
        TxnRef::Ro(txn)
    }
}

impl<'t> From<&'t WriteTxn> for TxnRef<'t> {
    fn from(txn: &'t WriteTxn) -> Self {
        TxnRef::Rw(txn)
    }
}

impl<'t> TxnRef<'t> {
    pub(crate) fn plain(self, def: TableDefinition<'static, Bytes, Bytes>) -> Result<PlainTable<'t>> {
        match self {
            TxnRef::Ro(t) => Ok(PlainTable::Ro(t.inner.open_table(def)?)),
            TxnRef::Rw(t) => Ok(PlainTable::Rw(t.inner.open_table(def)?)),
        }
    }

    pub(crate) fn multi(
        self,
        def: MultimapTableDefinition<'static, Bytes, Bytes>,
    ) -> Result<MultiTable<'t>> {
        match self {
            TxnRef::Ro(t) => Ok(MultiTable::Ro(t.inner.open_multimap_table(def)?)),
            TxnRef::Rw(t) => Ok(MultiTable::Rw(t.inner.open_multimap_table(def)?)),
        }
    }
}

/// An ordered sub-database opened from either transaction kind.
pub(crate) enum PlainTable<'t> {
    Ro(redb::ReadOnlyTable<Bytes, Bytes>),
    Rw(redb::Table<'t, Bytes, Bytes>),
}

impl PlainTable<'_> {
    pub(crate) fn get(&self, key: &[u8]) -> Result<Option<redb::AccessGuard<'_, Bytes>>> {
        let guard = match self {
            PlainTable::Ro(t) => ReadableTable::get(t, key)?,
            PlainTable::Rw(t) => ReadableTable::get(t, key)?,
        };
        Ok(guard)
    }

    pub(crate) fn range(
        &self,
        bounds: (Bound<&[u8]>, Bound<&[u8]>),
    ) -> Result<redb::Range<'_, Bytes, Bytes>> {
        let range = match self {
            PlainTable::Ro(t) => ReadableTable::range::<&[u8]>(t, bounds)?,
            PlainTable::Rw(t) => ReadableTable::range::<&[u8]>(t, bounds)?,
        };
        Ok(range)
    }

    pub(crate) fn len(&self) -> Result<u64> {
        let len = match self {
            PlainTable::Ro(t) => t.len()?,
            PlainTable::Rw(t) => t.len()?,
        };
        Ok(len)
    }
}

/// A sorted-duplicates sub-database opened from either transaction kind.
pub(crate) enum MultiTable<'t> {
    Ro(redb::ReadOnlyMultimapTable<Bytes, Bytes>),
    Rw(redb::MultimapTable<'t, Bytes, Bytes>),
}

impl MultiTable<'_> {
    pub(crate) fn get(&self, key: &[u8]) -> Result<redb::MultimapValue<'_, Bytes>> {
        let values = match self {
            MultiTable::Ro(t) => ReadableMultimapTable::get(t, key)?,
            MultiTable::Rw(t) => ReadableMultimapTable::get(t, key)?,
        };
        Ok(values)
    }

    pub(crate) fn range(
        &self,
        bounds: (Bound<&[u8]>, Bound<&[u8]>),
    ) -> Result<redb::MultimapRange<'_, Bytes, Bytes>> {
        let range = match self {
            MultiTable::Ro(t) => ReadableMultimapTable::range::<&[u8]>(t, bounds)?,
            MultiTable::Rw(t) => ReadableMultimapTable::range::<&[u8]>(t, bounds)?,
        };
        Ok(range)
    }

    /// Total number of (key, subkey) pairs.
    pub(crate) fn len(&self) -> Result<u64> {
        let len = match self {
            MultiTable::Ro(t) => t.len()?,
            MultiTable::Rw(t) => t.len()?,
        };
        Ok(len)
    }
}
