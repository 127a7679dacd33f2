//! # TableDef - The Index Maintenance Engine
//!
//! A `TableDef` ties a table name to its record schema and its index
//! definitions, and owns every mutation path: insert, update, delete,
//! and the point lookups. The invariant it maintains across all of them:
//!
//! > For every live record and every index, the index's sub-database
//! > contains exactly the entries the index's extractor produces for
//! > that record — no more, no fewer — and a unique index never maps
//! > one key to two records.
//!
//! ## Sub-database layout
//!
//! | Sub-database | Key | Value |
//! |--------------|-----|-------|
//! | `<Table>` | 8-byte BE primary key id | packed payload |
//! | `<Table>__<index>` (unique) | index key bytes | 8-byte BE id |
//! | `<Table>__<index>` (duplicate) | index key bytes | subkey (`custom ++ id_be`) |
//! | `__meta` | table name | last allocated id |
//!
//! ## Validation order
//!
//! Inserts and updates probe every unique index *before* touching any
//! sub-database (or the id counter), so a rejected operation leaves the
//! transaction exactly as it found it and the caller may retry or abort.
//!
//! Updates are diff-based: the old and new key sets of each index are
//! compared and only the difference is written. A proposal byte-identical
//! to the existing payload short-circuits to `Ok(0)` without writing.

use eyre::{ensure, Result, WrapErr};
use redb::{ReadableTable, TableDefinition};
use tracing::trace;

use crate::encoding::key::{decode_u64, encode_u64, split_subkey};
use crate::error::{Corruption, UniqueConstraintViolation};
use crate::index::{diff_keys, IndexDef, IndexKeys};
use crate::records::schema::Schema;
use crate::records::view::RecordView;
use crate::row::Row;
use crate::txn::{multi_def, plain_def, TxnRef, WriteTxn};

/// Per-table monotonic id counters, keyed by table name.
pub(crate) const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("__meta");

pub struct TableDef {
    name: &'static str,
    schema: Schema,
    indices: Vec<IndexDef>,
}

impl TableDef {
    pub fn new(name: &'static str, schema: Schema, indices: Vec<IndexDef>) -> Self {
        Self {
            name,
            schema,
            indices,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn indices(&self) -> &[IndexDef] {
        &self.indices
    }

    pub fn index(&self, name: &str) -> Result<&IndexDef> {
        self.indices
            .iter()
            .find(|ix| ix.name == name)
            .ok_or_else(|| eyre::eyre!("table '{}' has no index named '{}'", self.name, name))
    }

    /// Inserts a packed payload, allocating the next id when none is
    /// supplied, and writes every index entry the extractors produce.
    /// Returns the record's primary key id.
    ///
    /// Fails with [`UniqueConstraintViolation`] before any visible
    /// mutation if a unique index already holds one of the new keys.
    pub fn insert(&self, txn: &WriteTxn, payload: &[u8], requested_id: Option<u64>) -> Result<u64> {
        let view = RecordView::parse(payload, &self.schema)
            .wrap_err_with(|| format!("packing record for table '{}'", self.name))?;

        let mut per_index: Vec<IndexKeys> = Vec::with_capacity(self.indices.len());
        for ix in &self.indices {
            per_index.push(ix.keys(&view)?);
        }

        // probe every unique index before mutating anything
        for (ix, keys) in self.indices.iter().zip(&per_index) {
            if !ix.unique || keys.is_empty() {
                continue;
            }
            let table = txn.inner.open_table(plain_def(ix.sub_db))?;
            for key in keys {
                if table.get(key.as_slice())?.is_some() {
                    return Err(UniqueConstraintViolation {
                        table: self.name,
                        index: ix.name,
                    }
                    .into());
                }
            }
        }

        let id = match requested_id {
            Some(id) => {
                {
                    let main = txn.inner.open_table(plain_def(self.name))?;
                    ensure!(
                        main.get(encode_u64(id).as_slice())?.is_none(),
                        "primary key id {} already exists in table '{}'",
                        id,
                        self.name
                    );
                }
                // keep auto-allocation ahead of user-supplied ids
                let mut meta = txn.inner.open_table(META_TABLE)?;
                let current = meta.get(self.name)?.map(|g| g.value()).unwrap_or(0);
                if id > current {
                    meta.insert(self.name, id)?;
                }
                id
            }
            None => {
                let mut meta = txn.inner.open_table(META_TABLE)?;
                let current = meta.get(self.name)?.map(|g| g.value()).unwrap_or(0);
                let id = current
                    .checked_add(1)
                    .ok_or_else(|| eyre::eyre!("id counter exhausted for table '{}'", self.name))?;
                meta.insert(self.name, id)?;
                id
            }
        };

        {
            let mut main = txn.inner.open_table(plain_def(self.name))?;
            main.insert(encode_u64(id).as_slice(), payload)?;
        }

        for (ix, keys) in self.indices.iter().zip(&per_index) {
            if keys.is_empty() {
                continue;
            }
            if ix.unique {
                let mut table = txn.inner.open_table(plain_def(ix.sub_db))?;
                for key in keys {
                    table.insert(key.as_slice(), encode_u64(id).as_slice())?;
                }
            } else {
                let subkey = ix.subkey(&view, id)?;
                let mut table = txn.inner.open_multimap_table(multi_def(ix.sub_db))?;
                for key in keys {
                    table.insert(key.as_slice(), subkey.as_slice())?;
                }
            }
        }

        trace!(table = self.name, id, "inserted record");
        Ok(id)
    }

    /// Replaces record `id`'s payload and reconciles every index by
    /// diffing the old and new key sets. Returns `0` when the proposed
    /// payload is byte-identical to the existing one (and writes
    /// nothing); otherwise a non-zero change count.
    pub fn update(
        &self,
        txn: &WriteTxn,
        id: u64,
        old_payload: &[u8],
        new_payload: &[u8],
    ) -> Result<u64> {
        if old_payload == new_payload {
            return Ok(0);
        }

        let old_view = RecordView::parse(old_payload, &self.schema)
            .wrap_err_with(|| format!("decoding record {} of table '{}'", id, self.name))?;
        let new_view = RecordView::parse(new_payload, &self.schema)
            .wrap_err_with(|| format!("packing record for table '{}'", self.name))?;

        let mut old_keys: Vec<IndexKeys> = Vec::with_capacity(self.indices.len());
        let mut new_keys: Vec<IndexKeys> = Vec::with_capacity(self.indices.len());
        for ix in &self.indices {
            old_keys.push(ix.keys(&old_view)?);
            new_keys.push(ix.keys(&new_view)?);
        }

        // probe unique indexes for the keys this update would add; an
        // entry already mapping to this id is not a conflict
        for (i, ix) in self.indices.iter().enumerate() {
            if !ix.unique {
                continue;
            }
            let (_, to_add) = diff_keys(&old_keys[i], &new_keys[i]);
            if to_add.is_empty() {
                continue;
            }
            let table = txn.inner.open_table(plain_def(ix.sub_db))?;
            for key in to_add {
                if let Some(guard) = table.get(key)? {
                    if decode_u64(guard.value())? != id {
                        return Err(UniqueConstraintViolation {
                            table: self.name,
                            index: ix.name,
                        }
                        .into());
                    }
                }
            }
        }

        {
            let mut main = txn.inner.open_table(plain_def(self.name))?;
            main.insert(encode_u64(id).as_slice(), new_payload)?;
        }

        let mut changes: u64 = 1;
        for (i, ix) in self.indices.iter().enumerate() {
            if ix.unique {
                let (to_remove, to_add) = diff_keys(&old_keys[i], &new_keys[i]);
                if to_remove.is_empty() && to_add.is_empty() {
                    continue;
                }
                let mut table = txn.inner.open_table(plain_def(ix.sub_db))?;
                for key in &to_remove {
                    table.remove(*key)?;
                }
                for key in &to_add {
                    table.insert(*key, encode_u64(id).as_slice())?;
                }
                changes += (to_remove.len() + to_add.len()) as u64;
            } else {
                let old_sub = ix.subkey(&old_view, id)?;
                let new_sub = ix.subkey(&new_view, id)?;
                let mut table = txn.inner.open_multimap_table(multi_def(ix.sub_db))?;
                if old_sub == new_sub {
                    let (to_remove, to_add) = diff_keys(&old_keys[i], &new_keys[i]);
                    for key in &to_remove {
                        table.remove(*key, old_sub.as_slice())?;
                    }
                    for key in &to_add {
                        table.insert(*key, new_sub.as_slice())?;
                    }
                    changes += (to_remove.len() + to_add.len()) as u64;
                } else {
                    // subkey changed: every kept entry moves within its
                    // duplicate group
                    for key in &old_keys[i] {
                        table.remove(key.as_slice(), old_sub.as_slice())?;
                    }
                    for key in &new_keys[i] {
                        table.insert(key.as_slice(), new_sub.as_slice())?;
                    }
                    changes += (old_keys[i].len() + new_keys[i].len()) as u64;
                }
            }
        }

        trace!(table = self.name, id, changes, "updated record");
        Ok(changes)
    }

    /// Removes record `id` and all of its index entries. A missing id is
    /// a no-op, not an error.
    pub fn delete(&self, txn: &WriteTxn, id: u64) -> Result<()> {
        let key = encode_u64(id);
        let old_payload: Vec<u8> = {
            let main = txn.inner.open_table(plain_def(self.name))?;
            let x = match main.get(key.as_slice())? {
                Some(guard) => guard.value().to_vec(),
                None => return Ok(()),
            };
            x
        };
        let view = RecordView::parse(&old_payload, &self.schema)
            .wrap_err_with(|| format!("decoding record {} of table '{}'", id, self.name))?;

        for ix in &self.indices {
            let keys = ix.keys(&view)?;
            if keys.is_empty() {
                continue;
            }
            if ix.unique {
                let mut table = txn.inner.open_table(plain_def(ix.sub_db))?;
                for k in &keys {
                    table.remove(k.as_slice())?;
                }
            } else {
                let subkey = ix.subkey(&view, id)?;
                let mut table = txn.inner.open_multimap_table(multi_def(ix.sub_db))?;
                for k in &keys {
                    table.remove(k.as_slice(), subkey.as_slice())?;
                }
            }
        }

        {
            let mut main = txn.inner.open_table(plain_def(self.name))?;
            main.remove(key.as_slice())?;
        }

        trace!(table = self.name, id, "deleted record");
        Ok(())
    }

    /// Point lookup by primary key id. Zero-copy in read transactions;
    /// write-transaction lookups return an owned-payload row.
    pub fn lookup<'t>(&self, txn: impl Into<TxnRef<'t>>, id: u64) -> Result<Option<Row<'t>>> {
        let key = encode_u64(id);
        match txn.into() {
            TxnRef::Ro(t) => {
                let table = t.inner.open_table(plain_def(self.name))?;
                Ok(table.get(key.as_slice())?.map(|g| Row::from_guard(id, g)))
            }
            TxnRef::Rw(t) => {
                let table = t.inner.open_table(plain_def(self.name))?;
                let x = table
                    .get(key.as_slice())?
                    .map(|g| Row::from_owned(id, g.value().to_vec()));
                Ok(x)
            }
        }
    }

    /// Point lookup through a secondary index. For duplicate indexes
    /// with several matches this resolves the first entry in duplicate
    /// order; callers that care which record they get must scan.
    pub fn lookup_by_index<'t>(
        &self,
        txn: impl Into<TxnRef<'t>>,
        index: &str,
        key: &[u8],
    ) -> Result<Option<Row<'t>>> {
        let txn = txn.into();
        let ix = self.index(index)?;

        let id = if ix.unique {
            let table = txn.plain(plain_def(ix.sub_db))?;
            let x = match table.get(key)? {
                Some(guard) => decode_u64(guard.value())?,
                None => return Ok(None),
            };
            x
        } else {
            let table = txn.multi(multi_def(ix.sub_db))?;
            let mut values = table.get(key)?;
            let x = match values.next() {
                Some(item) => split_subkey(item?.value())?.1,
                None => return Ok(None),
            };
            x
        };

        match self.lookup(txn, id)? {
            Some(row) => Ok(Some(row)),
            None => Err(Corruption::new(format!(
                "index '{}' of table '{}' references missing id {}",
                ix.name, self.name, id
            ))
            .into()),
        }
    }

    /// Every index's extracted key set for `row`, for diagnostics.
    pub fn index_keys(&self, row: &Row) -> Result<Vec<(&'static str, IndexKeys)>> {
        let view = row.view(&self.schema)?;
        self.indices
            .iter()
            .map(|ix| Ok((ix.name, ix.keys(&view)?)))
            .collect()
    }
}
