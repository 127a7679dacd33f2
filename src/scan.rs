//! # Scans - The Iteration Engine
//!
//! Ordered, restartable, bidirectional iteration over the main table, a
//! secondary index, a single duplicate group, or the raw (key, subkey)
//! pairs of a duplicate sub-database.
//!
//! ## Positioning
//!
//! Forward scans place the cursor at the first entry with key >= the
//! start key (at the first entry when no start is given); reverse scans
//! at the last entry with key <= the start key (at the last entry when
//! omitted). A start key that does not exist lands on the adjacent valid
//! position: forward from `"amy"` lands on `"bob"`, reverse from
//! `"carol"` lands on `"bob2"`. A start key beyond every entry in the
//! travel direction lands on the extreme entry; a start key before every
//! entry yields an empty scan.
//!
//! The same >=/<= rule applies to subkeys when positioning inside a
//! duplicate group, and to the concatenated (key, subkey) position of
//! [`TableDef::foreach_full`]. Composite keys get no special treatment:
//! the rule reads the whole key as bytes, which is what makes a reverse
//! scan from `("bbbb", 0)` land *before* every `"bbbb"`-prefixed entry.
//!
//! ## Visitors
//!
//! Every scan drives a visitor callback; returning `Ok(false)` stops the
//! scan early. Index scans hand the visitor the raw index key bytes next
//! to the record so composite-key visitors can parse the prefix and stop
//! when it changes.

use std::ops::Bound;

use eyre::{ensure, Result};

use crate::encoding::key::{decode_u64, encode_u64, split_subkey};
use crate::error::Corruption;
use crate::row::Row;
use crate::table::TableDef;
use crate::txn::{multi_def, plain_def, TxnRef};

fn scan_bounds<'a>(reverse: bool, start: Option<&'a [u8]>) -> (Bound<&'a [u8]>, Bound<&'a [u8]>) {
    match (reverse, start) {
        (false, Some(s)) => (Bound::Included(s), Bound::Unbounded),
        (true, Some(s)) => (Bound::Unbounded, Bound::Included(s)),
        (_, None) => (Bound::Unbounded, Bound::Unbounded),
    }
}

fn missing_id(table: &'static str, index: &'static str, id: u64) -> eyre::Report {
    Corruption::new(format!(
        "index '{}' of table '{}' references missing id {}",
        index, table, id
    ))
    .into()
}

impl TableDef {
    /// Iterates the main table in primary-key order. `total`, when
    /// supplied, receives the table's record count, independent of
    /// where the scan started or stopped.
    pub fn foreach<'t, T, V>(
        &self,
        txn: T,
        mut visitor: V,
        reverse: bool,
        start: Option<u64>,
        total: Option<&mut u64>,
    ) -> Result<()>
    where
        T: Into<TxnRef<'t>>,
        V: FnMut(Row<'_>) -> Result<bool>,
    {
        let txn = txn.into();
        let table = txn.plain(plain_def(self.name()))?;
        if let Some(total) = total {
            *total = table.len()?;
        }
        let start_key = start.map(encode_u64);
        let mut range = table.range(scan_bounds(reverse, start_key.as_ref().map(|k| k.as_slice())))?;
        loop {
            let item = if reverse { range.next_back() } else { range.next() };
            let Some(item) = item else { break };
            let (key_guard, value_guard) = item?;
            let id = decode_u64(key_guard.value())?;
            if !visitor(Row::from_slice(id, value_guard.value()))? {
                break;
            }
        }
        Ok(())
    }

    /// Iterates an index in index-key order, resolving each entry to its
    /// record. Records indexed under several keys are visited once per
    /// occurrence. `total`, when supplied, receives the index's total
    /// entry count, independent of where the scan started or stopped.
    pub fn foreach_index<'t, T, V>(
        &self,
        txn: T,
        index: &str,
        mut visitor: V,
        reverse: bool,
        start: Option<&[u8]>,
        total: Option<&mut u64>,
    ) -> Result<()>
    where
        T: Into<TxnRef<'t>>,
        V: FnMut(&[u8], Row<'_>) -> Result<bool>,
    {
        let txn = txn.into();
        let ix = self.index(index)?;
        let main = txn.plain(plain_def(self.name()))?;

        if ix.unique {
            let table = txn.plain(plain_def(ix.sub_db))?;
            if let Some(total) = total {
                *total = table.len()?;
            }
            let mut range = table.range(scan_bounds(reverse, start))?;
            loop {
                let item = if reverse { range.next_back() } else { range.next() };
                let Some(item) = item else { break };
                let (key_guard, value_guard) = item?;
                let id = decode_u64(value_guard.value())?;
                let payload = main
                    .get(&encode_u64(id))?
                    .ok_or_else(|| missing_id(self.name(), ix.name, id))?;
                if !visitor(key_guard.value(), Row::from_slice(id, payload.value()))? {
                    break;
                }
            }
        } else {
            let table = txn.multi(multi_def(ix.sub_db))?;
            if let Some(total) = total {
                *total = table.len()?;
            }
            let mut range = table.range(scan_bounds(reverse, start))?;
            'keys: loop {
                let item = if reverse { range.next_back() } else { range.next() };
                let Some(item) = item else { break };
                let (key_guard, mut subkeys) = item?;
                loop {
                    let sub = if reverse {
                        subkeys.next_back()
                    } else {
                        subkeys.next()
                    };
                    let Some(sub) = sub else { break };
                    let (_, id) = split_subkey(sub?.value())?;
                    let payload = main
                        .get(&encode_u64(id))?
                        .ok_or_else(|| missing_id(self.name(), ix.name, id))?;
                    if !visitor(key_guard.value(), Row::from_slice(id, payload.value()))? {
                        break 'keys;
                    }
                }
            }
        }
        Ok(())
    }

    /// Iterates the records sharing one index key, in duplicate-sort
    /// order. `start_subkey` positions within the group with the usual
    /// >=/<= rule. `total`, when supplied, receives the key's duplicate
    /// count, independent of where the scan started or stopped.
    /// Duplicate indexes only.
    pub fn foreach_dup<'t, T, V>(
        &self,
        txn: T,
        index: &str,
        key: &[u8],
        mut visitor: V,
        reverse: bool,
        start_subkey: Option<&[u8]>,
        total: Option<&mut u64>,
    ) -> Result<()>
    where
        T: Into<TxnRef<'t>>,
        V: FnMut(Row<'_>) -> Result<bool>,
    {
        let txn = txn.into();
        let ix = self.index(index)?;
        ensure!(
            !ix.unique,
            "index '{}' of table '{}' is unique; duplicate-group scans need a duplicate index",
            ix.name,
            self.name()
        );
        let main = txn.plain(plain_def(self.name()))?;
        let table = txn.multi(multi_def(ix.sub_db))?;

        if let Some(total) = total {
            let mut count = 0u64;
            for item in table.get(key)? {
                item?;
                count += 1;
            }
            *total = count;
        }

        let mut subkeys = table.get(key)?;
        loop {
            let item = if reverse {
                subkeys.next_back()
            } else {
                subkeys.next()
            };
            let Some(item) = item else { break };
            let guard = item?;
            let sub = guard.value();
            if let Some(from) = start_subkey {
                if (!reverse && sub < from) || (reverse && sub > from) {
                    continue;
                }
            }
            let (_, id) = split_subkey(sub)?;
            let payload = main
                .get(&encode_u64(id))?
                .ok_or_else(|| missing_id(self.name(), ix.name, id))?;
            if !visitor(Row::from_slice(id, payload.value()))? {
                break;
            }
        }
        Ok(())
    }

    /// Iterates the *distinct* keys of an index, one visit per key
    /// regardless of how many records share it. `total`, when supplied,
    /// receives the index's distinct-key count, independent of where
    /// the scan started or stopped.
    pub fn foreach_keys<'t, T, V>(
        &self,
        txn: T,
        index: &str,
        mut visitor: V,
        reverse: bool,
        start: Option<&[u8]>,
        total: Option<&mut u64>,
    ) -> Result<()>
    where
        T: Into<TxnRef<'t>>,
        V: FnMut(&[u8]) -> Result<bool>,
    {
        let txn = txn.into();
        let ix = self.index(index)?;

        if ix.unique {
            let table = txn.plain(plain_def(ix.sub_db))?;
            // one record per key, so every key is distinct
            if let Some(total) = total {
                *total = table.len()?;
            }
            let mut range = table.range(scan_bounds(reverse, start))?;
            loop {
                let item = if reverse { range.next_back() } else { range.next() };
                let Some(item) = item else { break };
                let (key_guard, _) = item?;
                if !visitor(key_guard.value())? {
                    break;
                }
            }
        } else {
            let table = txn.multi(multi_def(ix.sub_db))?;
            // the engine tracks pair counts, not key counts, so the
            // distinct-key total is a key-group walk
            if let Some(total) = total {
                let mut count = 0u64;
                for item in table.range(scan_bounds(false, None))? {
                    item?;
                    count += 1;
                }
                *total = count;
            }
            let mut range = table.range(scan_bounds(reverse, start))?;
            loop {
                let item = if reverse { range.next_back() } else { range.next() };
                let Some(item) = item else { break };
                let (key_guard, _) = item?;
                if !visitor(key_guard.value())? {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Raw escape hatch over a duplicate sub-database: visits
    /// (key, subkey) byte pairs from the concatenated
    /// (start_key, start_subkey) position in either direction, without
    /// resolving records.
    pub fn foreach_full<'t, T, V>(
        &self,
        txn: T,
        index: &str,
        mut visitor: V,
        reverse: bool,
        start_key: Option<&[u8]>,
        start_subkey: Option<&[u8]>,
    ) -> Result<()>
    where
        T: Into<TxnRef<'t>>,
        V: FnMut(&[u8], &[u8]) -> Result<bool>,
    {
        let txn = txn.into();
        let ix = self.index(index)?;
        ensure!(
            !ix.unique,
            "index '{}' of table '{}' is unique; raw pair scans need a duplicate index",
            ix.name,
            self.name()
        );
        let table = txn.multi(multi_def(ix.sub_db))?;

        let mut range = table.range(scan_bounds(reverse, start_key))?;
        'keys: loop {
            let item = if reverse { range.next_back() } else { range.next() };
            let Some(item) = item else { break };
            let (key_guard, mut subkeys) = item?;
            let key = key_guard.value();
            // subkey positioning applies only inside the start key's group
            let position_here = start_key.is_some_and(|sk| sk == key);
            loop {
                let sub = if reverse {
                    subkeys.next_back()
                } else {
                    subkeys.next()
                };
                let Some(sub) = sub else { break };
                let guard = sub?;
                let subkey = guard.value();
                if position_here {
                    if let Some(from) = start_subkey {
                        if (!reverse && subkey < from) || (reverse && subkey > from) {
                            continue;
                        }
                    }
                }
                if !visitor(key, subkey)? {
                    break 'keys;
                }
            }
        }
        Ok(())
    }
}
