//! # Index Definitions and Key-Set Arithmetic
//!
//! Every index, whatever its flavor, is the same thing at runtime: a
//! pure extractor from a record to zero-or-more key byte strings, plus a
//! uniqueness flag. A plain field index extracts one key; a computed
//! index transforms before extracting (case-folded email); a tokenizing
//! index emits many keys (split on whitespace); a filtered index emits
//! none for records it excludes. Collapsing the flavors into one shape
//! keeps the maintenance engine and its tests small.
//!
//! Duplicate indexes additionally carry an optional subkey extractor:
//! the bytes that order records *within* one key's duplicate group. The
//! stored subkey is always `custom_part ++ id_be` (see `encoding::key`),
//! so the default order is primary-key-id order and any custom order
//! still resolves back to its record.

use eyre::Result;
use smallvec::SmallVec;

use crate::encoding::key::subkey_for_id;
use crate::records::view::RecordView;

/// Key set one index extracts from one record. Deduplicated and sorted
/// by [`IndexDef::keys`].
pub type IndexKeys = SmallVec<[Vec<u8>; 2]>;

/// Extractor: record -> zero-or-more index keys.
pub type KeysFn = fn(&RecordView) -> Result<IndexKeys>;

/// Custom duplicate-sort bytes: record -> the custom part of its subkey.
pub type SubkeyFn = fn(&RecordView) -> Result<Vec<u8>>;

pub struct IndexDef {
    /// Index name as the schema declares it, e.g. `userName`.
    pub name: &'static str,
    /// Sub-database name, e.g. `User__userName`.
    pub sub_db: &'static str,
    /// At most one record per key when set.
    pub unique: bool,
    pub keys_of: KeysFn,
    /// Only meaningful for duplicate indexes; `None` means id order.
    pub subkey_of: Option<SubkeyFn>,
}

impl IndexDef {
    pub const fn unique(name: &'static str, sub_db: &'static str, keys_of: KeysFn) -> Self {
        Self {
            name,
            sub_db,
            unique: true,
            keys_of,
            subkey_of: None,
        }
    }

    pub const fn duplicate(name: &'static str, sub_db: &'static str, keys_of: KeysFn) -> Self {
        Self {
            name,
            sub_db,
            unique: false,
            keys_of,
            subkey_of: None,
        }
    }

    pub const fn duplicate_with_subkey(
        name: &'static str,
        sub_db: &'static str,
        keys_of: KeysFn,
        subkey_of: SubkeyFn,
    ) -> Self {
        Self {
            name,
            sub_db,
            unique: false,
            keys_of,
            subkey_of: Some(subkey_of),
        }
    }

    /// Runs the extractor and normalizes the result: sorted, duplicates
    /// collapsed. A record is indexed at most once per emitted key.
    pub fn keys(&self, view: &RecordView) -> Result<IndexKeys> {
        let mut keys = (self.keys_of)(view)?;
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    /// The full subkey stored for `view`'s record in a duplicate group.
    pub fn subkey(&self, view: &RecordView, id: u64) -> Result<Vec<u8>> {
        match self.subkey_of {
            Some(f) => Ok(subkey_for_id(&f(view)?, id)),
            None => Ok(subkey_for_id(&[], id)),
        }
    }
}

/// Difference between the key sets of a record before and after an
/// update: `(to_remove, to_add)`. Inputs must be sorted and deduped, as
/// produced by [`IndexDef::keys`].
pub fn diff_keys<'a>(
    old: &'a IndexKeys,
    new: &'a IndexKeys,
) -> (Vec<&'a [u8]>, Vec<&'a [u8]>) {
    let mut to_remove = Vec::new();
    let mut to_add = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < old.len() && j < new.len() {
        match old[i].cmp(&new[j]) {
            std::cmp::Ordering::Less => {
                to_remove.push(old[i].as_slice());
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                to_add.push(new[j].as_slice());
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    to_remove.extend(old[i..].iter().map(|k| k.as_slice()));
    to_add.extend(new[j..].iter().map(|k| k.as_slice()));
    (to_remove, to_add)
}
