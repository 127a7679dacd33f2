//! # Big-Endian Key Encoding
//!
//! The KV engine orders keys and duplicate subkeys by a plain memcmp, so
//! every key stratadb writes is arranged to make lexicographic byte order
//! coincide with semantic order:
//!
//! - **Unsigned integers** are fixed-width big-endian. The value `1001`
//!   as a 64-bit key is `00 00 00 00 00 00 03 E9`, so numeric order and
//!   byte order agree.
//! - **Strings and byte strings** are used as-is. They occupy a whole key
//!   (or the variable prefix of a composite key), so no length prefix is
//!   needed and embedded zeros are fine.
//! - **Composite keys** are the variable-length part followed by the
//!   fixed-width part. Because the suffix has a known width, the prefix
//!   is unambiguously recoverable, and sorting the concatenation gives
//!   lexicographic order on the prefix with numeric tiebreak on the
//!   suffix.
//! - **Duplicate subkeys** are `custom_part ++ id_be`. The default has an
//!   empty custom part, which makes the default duplicate order primary-
//!   key-id order (insertion order for auto-assigned ids). A custom
//!   custom part buys any other total order while the trailing id keeps
//!   every (key, subkey) pair distinct and resolvable back to its record.
//!
//! Payload bytes inside records are little-endian (see `records`); only
//! key material is big-endian.

use eyre::Result;

use crate::error::Corruption;

/// Width of an encoded primary key id, and of the id suffix every
/// duplicate subkey ends with.
pub const PK_ID_LEN: usize = 8;

/// Encodes a u64 as a fresh 8-byte big-endian key.
pub fn encode_u64(value: u64) -> [u8; PK_ID_LEN] {
    value.to_be_bytes()
}

/// Appends the big-endian encoding of `value` to `buf`.
///
/// Buffer-reuse variant for hot paths that assemble composite keys.
pub fn encode_u64_to(value: u64, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// Decodes an 8-byte big-endian key back to a u64.
pub fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let arr: [u8; PK_ID_LEN] = bytes
        .try_into()
        .map_err(|_| Corruption::new(format!("expected 8-byte key, got {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(arr))
}

/// Encodes a composite key: variable-length prefix followed by a
/// fixed-width big-endian suffix.
pub fn encode_composite(prefix: &[u8], suffix: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(prefix.len() + PK_ID_LEN);
    buf.extend_from_slice(prefix);
    encode_u64_to(suffix, &mut buf);
    buf
}

/// Recovers the variable-length prefix of a composite key by stripping
/// the fixed-width suffix.
pub fn composite_prefix(key: &[u8]) -> Result<&[u8]> {
    if key.len() < PK_ID_LEN {
        return Err(Corruption::new(format!(
            "composite key too short for fixed suffix: {} bytes",
            key.len()
        ))
        .into());
    }
    Ok(&key[..key.len() - PK_ID_LEN])
}

/// Assembles a duplicate subkey: the index's custom sort bytes followed
/// by the big-endian primary key id.
pub fn subkey_for_id(custom_part: &[u8], id: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(custom_part.len() + PK_ID_LEN);
    buf.extend_from_slice(custom_part);
    encode_u64_to(id, &mut buf);
    buf
}

/// Splits a duplicate subkey back into (custom_part, primary key id).
pub fn split_subkey(subkey: &[u8]) -> Result<(&[u8], u64)> {
    if subkey.len() < PK_ID_LEN {
        return Err(Corruption::new(format!(
            "duplicate subkey too short for id suffix: {} bytes",
            subkey.len()
        ))
        .into());
    }
    let split = subkey.len() - PK_ID_LEN;
    let id = decode_u64(&subkey[split..])?;
    Ok((&subkey[..split], id))
}
