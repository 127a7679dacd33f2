//! # Encoding Module
//!
//! Byte-comparable key encoding. Everything the engine compares with
//! memcmp goes through here: primary key ids, secondary index keys,
//! composite keys, and the subkeys that order duplicate groups.

pub mod key;

pub use key::{
    composite_prefix, decode_u64, encode_composite, encode_u64, encode_u64_to, split_subkey,
    subkey_for_id, PK_ID_LEN,
};
