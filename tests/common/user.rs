//! Operation surface for the `User` schema:
//!
//! ```text
//! table User {
//!     userName:     text,   unique index
//!     passwordHash: bytes
//!     created:      u64,    duplicate index
//! }
//! ```

use std::sync::LazyLock;

use eyre::Result;
use smallvec::smallvec;
use stratadb::{
    encode_u64, FieldDef, FieldKind, IndexDef, IndexKeys, RecordBuilder, RecordView, Row, Schema,
    TableDef, TxnRef, WriteTxn,
};

pub const F_USER_NAME: usize = 0;
pub const F_PASSWORD_HASH: usize = 1;
pub const F_CREATED: usize = 2;

fn user_name_keys(view: &RecordView) -> Result<IndexKeys> {
    Ok(smallvec![view.get_text(F_USER_NAME)?.as_bytes().to_vec()])
}

fn created_keys(view: &RecordView) -> Result<IndexKeys> {
    Ok(smallvec![encode_u64(view.get_u64(F_CREATED)?).to_vec()])
}

static USER: LazyLock<TableDef> = LazyLock::new(|| {
    TableDef::new(
        "User",
        Schema::new(vec![
            FieldDef::new("userName", FieldKind::Text),
            FieldDef::new("passwordHash", FieldKind::Bytes),
            FieldDef::new("created", FieldKind::U64),
        ]),
        vec![
            IndexDef::unique("userName", "User__userName", user_name_keys),
            IndexDef::duplicate("created", "User__created", created_keys),
        ],
    )
});

pub fn table() -> &'static TableDef {
    &USER
}

pub struct UserView<'a> {
    row: Row<'a>,
}

impl<'a> UserView<'a> {
    pub fn primary_key_id(&self) -> u64 {
        self.row.primary_key_id()
    }

    pub fn user_name(&self) -> Result<&str> {
        self.row.view(USER.schema())?.get_text(F_USER_NAME)
    }

    pub fn password_hash(&self) -> Result<&[u8]> {
        self.row.view(USER.schema())?.get_bytes(F_PASSWORD_HASH)
    }

    pub fn created(&self) -> Result<u64> {
        self.row.view(USER.schema())?.get_u64(F_CREATED)
    }

    pub fn is_zero_copy(&self) -> bool {
        self.row.is_zero_copy()
    }
}

fn pack(user_name: &str, password_hash: &[u8], created: u64) -> Result<Vec<u8>> {
    let mut builder = RecordBuilder::new(USER.schema());
    builder.set_text(F_USER_NAME, user_name)?;
    builder.set_bytes(F_PASSWORD_HASH, password_hash)?;
    builder.set_u64(F_CREATED, created)?;
    Ok(builder.build())
}

pub fn insert_user(
    txn: &WriteTxn,
    user_name: &str,
    password_hash: &[u8],
    created: u64,
) -> Result<u64> {
    USER.insert(txn, &pack(user_name, password_hash, created)?, None)
}

pub fn insert_user_with_id(
    txn: &WriteTxn,
    id: u64,
    user_name: &str,
    password_hash: &[u8],
    created: u64,
) -> Result<u64> {
    USER.insert(txn, &pack(user_name, password_hash, created)?, Some(id))
}

pub fn lookup_user<'t>(txn: impl Into<TxnRef<'t>>, id: u64) -> Result<Option<UserView<'t>>> {
    Ok(USER.lookup(txn, id)?.map(|row| UserView { row }))
}

pub fn lookup_user_by_user_name<'t>(
    txn: impl Into<TxnRef<'t>>,
    user_name: &str,
) -> Result<Option<UserView<'t>>> {
    Ok(USER
        .lookup_by_index(txn, "userName", user_name.as_bytes())?
        .map(|row| UserView { row }))
}

#[derive(Default)]
pub struct UserPatch<'p> {
    pub user_name: Option<&'p str>,
    pub password_hash: Option<&'p [u8]>,
    pub created: Option<u64>,
}

/// Applies a partial update: absent fields keep their current values.
/// Returns 0 when the result is byte-identical to the existing record.
pub fn update_user(txn: &WriteTxn, existing: &UserView<'_>, patch: &UserPatch<'_>) -> Result<u64> {
    let mut builder = RecordBuilder::new(USER.schema());
    match patch.user_name {
        Some(v) => builder.set_text(F_USER_NAME, v)?,
        None => builder.set_text(F_USER_NAME, existing.user_name()?)?,
    }
    match patch.password_hash {
        Some(v) => builder.set_bytes(F_PASSWORD_HASH, v)?,
        None => builder.set_bytes(F_PASSWORD_HASH, existing.password_hash()?)?,
    }
    match patch.created {
        Some(v) => builder.set_u64(F_CREATED, v)?,
        None => builder.set_u64(F_CREATED, existing.created()?)?,
    }
    let proposed = builder.build();
    USER.update(
        txn,
        existing.primary_key_id(),
        existing.row.payload(),
        &proposed,
    )
}

pub fn delete_user(txn: &WriteTxn, id: u64) -> Result<()> {
    USER.delete(txn, id)
}

pub fn foreach_user<'t, T, V>(
    txn: T,
    mut visitor: V,
    reverse: bool,
    start: Option<u64>,
    total: Option<&mut u64>,
) -> Result<()>
where
    T: Into<TxnRef<'t>>,
    V: FnMut(&UserView<'_>) -> Result<bool>,
{
    USER.foreach(
        txn,
        |row| {
            let view = UserView { row };
            visitor(&view)
        },
        reverse,
        start,
        total,
    )
}

pub fn foreach_user_by_user_name<'t, T, V>(
    txn: T,
    mut visitor: V,
    reverse: bool,
    start: Option<&str>,
    total: Option<&mut u64>,
) -> Result<()>
where
    T: Into<TxnRef<'t>>,
    V: FnMut(&UserView<'_>) -> Result<bool>,
{
    USER.foreach_index(
        txn,
        "userName",
        |_key, row| {
            let view = UserView { row };
            visitor(&view)
        },
        reverse,
        start.map(str::as_bytes),
        total,
    )
}

pub fn foreach_user_by_created<'t, T, V>(
    txn: T,
    mut visitor: V,
    reverse: bool,
    start: Option<u64>,
    total: Option<&mut u64>,
) -> Result<()>
where
    T: Into<TxnRef<'t>>,
    V: FnMut(&UserView<'_>) -> Result<bool>,
{
    let start_key = start.map(encode_u64);
    USER.foreach_index(
        txn,
        "created",
        |_key, row| {
            let view = UserView { row };
            visitor(&view)
        },
        reverse,
        start_key.as_ref().map(|k| k.as_slice()),
        total,
    )
}

pub fn foreach_dup_user_by_created<'t, T, V>(
    txn: T,
    created: u64,
    mut visitor: V,
    reverse: bool,
    start_id: Option<u64>,
    total: Option<&mut u64>,
) -> Result<()>
where
    T: Into<TxnRef<'t>>,
    V: FnMut(&UserView<'_>) -> Result<bool>,
{
    let key = encode_u64(created);
    let start_subkey = start_id.map(encode_u64);
    USER.foreach_dup(
        txn,
        "created",
        &key,
        |row| {
            let view = UserView { row };
            visitor(&view)
        },
        reverse,
        start_subkey.as_ref().map(|s| s.as_slice()),
        total,
    )
}

pub fn foreach_keys_user_by_user_name<'t, T, V>(
    txn: T,
    mut visitor: V,
    reverse: bool,
    start: Option<&str>,
    total: Option<&mut u64>,
) -> Result<()>
where
    T: Into<TxnRef<'t>>,
    V: FnMut(&str) -> Result<bool>,
{
    USER.foreach_keys(
        txn,
        "userName",
        |key| visitor(std::str::from_utf8(key)?),
        reverse,
        start.map(str::as_bytes),
        total,
    )
}

pub fn foreach_keys_user_by_created<'t, T, V>(
    txn: T,
    mut visitor: V,
    reverse: bool,
    start: Option<u64>,
    total: Option<&mut u64>,
) -> Result<()>
where
    T: Into<TxnRef<'t>>,
    V: FnMut(u64) -> Result<bool>,
{
    let start_key = start.map(encode_u64);
    USER.foreach_keys(
        txn,
        "created",
        |key| visitor(stratadb::decode_u64(key)?),
        reverse,
        start_key.as_ref().map(|k| k.as_slice()),
        total,
    )
}

/// Extracted key set of every index for `view`, for diagnostics.
pub fn user_index_keys(view: &UserView<'_>) -> Result<Vec<(&'static str, IndexKeys)>> {
    USER.index_keys(&view.row)
}
