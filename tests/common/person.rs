//! Operation surface for the `Person` schema:
//!
//! ```text
//! table Person {
//!     name:  text
//!     email: text,   unique computed index emailLC (lowercased email)
//!     age:   u64,    duplicate index age, skipped when age < 18
//!     role:  text,   duplicate index role, skipped when role == "admin"
//! }
//! ```

use std::sync::LazyLock;

use eyre::Result;
use smallvec::{smallvec, SmallVec};
use stratadb::{
    encode_u64, FieldDef, FieldKind, IndexDef, IndexKeys, RecordBuilder, RecordView, Row, Schema,
    TableDef, TxnRef, WriteTxn,
};

pub const F_NAME: usize = 0;
pub const F_EMAIL: usize = 1;
pub const F_AGE: usize = 2;
pub const F_ROLE: usize = 3;

fn email_lc_keys(view: &RecordView) -> Result<IndexKeys> {
    Ok(smallvec![view
        .get_text(F_EMAIL)?
        .to_lowercase()
        .into_bytes()])
}

fn age_keys(view: &RecordView) -> Result<IndexKeys> {
    let age = view.get_u64(F_AGE)?;
    if age < 18 {
        return Ok(SmallVec::new());
    }
    Ok(smallvec![encode_u64(age).to_vec()])
}

fn role_keys(view: &RecordView) -> Result<IndexKeys> {
    let role = view.get_text(F_ROLE)?;
    if role == "admin" {
        return Ok(SmallVec::new());
    }
    Ok(smallvec![role.as_bytes().to_vec()])
}

static PERSON: LazyLock<TableDef> = LazyLock::new(|| {
    TableDef::new(
        "Person",
        Schema::new(vec![
            FieldDef::new("name", FieldKind::Text),
            FieldDef::new("email", FieldKind::Text),
            FieldDef::new("age", FieldKind::U64),
            FieldDef::new("role", FieldKind::Text),
        ]),
        vec![
            IndexDef::unique("emailLC", "Person__emailLC", email_lc_keys),
            IndexDef::duplicate("age", "Person__age", age_keys),
            IndexDef::duplicate("role", "Person__role", role_keys),
        ],
    )
});

pub fn table() -> &'static TableDef {
    &PERSON
}

pub struct PersonView<'a> {
    row: Row<'a>,
}

impl<'a> PersonView<'a> {
    pub fn primary_key_id(&self) -> u64 {
        self.row.primary_key_id()
    }

    pub fn name(&self) -> Result<&str> {
        self.row.view(PERSON.schema())?.get_text(F_NAME)
    }

    pub fn email(&self) -> Result<&str> {
        self.row.view(PERSON.schema())?.get_text(F_EMAIL)
    }

    pub fn age(&self) -> Result<u64> {
        self.row.view(PERSON.schema())?.get_u64(F_AGE)
    }

    pub fn role(&self) -> Result<&str> {
        self.row.view(PERSON.schema())?.get_text(F_ROLE)
    }
}

fn pack(name: &str, email: &str, age: u64, role: &str) -> Result<Vec<u8>> {
    let mut builder = RecordBuilder::new(PERSON.schema());
    builder.set_text(F_NAME, name)?;
    builder.set_text(F_EMAIL, email)?;
    builder.set_u64(F_AGE, age)?;
    builder.set_text(F_ROLE, role)?;
    Ok(builder.build())
}

pub fn insert_person(
    txn: &WriteTxn,
    name: &str,
    email: &str,
    age: u64,
    role: &str,
) -> Result<u64> {
    PERSON.insert(txn, &pack(name, email, age, role)?, None)
}

pub fn lookup_person<'t>(txn: impl Into<TxnRef<'t>>, id: u64) -> Result<Option<PersonView<'t>>> {
    Ok(PERSON.lookup(txn, id)?.map(|row| PersonView { row }))
}

/// Lookup by the computed index: `email_lc` must already be lowercased,
/// exactly as the extractor stores it.
pub fn lookup_person_by_email_lc<'t>(
    txn: impl Into<TxnRef<'t>>,
    email_lc: &str,
) -> Result<Option<PersonView<'t>>> {
    Ok(PERSON
        .lookup_by_index(txn, "emailLC", email_lc.as_bytes())?
        .map(|row| PersonView { row }))
}

#[derive(Default)]
pub struct PersonPatch<'p> {
    pub name: Option<&'p str>,
    pub email: Option<&'p str>,
    pub age: Option<u64>,
    pub role: Option<&'p str>,
}

/// Applies a partial update: absent fields keep their current values.
/// Returns 0 when the result is byte-identical to the existing record.
pub fn update_person(
    txn: &WriteTxn,
    existing: &PersonView<'_>,
    patch: &PersonPatch<'_>,
) -> Result<u64> {
    let mut builder = RecordBuilder::new(PERSON.schema());
    match patch.name {
        Some(v) => builder.set_text(F_NAME, v)?,
        None => builder.set_text(F_NAME, existing.name()?)?,
    }
    match patch.email {
        Some(v) => builder.set_text(F_EMAIL, v)?,
        None => builder.set_text(F_EMAIL, existing.email()?)?,
    }
    match patch.age {
        Some(v) => builder.set_u64(F_AGE, v)?,
        None => builder.set_u64(F_AGE, existing.age()?)?,
    }
    match patch.role {
        Some(v) => builder.set_text(F_ROLE, v)?,
        None => builder.set_text(F_ROLE, existing.role()?)?,
    }
    let proposed = builder.build();
    PERSON.update(
        txn,
        existing.primary_key_id(),
        existing.row.payload(),
        &proposed,
    )
}

pub fn delete_person(txn: &WriteTxn, id: u64) -> Result<()> {
    PERSON.delete(txn, id)
}

pub fn foreach_person_by_age<'t, T, V>(
    txn: T,
    mut visitor: V,
    reverse: bool,
    start: Option<u64>,
    total: Option<&mut u64>,
) -> Result<()>
where
    T: Into<TxnRef<'t>>,
    V: FnMut(&PersonView<'_>) -> Result<bool>,
{
    let start_key = start.map(encode_u64);
    PERSON.foreach_index(
        txn,
        "age",
        |_key, row| {
            let view = PersonView { row };
            visitor(&view)
        },
        reverse,
        start_key.as_ref().map(|k| k.as_slice()),
        total,
    )
}

pub fn foreach_person_by_role<'t, T, V>(
    txn: T,
    mut visitor: V,
    reverse: bool,
    start: Option<&str>,
    total: Option<&mut u64>,
) -> Result<()>
where
    T: Into<TxnRef<'t>>,
    V: FnMut(&PersonView<'_>) -> Result<bool>,
{
    PERSON.foreach_index(
        txn,
        "role",
        |_key, row| {
            let view = PersonView { row };
            visitor(&view)
        },
        reverse,
        start.map(str::as_bytes),
        total,
    )
}
