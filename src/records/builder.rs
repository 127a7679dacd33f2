//! # RecordBuilder - Record Construction
//!
//! `RecordBuilder` packs typed field values into a payload. Setters
//! encode straight into per-field slots; `build()` concatenates the
//! slots in schema order. Unset fields default to zero / empty, which
//! round-trips through the view as `0`, `""`, or an empty sequence.
//!
//! ## Usage
//!
//! ```ignore
//! let mut builder = RecordBuilder::new(&schema);
//! builder.set_text(0, "jane")?;
//! builder.set_u64(2, 1001)?;
//! let payload = builder.build();
//!
//! // Reuse for the next record
//! builder.reset();
//! ```

use eyre::{ensure, Result};

use crate::records::schema::Schema;
use crate::records::types::FieldKind;

pub struct RecordBuilder<'a> {
    schema: &'a Schema,
    // wire-format bytes per field, None = default
    slots: Vec<Option<Vec<u8>>>,
}

fn prefixed(bytes: &[u8]) -> Result<Vec<u8>> {
    ensure!(
        bytes.len() <= u32::MAX as usize,
        "field of {} bytes exceeds the u32 length prefix",
        bytes.len()
    );
    let mut out = Vec::with_capacity(4 + bytes.len());
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
    Ok(out)
}

impl<'a> RecordBuilder<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            slots: vec![None; schema.field_count()],
        }
    }

    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    fn put(&mut self, idx: usize, expected: FieldKind, wire: Vec<u8>) -> Result<()> {
        let field = self
            .schema
            .field(idx)
            .ok_or_else(|| eyre::eyre!("field index {} out of range", idx))?;
        ensure!(
            field.kind == expected,
            "field '{}' is {:?}, not {:?}",
            field.name,
            field.kind,
            expected
        );
        self.slots[idx] = Some(wire);
        Ok(())
    }

    pub fn set_bool(&mut self, idx: usize, value: bool) -> Result<()> {
        self.put(idx, FieldKind::Bool, vec![u8::from(value)])
    }

    pub fn set_u8(&mut self, idx: usize, value: u8) -> Result<()> {
        self.put(idx, FieldKind::U8, vec![value])
    }

    pub fn set_u16(&mut self, idx: usize, value: u16) -> Result<()> {
        self.put(idx, FieldKind::U16, value.to_le_bytes().to_vec())
    }

    pub fn set_u32(&mut self, idx: usize, value: u32) -> Result<()> {
        self.put(idx, FieldKind::U32, value.to_le_bytes().to_vec())
    }

    pub fn set_u64(&mut self, idx: usize, value: u64) -> Result<()> {
        self.put(idx, FieldKind::U64, value.to_le_bytes().to_vec())
    }

    pub fn set_bytes(&mut self, idx: usize, value: &[u8]) -> Result<()> {
        let wire = prefixed(value)?;
        self.put(idx, FieldKind::Bytes, wire)
    }

    pub fn set_text(&mut self, idx: usize, value: &str) -> Result<()> {
        let wire = prefixed(value.as_bytes())?;
        self.put(idx, FieldKind::Text, wire)
    }

    pub fn set_u64_seq(&mut self, idx: usize, values: &[u64]) -> Result<()> {
        ensure!(
            values.len() <= u32::MAX as usize,
            "sequence of {} elements exceeds the u32 count prefix",
            values.len()
        );
        let mut wire = Vec::with_capacity(4 + values.len() * 8);
        wire.extend_from_slice(&(values.len() as u32).to_le_bytes());
        for v in values {
            wire.extend_from_slice(&v.to_le_bytes());
        }
        self.put(idx, FieldKind::U64Seq, wire)
    }

    pub fn set_bytes_seq<I, B>(&mut self, idx: usize, values: I) -> Result<()>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let wire = seq_wire(values)?;
        self.put(idx, FieldKind::BytesSeq, wire)
    }

    pub fn set_text_seq<I, S>(&mut self, idx: usize, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wire = seq_wire(values.into_iter().map(|s| s.as_ref().as_bytes().to_vec()))?;
        self.put(idx, FieldKind::TextSeq, wire)
    }

    /// Concatenates the slots in schema order. Unset fields emit their
    /// defaults.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (idx, field) in self.schema.fields().iter().enumerate() {
            match &self.slots[idx] {
                Some(wire) => out.extend_from_slice(wire),
                None => match field.kind.fixed_size() {
                    Some(size) => out.extend(std::iter::repeat(0u8).take(size)),
                    // empty string / bytes / sequence: count or length 0
                    None => out.extend_from_slice(&0u32.to_le_bytes()),
                },
            }
        }
        out
    }
}

fn seq_wire<I, B>(values: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut body = Vec::new();
    let mut count: u32 = 0;
    for value in values {
        body.extend_from_slice(&prefixed(value.as_ref())?);
        count = count
            .checked_add(1)
            .ok_or_else(|| eyre::eyre!("sequence exceeds the u32 count prefix"))?;
    }
    let mut wire = Vec::with_capacity(4 + body.len());
    wire.extend_from_slice(&count.to_le_bytes());
    wire.extend_from_slice(&body);
    Ok(wire)
}
