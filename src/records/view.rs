//! # RecordView - Zero-Copy Record Access
//!
//! `RecordView` reads a packed payload without copying it. Construction
//! walks the payload once against the schema, validating every length
//! prefix and computing field start offsets; accessors then return
//! slices straight into the underlying buffer.
//!
//! ## Usage
//!
//! ```ignore
//! let view = RecordView::parse(payload, &schema)?;
//! let name: &str = view.get_text(0)?;     // zero-copy reference
//! let created: u64 = view.get_u64(2)?;    // direct read from buffer
//! ```
//!
//! A view borrows its payload; payloads handed out by the engine are
//! stable for the lifetime of the enclosing transaction, so views must
//! not outlive it. The borrow checker enforces this.
//!
//! ## Corruption
//!
//! A truncated payload, a length prefix running past the end, or
//! trailing bytes after the last field all fail `parse` with
//! [`Corruption`](crate::error::Corruption): the layer wrote these bytes
//! itself, so a malformed payload means the store can no longer be
//! trusted.

use eyre::{ensure, Result};
use smallvec::SmallVec;

use crate::error::Corruption;
use crate::records::schema::Schema;
use crate::records::types::FieldKind;

const LEN_PREFIX: usize = 4;

#[derive(Debug)]
pub struct RecordView<'a> {
    data: &'a [u8],
    schema: &'a Schema,
    // field_count + 1 entries; starts[i]..starts[i+1] is field i's body
    starts: SmallVec<[u32; 12]>,
}

fn read_len(data: &[u8], at: usize) -> Result<usize> {
    let end = at
        .checked_add(LEN_PREFIX)
        .filter(|&e| e <= data.len())
        .ok_or_else(|| Corruption::new("payload truncated inside a length prefix"))?;
    let bytes: [u8; LEN_PREFIX] = data[at..end]
        .try_into()
        .map_err(|_| Corruption::new("payload truncated inside a length prefix"))?;
    Ok(u32::from_le_bytes(bytes) as usize)
}

impl<'a> RecordView<'a> {
    /// Validates `data` against `schema` and indexes the field offsets.
    pub fn parse(data: &'a [u8], schema: &'a Schema) -> Result<Self> {
        let mut starts: SmallVec<[u32; 12]> = SmallVec::with_capacity(schema.field_count() + 1);
        let mut at: usize = 0;

        for field in schema.fields() {
            starts.push(at as u32);
            let next = match field.kind {
                FieldKind::Bool | FieldKind::U8 => at.checked_add(1),
                FieldKind::U16 => at.checked_add(2),
                FieldKind::U32 => at.checked_add(4),
                FieldKind::U64 => at.checked_add(8),
                FieldKind::Bytes | FieldKind::Text => {
                    let len = read_len(data, at)?;
                    at.checked_add(LEN_PREFIX).and_then(|a| a.checked_add(len))
                }
                FieldKind::U64Seq => {
                    let count = read_len(data, at)?;
                    count
                        .checked_mul(8)
                        .and_then(|body| at.checked_add(LEN_PREFIX + body))
                }
                FieldKind::BytesSeq | FieldKind::TextSeq => {
                    let count = read_len(data, at)?;
                    let mut cursor = at + LEN_PREFIX;
                    for _ in 0..count {
                        let len = read_len(data, cursor)?;
                        cursor = cursor
                            .checked_add(LEN_PREFIX)
                            .and_then(|c| c.checked_add(len))
                            .filter(|&c| c <= data.len())
                            .ok_or_else(|| {
                                Corruption::new(format!(
                                    "element length in repeated field '{}' exceeds payload",
                                    field.name
                                ))
                            })?;
                    }
                    Some(cursor)
                }
            };
            at = next.filter(|&n| n <= data.len()).ok_or_else(|| {
                Corruption::new(format!(
                    "field '{}' extends past end of payload ({} bytes)",
                    field.name,
                    data.len()
                ))
            })?;
        }

        if at != data.len() {
            return Err(Corruption::new(format!(
                "{} trailing bytes after last field",
                data.len() - at
            ))
            .into());
        }
        starts.push(at as u32);

        Ok(Self {
            data,
            schema,
            starts,
        })
    }

    /// The whole packed payload.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    fn body(&self, idx: usize, expected: FieldKind) -> Result<&'a [u8]> {
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
        Ok(&self.data[self.starts[idx] as usize..self.starts[idx + 1] as usize])
    }

    pub fn get_bool(&self, idx: usize) -> Result<bool> {
        Ok(self.body(idx, FieldKind::Bool)?[0] != 0)
    }

    pub fn get_u8(&self, idx: usize) -> Result<u8> {
        Ok(self.body(idx, FieldKind::U8)?[0])
    }

    pub fn get_u16(&self, idx: usize) -> Result<u16> {
        let body = self.body(idx, FieldKind::U16)?;
        let bytes: [u8; 2] = body
            .try_into()
            .map_err(|_| eyre::eyre!("insufficient data for u16 at field {}", idx))?;
        Ok(u16::from_le_bytes(bytes))
    }

    pub fn get_u32(&self, idx: usize) -> Result<u32> {
        let body = self.body(idx, FieldKind::U32)?;
        let bytes: [u8; 4] = body
            .try_into()
            .map_err(|_| eyre::eyre!("insufficient data for u32 at field {}", idx))?;
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn get_u64(&self, idx: usize) -> Result<u64> {
        let body = self.body(idx, FieldKind::U64)?;
        let bytes: [u8; 8] = body
            .try_into()
            .map_err(|_| eyre::eyre!("insufficient data for u64 at field {}", idx))?;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Zero-copy byte-string field. Empty if stored empty.
    pub fn get_bytes(&self, idx: usize) -> Result<&'a [u8]> {
        Ok(&self.body(idx, FieldKind::Bytes)?[LEN_PREFIX..])
    }

    /// Zero-copy UTF-8 field. Invalid UTF-8 is corruption: the packer
    /// only ever wrote valid strings.
    pub fn get_text(&self, idx: usize) -> Result<&'a str> {
        let bytes = &self.body(idx, FieldKind::Text)?[LEN_PREFIX..];
        std::str::from_utf8(bytes)
            .map_err(|e| Corruption::new(format!("invalid UTF-8 in text field {}: {}", idx, e)).into())
    }

    pub fn get_u64_seq(&self, idx: usize) -> Result<U64SeqView<'a>> {
        let body = self.body(idx, FieldKind::U64Seq)?;
        Ok(U64SeqView {
            elems: &body[LEN_PREFIX..],
        })
    }

    pub fn get_bytes_seq(&self, idx: usize) -> Result<BytesSeqView<'a>> {
        let body = self.body(idx, FieldKind::BytesSeq)?;
        Ok(BytesSeqView::over(body))
    }

    pub fn get_text_seq(&self, idx: usize) -> Result<TextSeqView<'a>> {
        let body = self.body(idx, FieldKind::TextSeq)?;
        Ok(TextSeqView {
            inner: BytesSeqView::over(body),
        })
    }
}

/// Zero-copy view over a repeated u64 field: packed 8-byte little-endian
/// elements.
#[derive(Debug, Clone, Copy)]
pub struct U64SeqView<'a> {
    elems: &'a [u8],
}

impl<'a> U64SeqView<'a> {
    pub fn len(&self) -> usize {
        self.elems.len() / 8
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<u64> {
        let chunk = self.elems.get(i * 8..i * 8 + 8)?;
        Some(u64::from_le_bytes(chunk.try_into().expect("fixed-width slice")))
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + 'a {
        self.elems
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().expect("fixed-width slice")))
    }
}

/// Zero-copy view over a repeated byte-string field. Bounds were
/// validated by `RecordView::parse`, so iteration is infallible.
#[derive(Debug, Clone, Copy)]
pub struct BytesSeqView<'a> {
    body: &'a [u8],
    count: usize,
}

impl<'a> BytesSeqView<'a> {
    fn over(field_body: &'a [u8]) -> Self {
        let count = u32::from_le_bytes(
            field_body[..LEN_PREFIX].try_into().expect("fixed-width slice"),
        ) as usize;
        Self {
            body: &field_body[LEN_PREFIX..],
            count,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> BytesSeqIter<'a> {
        BytesSeqIter {
            rest: self.body,
            remaining: self.count,
        }
    }
}

pub struct BytesSeqIter<'a> {
    rest: &'a [u8],
    remaining: usize,
}

impl<'a> Iterator for BytesSeqIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.remaining == 0 {
            return None;
        }
        let len = u32::from_le_bytes(self.rest.get(..LEN_PREFIX)?.try_into().ok()?) as usize;
        let elem = self.rest.get(LEN_PREFIX..LEN_PREFIX + len)?;
        self.rest = &self.rest[LEN_PREFIX + len..];
        self.remaining -= 1;
        Some(elem)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Zero-copy view over a repeated UTF-8 field. UTF-8 is checked lazily
/// per element, like scalar text fields.
#[derive(Debug, Clone, Copy)]
pub struct TextSeqView<'a> {
    inner: BytesSeqView<'a>,
}

impl<'a> TextSeqView<'a> {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<&'a str>> {
        self.inner.iter().map(|bytes| {
            std::str::from_utf8(bytes)
                .map_err(|e| Corruption::new(format!("invalid UTF-8 in text element: {}", e)).into())
        })
    }
}
