//! # Record Schema
//!
//! A `Schema` is the ordered list of fields a table's payloads carry.
//! Field order is the wire order; the codec walks it when packing and
//! when validating a payload.

use crate::records::types::{FieldDef, FieldKind};

#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, idx: usize) -> Option<&FieldDef> {
        self.fields.get(idx)
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Index of a field by name, for diagnostics and ad-hoc access.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn kind(&self, idx: usize) -> Option<FieldKind> {
        self.fields.get(idx).map(|f| f.kind)
    }
}
