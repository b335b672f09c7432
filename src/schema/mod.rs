//! # Resolved Record Schema
//!
//! The durable output of a discovery run: the table geometry plus one
//! [`FieldSpec`] per resolved field, with addresses relative to the start of
//! a record. A schema is immutable once assembled and is shared read-only by
//! every codec instance; fields the resolver could not place are carried in
//! `unresolved` so encode attempts against them can fail loudly instead of
//! writing garbage.

use crate::bits::BitAddress;
use crate::strings::StringEncoding;
use crate::table::RecordTable;
use crate::transform::Transform;

/// How a field's raw bits map to a value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Bit-packed scalar decoded through a transform.
    Scalar(Transform),
    /// 32-bit little-endian absolute pointer into the string pool.
    StringPointer(StringEncoding),
}

/// One resolved field layout, relative to the record base.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub address: BitAddress,
    pub width: u8,
    pub ty: FieldType,
}

/// The resolved, named, typed layout for one record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    table: RecordTable,
    fields: Vec<FieldSpec>,
    unresolved: Vec<String>,
}

impl RecordSchema {
    pub fn new(table: RecordTable, fields: Vec<FieldSpec>, unresolved: Vec<String>) -> Self {
        Self {
            table,
            fields,
            unresolved,
        }
    }

    pub fn table(&self) -> &RecordTable {
        &self.table
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    pub fn is_unresolved(&self, name: &str) -> bool {
        self.unresolved.iter().any(|n| n == name)
    }
}
