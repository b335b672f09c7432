//! # Record Codec
//!
//! Reads and writes whole records through a resolved [`RecordSchema`]. The
//! codec borrows the schema read-only (any number of codecs can decode the
//! same buffer concurrently) while encoding mutates the buffer in place
//! under the caller's single-writer discipline.
//!
//! Encoding is the precise inverse of decoding: scalar fields run their
//! transform backwards (reading the current raw first so `MaskedMsb` flag
//! bits survive a round trip), and string-pointer fields write the pointer
//! only; pool contents are never touched. Asking to encode a field the
//! resolver left unresolved fails instead of guessing an address.

use eyre::{bail, ensure, eyre, Result};
use hashbrown::HashMap;

use crate::bits::{read_bits, read_le, write_bits, write_le, BitAddress};
use crate::schema::{FieldSpec, FieldType, RecordSchema};
use crate::strings::{StringPool, StringRef};
use crate::transform::Transform;

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Bool(bool),
    /// Resolved enum label.
    Label(String),
    /// Resolved pooled string.
    Text(String),
}

/// Decoder/encoder for records of one resolved schema.
pub struct RecordCodec<'a> {
    schema: &'a RecordSchema,
    pool: Option<&'a StringPool>,
}

impl<'a> RecordCodec<'a> {
    pub fn new(schema: &'a RecordSchema) -> Self {
        Self { schema, pool: None }
    }

    pub fn with_pool(schema: &'a RecordSchema, pool: &'a StringPool) -> Self {
        Self {
            schema,
            pool: Some(pool),
        }
    }

    fn record_base(&self, buf: &[u8], index: usize) -> Result<usize> {
        let table = self.schema.table();
        let base = table
            .record_offset(index)
            .ok_or_else(|| eyre!("record index {} out of 0..{}", index, table.record_count))?;
        ensure!(
            base + table.stride <= buf.len(),
            "record {} at byte {} runs past end of buffer (len {})",
            index,
            base,
            buf.len()
        );
        Ok(base)
    }

    fn field_spec(&self, name: &str) -> Result<&'a FieldSpec> {
        if self.schema.is_unresolved(name) {
            bail!("schema incomplete: field {:?} was not resolved", name);
        }
        self.schema
            .field(name)
            .ok_or_else(|| eyre!("schema has no field {:?}", name))
    }

    fn field_address(&self, base: usize, spec: &FieldSpec) -> BitAddress {
        BitAddress::new(base + spec.address.byte, spec.address.bit)
    }

    /// Decodes one named field of record `index`.
    pub fn decode_field(&self, buf: &[u8], index: usize, name: &str) -> Result<FieldValue> {
        let base = self.record_base(buf, index)?;
        let spec = self.field_spec(name)?;
        let addr = self.field_address(base, spec);

        match &spec.ty {
            FieldType::Scalar(transform) => {
                let raw = read_bits(buf, addr, spec.width)?;
                let value = transform.decode(raw)?;
                Ok(match transform {
                    Transform::Boolean => FieldValue::Bool(value != 0),
                    Transform::Enum { .. } => {
                        let label = transform
                            .label(value)
                            .ok_or_else(|| eyre!("enum ordinal {} out of range for {:?}", value, name))?
                            .to_string();
                        FieldValue::Label(label)
                    }
                    _ => FieldValue::Int(value),
                })
            }
            FieldType::StringPointer(encoding) => {
                let pool = self
                    .pool
                    .ok_or_else(|| eyre!("no string pool configured for field {:?}", name))?;
                let offset = read_le(buf, addr, 4)?;
                let text = pool.resolve(
                    buf,
                    StringRef {
                        offset,
                        encoding: *encoding,
                    },
                )?;
                Ok(FieldValue::Text(text))
            }
        }
    }

    /// Decodes every resolved field of record `index`.
    pub fn decode_record(&self, buf: &[u8], index: usize) -> Result<HashMap<String, FieldValue>> {
        let mut values = HashMap::with_capacity(self.schema.fields().len());
        for spec in self.schema.fields() {
            let value = self.decode_field(buf, index, &spec.name)?;
            values.insert(spec.name.clone(), value);
        }
        Ok(values)
    }

    /// Encodes one named field of record `index` in place.
    pub fn encode_field(
        &self,
        buf: &mut [u8],
        index: usize,
        name: &str,
        value: &FieldValue,
    ) -> Result<()> {
        let base = self.record_base(buf, index)?;
        let spec = self.field_spec(name)?;
        let addr = self.field_address(base, spec);

        match &spec.ty {
            FieldType::Scalar(transform) => {
                let target = match (transform, value) {
                    (Transform::Boolean, FieldValue::Bool(b)) => i64::from(*b),
                    (Transform::Enum { labels }, FieldValue::Label(label)) => labels
                        .iter()
                        .position(|l| l == label)
                        .map(|p| p as i64)
                        .ok_or_else(|| eyre!("no enum label {:?} for field {:?}", label, name))?,
                    (_, FieldValue::Int(v)) => *v,
                    (_, other) => bail!("field {:?} cannot encode {:?}", name, other),
                };
                // Current raw feeds MaskedMsb so its flag bit round-trips.
                let prior = read_bits(buf, addr, spec.width)?;
                let raw = transform.encode(target, spec.width, prior)?;
                write_bits(buf, addr, spec.width, raw)
            }
            FieldType::StringPointer(_) => {
                let FieldValue::Int(offset) = value else {
                    bail!(
                        "field {:?} encodes the pool offset as Int, got {:?}",
                        name,
                        value
                    );
                };
                ensure!(
                    *offset >= 0 && *offset <= u32::MAX as i64,
                    "pool offset {} out of u32 range",
                    offset
                );
                write_le(buf, addr, 4, *offset as u32)
            }
        }
    }

    /// Encodes the given named values into record `index` in place.
    pub fn encode_record(
        &self,
        buf: &mut [u8],
        index: usize,
        values: &HashMap<String, FieldValue>,
    ) -> Result<()> {
        for (name, value) in values {
            self.encode_field(buf, index, name, value)?;
        }
        Ok(())
    }
}
