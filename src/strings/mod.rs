//! # String Pool Resolution
//!
//! Records do not embed their text inline; name-like fields store a 32-bit
//! **absolute** byte offset into a late string-pool region of the buffer.
//! This module resolves such a pointer into a bounded, terminator-delimited
//! string.
//!
//! Resolution is deliberately strict: a pointer outside the configured pool
//! region, or a decoded unit outside the printable range, fails immediately.
//! That failure is not just an error path: the hypothesis scorer relies on
//! it as a negative signal to reject candidate fields that are *not* string
//! pointers, which is most of them.

use std::ops::Range;

use eyre::{bail, ensure, Result};

use crate::config::constants::{DEFAULT_MAX_STRING_LEN, PRINTABLE_MAX, PRINTABLE_MIN};

/// Character encoding of a pooled string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEncoding {
    Ascii,
    Utf16Le,
}

/// An unresolved pointer field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringRef {
    pub offset: u32,
    pub encoding: StringEncoding,
}

/// The plausible pool region and resolution bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringPool {
    region: Range<usize>,
    max_len: usize,
}

impl StringPool {
    pub fn new(region: Range<usize>) -> Self {
        Self {
            region,
            max_len: DEFAULT_MAX_STRING_LEN,
        }
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn region(&self) -> &Range<usize> {
        &self.region
    }

    /// Resolves `r` to a string, scanning forward to a zero terminator or
    /// `max_len` units.
    pub fn resolve(&self, buf: &[u8], r: StringRef) -> Result<String> {
        let offset = r.offset as usize;
        ensure!(
            self.region.contains(&offset),
            "pointer {:#x} outside string pool region {:#x}..{:#x}",
            offset,
            self.region.start,
            self.region.end
        );

        match r.encoding {
            StringEncoding::Ascii => self.resolve_ascii(buf, offset),
            StringEncoding::Utf16Le => self.resolve_utf16le(buf, offset),
        }
    }

    fn resolve_ascii(&self, buf: &[u8], offset: usize) -> Result<String> {
        let mut out = String::new();
        for i in 0..self.max_len {
            let pos = offset + i;
            ensure!(pos < buf.len(), "string at {:#x} runs past end of buffer", offset);
            let b = buf[pos];
            if b == 0 {
                break;
            }
            ensure!(
                (PRINTABLE_MIN..=PRINTABLE_MAX).contains(&b),
                "non-printable byte {:#04x} at {:#x}, not a string pointer",
                b,
                pos
            );
            out.push(b as char);
        }
        Ok(out)
    }

    fn resolve_utf16le(&self, buf: &[u8], offset: usize) -> Result<String> {
        let mut out = String::new();
        for i in 0..self.max_len {
            let pos = offset + 2 * i;
            ensure!(
                pos + 2 <= buf.len(),
                "string at {:#x} runs past end of buffer",
                offset
            );
            let unit = u16::from_le_bytes([buf[pos], buf[pos + 1]]);
            if unit == 0 {
                break;
            }
            let printable = (PRINTABLE_MIN as u16..=PRINTABLE_MAX as u16).contains(&unit)
                || unit >= 0x00A0;
            ensure!(
                printable,
                "non-printable unit {:#06x} at {:#x}, not a string pointer",
                unit,
                pos
            );
            match char::from_u32(unit as u32) {
                Some(c) => out.push(c),
                // Lone surrogate: foreign bytes, not text.
                None => bail!("lone surrogate {:#06x} at {:#x}, not a string pointer", unit, pos),
            }
        }
        Ok(out)
    }
}
