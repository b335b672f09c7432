//! # Value Transforms
//!
//! Pure bidirectional mappings between the raw integer a field stores and the
//! domain value it means. Each kind is a `(decode, encode)` pair; `encode` is
//! the exact inverse of `decode` over the representable domain.
//!
//! | Kind           | decode(raw)                  | encode(value)                       |
//! |----------------|------------------------------|-------------------------------------|
//! | `Identity`     | `raw`                        | `value`                             |
//! | `AffineRating` | `raw / divisor + offset`     | smallest raw that decodes to value  |
//! | `MaskedMsb`    | `raw & mask`                 | value under mask, prior bits kept   |
//! | `Boolean`      | `raw != 0`                   | `false -> 0`, `true -> 1`           |
//! | `Enum`         | label ordinal                | ordinal of label                    |
//!
//! `AffineRating` is not injective (with divisor 3, raws 222..=224 all decode
//! to the same rating), so encode picks the smallest raw in `[0, 2^width)`
//! whose decode equals the value and fails if none exists.
//!
//! `MaskedMsb` exists because some packed percentage fields interleave an
//! extra flag bit above the value (observed with mask `0x7F`). What that bit
//! means was never conclusively recovered; it is ignored on decode and
//! preserved verbatim on encode via the caller-supplied prior raw.

use eyre::{ensure, Result};

/// Raw-to-domain mapping for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    Identity,
    AffineRating { divisor: u32, offset: i64 },
    MaskedMsb { mask: u32 },
    Boolean,
    Enum { labels: Vec<String> },
}

fn max_raw(width: u8) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

impl Transform {
    /// Maps a raw field value to its domain value.
    ///
    /// `Boolean` decodes to 0 or 1; `Enum` decodes to the label ordinal and
    /// fails for a raw with no label (recoverable; the caller may surface
    /// the raw integer instead).
    pub fn decode(&self, raw: u32) -> Result<i64> {
        match self {
            Transform::Identity => Ok(raw as i64),
            Transform::AffineRating { divisor, offset } => {
                ensure!(*divisor > 0, "affine divisor must be nonzero");
                Ok((raw / divisor) as i64 + offset)
            }
            Transform::MaskedMsb { mask } => Ok((raw & mask) as i64),
            Transform::Boolean => Ok(i64::from(raw != 0)),
            Transform::Enum { labels } => {
                ensure!(
                    (raw as usize) < labels.len(),
                    "unknown enum value {} ({} labels)",
                    raw,
                    labels.len()
                );
                Ok(raw as i64)
            }
        }
    }

    /// Maps a domain value back to a raw field value for a `width`-bit field.
    ///
    /// `prior_raw` is the field's current raw contents; only `MaskedMsb`
    /// consults it, to carry the bits its mask excludes through a round trip.
    pub fn encode(&self, value: i64, width: u8, prior_raw: u32) -> Result<u32> {
        let cap = max_raw(width);
        match self {
            Transform::Identity => {
                ensure!(
                    value >= 0 && value <= cap as i64,
                    "value {} has no {}-bit raw representation",
                    value,
                    width
                );
                Ok(value as u32)
            }
            Transform::AffineRating { divisor, offset } => {
                ensure!(*divisor > 0, "affine divisor must be nonzero");
                // Smallest raw with raw / divisor + offset == value.
                let steps = value - offset;
                ensure!(
                    steps >= 0,
                    "value {} below affine floor {}",
                    value,
                    offset
                );
                let raw = (steps as u64) * (*divisor as u64);
                ensure!(
                    raw <= cap as u64,
                    "value {} has no {}-bit raw representation",
                    value,
                    width
                );
                Ok(raw as u32)
            }
            Transform::MaskedMsb { mask } => {
                ensure!(
                    value >= 0 && value <= u32::MAX as i64,
                    "value {} has no raw representation",
                    value
                );
                let v = value as u32;
                ensure!(
                    v & !mask == 0,
                    "value {} does not fit under mask {:#x}",
                    value,
                    mask
                );
                Ok((v & mask) | (prior_raw & !mask & cap))
            }
            Transform::Boolean => Ok(u32::from(value != 0)),
            Transform::Enum { labels } => {
                ensure!(
                    value >= 0 && (value as usize) < labels.len(),
                    "no enum label with ordinal {}",
                    value
                );
                Ok(value as u32)
            }
        }
    }

    /// Interval of domain values a `width`-bit field can decode to.
    ///
    /// Used to discard transform/width pairs that cannot possibly reach a
    /// query's plausibility range before any anchors are consulted. Fails
    /// for a transform no raw can decode through, such as a zero divisor.
    pub fn decode_range(&self, width: u8) -> Result<(i64, i64)> {
        let cap = max_raw(width) as i64;
        Ok(match self {
            Transform::Identity => (0, cap),
            Transform::AffineRating { divisor, offset } => {
                ensure!(*divisor > 0, "affine divisor must be nonzero");
                (*offset, cap / *divisor as i64 + offset)
            }
            Transform::MaskedMsb { mask } => (0, cap & *mask as i64),
            Transform::Boolean => (0, 1),
            Transform::Enum { labels } => (0, cap.min(labels.len() as i64 - 1)),
        })
    }

    /// Label for a decoded `Enum` ordinal; `None` for other kinds.
    pub fn label(&self, ordinal: i64) -> Option<&str> {
        match self {
            Transform::Enum { labels } => labels.get(usize::try_from(ordinal).ok()?),
            _ => None,
        }
        .map(String::as_str)
    }
}
