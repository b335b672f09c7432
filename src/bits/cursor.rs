//! # Bit Cursor
//!
//! Reads and writes arbitrary-width integer fields at arbitrary bit
//! alignments inside a byte buffer.
//!
//! ## Bit Order Convention
//!
//! Bit 0 of a byte is its **most significant** bit. A multi-bit field spans
//! bits MSB-first and crosses byte boundaries transparently; the first bit
//! read becomes the highest-order bit of the returned integer. This is the
//! convention empirically recovered from the save format and operates below
//! the byte level: it is not little- or big-endian byte order, and callers
//! must not normalize it.
//!
//! ```text
//! byte:        0b1011_0000
//! bit index:     0123 4567   (bit 0 = MSB)
//! read at (0,0), width 4  ->  0b1011 = 11
//! read at (0,2), width 4  ->  0b1100 = 12
//! ```
//!
//! Multi-byte little-endian scalars embedded in the same records (keys,
//! string pointers) are composed from consecutive byte-wise reads via
//! [`read_le`] / [`write_le`].
//!
//! ## Thread Safety
//!
//! Reads are pure. Writes are read-modify-write on the touched bytes only and
//! never disturb bits outside the target span; concurrent writers of the same
//! buffer are the caller's problem (single-writer discipline).

use eyre::{ensure, Result};

use crate::config::constants::MAX_FIELD_WIDTH;

/// A bit-granular position in a byte buffer.
///
/// `bit` counts from the most significant bit of the byte, so `bit` is always
/// in `0..8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BitAddress {
    pub byte: usize,
    pub bit: u8,
}

impl BitAddress {
    pub fn new(byte: usize, bit: u8) -> Self {
        debug_assert!(bit < 8, "bit offset {bit} out of 0..8");
        Self { byte, bit }
    }

    /// Absolute bit index: `byte * 8 + bit`.
    pub fn bit_index(self) -> usize {
        self.byte * 8 + self.bit as usize
    }

    pub fn from_bit_index(index: usize) -> Self {
        Self {
            byte: index / 8,
            bit: (index % 8) as u8,
        }
    }

    /// Advances the address by `bits`, carrying into the byte offset.
    pub fn offset_by(self, bits: usize) -> Self {
        Self::from_bit_index(self.bit_index() + bits)
    }
}

fn check_span(buf: &[u8], addr: BitAddress, width: u8) -> Result<()> {
    ensure!(
        width >= 1 && width <= MAX_FIELD_WIDTH,
        "bit width {} out of range 1..={}",
        width,
        MAX_FIELD_WIDTH
    );
    let span_bytes = (addr.bit as usize + width as usize).div_ceil(8);
    ensure!(
        addr.byte
            .checked_add(span_bytes)
            .is_some_and(|end| end <= buf.len()),
        "field at byte {} bit {} width {} runs past end of buffer (len {})",
        addr.byte,
        addr.bit,
        width,
        buf.len()
    );
    Ok(())
}

/// Reads a `width`-bit unsigned integer at `addr`, MSB-first.
pub fn read_bits(buf: &[u8], addr: BitAddress, width: u8) -> Result<u32> {
    check_span(buf, addr, width)?;

    let mut pos = addr.byte;
    let mut bit = addr.bit;
    let mut result: u32 = 0;
    for _ in 0..width {
        let b = (buf[pos] >> (7 - bit)) & 1;
        result = (result << 1) | b as u32;
        bit += 1;
        if bit == 8 {
            bit = 0;
            pos += 1;
        }
    }
    Ok(result)
}

/// Writes the low `width` bits of `value` at `addr`, MSB-first, preserving
/// every bit outside `[addr, addr + width)`.
pub fn write_bits(buf: &mut [u8], addr: BitAddress, width: u8, value: u32) -> Result<()> {
    check_span(buf, addr, width)?;
    if width < 32 {
        ensure!(
            value < (1u32 << width),
            "value {} does not fit in {} bits",
            value,
            width
        );
    }

    let mut pos = addr.byte;
    let mut bit = addr.bit;
    for i in 0..width {
        let field_bit = ((value >> (width - 1 - i)) & 1) as u8;
        let mask = 1u8 << (7 - bit);
        if field_bit == 1 {
            buf[pos] |= mask;
        } else {
            buf[pos] &= !mask;
        }
        bit += 1;
        if bit == 8 {
            bit = 0;
            pos += 1;
        }
    }
    Ok(())
}

/// Reads a little-endian scalar of `bytes` bytes (1..=4) as consecutive
/// byte-wise bit reads starting at `addr`.
///
/// Record keys and string pointers are stored little-endian while the packed
/// fields around them follow the MSB-first convention; this composes the two
/// without special-casing byte-aligned addresses.
pub fn read_le(buf: &[u8], addr: BitAddress, bytes: usize) -> Result<u32> {
    ensure!(
        (1..=4).contains(&bytes),
        "little-endian read of {} bytes out of range 1..=4",
        bytes
    );
    let mut value: u32 = 0;
    for i in 0..bytes {
        let byte = read_bits(buf, addr.offset_by(i * 8), 8)?;
        value |= byte << (8 * i);
    }
    Ok(value)
}

/// Inverse of [`read_le`].
pub fn write_le(buf: &mut [u8], addr: BitAddress, bytes: usize, value: u32) -> Result<()> {
    ensure!(
        (1..=4).contains(&bytes),
        "little-endian write of {} bytes out of range 1..=4",
        bytes
    );
    if bytes < 4 {
        ensure!(
            value < (1u32 << (8 * bytes)),
            "value {} does not fit in {} bytes",
            value,
            bytes
        );
    }
    for i in 0..bytes {
        write_bits(buf, addr.offset_by(i * 8), 8, (value >> (8 * i)) & 0xFF)?;
    }
    Ok(())
}
