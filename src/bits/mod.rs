//! Bit-granular buffer addressing.

mod cursor;

pub use cursor::{read_bits, read_le, write_bits, write_le, BitAddress};
