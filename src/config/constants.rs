//! # Discovery Configuration Constants
//!
//! This module centralizes the default tunables for table location, hypothesis
//! scoring, and string resolution. Constants that depend on each other are
//! co-located and the relationships documented, so a change to one can be
//! checked against its dependents.
//!
//! ```text
//! EXACT_MATCH_WEIGHT (3.0)
//!       │
//!       └─> DEFAULT_PENALTY_FACTOR (2.5)
//!             A violated constraint costs penalty_factor * weight, so with
//!             the defaults one contradicted range constraint (-2.5) outweighs
//!             one confirmed range constraint (+1.0), and one contradicted
//!             exact constraint (-7.5) outweighs two confirmed exact
//!             constraints (+6.0). The factor must stay > 1.0 or coincidental
//!             matches stop being suppressed.
//!
//! DEFAULT_MIN_SCORE (4.0)
//!       │
//!       └─> reachable as one exact match (3.0) plus one range match (1.0),
//!           i.e. a candidate needs at least two agreeing anchors with mixed
//!           constraint strength before it is accepted.
//!
//! DEFAULT_KEY_MAX (15_000)
//!       │
//!       └─> upper bound for the per-record key validity predicate. Entity
//!           identifiers in the surveyed save files stay in the low thousands;
//!           anything at or above this reads as foreign bytes and terminates
//!           a record chain. A key of exactly 0 is an empty slot and keeps
//!           the chain alive.
//! ```

/// Widest field the bit cursor will read or write in one call.
pub const MAX_FIELD_WIDTH: u8 = 32;

/// Default weight for an exact-match constraint (strong discriminator).
pub const EXACT_MATCH_WEIGHT: f64 = 3.0;

/// Default weight for a range or string constraint.
pub const RANGE_MATCH_WEIGHT: f64 = 1.0;

/// Multiplier applied to a constraint's weight when it is violated.
pub const DEFAULT_PENALTY_FACTOR: f64 = 2.5;

/// Minimum accepted score for a resolved field layout.
pub const DEFAULT_MIN_SCORE: f64 = 4.0;

/// Default upper bound (exclusive) for a valid record key.
pub const DEFAULT_KEY_MAX: u32 = 15_000;

/// Minimum number of consecutive valid records for a table candidate.
pub const DEFAULT_MIN_RUN: usize = 3;

/// Default search window for the marker-field displacement within a record,
/// used when an anchor does not declare its displacement.
pub const DEFAULT_DISPLACEMENT_LIMIT: usize = 256;

/// Default unit cap when resolving a string pointer.
pub const DEFAULT_MAX_STRING_LEN: usize = 64;

/// Printable ASCII range accepted inside resolved strings.
pub const PRINTABLE_MIN: u8 = 0x20;
pub const PRINTABLE_MAX: u8 = 0x7E;
