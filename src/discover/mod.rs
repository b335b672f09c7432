//! # Layout Discovery
//!
//! Reifies the "brute force everything" loops of ad hoc format exploration
//! into a declarative pipeline: a [`FieldQuery`] describes the search space
//! for one field, the scorer turns each [`CandidateLayout`] into a
//! [`ScoredCandidate`] against the anchor set, and the resolver selects the
//! best consistent layout per field into a `RecordSchema`.
//!
//! Scoring one candidate is a pure function of `(buffer, table, anchors,
//! candidate)`; the resolver runs the scan single-threaded in a fixed order
//! so results are deterministic, but the per-candidate merge is commutative,
//! and a caller may partition the space across workers and combine with the
//! same tie-break rule.

use std::fmt;
use std::ops::{Range, RangeInclusive};

use crate::bits::BitAddress;
use crate::config::constants::{DEFAULT_MIN_SCORE, DEFAULT_PENALTY_FACTOR};
use crate::strings::StringEncoding;
use crate::transform::Transform;

mod resolver;
mod scorer;

pub use resolver::{Resolution, SchemaResolver};
pub use scorer::score_candidate;

/// A trial field layout under evaluation. Never persisted past the search.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateLayout {
    /// Address relative to the record base.
    pub address: BitAddress,
    pub width: u8,
    pub transform: Transform,
}

/// A candidate plus its evidence against the anchor set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub layout: CandidateLayout,
    pub score: f64,
    /// Distinct anchors with at least one satisfied constraint. Agreement
    /// across independent anchors is stronger evidence than several
    /// constraints of a single anchor.
    pub anchors_matched: usize,
    pub matched: usize,
    pub violated: usize,
    /// False when any anchor decoded outside the universal plausibility
    /// range. An implausible anchor disqualifies the candidate no matter how
    /// high its accumulated score.
    pub valid: bool,
}

/// Value domain of the field being searched for.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDomain {
    Scalar {
        /// Transform kinds plausible for this field.
        transforms: Vec<Transform>,
        /// Every anchor must decode into this range, constraints or not.
        plausible: RangeInclusive<i64>,
    },
    /// 32-bit little-endian absolute pointer into the string pool. A
    /// candidate is plausible only if the pointer resolves for every anchor.
    StringPointer { encoding: StringEncoding },
}

/// The declarative search space for one named field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldQuery {
    pub name: String,
    /// Byte offsets (relative to the record base) to try.
    pub window: Range<usize>,
    /// Bit widths to try.
    pub widths: Vec<u8>,
    /// Number of consecutive values sharing the start address. 1 for a
    /// scalar; N for an ordered sequence, validated against slot-indexed
    /// constraints across the entire run, which is what distinguishes a
    /// repeating array from isolated coincidental scalars.
    pub count: usize,
    pub domain: FieldDomain,
}

impl FieldQuery {
    pub fn scalar(
        name: &str,
        window: Range<usize>,
        widths: Vec<u8>,
        transforms: Vec<Transform>,
        plausible: RangeInclusive<i64>,
    ) -> Self {
        Self {
            name: name.to_string(),
            window,
            widths,
            count: 1,
            domain: FieldDomain::Scalar {
                transforms,
                plausible,
            },
        }
    }

    pub fn sequence(
        name: &str,
        window: Range<usize>,
        width: u8,
        count: usize,
        transforms: Vec<Transform>,
        plausible: RangeInclusive<i64>,
    ) -> Self {
        Self {
            name: name.to_string(),
            window,
            widths: vec![width],
            count,
            domain: FieldDomain::Scalar {
                transforms,
                plausible,
            },
        }
    }

    pub fn string_pointer(name: &str, window: Range<usize>, encoding: StringEncoding) -> Self {
        Self {
            name: name.to_string(),
            window,
            widths: vec![32],
            count: 1,
            domain: FieldDomain::StringPointer { encoding },
        }
    }
}

/// Scoring and acceptance tunables for one resolution run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Minimum score an accepted candidate must reach.
    pub min_score: f64,
    /// Multiplier applied to a constraint's weight on violation. Must stay
    /// above 1.0 so a contradiction outweighs a confirmation.
    pub penalty_factor: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            penalty_factor: DEFAULT_PENALTY_FACTOR,
        }
    }
}

/// An anchor matched to its record inside the located table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorBinding {
    /// Index into the anchor set.
    pub anchor: usize,
    /// Byte offset of the anchor's record.
    pub record_base: usize,
}

/// Per-field discovery failures. Recoverable: they are accumulated and
/// returned next to the fields that did resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFailure {
    /// Search space exhausted with nothing valid above the threshold.
    NoCandidate,
    /// Several candidates survived every tie-break.
    Ambiguous { tied: usize },
}

impl fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldFailure::NoCandidate => write!(f, "no candidate layout reached the minimum score"),
            FieldFailure::Ambiguous { tied } => {
                write!(f, "{tied} candidate layouts tie after all tie-breaks")
            }
        }
    }
}

impl std::error::Error for FieldFailure {}
