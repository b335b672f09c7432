//! # Anchors: External Ground Truth
//!
//! An [`Anchor`] identifies one concrete record in the buffer through a raw
//! marker byte pattern (typically the little-endian bytes of a known entity
//! identifier) and asserts facts about that record's fields. Discovery never
//! trusts a single anchor: one record satisfying a predicate could be a
//! coincidence anywhere in a multi-megabyte buffer, so [`AnchorSet::new`]
//! requires at least two independent reference records.
//!
//! Constraints reference fields by name and, for repeating sequences, by slot
//! index within the sequence. Weights default to a strong value for exact
//! identifier matches and a weak one for range/string assertions; both can be
//! overridden per constraint.

use eyre::{ensure, Result};

use crate::config::constants::{EXACT_MATCH_WEIGHT, RANGE_MATCH_WEIGHT};

/// A predicate over a decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    /// Decodes to exactly this value. Strong discriminator.
    Exactly(i64),
    /// Decodes into the inclusive interval.
    InRange(i64, i64),
    /// A string-pointer field resolves to exactly this text.
    Text(String),
}

impl Expectation {
    pub fn default_weight(&self) -> f64 {
        match self {
            Expectation::Exactly(_) => EXACT_MATCH_WEIGHT,
            Expectation::InRange(..) | Expectation::Text(_) => RANGE_MATCH_WEIGHT,
        }
    }

    /// `None` when the expectation does not apply to integer values.
    pub fn matches_int(&self, value: i64) -> Option<bool> {
        match self {
            Expectation::Exactly(n) => Some(value == *n),
            Expectation::InRange(lo, hi) => Some(*lo <= value && value <= *hi),
            Expectation::Text(_) => None,
        }
    }

    /// `None` when the expectation does not apply to resolved strings.
    pub fn matches_text(&self, value: &str) -> Option<bool> {
        match self {
            Expectation::Text(expected) => Some(value == expected),
            _ => None,
        }
    }
}

/// One asserted fact about a field of an anchor's record.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub field: String,
    /// Index within a field sequence; 0 for scalar fields.
    pub slot: usize,
    pub expectation: Expectation,
    pub weight: f64,
}

impl Constraint {
    pub fn new(field: &str, expectation: Expectation) -> Self {
        let weight = expectation.default_weight();
        Self {
            field: field.to_string(),
            slot: 0,
            expectation,
            weight,
        }
    }

    pub fn at_slot(field: &str, slot: usize, expectation: Expectation) -> Self {
        Self {
            slot,
            ..Self::new(field, expectation)
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// A reference record: a locatable marker plus expected-attribute facts.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    /// Byte pattern that occurs inside the record (e.g. the LE identifier).
    pub marker: Vec<u8>,
    /// Byte offset of the marker field within its record, when known.
    /// `None` makes the table locator search for the displacement.
    pub marker_displacement: Option<usize>,
    pub constraints: Vec<Constraint>,
}

impl Anchor {
    pub fn new(marker: Vec<u8>) -> Self {
        Self {
            marker,
            marker_displacement: None,
            constraints: Vec::new(),
        }
    }

    pub fn at_displacement(mut self, displacement: usize) -> Self {
        self.marker_displacement = Some(displacement);
        self
    }

    pub fn expect(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Constraints that reference `field`, in declaration order.
    pub fn constraints_for<'a>(
        &'a self,
        field: &'a str,
    ) -> impl Iterator<Item = &'a Constraint> + 'a {
        self.constraints.iter().filter(move |c| c.field == field)
    }
}

/// The full set of reference records for one discovery run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorSet {
    anchors: Vec<Anchor>,
}

impl AnchorSet {
    /// Fails with fewer than two anchors: one reference record cannot
    /// distinguish the true field from a coincidental match.
    pub fn new(anchors: Vec<Anchor>) -> Result<Self> {
        ensure!(
            anchors.len() >= 2,
            "anchor set needs at least 2 reference records, got {}",
            anchors.len()
        );
        ensure!(
            anchors.iter().all(|a| !a.marker.is_empty()),
            "anchor marker pattern cannot be empty"
        );
        Ok(Self { anchors })
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}
