//! # Table Location
//!
//! Finds the base offset and stride of a fixed-stride record table by
//! chaining a per-record validity predicate from anchor marker positions.
//!
//! ## Algorithm
//!
//! For every candidate stride and every candidate marker-field displacement,
//! each occurrence of an anchor's marker pattern proposes a record base
//! (`occurrence - displacement`). From that base the locator walks the key
//! field, the 16-bit little-endian integer at the displacement, in both
//! directions: a key of 0 is a valid-but-empty slot and keeps the chain
//! alive, a key in `1..key_max` is a populated record, anything else (or a
//! record that no longer fits in the buffer) terminates the run. A candidate
//! survives only if its maximal run reaches `min_run` records and the same
//! `(stride, base)` geometry aligns the markers of at least two anchors.
//!
//! Selection prefers the longest run, then the widest anchor coverage.
//! Surviving candidates that still tie under **different strides** are a real
//! failure mode (the same bytes often chain plausibly under several record
//! sizes) and are reported as [`LocateError::Ambiguous`] instead of being
//! silently resolved; same-stride ties are shifted grids over the same keys
//! and collapse to the smallest base offset.

use std::fmt;

use memchr::memmem;
use smallvec::SmallVec;
use tracing::debug;

use crate::anchor::AnchorSet;
use crate::config::constants::{DEFAULT_DISPLACEMENT_LIMIT, DEFAULT_KEY_MAX, DEFAULT_MIN_RUN};

/// Geometry of a located fixed-stride record table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTable {
    pub base: usize,
    pub stride: usize,
    pub record_count: usize,
}

impl RecordTable {
    /// Byte offset of record `index`, if in range.
    pub fn record_offset(&self, index: usize) -> Option<usize> {
        (index < self.record_count).then(|| self.base + index * self.stride)
    }

    /// One past the last record's bytes.
    pub fn end(&self) -> usize {
        self.base + self.record_count * self.stride
    }

    /// Index of the record containing `byte_offset`, if any. A degenerate
    /// zero-stride table contains no byte.
    pub fn record_at(&self, byte_offset: usize) -> Option<usize> {
        if self.stride == 0 || byte_offset < self.base {
            return None;
        }
        let index = (byte_offset - self.base) / self.stride;
        (index < self.record_count).then_some(index)
    }
}

/// Bounds for the table-geometry search.
#[derive(Debug, Clone)]
pub struct TableSearch {
    /// Candidate record strides, in bytes.
    pub strides: Vec<usize>,
    /// Displacement window `0..limit` tried when anchors do not declare
    /// their marker displacement.
    pub displacement_limit: usize,
    /// Exclusive upper bound of the key validity predicate.
    pub key_max: u32,
    /// Minimum chain depth for a candidate to count.
    pub min_run: usize,
}

impl Default for TableSearch {
    fn default() -> Self {
        Self {
            strides: (64..=2048).collect(),
            displacement_limit: DEFAULT_DISPLACEMENT_LIMIT,
            key_max: DEFAULT_KEY_MAX,
            min_run: DEFAULT_MIN_RUN,
        }
    }
}

/// Table-geometry discovery failures. Both abort the discovery run: no
/// schema can be resolved without a validated table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    /// No `(stride, base)` reached the minimum run length while aligning at
    /// least two anchors.
    NoConsistentTable { min_run: usize },
    /// Multiple distinct geometries tied on run length and anchor coverage.
    Ambiguous { candidates: Vec<RecordTable> },
}

impl fmt::Display for LocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocateError::NoConsistentTable { min_run } => write!(
                f,
                "no stride/base candidate reached a run of {min_run} records with 2-anchor coverage"
            ),
            LocateError::Ambiguous { candidates } => {
                write!(f, "{} table geometries tie:", candidates.len())?;
                for t in candidates {
                    write!(
                        f,
                        " (base {} stride {} records {})",
                        t.base, t.stride, t.record_count
                    )?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for LocateError {}

fn key_valid(buf: &[u8], record_base: usize, stride: usize, disp: usize, key_max: u32) -> bool {
    let Some(end) = record_base.checked_add(stride) else {
        return false;
    };
    if end > buf.len() {
        return false;
    }
    let pos = record_base + disp;
    let key = u16::from_le_bytes([buf[pos], buf[pos + 1]]) as u32;
    key == 0 || key < key_max
}

struct Candidate {
    table: RecordTable,
    coverage: usize,
}

/// Locates the maximal fixed-stride record table consistent with `anchors`.
pub fn locate(
    buf: &[u8],
    anchors: &AnchorSet,
    search: &TableSearch,
) -> Result<RecordTable, LocateError> {
    let occurrences: Vec<Vec<usize>> = anchors
        .anchors()
        .iter()
        .map(|a| memmem::find_iter(buf, &a.marker).collect())
        .collect();

    let mut displacements: Vec<usize> = anchors
        .anchors()
        .iter()
        .filter_map(|a| a.marker_displacement)
        .collect();
    displacements.sort_unstable();
    displacements.dedup();
    if displacements.is_empty() {
        displacements = (0..search.displacement_limit).collect();
    }

    let mut strides = search.strides.clone();
    strides.retain(|&s| s > 0);
    strides.sort_unstable();
    strides.dedup();

    // Very few geometries survive the run and coverage filters.
    let mut candidates: SmallVec<[Candidate; 4]> = SmallVec::new();

    for &stride in &strides {
        for &disp in &displacements {
            // The key field must fit inside the record.
            if disp + 2 > stride {
                continue;
            }
            for &occurrence in occurrences.iter().flatten() {
                let Some(seed) = occurrence.checked_sub(disp) else {
                    continue;
                };
                if !key_valid(buf, seed, stride, disp, search.key_max) {
                    continue;
                }

                // Maximal run through the seed, both directions.
                let mut first = seed;
                while let Some(prev) = first.checked_sub(stride) {
                    if key_valid(buf, prev, stride, disp, search.key_max) {
                        first = prev;
                    } else {
                        break;
                    }
                }
                let mut count = (seed - first) / stride + 1;
                let mut next = seed + stride;
                while key_valid(buf, next, stride, disp, search.key_max) {
                    count += 1;
                    next += stride;
                }
                if count < search.min_run {
                    continue;
                }

                let table = RecordTable {
                    base: first,
                    stride,
                    record_count: count,
                };
                let aligned = |q: usize| {
                    q.checked_sub(disp).is_some_and(|b| {
                        b >= table.base
                            && (b - table.base) % stride == 0
                            && (b - table.base) / stride < count
                    })
                };
                let coverage = occurrences
                    .iter()
                    .filter(|occs| occs.iter().copied().any(aligned))
                    .count();
                if coverage < 2 {
                    continue;
                }

                if !candidates.iter().any(|c| c.table == table) {
                    debug!(
                        base = table.base,
                        stride,
                        records = count,
                        coverage,
                        "table candidate"
                    );
                    candidates.push(Candidate { table, coverage });
                }
            }
        }
    }

    if candidates.is_empty() {
        return Err(LocateError::NoConsistentTable {
            min_run: search.min_run,
        });
    }

    let best = candidates
        .iter()
        .map(|c| (c.table.record_count, c.coverage))
        .max()
        .unwrap();
    let mut top: Vec<RecordTable> = candidates
        .iter()
        .filter(|c| (c.table.record_count, c.coverage) == best)
        .map(|c| c.table.clone())
        .collect();
    top.sort_by_key(|t| (t.stride, t.base));

    if top.len() == 1 {
        return Ok(top.remove(0));
    }
    if top.iter().all(|t| t.stride == top[0].stride) {
        // Shifted grids over the same key chain; the smallest base is the
        // maximal one.
        return Ok(top.remove(0));
    }
    Err(LocateError::Ambiguous { candidates: top })
}
