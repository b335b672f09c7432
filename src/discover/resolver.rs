//! # Schema Resolution
//!
//! Drives the discovery search: for every queried field, enumerate candidate
//! layouts across the byte window, bit offsets 0..8, the width set and the
//! plausible transforms, score each against the anchors, and keep the best
//! consistent one. Field resolution is independent per field (layouts
//! depend only on the shared table geometry, never on each other), so a
//! failed field is accumulated and reported without aborting its siblings.
//!
//! Tie-breaking is fixed and total up to true ambiguity: highest score, most
//! distinct anchors with a satisfied constraint, most constraints matched,
//! smallest width, smallest byte offset, smallest bit offset. Candidates
//! still tied after that (typically distinct
//! transforms that decode identically over the observed raws) are reported
//! as ambiguous rather than guessed at.

use eyre::{ensure, Result};
use memchr::memmem;
use tracing::debug;

use crate::anchor::AnchorSet;
use crate::bits::BitAddress;
use crate::schema::{FieldSpec, FieldType, RecordSchema};
use crate::strings::StringPool;
use crate::table::RecordTable;
use crate::transform::Transform;

use super::scorer::score_candidate;
use super::{
    AnchorBinding, CandidateLayout, FieldDomain, FieldFailure, FieldQuery, ResolverConfig,
    ScoredCandidate,
};

/// Outcome of a resolution run: the schema that could be assembled plus the
/// fields that could not, with the reason each one failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub schema: RecordSchema,
    pub unresolved: Vec<(String, FieldFailure)>,
}

/// One-shot driver for resolving a set of field queries over a located table.
pub struct SchemaResolver<'a> {
    buf: &'a [u8],
    table: &'a RecordTable,
    anchors: &'a AnchorSet,
    pool: Option<&'a StringPool>,
    config: ResolverConfig,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(buf: &'a [u8], table: &'a RecordTable, anchors: &'a AnchorSet) -> Self {
        Self {
            buf,
            table,
            anchors,
            pool: None,
            config: ResolverConfig::default(),
        }
    }

    pub fn with_pool(mut self, pool: &'a StringPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Matches each anchor's marker to the record containing it.
    ///
    /// A declared marker displacement is binding: only an occurrence at
    /// exactly that offset inside its record counts, so marker bytes that
    /// show up coincidentally elsewhere in the table cannot capture the
    /// anchor. This mirrors the coverage rule the locator applied when it
    /// validated the geometry.
    fn bind_anchors(&self) -> Result<Vec<AnchorBinding>> {
        let mut bindings = Vec::new();
        for (index, anchor) in self.anchors.anchors().iter().enumerate() {
            let found = memmem::find_iter(self.buf, &anchor.marker).find_map(|pos| {
                let record = self.table.record_at(pos)?;
                let base = self.table.record_offset(record)?;
                // The marker must sit entirely inside one record.
                if pos + anchor.marker.len() > base + self.table.stride {
                    return None;
                }
                if let Some(disp) = anchor.marker_displacement {
                    if pos - base != disp {
                        return None;
                    }
                }
                Some(AnchorBinding {
                    anchor: index,
                    record_base: base,
                })
            });
            if let Some(binding) = found {
                bindings.push(binding);
            }
        }
        ensure!(
            bindings.len() >= 2,
            "only {} anchors align inside the located table, need at least 2",
            bindings.len()
        );
        Ok(bindings)
    }

    /// Resolves every query, accumulating per-field failures.
    pub fn resolve(&self, queries: &[FieldQuery]) -> Result<Resolution> {
        ensure!(
            self.pool.is_some()
                || queries
                    .iter()
                    .all(|q| !matches!(q.domain, FieldDomain::StringPointer { .. })),
            "string-pointer query without a configured string pool"
        );
        let bindings = self.bind_anchors()?;

        let mut fields = Vec::new();
        let mut unresolved = Vec::new();
        for query in queries {
            match self.resolve_field(query, &bindings) {
                Ok(layout) => {
                    debug!(
                        field = %query.name,
                        byte = layout.address.byte,
                        bit = layout.address.bit,
                        width = layout.width,
                        "resolved field"
                    );
                    expand_field(query, &layout, &mut fields);
                }
                Err(failure) => {
                    debug!(field = %query.name, %failure, "field unresolved");
                    unresolved.push((query.name.clone(), failure));
                }
            }
        }

        let unresolved_names = unresolved.iter().map(|(n, _)| n.clone()).collect();
        Ok(Resolution {
            schema: RecordSchema::new(self.table.clone(), fields, unresolved_names),
            unresolved,
        })
    }

    fn resolve_field(
        &self,
        query: &FieldQuery,
        bindings: &[AnchorBinding],
    ) -> Result<CandidateLayout, FieldFailure> {
        let identity = [Transform::Identity];
        let mut best: Vec<ScoredCandidate> = Vec::new();
        let mut best_score = f64::NEG_INFINITY;

        for byte in query.window.clone() {
            for bit in 0..8u8 {
                for &width in &query.widths {
                    let transforms: &[Transform] = match &query.domain {
                        FieldDomain::Scalar { transforms, .. } => transforms,
                        FieldDomain::StringPointer { .. } => &identity,
                    };
                    for transform in transforms {
                        if let FieldDomain::Scalar { plausible, .. } = &query.domain {
                            // Skip transform/width pairs that cannot reach
                            // the plausible range at all. A transform that
                            // has no range (zero divisor) can never decode.
                            let Ok((lo, hi)) = transform.decode_range(width) else {
                                continue;
                            };
                            if hi < *plausible.start() || lo > *plausible.end() {
                                continue;
                            }
                        }
                        let candidate = CandidateLayout {
                            address: BitAddress::new(byte, bit),
                            width,
                            transform: transform.clone(),
                        };
                        let scored = score_candidate(
                            self.buf,
                            self.anchors.anchors(),
                            bindings,
                            query,
                            &candidate,
                            self.pool,
                            self.config.penalty_factor,
                        );
                        if !scored.valid || scored.score < self.config.min_score {
                            continue;
                        }
                        if scored.score > best_score {
                            best_score = scored.score;
                            best = vec![scored];
                        } else if scored.score == best_score {
                            best.push(scored);
                        }
                    }
                }
            }
        }

        if best.is_empty() {
            return Err(FieldFailure::NoCandidate);
        }

        // Tie-breaks, in order: most distinct anchors satisfied, most
        // constraints matched, smallest width, smallest byte offset,
        // smallest bit offset.
        let max_anchors = best.iter().map(|c| c.anchors_matched).max().unwrap();
        best.retain(|c| c.anchors_matched == max_anchors);
        let max_matched = best.iter().map(|c| c.matched).max().unwrap();
        best.retain(|c| c.matched == max_matched);
        let min_width = best.iter().map(|c| c.layout.width).min().unwrap();
        best.retain(|c| c.layout.width == min_width);
        let min_addr = best.iter().map(|c| c.layout.address).min().unwrap();
        best.retain(|c| c.layout.address == min_addr);

        if best.len() > 1 {
            return Err(FieldFailure::Ambiguous { tied: best.len() });
        }
        Ok(best.remove(0).layout)
    }
}

fn expand_field(query: &FieldQuery, layout: &CandidateLayout, fields: &mut Vec<FieldSpec>) {
    match &query.domain {
        FieldDomain::Scalar { .. } => {
            if query.count == 1 {
                fields.push(FieldSpec {
                    name: query.name.clone(),
                    address: layout.address,
                    width: layout.width,
                    ty: FieldType::Scalar(layout.transform.clone()),
                });
            } else {
                for slot in 0..query.count {
                    fields.push(FieldSpec {
                        name: format!("{}[{}]", query.name, slot),
                        address: layout.address.offset_by(slot * layout.width as usize),
                        width: layout.width,
                        ty: FieldType::Scalar(layout.transform.clone()),
                    });
                }
            }
        }
        FieldDomain::StringPointer { encoding } => {
            fields.push(FieldSpec {
                name: query.name.clone(),
                address: layout.address,
                width: 32,
                ty: FieldType::StringPointer(*encoding),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{Anchor, Constraint, Expectation};
    use crate::bits::write_bits;

    /// Three 16-byte records at base 0; markers 0x05,0x00 / 0x07,0x00 at
    /// byte 10 of records 0 and 1; a 4-bit field planted at (4,2).
    fn fixture() -> (Vec<u8>, RecordTable, AnchorSet) {
        let mut buf = vec![0u8; 64];
        buf[10] = 0x05;
        buf[26] = 0x07;
        write_bits(&mut buf, BitAddress::new(4, 2), 4, 9).unwrap();
        write_bits(&mut buf, BitAddress::new(20, 2), 4, 3).unwrap();

        let table = RecordTable {
            base: 0,
            stride: 16,
            record_count: 3,
        };
        let anchors = AnchorSet::new(vec![
            Anchor::new(vec![0x05, 0x00])
                .expect(Constraint::new("grade", Expectation::Exactly(9))),
            Anchor::new(vec![0x07, 0x00])
                .expect(Constraint::new("grade", Expectation::Exactly(3))),
        ])
        .unwrap();
        (buf, table, anchors)
    }

    fn grade_query(transforms: Vec<Transform>) -> FieldQuery {
        FieldQuery::scalar("grade", 2..8, vec![4], transforms, 0..=15)
    }

    #[test]
    fn resolves_planted_bit_field() {
        let (buf, table, anchors) = fixture();
        let resolver = SchemaResolver::new(&buf, &table, &anchors);

        let resolution = resolver
            .resolve(&[grade_query(vec![Transform::Identity])])
            .unwrap();

        assert!(resolution.unresolved.is_empty());
        let spec = resolution.schema.field("grade").unwrap();
        assert_eq!(spec.address, BitAddress::new(4, 2));
        assert_eq!(spec.width, 4);
        assert_eq!(spec.ty, FieldType::Scalar(Transform::Identity));
    }

    #[test]
    fn resolution_is_deterministic() {
        let (buf, table, anchors) = fixture();
        let resolver = SchemaResolver::new(&buf, &table, &anchors);
        let queries = [grade_query(vec![Transform::Identity])];

        let first = resolver.resolve(&queries).unwrap();
        let second = resolver.resolve(&queries).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn indistinguishable_transforms_are_ambiguous() {
        let (buf, table, anchors) = fixture();
        let resolver = SchemaResolver::new(&buf, &table, &anchors);
        // Identity and MaskedMsb{0xF} decode identically for 4-bit raws, so
        // no tie-break can separate them.
        let queries = [grade_query(vec![
            Transform::Identity,
            Transform::MaskedMsb { mask: 0xF },
        ])];

        let resolution = resolver.resolve(&queries).unwrap();

        assert!(resolution.schema.fields().is_empty());
        assert_eq!(
            resolution.unresolved,
            vec![("grade".to_string(), FieldFailure::Ambiguous { tied: 2 })]
        );
        assert!(resolution.schema.is_unresolved("grade"));
    }

    #[test]
    fn unmatchable_constraints_accumulate_no_candidate() {
        let (buf, table, _) = fixture();
        let anchors = AnchorSet::new(vec![
            Anchor::new(vec![0x05, 0x00])
                .expect(Constraint::new("grade", Expectation::Exactly(14))),
            Anchor::new(vec![0x07, 0x00])
                .expect(Constraint::new("grade", Expectation::Exactly(13))),
        ])
        .unwrap();
        let resolver = SchemaResolver::new(&buf, &table, &anchors);

        let resolution = resolver
            .resolve(&[grade_query(vec![Transform::Identity])])
            .unwrap();

        assert_eq!(
            resolution.unresolved,
            vec![("grade".to_string(), FieldFailure::NoCandidate)]
        );
    }

    #[test]
    fn failed_field_does_not_abort_siblings() {
        let (buf, table, anchors) = fixture();
        let resolver = SchemaResolver::new(&buf, &table, &anchors);
        let queries = [
            grade_query(vec![Transform::Identity]),
            // No constraints reference this name, so nothing can score.
            FieldQuery::scalar("phantom", 2..8, vec![4], vec![Transform::Identity], 0..=15),
        ];

        let resolution = resolver.resolve(&queries).unwrap();

        assert!(resolution.schema.field("grade").is_some());
        assert_eq!(
            resolution.unresolved,
            vec![("phantom".to_string(), FieldFailure::NoCandidate)]
        );
    }

    #[test]
    fn zero_divisor_transform_is_skipped_not_fatal() {
        let (buf, table, anchors) = fixture();
        let resolver = SchemaResolver::new(&buf, &table, &anchors);

        let resolution = resolver
            .resolve(&[grade_query(vec![Transform::AffineRating {
                divisor: 0,
                offset: 0,
            }])])
            .unwrap();

        assert_eq!(
            resolution.unresolved,
            vec![("grade".to_string(), FieldFailure::NoCandidate)]
        );
    }

    #[test]
    fn declared_displacement_rejects_decoy_marker_bytes() {
        // Record 0 happens to contain anchor 1's marker bytes at offset 4;
        // the genuine occurrence sits at the declared displacement 10 in
        // record 1. Binding to the decoy would score "grade" against the
        // wrong record and sink the planted layout.
        let mut buf = vec![0u8; 64];
        buf[2] = 9;
        buf[4] = 0x07;
        buf[10] = 0x05;
        buf[18] = 3;
        buf[26] = 0x07;
        let table = RecordTable {
            base: 0,
            stride: 16,
            record_count: 3,
        };
        let anchors = AnchorSet::new(vec![
            Anchor::new(vec![0x05, 0x00])
                .at_displacement(10)
                .expect(Constraint::new("grade", Expectation::Exactly(9))),
            Anchor::new(vec![0x07, 0x00])
                .at_displacement(10)
                .expect(Constraint::new("grade", Expectation::Exactly(3))),
        ])
        .unwrap();
        let resolver = SchemaResolver::new(&buf, &table, &anchors);

        let resolution = resolver
            .resolve(&[FieldQuery::scalar(
                "grade",
                2..3,
                vec![8],
                vec![Transform::Identity],
                0..=15,
            )])
            .unwrap();

        assert!(resolution.unresolved.is_empty());
        let spec = resolution.schema.field("grade").unwrap();
        assert_eq!(spec.address, BitAddress::new(2, 0));
        assert_eq!(spec.width, 8);
    }

    #[test]
    fn two_anchor_agreement_wins_score_tie() {
        // Bytes 2 and 3 tie on score: byte 2 satisfies both of anchor 0's
        // constraints but contradicts anchor 1, while byte 3 satisfies one
        // constraint of each anchor. Agreement across independent anchors
        // wins even though byte 2 comes first in scan order.
        let mut buf = vec![0u8; 32];
        buf[2] = 5;
        buf[3] = 8;
        buf[10] = 0xA1;
        buf[18] = 50;
        buf[19] = 7;
        buf[26] = 0xA2;
        let table = RecordTable {
            base: 0,
            stride: 16,
            record_count: 2,
        };
        let anchors = AnchorSet::new(vec![
            Anchor::new(vec![0xA1])
                .expect(Constraint::new("v", Expectation::Exactly(5)).with_weight(1.0))
                .expect(Constraint::new("v", Expectation::InRange(0, 9))),
            Anchor::new(vec![0xA2])
                .expect(Constraint::new("v", Expectation::Exactly(7)).with_weight(1.0)),
        ])
        .unwrap();
        let resolver = SchemaResolver::new(&buf, &table, &anchors).with_config(ResolverConfig {
            min_score: -1.0,
            penalty_factor: 2.5,
        });

        let resolution = resolver
            .resolve(&[FieldQuery::scalar(
                "v",
                2..4,
                vec![8],
                vec![Transform::Identity],
                0..=100,
            )])
            .unwrap();

        let spec = resolution.schema.field("v").unwrap();
        assert_eq!(spec.address, BitAddress::new(3, 0));
    }

    #[test]
    fn string_query_without_pool_is_rejected() {
        let (buf, table, anchors) = fixture();
        let resolver = SchemaResolver::new(&buf, &table, &anchors);
        let queries = [FieldQuery::string_pointer(
            "name",
            0..8,
            crate::strings::StringEncoding::Ascii,
        )];

        let err = resolver.resolve(&queries).unwrap_err();
        assert!(err.to_string().contains("without a configured string pool"));
    }
}
