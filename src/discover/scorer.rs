//! # Hypothesis Scoring
//!
//! Evaluates one candidate layout against every bound anchor. A satisfied
//! constraint adds its weight; a violated constraint (or a decode failure
//! where a constraint applies) subtracts `penalty_factor * weight`, so one
//! contradiction outweighs one confirmation. With a search space of tens of
//! thousands of candidates per field, coincidental matches are the rule and
//! must be suppressed aggressively.
//!
//! Separately from scoring, every anchor must decode into the query's
//! universal plausibility range, not just the anchors with explicit
//! constraints. A single implausible anchor marks the whole candidate
//! invalid. For string-pointer queries, "plausible" means the pointer
//! resolves cleanly for every anchor; the resolver's strictness doubles as
//! the rejection signal for non-pointer fields.

use crate::anchor::Anchor;
use crate::bits::{read_bits, read_le, BitAddress};
use crate::strings::{StringPool, StringRef};

use super::{AnchorBinding, CandidateLayout, FieldDomain, FieldQuery, ScoredCandidate};

/// Scores `candidate` for `query` against all bound anchors.
pub fn score_candidate(
    buf: &[u8],
    anchors: &[Anchor],
    bindings: &[AnchorBinding],
    query: &FieldQuery,
    candidate: &CandidateLayout,
    pool: Option<&StringPool>,
    penalty_factor: f64,
) -> ScoredCandidate {
    let mut score = 0.0;
    let mut anchors_matched = 0usize;
    let mut matched = 0usize;
    let mut violated = 0usize;
    let mut valid = true;

    for binding in bindings {
        let anchor = &anchors[binding.anchor];
        let mut anchor_hit = false;
        for slot in 0..query.count {
            let addr = BitAddress::new(
                binding.record_base + candidate.address.byte,
                candidate.address.bit,
            )
            .offset_by(slot * candidate.width as usize);

            let decoded = decode_slot(buf, addr, candidate, &query.domain, pool);

            let plausible = match (&decoded, &query.domain) {
                (SlotValue::Int(v), FieldDomain::Scalar { plausible, .. }) => plausible.contains(v),
                (SlotValue::Text(_), _) => true,
                (SlotValue::Undecodable, _) => false,
                (SlotValue::Int(_), FieldDomain::StringPointer { .. }) => false,
            };
            if !plausible {
                valid = false;
            }

            for constraint in anchor.constraints_for(&query.name) {
                if constraint.slot != slot {
                    continue;
                }
                let outcome = match &decoded {
                    SlotValue::Int(v) => constraint.expectation.matches_int(*v),
                    SlotValue::Text(s) => constraint.expectation.matches_text(s),
                    // A decode failure contradicts any applicable constraint.
                    SlotValue::Undecodable => Some(false),
                };
                match outcome {
                    Some(true) => {
                        score += constraint.weight;
                        matched += 1;
                        anchor_hit = true;
                    }
                    Some(false) => {
                        score -= penalty_factor * constraint.weight;
                        violated += 1;
                    }
                    None => {}
                }
            }
        }
        if anchor_hit {
            anchors_matched += 1;
        }
    }

    ScoredCandidate {
        layout: candidate.clone(),
        score,
        anchors_matched,
        matched,
        violated,
        valid,
    }
}

enum SlotValue {
    Int(i64),
    Text(String),
    Undecodable,
}

fn decode_slot(
    buf: &[u8],
    addr: BitAddress,
    candidate: &CandidateLayout,
    domain: &FieldDomain,
    pool: Option<&StringPool>,
) -> SlotValue {
    match domain {
        FieldDomain::Scalar { .. } => {
            match read_bits(buf, addr, candidate.width)
                .and_then(|raw| candidate.transform.decode(raw))
            {
                Ok(v) => SlotValue::Int(v),
                Err(_) => SlotValue::Undecodable,
            }
        }
        FieldDomain::StringPointer { encoding } => {
            let Some(pool) = pool else {
                return SlotValue::Undecodable;
            };
            let resolved = read_le(buf, addr, 4).and_then(|offset| {
                pool.resolve(
                    buf,
                    StringRef {
                        offset,
                        encoding: *encoding,
                    },
                )
            });
            match resolved {
                Ok(s) => SlotValue::Text(s),
                Err(_) => SlotValue::Undecodable,
            }
        }
    }
}
