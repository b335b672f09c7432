//! # bitrecon - Binary Layout Discovery and Decode Engine
//!
//! bitrecon recovers the field-level layout of undocumented, bit-packed
//! binary record tables (the kind found in game save files) from nothing
//! but the raw bytes and a handful of externally known facts ("anchors")
//! about specific records. Once a layout is resolved it doubles as a codec:
//! the same schema that was discovered can decode and re-encode arbitrary
//! records of that type.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        RecordCodec (decode/encode)   │
//! ├─────────────────────────────────────┤
//! │   RecordSchema (resolved FieldSpecs) │
//! ├─────────────────────────────────────┤
//! │  SchemaResolver │ HypothesisScorer   │
//! ├─────────────────┼───────────────────┤
//! │  TableLocator   │ StringPoolResolver │
//! ├─────────────────────────────────────┤
//! │  AnchorSet (external ground truth)   │
//! ├─────────────────────────────────────┤
//! │  BitCursor / ValueTransform          │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Discovery Pipeline
//!
//! 1. [`table::locate`] finds the record table's base offset and stride by
//!    chaining a key-validity predicate from anchor marker positions.
//! 2. [`discover::SchemaResolver`] enumerates candidate
//!    `(address, width, transform)` layouts per field inside caller-supplied
//!    search windows, scores each against the anchors, and assembles a
//!    [`schema::RecordSchema`], partial if some fields stay unresolved.
//! 3. [`codec::RecordCodec`] reads and writes named field values for any
//!    record index through the resolved schema.
//!
//! ## Quick Start
//!
//! ```ignore
//! use bitrecon::{
//!     locate, Anchor, AnchorSet, Constraint, Expectation, FieldQuery,
//!     RecordCodec, SchemaResolver, TableSearch, Transform,
//! };
//!
//! let anchors = AnchorSet::new(vec![
//!     Anchor::new(1013u16.to_le_bytes().to_vec())
//!         .expect(Constraint::new("overall", Expectation::InRange(97, 100))),
//!     Anchor::new(1015u16.to_le_bytes().to_vec())
//!         .expect(Constraint::new("overall", Expectation::InRange(90, 97))),
//! ])?;
//!
//! let table = locate(&buf, &anchors, &TableSearch::default())?;
//! let resolution = SchemaResolver::new(&buf, &table, &anchors).resolve(&[
//!     FieldQuery::scalar(
//!         "overall",
//!         30..250,
//!         vec![8],
//!         vec![Transform::AffineRating { divisor: 3, offset: 25 }],
//!         25..=110,
//!     ),
//! ])?;
//!
//! let codec = RecordCodec::new(&resolution.schema);
//! let values = codec.decode_record(&buf, 0)?;
//! ```
//!
//! ## Conventions
//!
//! The bit cursor treats bit 0 of a byte as its most significant bit and
//! composes fields MSB-first; multi-byte keys and string pointers are
//! little-endian. Both conventions were recovered empirically from the
//! source format and are load-bearing; see [`bits`].
//!
//! ## Concurrency Model
//!
//! Discovery is a CPU-bound, one-shot batch computation over a read-only
//! buffer; no internal locking exists or is needed. Encoding mutates the
//! buffer in place and assumes single-writer discipline enforced by the
//! caller.

pub mod anchor;
pub mod bits;
pub mod codec;
pub mod config;
pub mod discover;
pub mod schema;
pub mod strings;
pub mod table;
pub mod transform;

pub use anchor::{Anchor, AnchorSet, Constraint, Expectation};
pub use bits::{read_bits, read_le, write_bits, write_le, BitAddress};
pub use codec::{FieldValue, RecordCodec};
pub use discover::{
    score_candidate, AnchorBinding, CandidateLayout, FieldDomain, FieldFailure, FieldQuery,
    Resolution, ResolverConfig, SchemaResolver, ScoredCandidate,
};
pub use schema::{FieldSpec, FieldType, RecordSchema};
pub use strings::{StringEncoding, StringPool, StringRef};
pub use table::{locate, LocateError, RecordTable, TableSearch};
pub use transform::Transform;
