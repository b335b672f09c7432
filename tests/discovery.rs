//! End-to-end discovery pipeline over a synthetic roster buffer.
//!
//! The fixture mirrors the shape of the real save format: a fixed-stride
//! record table with little-endian identifier keys, a bit-packed rating at an
//! odd bit offset, a masked tendency block, an enum position field and
//! absolute string pointers into a late pool region, surrounded by foreign
//! bytes the engine must not mistake for records.

use bitrecon::{
    locate, read_bits, write_bits, Anchor, AnchorSet, BitAddress, Constraint, Expectation,
    FieldFailure, FieldQuery, FieldValue, RecordCodec, ResolverConfig, SchemaResolver,
    StringEncoding, StringPool, TableSearch, Transform,
};

const TABLE_BASE: usize = 512;
const STRIDE: usize = 64;
const KEY_DISP: usize = 12;
const POOL_START: usize = 3000;

struct Player {
    id: u16,
    rating_raw: u32,
    tendencies: [u32; 8],
    position: u32,
    name: Option<(&'static str, u32)>,
}

fn players() -> Vec<Player> {
    vec![
        Player {
            id: 1013,
            rating_raw: 222, // decodes to 99
            // MSB flag set on slots 0 and 3.
            tendencies: [85 | 0x80, 70, 60, 90 | 0x80, 40, 30, 88, 55],
            position: 2, // SF
            name: Some(("LeBron", 3000)),
        },
        Player {
            id: 1015,
            rating_raw: 210, // decodes to 95
            tendencies: [80, 65, 50, 85, 45, 35, 75, 60],
            position: 1, // SG
            name: Some(("Wade", 3010)),
        },
        Player {
            id: 1014,
            rating_raw: 192, // decodes to 89
            tendencies: [70, 60, 55, 80, 50, 40, 65, 50],
            position: 4, // C
            name: Some(("Bosh", 3020)),
        },
        // Empty slot: key 0 keeps the record chain alive.
        Player {
            id: 0,
            rating_raw: 0,
            tendencies: [0; 8],
            position: 0,
            name: None,
        },
    ]
}

fn build_buffer() -> Vec<u8> {
    let mut buf = vec![0xFFu8; 4096];

    for (i, p) in players().iter().enumerate() {
        let base = TABLE_BASE + i * STRIDE;
        // Packed-field area is zeroed; the rest of the record stays foreign.
        buf[base + 16..base + 52].fill(0);
        buf[base + KEY_DISP..base + KEY_DISP + 2].copy_from_slice(&p.id.to_le_bytes());
        write_bits(&mut buf, BitAddress::new(base + 20, 3), 8, p.rating_raw).unwrap();
        for (slot, &raw) in p.tendencies.iter().enumerate() {
            let addr = BitAddress::new(base + 34, 2).offset_by(slot * 8);
            write_bits(&mut buf, addr, 8, raw).unwrap();
        }
        let pointer = p.name.map_or(0, |(_, off)| off);
        buf[base + 44..base + 48].copy_from_slice(&pointer.to_le_bytes());
        write_bits(&mut buf, BitAddress::new(base + 50, 0), 3, p.position).unwrap();

        if let Some((name, off)) = p.name {
            let off = off as usize;
            buf[off..off + name.len()].copy_from_slice(name.as_bytes());
            buf[off + name.len()] = 0;
        }
    }
    buf
}

fn anchors() -> AnchorSet {
    AnchorSet::new(vec![
        Anchor::new(1013u16.to_le_bytes().to_vec())
            .at_displacement(KEY_DISP)
            .expect(Constraint::new("overall", Expectation::Exactly(99)))
            .expect(Constraint::at_slot("tendency", 0, Expectation::InRange(80, 99)))
            .expect(Constraint::at_slot("tendency", 3, Expectation::Exactly(90)))
            .expect(Constraint::at_slot("tendency", 6, Expectation::Exactly(88)))
            .expect(Constraint::new("name", Expectation::Text("LeBron".into())))
            .expect(Constraint::new("position", Expectation::Exactly(2))),
        Anchor::new(1015u16.to_le_bytes().to_vec())
            .at_displacement(KEY_DISP)
            .expect(Constraint::new("overall", Expectation::InRange(90, 97)))
            .expect(Constraint::at_slot("tendency", 0, Expectation::InRange(75, 95)))
            .expect(Constraint::at_slot("tendency", 2, Expectation::Exactly(50)))
            .expect(Constraint::at_slot("tendency", 7, Expectation::InRange(55, 70)))
            .expect(Constraint::new("name", Expectation::Text("Wade".into())))
            .expect(Constraint::new("position", Expectation::Exactly(1))),
    ])
    .unwrap()
}

fn queries() -> Vec<FieldQuery> {
    let positions = vec![
        "PG".to_string(),
        "SG".to_string(),
        "SF".to_string(),
        "PF".to_string(),
        "C".to_string(),
    ];
    vec![
        FieldQuery::scalar(
            "overall",
            16..32,
            vec![8],
            vec![Transform::AffineRating {
                divisor: 3,
                offset: 25,
            }],
            25..=110,
        ),
        FieldQuery::sequence(
            "tendency",
            32..40,
            8,
            8,
            vec![Transform::MaskedMsb { mask: 0x7F }],
            0..=100,
        ),
        FieldQuery::string_pointer("name", 40..48, StringEncoding::Ascii),
        FieldQuery::scalar(
            "position",
            48..52,
            vec![3],
            vec![Transform::Enum { labels: positions }],
            0..=4,
        ),
        // Nothing in the record decodes plausibly for this one.
        FieldQuery::scalar("wingspan", 52..60, vec![8], vec![Transform::Identity], 0..=50),
    ]
}

fn table_search() -> TableSearch {
    TableSearch {
        strides: (16..=128).collect(),
        key_max: 2048,
        ..TableSearch::default()
    }
}

#[test]
fn locates_the_table_among_foreign_bytes() {
    let buf = build_buffer();
    let table = locate(&buf, &anchors(), &table_search()).unwrap();

    assert_eq!(table.base, TABLE_BASE);
    assert_eq!(table.stride, STRIDE);
    assert_eq!(table.record_count, 4);
}

#[test]
fn resolves_every_planted_field_and_reports_the_rest() {
    let buf = build_buffer();
    let anchors = anchors();
    let table = locate(&buf, &anchors, &table_search()).unwrap();
    let pool = StringPool::new(POOL_START..4096);

    let resolution = SchemaResolver::new(&buf, &table, &anchors)
        .with_pool(&pool)
        .with_config(ResolverConfig {
            min_score: 2.0,
            penalty_factor: 2.5,
        })
        .resolve(&queries())
        .unwrap();

    let schema = &resolution.schema;
    let overall = schema.field("overall").unwrap();
    assert_eq!(overall.address, BitAddress::new(20, 3));
    assert_eq!(overall.width, 8);

    // The sequence expands into one FieldSpec per slot, 8 bits apart.
    let t0 = schema.field("tendency[0]").unwrap();
    let t7 = schema.field("tendency[7]").unwrap();
    assert_eq!(t0.address, BitAddress::new(34, 2));
    assert_eq!(t7.address, BitAddress::new(41, 2));

    let name = schema.field("name").unwrap();
    assert_eq!(name.address, BitAddress::new(44, 0));

    let position = schema.field("position").unwrap();
    assert_eq!(position.address, BitAddress::new(50, 0));
    assert_eq!(position.width, 3);

    assert_eq!(
        resolution.unresolved,
        vec![("wingspan".to_string(), FieldFailure::NoCandidate)]
    );
    assert!(schema.is_unresolved("wingspan"));
}

#[test]
fn resolved_schema_decodes_non_anchor_records() {
    let buf = build_buffer();
    let anchors = anchors();
    let table = locate(&buf, &anchors, &table_search()).unwrap();
    let pool = StringPool::new(POOL_START..4096);
    let resolution = SchemaResolver::new(&buf, &table, &anchors)
        .with_pool(&pool)
        .with_config(ResolverConfig {
            min_score: 2.0,
            penalty_factor: 2.5,
        })
        .resolve(&queries())
        .unwrap();

    let codec = RecordCodec::with_pool(&resolution.schema, &pool);

    // Record 2 contributed no anchors; the schema still decodes it.
    let bosh = codec.decode_record(&buf, 2).unwrap();
    assert_eq!(bosh["overall"], FieldValue::Int(89));
    assert_eq!(bosh["tendency[3]"], FieldValue::Int(80));
    assert_eq!(bosh["position"], FieldValue::Label("C".into()));
    assert_eq!(bosh["name"], FieldValue::Text("Bosh".into()));

    let lebron = codec.decode_record(&buf, 0).unwrap();
    assert_eq!(lebron["overall"], FieldValue::Int(99));
    assert_eq!(lebron["tendency[0]"], FieldValue::Int(85));
    assert_eq!(lebron["name"], FieldValue::Text("LeBron".into()));

    // The empty slot's zero name pointer does not resolve.
    assert!(codec.decode_record(&buf, 3).is_err());
}

#[test]
fn encode_round_trips_through_the_discovered_layout() {
    let mut buf = build_buffer();
    let anchors = anchors();
    let table = locate(&buf, &anchors, &table_search()).unwrap();
    let pool = StringPool::new(POOL_START..4096);
    let resolution = SchemaResolver::new(&buf, &table, &anchors)
        .with_pool(&pool)
        .with_config(ResolverConfig {
            min_score: 2.0,
            penalty_factor: 2.5,
        })
        .resolve(&queries())
        .unwrap();
    let codec = RecordCodec::with_pool(&resolution.schema, &pool);

    codec
        .encode_field(&mut buf, 2, "overall", &FieldValue::Int(94))
        .unwrap();
    assert_eq!(
        codec.decode_field(&buf, 2, "overall").unwrap(),
        FieldValue::Int(94)
    );

    // Re-encoding a flagged tendency keeps the masked-off MSB intact.
    codec
        .encode_field(&mut buf, 0, "tendency[0]", &FieldValue::Int(77))
        .unwrap();
    assert_eq!(
        codec.decode_field(&buf, 0, "tendency[0]").unwrap(),
        FieldValue::Int(77)
    );
    let raw = read_bits(&buf, BitAddress::new(TABLE_BASE + 34, 2), 8).unwrap();
    assert_eq!(raw, 0x80 | 77);

    // Encoding a field the resolver never placed must fail loudly.
    let err = codec
        .encode_field(&mut buf, 0, "wingspan", &FieldValue::Int(84))
        .unwrap_err();
    assert!(err.to_string().contains("schema incomplete"));
}
