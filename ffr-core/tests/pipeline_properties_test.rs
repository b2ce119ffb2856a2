//! 解码-提取-映射流水线的性质测试

use std::collections::HashMap;

use ffr_core::{
    decode_rle, extract_bit_field, map_fields, normalize_register_value, FieldDefinition,
    FieldMapper, FieldValue,
};

const SAMPLE: &str = "1100000111110000";

fn unit_data(entries: &[(&str, &str, &str)]) -> HashMap<(String, String), String> {
    entries
        .iter()
        .map(|(unit, register, raw)| ((unit.to_string(), register.to_string()), raw.to_string()))
        .collect()
}

#[test]
fn test_decode_literal_cases() {
    assert_eq!(decode_rle(""), "");
    assert_eq!(decode_rle("A5"), "00000");
    assert_eq!(decode_rle("B3"), "111");
    assert_eq!(decode_rle("A"), "0");
    assert_eq!(decode_rle("B"), "1");
    assert_eq!(decode_rle("A5BA2B3"), "00000100111");
    assert_eq!(decode_rle("a3B2"), "00011");
}

#[test]
fn test_decode_is_deterministic() {
    for input in ["A5BA2B3", "b12a3?B", "", "A0B0", "zz"] {
        assert_eq!(decode_rle(input), decode_rle(input));
    }
}

#[test]
fn test_extract_examples() {
    assert_eq!(extract_bit_field(SAMPLE, 0, 7), "11110000");
    assert_eq!(extract_bit_field(SAMPLE, 8, 15), "11000001");
}

#[test]
fn test_extract_length_property() {
    let len = SAMPLE.len() as i64;
    for start in 0..len {
        for end in start..len {
            let field = extract_bit_field(SAMPLE, start, end);
            assert_eq!(field.len() as i64, end - start + 1, "range {start}..={end}");
        }
    }
}

#[test]
fn test_extract_boundary_policy() {
    assert_eq!(extract_bit_field(SAMPLE, 5, 4), "");
    assert_eq!(extract_bit_field(SAMPLE, 0, 16), "");
    assert_eq!(extract_bit_field(SAMPLE, -1, 3), "");
    assert_eq!(extract_bit_field("", 0, 0), "");
}

#[test]
fn test_end_to_end_mapping_from_tuple_keyed_source() {
    let raw = unit_data(&[("U1", "CPU0", "A5BA2B3")]);
    let fields = vec![FieldDefinition::new("CPU0", "core_disable", 0, 7)];

    let records = map_fields(&fields, &raw, &["U1"]);
    let value = records[0].value_for("U1").unwrap();
    assert_eq!(value.binary, "00100111");
    assert_eq!(value.hex, "27");
}

#[test]
fn test_partial_data_does_not_disturb_other_fields() {
    let raw = unit_data(&[
        ("U1", "CPU0", "A5BA2B3"),
        ("U2", "CPU0", normalize_register_value("0000000011111111").as_ref()),
    ]);
    let fields = vec![
        FieldDefinition::new("CPU0", "low_byte", 0, 7),
        FieldDefinition::new("GCD", "gcd_disable", 0, 7),
        FieldDefinition::new("CPU0", "bit8", 8, 8),
    ];

    let mut mapper = FieldMapper::new(&raw);
    let records = mapper.map_fields(&fields, &["U1", "U2", "U3"]);

    assert_eq!(records.len(), 3);
    for unit in ["U1", "U2", "U3"] {
        assert_eq!(records[1].value_for(unit), Some(&FieldValue::empty()));
    }
    assert_eq!(records[0].value_for("U1").unwrap().hex, "27");
    assert_eq!(records[0].value_for("U2").unwrap().hex, "FF");
    assert_eq!(records[2].value_for("U1").unwrap().binary, "0");
    assert_eq!(records[2].value_for("U2").unwrap().binary, "0");
    assert_eq!(records[0].value_for("U3"), Some(&FieldValue::empty()));
}

#[test]
fn test_cached_decode_matches_direct_decode() {
    let encoded = "B4A3B2A1B9";
    let raw = unit_data(&[("U1", "HUB", encoded)]);
    let whole = decode_rle(encoded);
    let width = whole.len() as i64;
    let fields: Vec<_> = (0..width)
        .map(|bit| FieldDefinition::new("HUB", &format!("bit{bit}"), bit, bit))
        .collect();

    let mut mapper = FieldMapper::new(&raw);
    let records = mapper.map_fields(&fields, &["U1"]);

    let rebuilt: String = records
        .iter()
        .rev()
        .map(|record| record.values[0].value.binary.clone())
        .collect();
    assert_eq!(rebuilt, whole);
    assert_eq!(mapper.stats().decoded_pairs, 1);
    assert_eq!(mapper.stats().cache_hits, fields.len() - 1);
}
