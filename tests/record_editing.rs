//! Integration tests for record mutation, repeatability and local blocks.

mod common;

use common::{create_book_record, create_record_with_local_tags, local_field, tag};
use marcio::local_block::{coalesce_local_block_deletions, INDICATOR_WILDCARD};
use marcio::{is_repeatable_field, MarcError, Record, Subfields, LOCAL_BLOCK_TAG};

#[test]
fn test_second_non_repeatable_field_is_refused() {
    let mut record = create_book_record("r1");
    let before = record.clone();

    let inserted = record
        .insert_data_field(tag("100"), '1', ' ', &Subfields::from([('a', "Someone else")]))
        .unwrap();
    assert!(!inserted);
    assert_eq!(record, before);
}

#[test]
fn test_repeatable_field_is_inserted_after_its_run() {
    let mut record = create_book_record("r1");
    let inserted = record
        .insert_data_field(tag("650"), ' ', '0', &Subfields::from([('a', "Third subject")]))
        .unwrap();
    assert!(inserted);

    let subjects = record.fields_with_tag(tag("650"));
    assert_eq!(subjects.len(), 3);
    assert_eq!(subjects[2].first_subfield_with_code('a'), Some("Third subject"));
}

#[test]
fn test_merge_keeps_single_control_number() {
    let mut record = create_book_record("r1");
    let before = record.len();
    let mut extra = create_book_record("r2");
    extra.delete_fields(vec![1, 2, 3]);

    record.merge(&extra);
    assert_eq!(record.control_number(), Some("r1"));
    assert_eq!(record.len(), before + 2);
    assert_eq!(record.fields_with_tag(tag("650")).len(), 4);
    assert_eq!(record.size(), marcio::reader::parse_record(&binary(&record)).unwrap().size());
}

fn binary(record: &Record) -> Vec<u8> {
    let mut writer = marcio::BinaryWriter::new(Vec::new());
    writer.write_record(record).unwrap();
    writer.into_inner()
}

#[test]
fn test_unknown_tag_only_matters_when_repeated() {
    let mut record = create_book_record("r1");
    assert!(record.insert_field(tag("011"), "  \x1faobsolete").unwrap());
    assert!(matches!(
        record.insert_field(tag("011"), "  \x1faagain"),
        Err(MarcError::UnknownTag(t)) if t == "011"
    ));
    assert!(is_repeatable_field(tag("LOK")).unwrap());
    assert!(is_repeatable_field(tag("500")).unwrap());
}

#[test]
fn test_subfield_editing_and_retagging() {
    let mut record = create_book_record("r1");
    assert!(record.add_subfield(tag("245"), 'b', "a novel"));
    assert_eq!(
        record.subfield_values(tag("245"), "ab"),
        vec!["The Great Gatsby /", "a novel"]
    );

    record.delete_all_subfields_with_code(tag("650"), 'z');
    assert!(record.fields_with_tag(tag("650")).iter().all(|f| !f.subfields().has_subfield('z')));

    assert_eq!(record.re_tag(tag("650"), tag("651")), 2);
    assert!(!record.has_tag(tag("650")));
    assert!(record.has_tag_with_indicators(tag("651"), ' ', '0'));
    assert!(record.is_valid().is_ok());
}

#[test]
fn test_local_blocks_split_where_local_tag_decreases() {
    let record = create_record_with_local_tags(&["100", "200", "150", "300"]);
    let first_lok = record.tag_range(LOCAL_BLOCK_TAG).start;

    let blocks = record.find_all_local_blocks();
    assert_eq!(
        blocks,
        vec![first_lok..first_lok + 2, first_lok + 2..first_lok + 4]
    );
    assert_eq!(record.find_start_of_all_local_blocks(), vec![first_lok, first_lok + 2]);
}

#[test]
fn test_fields_in_local_block_with_wildcards() {
    let mut record = create_book_record("r1");
    record.append_field(local_field("001", "  ", "12345"));
    record.append_field(local_field("852", "1 ", "DE-21"));
    record.append_field(local_field("852", "2 ", "DE-21-110"));
    record.append_field(local_field("866", "30", "1990-"));
    let block = record.find_all_local_blocks()[0].clone();

    let holdings = record.find_fields_in_local_block("852", INDICATOR_WILDCARD, ' ', block.clone());
    assert_eq!(holdings.len(), 2);
    assert_eq!(holdings.start, block.start + 1);

    let exact = record.find_fields_in_local_block("852", '2', ' ', block.clone());
    assert_eq!(exact.len(), 1);

    let missing = record.find_fields_in_local_block("935", INDICATOR_WILDCARD, INDICATOR_WILDCARD, block.clone());
    assert!(missing.is_empty());
    assert_eq!(missing.start, block.end);
}

#[test]
fn test_delete_local_blocks() {
    let mut record = create_record_with_local_tags(&["001", "852", "001", "852", "001", "852"]);
    let starts = record.find_start_of_all_local_blocks();
    assert_eq!(starts.len(), 3);

    record.delete_local_blocks(&[starts[0], starts[1]]);
    let remaining = record.fields_with_tag(LOCAL_BLOCK_TAG);
    assert_eq!(remaining.len(), 2);
    assert_eq!(record.find_all_local_blocks().len(), 1);

    let starts = record.find_start_of_all_local_blocks();
    record.delete_local_blocks(&starts);
    assert!(!record.has_tag(LOCAL_BLOCK_TAG));
    assert_eq!(record, create_book_record("loc1"));
}

#[test]
fn test_coalescing_touching_ranges() {
    assert_eq!(
        coalesce_local_block_deletions(&[7..9, 2..4, 4..6]),
        vec![2..6, 7..9]
    );
    assert!(coalesce_local_block_deletions(&[]).is_empty());
}
