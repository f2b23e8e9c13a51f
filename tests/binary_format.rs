//! Integration tests for ISO 2709 reading and writing.

mod common;

use common::{create_book_record, create_oversized_record, tag};
use marcio::formats::FormatReader;
use marcio::record::MAX_RECORD_LENGTH;
use marcio::{BinaryReader, BinaryWriter, MarcError, Record};
use std::io::Cursor;

fn write_all(records: &[Record]) -> Vec<u8> {
    let mut writer = BinaryWriter::new(Vec::new());
    for record in records {
        writer.write_record(record).expect("record is writable");
    }
    writer.into_inner()
}

/// Leader says 123 bytes with data at offset 50; one directory entry
/// `245 0021 00000` whose field is followed by padding.
fn hand_built_record() -> Vec<u8> {
    let mut bytes = b"00123nam a2200050   4500".to_vec();
    bytes.extend_from_slice(b"245002100000");
    bytes.push(0x1E);
    bytes.resize(50, b' ');
    bytes.extend_from_slice(b"10\x1faTitle\x1e\x1d");
    bytes.resize(123, b' ');
    bytes
}

#[test]
fn test_read_hand_built_record() {
    let mut reader = BinaryReader::new(Cursor::new(hand_built_record()));
    let record = reader.read_record().unwrap().expect("one record");

    assert_eq!(record.leader().record_length, 123);
    assert_eq!(record.len(), 1);
    let field = &record.fields()[0];
    assert_eq!(field.tag(), "245");
    assert_eq!(field.indicator1(), Some('1'));
    assert_eq!(field.indicator2(), Some('0'));
    let subfields = field.subfields();
    assert_eq!(subfields.len(), 1);
    assert_eq!(subfields.first_subfield_with_code('a'), Some("Title"));

    assert!(reader.read_record().unwrap().is_none());
}

#[test]
fn test_roundtrip_preserves_fields_and_kind() {
    let original = create_book_record("ocm001");
    let mut reader = BinaryReader::new(Cursor::new(write_all(&[original.clone()])));
    let read_back = reader.read_record().unwrap().unwrap();

    assert_eq!(read_back.control_number(), Some("ocm001"));
    assert_eq!(read_back.fields(), original.fields());
    assert_eq!(read_back.leader().record_type, original.leader().record_type);
    assert_eq!(read_back.bibliographic_level(), original.bibliographic_level());
    assert_eq!(read_back.language_code(), Some("eng"));
    assert_eq!(read_back.size(), original.size());
}

#[test]
fn test_oversized_record_is_split_and_merged() {
    let original = create_oversized_record("huge");
    assert!(original.size() > MAX_RECORD_LENGTH);

    let bytes = write_all(&[original.clone(), create_book_record("after")]);

    // Every physical record is within the limit and carries the same 001.
    let mut offset = 0;
    let mut physical = Vec::new();
    while offset < bytes.len() {
        let length: usize = std::str::from_utf8(&bytes[offset..offset + 5]).unwrap().parse().unwrap();
        assert!(length < MAX_RECORD_LENGTH);
        let chunk = marcio::reader::parse_record(&bytes[offset..offset + length]).unwrap();
        physical.push(chunk.control_number().unwrap_or_default().to_string());
        offset += length;
    }
    let huge_chunks = physical.iter().filter(|number| *number == "huge").count();
    assert!(huge_chunks >= 2, "expected a split, got {physical:?}");

    let mut reader = BinaryReader::new(Cursor::new(bytes));
    let merged = reader.read_record().unwrap().unwrap();
    assert_eq!(merged.fields(), original.fields());
    assert_eq!(merged.fields_with_tag(tag("001")).len(), 1);
    assert_eq!(
        reader.read_record().unwrap().unwrap().control_number(),
        Some("after")
    );
    assert!(reader.read_record().unwrap().is_none());
    assert_eq!(reader.records_read(), Some(2));
}

#[test]
fn test_records_without_control_number_are_not_merged() {
    let mut first = create_book_record("x");
    let mut second = create_book_record("x");
    first.delete_fields(vec![0]);
    second.delete_fields(vec![0]);

    // The writer refuses them, so build the chunks directly.
    let bytes: Vec<u8> = [&first, &second]
        .iter()
        .flat_map(|record| marcio::writer::RecordChunks::new(record).unwrap().flatten())
        .collect();

    let mut reader = BinaryReader::new(Cursor::new(bytes));
    assert_eq!(reader.read_all().unwrap().len(), 2);
}

#[test]
fn test_tell_and_seek_revisit_records() {
    let records = [
        create_book_record("a"),
        create_oversized_record("b"),
        create_book_record("c"),
    ];
    let mut reader = BinaryReader::new(Cursor::new(write_all(&records)));

    let mut offsets = Vec::new();
    loop {
        let offset = reader.tell();
        match reader.read_record().unwrap() {
            Some(record) => offsets.push((offset, record)),
            None => break,
        }
    }
    assert_eq!(offsets.len(), 3);
    assert_eq!(offsets[0].0, 0);

    for (offset, expected) in offsets.iter().rev() {
        reader.seek(*offset).unwrap();
        assert_eq!(&reader.read_record().unwrap().unwrap(), expected);
    }

    reader.rewind().unwrap();
    assert_eq!(reader.read_record().unwrap().unwrap().control_number(), Some("a"));
}

#[test]
fn test_truncated_stream_is_an_error() {
    let mut bytes = write_all(&[create_book_record("t")]);
    bytes.truncate(bytes.len() - 10);
    let mut reader = BinaryReader::new(Cursor::new(bytes));
    assert!(matches!(reader.read_record(), Err(MarcError::MalformedLeader(_))));
}

#[test]
fn test_directory_pointing_outside_data_is_an_error() {
    let mut bytes = hand_built_record();
    bytes[27..31].copy_from_slice(b"0099");
    let mut reader = BinaryReader::new(Cursor::new(bytes));
    assert!(matches!(reader.read_record(), Err(MarcError::MalformedDirectory(_))));
}
