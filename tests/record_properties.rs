//! Property-based tests for serialization round trips and checksums.
//!
//! Uses proptest to generate records with arbitrary data fields.

mod common;

use common::tag;
use marcio::{
    checksum, BibliographicLevel, BinaryReader, BinaryWriter, Field, Record, Subfields, Tag,
    TypeOfRecord, XmlReader, XmlWriter,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::io::Cursor;

fn arb_data_tag() -> impl Strategy<Value = Tag> {
    "[1-9][0-9][0-9]".prop_map(|raw| tag(&raw))
}

fn arb_indicator() -> impl Strategy<Value = char> {
    prop_oneof![Just(' '), proptest::char::range('0', '9')]
}

fn arb_subfields() -> impl Strategy<Value = Subfields> {
    prop::collection::vec(("[a-z0-9]", "[A-Za-z0-9 .,;:/()-]{1,40}"), 1..5).prop_map(|pairs| {
        let mut subfields = Subfields::new();
        for (code, value) in pairs {
            subfields.push(code.chars().next().unwrap_or('a'), value);
        }
        subfields
    })
}

fn arb_data_field() -> impl Strategy<Value = Field> {
    (arb_data_tag(), arb_indicator(), arb_indicator(), arb_subfields())
        .prop_map(|(tag, ind1, ind2, subfields)| Field::data(tag, ind1, ind2, &subfields))
}

fn arb_level() -> impl Strategy<Value = BibliographicLevel> {
    prop_oneof![
        Just(BibliographicLevel::MonographOrItem),
        Just(BibliographicLevel::Serial),
        Just(BibliographicLevel::MonographicComponentPart),
    ]
}

fn arb_record() -> impl Strategy<Value = Record> {
    (
        "[a-z0-9]{1,12}",
        arb_level(),
        prop::collection::vec(arb_data_field(), 0..20),
    )
        .prop_map(|(control_number, level, fields)| {
            fields
                .into_iter()
                .fold(
                    Record::builder(TypeOfRecord::LanguageMaterial, level)
                        .control_number(&control_number),
                    |builder, field| builder.field(field),
                )
                .build()
        })
}

fn binary_roundtrip(record: &Record) -> Record {
    let mut writer = BinaryWriter::new(Vec::new());
    writer.write_record(record).unwrap();
    let mut reader = BinaryReader::new(Cursor::new(writer.into_inner()));
    reader.read_record().unwrap().unwrap()
}

fn xml_roundtrip(record: &Record) -> Record {
    let mut writer = XmlWriter::new(Vec::new());
    writer.write_record(record).unwrap();
    let mut reader = XmlReader::new(Cursor::new(writer.into_inner().unwrap()));
    reader.read_record().unwrap().unwrap()
}

proptest! {
    #[test]
    fn binary_roundtrip_preserves_record(record in arb_record()) {
        let read = binary_roundtrip(&record);
        prop_assert_eq!(read.control_number(), record.control_number());
        prop_assert_eq!(read.record_type(), record.record_type());
        prop_assert_eq!(read.bibliographic_level(), record.bibliographic_level());
        prop_assert_eq!(read.fields(), record.fields());
    }

    #[test]
    fn xml_roundtrip_preserves_record(record in arb_record()) {
        let read = xml_roundtrip(&record);
        prop_assert_eq!(read.leader(), record.leader());
        prop_assert_eq!(read.fields(), record.fields());
    }

    #[test]
    fn checksum_ignores_field_order(
        fields in prop::collection::vec(arb_data_field(), 1..15).prop_shuffle(),
    ) {
        let mut shuffled = Record::new(TypeOfRecord::LanguageMaterial, BibliographicLevel::MonographOrItem, Some("c"));
        for field in &fields {
            shuffled.append_field(field.clone());
        }
        let mut sorted = shuffled.clone();
        sorted.sort_fields();

        let none = BTreeSet::new();
        prop_assert_eq!(
            checksum::compute(&shuffled, &none, false),
            checksum::compute(&sorted, &none, false)
        );
    }

    #[test]
    fn checksum_sees_content_changes(
        fields in prop::collection::vec(arb_data_field(), 1..15),
        index in any::<prop::sample::Index>(),
    ) {
        let mut original = Record::new(TypeOfRecord::LanguageMaterial, BibliographicLevel::MonographOrItem, Some("c"));
        let mut changed = original.clone();
        let target = index.index(fields.len());
        for (i, field) in fields.iter().enumerate() {
            original.append_field(field.clone());
            let mut field = field.clone();
            if i == target {
                field.set_contents(format!("{}!", field.contents()));
            }
            changed.append_field(field);
        }

        let none = BTreeSet::new();
        prop_assert_ne!(
            checksum::compute(&original, &none, false),
            checksum::compute(&changed, &none, false)
        );
    }

    #[test]
    fn checksum_excluded_tags_have_no_influence(
        fields in prop::collection::vec(arb_data_field(), 0..10),
        noise in arb_subfields(),
    ) {
        let mut base = Record::new(TypeOfRecord::LanguageMaterial, BibliographicLevel::MonographOrItem, Some("c"));
        for field in fields.into_iter().filter(|f| f.tag() != "999") {
            base.append_field(field);
        }
        let mut noisy = base.clone();
        noisy.append_field(Field::data(tag("999"), ' ', ' ', &noise));

        let excluded: BTreeSet<Tag> = [tag("999")].into_iter().collect();
        prop_assert_eq!(
            checksum::compute(&base, &excluded, false),
            checksum::compute(&noisy, &excluded, false)
        );
    }
}
