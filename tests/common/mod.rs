//! Record builders shared across the integration suites.

#![allow(dead_code)]

use marcio::{BibliographicLevel, Field, Record, Subfields, Tag, TypeOfRecord, LOCAL_BLOCK_TAG};

/// Parse a tag known to be valid.
pub fn tag(raw: &str) -> Tag {
    Tag::new(raw).expect("valid tag")
}

/// A small book record with author, title and two subjects.
pub fn create_book_record(control_number: &str) -> Record {
    Record::builder(TypeOfRecord::LanguageMaterial, BibliographicLevel::MonographOrItem)
        .control_number(control_number)
        .field(Field::new(
            tag("008"),
            "200101s2001    xxu           000 0 eng d",
        ))
        .data_field(tag("100"), '1', ' ', &Subfields::from([('a', "Fitzgerald, F. Scott")]))
        .data_field(
            tag("245"),
            '1',
            '4',
            &Subfields::from([('a', "The Great Gatsby /"), ('c', "F. Scott Fitzgerald.")]),
        )
        .data_field(tag("650"), ' ', '0', &Subfields::from([('a', "Rich people"), ('z', "New York")]))
        .data_field(tag("650"), ' ', '0', &Subfields::from([('a', "Long Island (N.Y.)")]))
        .build()
}

/// A `LOK` field embedding `local_tag` with the given local indicators.
pub fn local_field(local_tag: &str, indicators: &str, value: &str) -> Field {
    Field::new(
        LOCAL_BLOCK_TAG,
        format!("  \x1f0{local_tag}{indicators}\x1fa{value}"),
    )
}

/// A book record followed by one `LOK` field per local tag.
pub fn create_record_with_local_tags(local_tags: &[&str]) -> Record {
    let mut record = create_book_record("loc1");
    for local_tag in local_tags {
        record.append_field(local_field(local_tag, "  ", local_tag));
    }
    record
}

/// A record whose binary form exceeds the 99999-byte limit.
pub fn create_oversized_record(control_number: &str) -> Record {
    let mut builder =
        Record::builder(TypeOfRecord::LanguageMaterial, BibliographicLevel::MonographOrItem)
            .control_number(control_number);
    let filler = "lorem ipsum ".repeat(400);
    for i in 0..25 {
        let note = format!("{i:03} {filler}");
        builder = builder.data_field(tag("500"), ' ', ' ', &Subfields::from([('a', note.as_str())]));
    }
    builder.build()
}
