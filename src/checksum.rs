//! Order-independent record checksums for deduplication.
//!
//! The digest covers the leader followed by `tag + contents` of every included
//! field, with fields sorted by tag and then by contents. Two records holding
//! the same fields in a different order therefore hash alike.

use crate::field::Field;
use crate::record::Record;
use crate::tag::Tag;
use sha1_smol::Sha1;
use std::collections::BTreeSet;

/// SHA-1 of `record` as 40 lowercase hex digits.
///
/// Fields tagged with anything in `excluded_tags` are left out, as are local
/// fields when `suppress_local` is set.
///
/// ```
/// use marcio::{checksum, BibliographicLevel, Record, Tag, TypeOfRecord};
/// use std::collections::BTreeSet;
///
/// let record = Record::new(TypeOfRecord::LanguageMaterial, BibliographicLevel::MonographOrItem, Some("1"));
/// let digest = checksum::compute(&record, &BTreeSet::new(), false);
/// assert_eq!(digest.len(), 40);
/// ```
#[must_use]
pub fn compute(record: &Record, excluded_tags: &BTreeSet<Tag>, suppress_local: bool) -> String {
    let mut included: Vec<&Field> = record
        .fields()
        .iter()
        .filter(|field| !excluded_tags.contains(&field.tag()))
        .filter(|field| !(suppress_local && field.tag().is_local()))
        .collect();
    included.sort();

    let mut hasher = Sha1::new();
    hasher.update(&record.leader().as_bytes());
    for field in included {
        hasher.update(field.tag().as_bytes());
        hasher.update(field.contents().as_bytes());
    }
    hasher.digest().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leader::{BibliographicLevel, TypeOfRecord};

    fn tag(raw: &str) -> Tag {
        Tag::new(raw).unwrap()
    }

    fn record(fields: &[(&str, &str)]) -> Record {
        let mut record = Record::new(
            TypeOfRecord::LanguageMaterial,
            BibliographicLevel::MonographOrItem,
            None,
        );
        for (raw_tag, contents) in fields {
            record.append_field(Field::new(tag(raw_tag), *contents));
        }
        record
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let a = record(&[("001", "x"), ("650", " 0\x1faA"), ("650", " 0\x1faB")]);
        let b = record(&[("650", " 0\x1faB"), ("001", "x"), ("650", " 0\x1faA")]);
        let none = BTreeSet::new();
        assert_eq!(compute(&a, &none, false), compute(&b, &none, false));
    }

    #[test]
    fn test_contents_change_digest() {
        let a = record(&[("001", "x"), ("245", "10\x1faTitle")]);
        let b = record(&[("001", "x"), ("245", "10\x1faTitle.")]);
        let none = BTreeSet::new();
        assert_ne!(compute(&a, &none, false), compute(&b, &none, false));
    }

    #[test]
    fn test_excluded_and_local_fields() {
        let plain = record(&[("001", "x"), ("245", "10\x1faTitle")]);
        let stamped = record(&[("001", "x"), ("005", "20240101"), ("245", "10\x1faTitle")]);
        let local = record(&[("001", "x"), ("245", "10\x1faTitle"), ("LOK", "  \x1f0852  ")]);

        let none = BTreeSet::new();
        let excluded: BTreeSet<Tag> = [tag("005")].into_iter().collect();
        assert_ne!(compute(&plain, &none, false), compute(&stamped, &none, false));
        assert_eq!(compute(&plain, &excluded, false), compute(&stamped, &excluded, false));
        assert_ne!(compute(&plain, &none, false), compute(&local, &none, false));
        assert_eq!(compute(&plain, &none, true), compute(&local, &none, true));
    }

    #[test]
    fn test_known_digest() {
        let empty = record(&[]);
        let mut hasher = Sha1::new();
        hasher.update(b"00000nam a22004452  4500");
        assert_eq!(compute(&empty, &BTreeSet::new(), false), hasher.digest().to_string());
    }
}
