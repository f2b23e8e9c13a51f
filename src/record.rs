//! MARC records: a leader plus an ordered sequence of fields.
//!
//! Fields are kept sorted by tag. Fields sharing a tag keep their relative
//! order, and the control number field `001`, when present, comes first.
//!
//! # Examples
//!
//! ```
//! use marcio::{BibliographicLevel, Record, Subfields, Tag, TypeOfRecord};
//!
//! let mut record = Record::new(
//!     TypeOfRecord::LanguageMaterial,
//!     BibliographicLevel::MonographOrItem,
//!     Some("ocm0001"),
//! );
//! let title = Tag::new("245").unwrap();
//! record
//!     .insert_data_field(title, '1', '0', &Subfields::from([('a', "Title")]))
//!     .unwrap();
//!
//! assert_eq!(record.control_number(), Some("ocm0001"));
//! assert_eq!(record.subfield_values(title, "a"), vec!["Title"]);
//! ```

use crate::error::Result;
use crate::field::Field;
use crate::leader::{BibliographicLevel, Leader, RecordType, TypeOfRecord, LEADER_LENGTH};
use crate::repeatable::is_repeatable_field;
use crate::subfields::{skip_indicators, Subfields, SUBFIELD_DELIMITER};
use crate::tag::{Tag, CONTROL_NUMBER};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;
use tracing::warn;

/// Bytes per directory entry: tag (3) + field length (4) + offset (5).
pub const DIRECTORY_ENTRY_LENGTH: usize = 12;

/// Largest binary record the 5-digit length can describe.
pub const MAX_RECORD_LENGTH: usize = 99_999;

/// Largest field contents a 4-digit directory length can describe (terminator excluded).
pub const MAX_VARIABLE_FIELD_DATA_LENGTH: usize = 9_998;

/// Ends the directory and every field.
pub const FIELD_TERMINATOR: u8 = 0x1E;

/// Ends a binary record.
pub const RECORD_TERMINATOR: u8 = 0x1D;

const FIXED_LENGTH_DATA: Tag = Tag::literal(b"008");
const PHYSICAL_DESCRIPTION_FIXED_FIELD: Tag = Tag::literal(b"007");
const TITLE_STATEMENT: Tag = Tag::literal(b"245");
const PHYSICAL_DESCRIPTION: Tag = Tag::literal(b"300");
const CARRIER_TYPE: Tag = Tag::literal(b"338");

/// Carrier types (338 $b) that denote online or computer media.
const ELECTRONIC_CARRIER_TYPES: &[&str] = &["ca", "cb", "cd", "ce", "cf", "ch", "ck", "cr", "cz"];

/// A MARC bibliographic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    leader: Leader,
    fields: Vec<Field>,
    /// Binary size of the record without its chunking: leader, directory,
    /// field data and both terminators.
    record_size: usize,
}

/// Builder for assembling a record from fields in any order.
///
/// Fields are sorted by tag when the record is built; no repeatability checks
/// are made.
#[derive(Debug)]
pub struct RecordBuilder {
    leader: Leader,
    fields: Vec<Field>,
}

impl RecordBuilder {
    /// Add the control number field.
    #[must_use]
    pub fn control_number(mut self, control_number: &str) -> Self {
        self.fields.push(Field::new(CONTROL_NUMBER, control_number));
        self
    }

    /// Add a field with raw contents.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a data field from indicators and subfields.
    #[must_use]
    pub fn data_field(
        mut self,
        tag: Tag,
        indicator1: char,
        indicator2: char,
        subfields: &Subfields,
    ) -> Self {
        self.fields
            .push(Field::data(tag, indicator1, indicator2, subfields));
        self
    }

    /// Build the record
    #[must_use]
    pub fn build(self) -> Record {
        let mut record = Record::from_parts(self.leader, self.fields);
        record.sort_fields();
        record
    }
}

impl Record {
    /// Create a record with a fresh leader and, optionally, a control number.
    #[must_use]
    pub fn new(
        type_of_record: TypeOfRecord,
        bibliographic_level: BibliographicLevel,
        control_number: Option<&str>,
    ) -> Self {
        let mut record = Record::from_parts(
            Leader::for_new_record(type_of_record, bibliographic_level),
            Vec::new(),
        );
        if let Some(control_number) = control_number.filter(|c| !c.is_empty()) {
            record.append_field(Field::new(CONTROL_NUMBER, control_number));
        }
        record
    }

    /// Start building a record with the given type and level.
    #[must_use]
    pub fn builder(
        type_of_record: TypeOfRecord,
        bibliographic_level: BibliographicLevel,
    ) -> RecordBuilder {
        RecordBuilder {
            leader: Leader::for_new_record(type_of_record, bibliographic_level),
            fields: Vec::new(),
        }
    }

    /// Assemble a record from already ordered fields.
    pub(crate) fn from_parts(leader: Leader, fields: Vec<Field>) -> Self {
        let record_size = empty_record_size() + fields.iter().map(field_size).sum::<usize>();
        Record {
            leader,
            fields,
            record_size,
        }
    }

    /// The record leader.
    #[must_use]
    pub fn leader(&self) -> &Leader {
        &self.leader
    }

    /// Mutable access to the leader. Length and base address are recomputed on write.
    pub fn leader_mut(&mut self) -> &mut Leader {
        &mut self.leader
    }

    /// Contents of the leading `001` field.
    #[must_use]
    pub fn control_number(&self) -> Option<&str> {
        self.fields
            .first()
            .filter(|field| field.tag() == CONTROL_NUMBER)
            .map(Field::contents)
    }

    /// All fields in record order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Size of the record in the binary format, ignoring the length limit.
    #[must_use]
    pub fn size(&self) -> usize {
        self.record_size
    }

    /// First field with `tag`.
    #[must_use]
    pub fn first_field(&self, tag: Tag) -> Option<&Field> {
        self.fields.iter().find(|field| field.tag() == tag)
    }

    /// Index range of the contiguous run of fields starting at the first `tag`.
    ///
    /// Empty (at the end of the record) if there is no such field.
    #[must_use]
    pub fn tag_range(&self, tag: Tag) -> Range<usize> {
        let Some(start) = self.fields.iter().position(|field| field.tag() == tag) else {
            return self.fields.len()..self.fields.len();
        };
        let run = self.fields[start..]
            .iter()
            .take_while(|field| field.tag() == tag)
            .count();
        start..start + run
    }

    /// The contiguous run of fields tagged `tag`.
    #[must_use]
    pub fn fields_with_tag(&self, tag: Tag) -> &[Field] {
        &self.fields[self.tag_range(tag)]
    }

    /// True if any field carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.first_field(tag).is_some()
    }

    /// True if a field tagged `tag` has exactly these indicators.
    #[must_use]
    pub fn has_tag_with_indicators(&self, tag: Tag, indicator1: char, indicator2: char) -> bool {
        self.fields_with_tag(tag).iter().any(|field| {
            field.indicator1() == Some(indicator1) && field.indicator2() == Some(indicator2)
        })
    }

    /// Values of subfields with any of `codes` across all fields tagged `tag`.
    #[must_use]
    pub fn subfield_values(&self, tag: Tag, codes: &str) -> Vec<String> {
        self.fields_with_tag(tag)
            .iter()
            .flat_map(|field| {
                field
                    .subfields()
                    .extract_subfields(codes)
                    .into_iter()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// The distinct tags present.
    #[must_use]
    pub fn tag_set(&self) -> BTreeSet<Tag> {
        self.fields.iter().map(Field::tag).collect()
    }

    /// Broad record class from leader position 6.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        self.leader.record_type_class()
    }

    /// Leader position 7.
    #[must_use]
    pub fn bibliographic_level(&self) -> char {
        self.leader.bibliographic_level
    }

    /// Overwrite leader position 7.
    pub fn set_bibliographic_level(&mut self, level: BibliographicLevel) {
        self.leader.bibliographic_level = level.code();
    }

    /// Bibliographic level `m`.
    #[must_use]
    pub fn is_monograph(&self) -> bool {
        self.leader.bibliographic_level == 'm'
    }

    /// Bibliographic level `s`.
    #[must_use]
    pub fn is_serial(&self) -> bool {
        self.leader.bibliographic_level == 's'
    }

    /// Bibliographic level `a` or `b` (component parts).
    #[must_use]
    pub fn is_article(&self) -> bool {
        matches!(self.leader.bibliographic_level, 'a' | 'b')
    }

    /// Heuristic for online and other computer-carried resources.
    ///
    /// Checks the record type, 007 for monographs, 245 $h, 300 $a and 338 $b.
    #[must_use]
    pub fn is_electronic_resource(&self) -> bool {
        if self.leader.record_type == 'm' {
            return true;
        }
        if self.is_monograph()
            && self
                .fields_with_tag(PHYSICAL_DESCRIPTION_FIXED_FIELD)
                .iter()
                .any(|field| field.contents().starts_with('c'))
        {
            return true;
        }

        let contains_ignoring_case = |haystack: &str, needle: &str| {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        };
        self.subfield_values(TITLE_STATEMENT, "h").iter().any(|h| {
            contains_ignoring_case(h, "[electronic resource]")
                || contains_ignoring_case(h, "[Elektronische Ressource]")
        }) || self
            .subfield_values(PHYSICAL_DESCRIPTION, "a")
            .iter()
            .any(|a| contains_ignoring_case(a, "Online-Ressource"))
            || self
                .subfield_values(CARRIER_TYPE, "b")
                .iter()
                .any(|b| ELECTRONIC_CARRIER_TYPES.contains(&b.as_str()))
    }

    /// Language code from 008 positions 35-37, if present and not blank.
    #[must_use]
    pub fn language_code(&self) -> Option<&str> {
        let contents = self.first_field(FIXED_LENGTH_DATA)?.contents();
        contents
            .get(35..38)
            .filter(|code| !code.trim().is_empty())
    }

    /// Insert a field in tag order, after any fields with the same tag.
    ///
    /// Returns `Ok(false)` and leaves the record untouched if `tag` is already
    /// present and not repeatable.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::UnknownTag`](crate::MarcError::UnknownTag) if the tag is
    /// already present and missing from the repeatable-field table.
    pub fn insert_field(&mut self, tag: Tag, contents: impl Into<String>) -> Result<bool> {
        if self.has_tag(tag) && !is_repeatable_field(tag)? {
            return Ok(false);
        }
        let key = field_order(tag);
        let position = self.fields.partition_point(|field| field_order(field.tag()) <= key);
        let field = Field::new(tag, contents);
        self.record_size += field_size(&field);
        self.fields.insert(position, field);
        Ok(true)
    }

    /// Insert a data field built from indicators and subfields.
    ///
    /// # Errors
    ///
    /// See [`insert_field`](Self::insert_field).
    pub fn insert_data_field(
        &mut self,
        tag: Tag,
        indicator1: char,
        indicator2: char,
        subfields: &Subfields,
    ) -> Result<bool> {
        let field = Field::data(tag, indicator1, indicator2, subfields);
        self.insert_field(tag, field.contents().to_string())
    }

    /// Append a field at the end without ordering or repeatability checks.
    pub fn append_field(&mut self, field: Field) {
        self.record_size += field_size(&field);
        self.fields.push(field);
    }

    /// Add a subfield, in code order, to the first field tagged `tag`.
    ///
    /// Returns `false` if there is no such field or `tag` is a control field.
    pub fn add_subfield(&mut self, tag: Tag, code: char, value: &str) -> bool {
        if tag.is_control_field_tag() {
            return false;
        }
        let Some(field) = self.fields.iter_mut().find(|field| field.tag() == tag) else {
            return false;
        };
        let old_size = field_size(field);
        let mut subfields = field.subfields();
        subfields.add_subfield(code, value);
        let indicator1 = field.indicator1().unwrap_or(' ');
        let indicator2 = field.indicator2().unwrap_or(' ');
        field.set_subfields(indicator1, indicator2, &subfields);
        self.record_size = self.record_size - old_size + field_size(field);
        true
    }

    /// Remove subfields with `code` from every field tagged `tag`.
    pub fn delete_all_subfields_with_code(&mut self, tag: Tag, code: char) {
        let range = self.tag_range(tag);
        for field in &mut self.fields[range] {
            field.delete_all_subfields_with_code(code);
        }
        self.recompute_size();
    }

    /// Change the tag of the run of `from` fields to `to`, re-sorting if needed.
    ///
    /// Returns how many fields were changed.
    pub fn re_tag(&mut self, from: Tag, to: Tag) -> usize {
        let range = self.tag_range(from);
        let changed = range.len();
        for field in &mut self.fields[range] {
            field.set_tag(to);
        }
        if changed > 0 {
            self.sort_fields();
        }
        changed
    }

    /// Add all fields of `other`, keeping tag order.
    ///
    /// The `001` of `other` is skipped when this record already has one.
    pub fn merge(&mut self, other: &Record) {
        let skip_control_number = self.control_number().is_some();
        for field in &other.fields {
            if skip_control_number && field.tag() == CONTROL_NUMBER {
                continue;
            }
            self.append_field(field.clone());
        }
        self.sort_fields();
    }

    /// Delete fields by index. Duplicate and out-of-range indices are ignored.
    pub fn delete_fields(&mut self, mut indices: Vec<usize>) {
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();
        for index in indices {
            if index < self.fields.len() {
                let field = self.fields.remove(index);
                self.record_size -= field_size(&field);
            }
        }
    }

    /// Delete a contiguous range of fields.
    pub(crate) fn delete_field_range(&mut self, range: Range<usize>) {
        let removed: usize = self.fields.drain(range).map(|field| field_size(&field)).sum();
        self.record_size -= removed;
    }

    /// Stable sort by tag, with `001` always first.
    pub fn sort_fields(&mut self) {
        self.fields.sort_by_key(|field| field_order(field.tag()));
    }

    /// Structural check: the record starts with `001` and every data field has
    /// indicators followed by well-formed subfield runs.
    ///
    /// Empty subfield values are logged, not rejected.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn is_valid(&self) -> std::result::Result<(), String> {
        if self.control_number().is_none() {
            return Err("001 field is missing!".to_string());
        }

        for field in self.fields.iter().filter(|field| field.is_data_field()) {
            let tag = field.tag();
            let contents = field.contents();
            if contents.chars().count() < 5 {
                return Err(format!(
                    "field contents are too small (< 5 characters)! (tag: {tag})"
                ));
            }

            let bytes = contents.as_bytes();
            let mut pos = contents.len() - skip_indicators(contents).len();
            while pos < bytes.len() {
                if bytes[pos] != SUBFIELD_DELIMITER {
                    return Err(format!("subfield does not start with 0x1F! (tag: {tag})"));
                }
                pos += 1;
                let Some(&code) = bytes.get(pos) else {
                    return Err(format!("subfield is missing a subfield code! (tag: {tag})"));
                };
                pos += 1;
                let value_len = bytes[pos..]
                    .iter()
                    .take_while(|&&b| b != SUBFIELD_DELIMITER)
                    .count();
                if value_len == 0 {
                    warn!(%tag, code = %char::from(code), "subfield is empty");
                }
                pos += value_len;
            }
        }

        Ok(())
    }

    fn recompute_size(&mut self) {
        self.record_size = empty_record_size() + self.fields.iter().map(field_size).sum::<usize>();
    }
}

/// Sort key placing `001` ahead of every other tag.
fn field_order(tag: Tag) -> (bool, Tag) {
    (tag != CONTROL_NUMBER, tag)
}

/// Leader, end-of-directory and end-of-record bytes.
const fn empty_record_size() -> usize {
    LEADER_LENGTH + 2
}

/// Directory entry, contents and field terminator.
fn field_size(field: &Field) -> usize {
    DIRECTORY_ENTRY_LENGTH + field.contents().len() + 1
}
