//! Fields: a tag plus raw contents.
//!
//! Contents are stored exactly as they appear between directory-addressed
//! offsets in a binary record, minus the field terminator. For a control field
//! that is plain text; for a data field it is two indicators followed by
//! subfield runs (see [`Subfields`]).

use crate::subfields::{skip_indicators, Subfields};
use crate::tag::Tag;
use serde::{Deserialize, Serialize};

/// A variable field of a MARC record.
///
/// Fields order by tag first, then by raw contents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Field {
    tag: Tag,
    contents: String,
}

impl Field {
    /// Create a field from a tag and raw contents.
    pub fn new(tag: Tag, contents: impl Into<String>) -> Self {
        Field {
            tag,
            contents: contents.into(),
        }
    }

    /// Create a data field from indicators and subfields.
    #[must_use]
    pub fn data(tag: Tag, indicator1: char, indicator2: char, subfields: &Subfields) -> Self {
        let mut contents = String::new();
        contents.push(indicator1);
        contents.push(indicator2);
        contents.push_str(&subfields.to_contents());
        Field { tag, contents }
    }

    /// The field tag.
    #[must_use]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub(crate) fn set_tag(&mut self, tag: Tag) {
        self.tag = tag;
    }

    /// Raw contents (indicators and subfield runs for data fields).
    #[must_use]
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Replace the raw contents.
    pub fn set_contents(&mut self, contents: impl Into<String>) {
        self.contents = contents.into();
    }

    /// Replace indicators and subfields of a data field.
    pub fn set_subfields(&mut self, indicator1: char, indicator2: char, subfields: &Subfields) {
        let mut contents = String::new();
        contents.push(indicator1);
        contents.push(indicator2);
        contents.push_str(&subfields.to_contents());
        self.contents = contents;
    }

    /// True if the tag designates a control field.
    #[must_use]
    pub fn is_control_field(&self) -> bool {
        self.tag.is_control_field_tag()
    }

    /// True if the tag designates a data field.
    #[must_use]
    pub fn is_data_field(&self) -> bool {
        !self.is_control_field()
    }

    /// First indicator, if the contents have one.
    #[must_use]
    pub fn indicator1(&self) -> Option<char> {
        self.contents.chars().next()
    }

    /// Second indicator, if the contents have one.
    #[must_use]
    pub fn indicator2(&self) -> Option<char> {
        self.contents.chars().nth(1)
    }

    /// Decode the subfields of a data field.
    #[must_use]
    pub fn subfields(&self) -> Subfields {
        Subfields::parse(&self.contents)
    }

    /// Value of the first subfield with `code`, without decoding the whole field.
    #[must_use]
    pub fn first_subfield_with_code(&self, code: char) -> Option<&str> {
        let body = skip_indicators(&self.contents);
        let mut runs = body.split('\x1F');
        runs.next();
        runs.find_map(|run| run.strip_prefix(code))
    }

    /// Replace the first subfield with `code`, or add it in code order.
    ///
    /// Indicators are kept.
    pub fn insert_or_replace_subfield(&mut self, code: char, value: &str) {
        let mut subfields = self.subfields();
        if !subfields.replace_first_subfield(code, value) {
            subfields.add_subfield(code, value);
        }
        self.rebuild(&subfields);
    }

    /// Remove every subfield with `code`. Control fields are left untouched.
    pub fn delete_all_subfields_with_code(&mut self, code: char) {
        if self.is_control_field() {
            return;
        }
        let mut subfields = self.subfields();
        subfields.delete_all_subfields_with_code(code);
        self.rebuild(&subfields);
    }

    fn rebuild(&mut self, subfields: &Subfields) {
        let indicator1 = self.indicator1().unwrap_or(' ');
        let indicator2 = self.indicator2().unwrap_or(' ');
        self.set_subfields(indicator1, indicator2, subfields);
    }
}
