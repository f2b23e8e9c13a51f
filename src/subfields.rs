//! Subfield lists of data fields.
//!
//! On the wire a data field is two indicator characters followed by runs of
//! `0x1F` + one-character code + value. [`Subfields`] is the decoded form of
//! those runs.

use memchr::memchr_iter;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Byte that introduces every subfield run.
pub const SUBFIELD_DELIMITER: u8 = 0x1F;
pub(crate) const SUBFIELD_DELIMITER_CHAR: char = '\x1F';

/// A single code/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield value
    pub value: String,
}

impl Subfield {
    /// Create a subfield.
    pub fn new(code: char, value: impl Into<String>) -> Self {
        Subfield {
            code,
            value: value.into(),
        }
    }

    /// Append the wire form (`0x1F` + code + value) to `out`.
    pub fn write_to(&self, out: &mut String) {
        out.push(SUBFIELD_DELIMITER_CHAR);
        out.push(self.code);
        out.push_str(&self.value);
    }
}

/// Ordered subfields of one data field.
///
/// [`add_subfield`](Self::add_subfield) keeps the list sorted by code; subfields
/// sharing a code stay in the order they were added. Lists decoded with
/// [`parse`](Self::parse) keep whatever order the field contents had.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfields {
    subfields: SmallVec<[Subfield; 4]>,
}

impl Subfields {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the subfield runs of data-field contents (the two indicators are skipped).
    ///
    /// Bytes before the first delimiter and delimiters without a code are ignored.
    ///
    /// ```
    /// use marcio::Subfields;
    ///
    /// let subfields = Subfields::parse("10\x1faTitle\x1fcAuthor");
    /// assert_eq!(subfields.len(), 2);
    /// assert_eq!(subfields.first_subfield_with_code('c'), Some("Author"));
    /// ```
    #[must_use]
    pub fn parse(field_contents: &str) -> Self {
        let body = skip_indicators(field_contents);
        let bytes = body.as_bytes();

        let mut subfields = SmallVec::new();
        let starts: Vec<usize> = memchr_iter(SUBFIELD_DELIMITER, bytes).collect();
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(bytes.len());
            // Delimiters are ASCII, so these offsets are char boundaries.
            let run = &body[start + 1..end];
            let mut chars = run.chars();
            if let Some(code) = chars.next() {
                subfields.push(Subfield::new(code, chars.as_str()));
            }
        }

        Subfields { subfields }
    }

    /// Number of subfields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subfields.len()
    }

    /// True if there are no subfields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subfields.is_empty()
    }

    /// Iterate over the subfields in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Subfield> {
        self.subfields.iter()
    }

    /// Insert a subfield at its code-sorted position, after any existing subfields with the same code.
    pub fn add_subfield(&mut self, code: char, value: impl Into<String>) {
        let position = self.subfields.partition_point(|s| s.code <= code);
        self.subfields.insert(position, Subfield::new(code, value));
    }

    /// Append a subfield at the end, ignoring code order.
    pub fn push(&mut self, code: char, value: impl Into<String>) {
        self.subfields.push(Subfield::new(code, value));
    }

    /// True if any subfield carries `code`.
    #[must_use]
    pub fn has_subfield(&self, code: char) -> bool {
        self.subfields.iter().any(|s| s.code == code)
    }

    /// Value of the first subfield with `code`.
    #[must_use]
    pub fn first_subfield_with_code(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|s| s.code == code)
            .map(|s| s.value.as_str())
    }

    /// Values of all subfields whose code appears in `codes`, in list order.
    #[must_use]
    pub fn extract_subfields(&self, codes: &str) -> Vec<&str> {
        self.subfields
            .iter()
            .filter(|s| codes.contains(s.code))
            .map(|s| s.value.as_str())
            .collect()
    }

    /// Replace the value of the first subfield with `code`.
    ///
    /// Returns `false` if there is no such subfield.
    pub fn replace_first_subfield(&mut self, code: char, value: impl Into<String>) -> bool {
        match self.subfields.iter_mut().find(|s| s.code == code) {
            Some(subfield) => {
                subfield.value = value.into();
                true
            },
            None => false,
        }
    }

    /// Remove the first subfield with `code`, if any.
    pub fn delete_first_subfield_with_code(&mut self, code: char) {
        if let Some(position) = self.subfields.iter().position(|s| s.code == code) {
            self.subfields.remove(position);
        }
    }

    /// Remove every subfield with `code`.
    pub fn delete_all_subfields_with_code(&mut self, code: char) {
        self.subfields.retain(|s| s.code != code);
    }

    /// Encode as `0x1F`-prefixed runs (without indicators).
    #[must_use]
    pub fn to_contents(&self) -> String {
        let mut out = String::with_capacity(
            self.subfields.iter().map(|s| s.value.len() + 2).sum(),
        );
        for subfield in &self.subfields {
            subfield.write_to(&mut out);
        }
        out
    }
}

impl<'a> IntoIterator for &'a Subfields {
    type Item = &'a Subfield;
    type IntoIter = std::slice::Iter<'a, Subfield>;

    fn into_iter(self) -> Self::IntoIter {
        self.subfields.iter()
    }
}

impl FromIterator<Subfield> for Subfields {
    fn from_iter<I: IntoIterator<Item = Subfield>>(iter: I) -> Self {
        Subfields {
            subfields: iter.into_iter().collect(),
        }
    }
}

impl<const N: usize> From<[(char, &str); N]> for Subfields {
    fn from(pairs: [(char, &str); N]) -> Self {
        pairs
            .into_iter()
            .map(|(code, value)| Subfield::new(code, value))
            .collect()
    }
}

/// Field contents after the two indicator characters.
pub(crate) fn skip_indicators(contents: &str) -> &str {
    let mut chars = contents.chars();
    chars.next();
    chars.next();
    chars.as_str()
}
