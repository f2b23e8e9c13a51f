//! Three-character field tags.
//!
//! Tags order lexicographically by their bytes, which is the order fields are
//! kept in inside a [`Record`](crate::Record). Digits sort before letters, so
//! alphabetic local tags such as `LOK` always follow the numeric ones.

use crate::error::{MarcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of bytes in a tag.
pub const TAG_LENGTH: usize = 3;

/// A MARC field tag: exactly three ASCII characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag([u8; TAG_LENGTH]);

/// `001`, the control number.
pub(crate) const CONTROL_NUMBER: Tag = Tag(*b"001");

impl Tag {
    /// Tag from a literal. Only for printable ASCII constants.
    pub(crate) const fn literal(bytes: &[u8; TAG_LENGTH]) -> Self {
        Tag(*bytes)
    }

    /// Create a tag from text.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidTag`] unless `tag` is exactly three ASCII characters.
    pub fn new(tag: &str) -> Result<Self> {
        match tag.as_bytes() {
            &[a, b, c] => Self::from_bytes([a, b, c]),
            _ => Err(MarcError::InvalidTag(tag.to_string())),
        }
    }

    /// Create a tag from three raw bytes, e.g. a binary directory entry.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidTag`] if any byte is not printable ASCII.
    pub fn from_bytes(bytes: [u8; TAG_LENGTH]) -> Result<Self> {
        if bytes.iter().all(|b| b.is_ascii_graphic()) {
            Ok(Tag(bytes))
        } else {
            Err(MarcError::InvalidTag(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        }
    }

    /// The tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// The raw tag bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; TAG_LENGTH] {
        &self.0
    }

    /// True for locally defined tags: any character that is non-numeric or the digit `9`.
    ///
    /// ```
    /// use marcio::Tag;
    ///
    /// assert!(Tag::new("LOK").unwrap().is_local());
    /// assert!(Tag::new("591").unwrap().is_local());
    /// assert!(!Tag::new("245").unwrap().is_local());
    /// ```
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.0.iter().any(|&b| !b.is_ascii_digit() || b == b'9')
    }

    /// True if fields with this tag are control fields.
    ///
    /// The rule is positional, not a length heuristic: a tag whose first two
    /// characters are `00` (`000`–`009`) names a control field holding plain
    /// text; every other tag names a data field with indicators and subfields.
    #[must_use]
    pub fn is_control_field_tag(&self) -> bool {
        self.0[0] == b'0' && self.0[1] == b'0'
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = MarcError;

    fn from_str(s: &str) -> Result<Self> {
        Tag::new(s)
    }
}

impl TryFrom<&str> for Tag {
    type Error = MarcError;

    fn try_from(value: &str) -> Result<Self> {
        Tag::new(value)
    }
}

impl TryFrom<String> for Tag {
    type Error = MarcError;

    fn try_from(value: String) -> Result<Self> {
        Tag::new(&value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.as_str().to_string()
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(raw: &[&str]) -> Vec<Tag> {
        raw.iter().map(|t| Tag::new(t).unwrap()).collect()
    }

    #[test]
    fn test_strict_ordering() {
        let ordered = tags(&["000", "001", "002", "010", "011", "100", "101", "110", "852", "LOK"]);
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1], "{} < {}", pair[0], pair[1]);
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_ordering_with_duplicates() {
        let ordered = tags(&["001", "002", "011", "011", "012", "112", "112"]);
        for pair in ordered.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_equality_with_str() {
        let tag = Tag::new("001").unwrap();
        assert_eq!(tag, "001");
        assert!(tag != "100");
        assert_eq!(tag.to_string(), "001");
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(matches!(Tag::new("24"), Err(MarcError::InvalidTag(_))));
        assert!(matches!(Tag::new("2450"), Err(MarcError::InvalidTag(_))));
        assert!(Tag::from_bytes([b'2', 0x1E, b'5']).is_err());
    }

    #[test]
    fn test_control_field_rule() {
        for raw in ["000", "001", "005", "008", "009"] {
            assert!(Tag::new(raw).unwrap().is_control_field_tag(), "{raw}");
        }
        for raw in ["010", "011", "100", "245", "LOK", "0A1"] {
            assert!(!Tag::new(raw).unwrap().is_control_field_tag(), "{raw}");
        }
    }

    #[test]
    fn test_locality() {
        for raw in ["LOK", "SIG", "591", "935", "099", "9XX"] {
            assert!(Tag::new(raw).unwrap().is_local(), "{raw}");
        }
        for raw in ["001", "100", "245", "650", "856"] {
            assert!(!Tag::new(raw).unwrap().is_local(), "{raw}");
        }
    }

    #[test]
    fn test_serde_as_string() {
        let tag = Tag::new("245").unwrap();
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"245\"");
        let back: Tag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
        assert!(serde_json::from_str::<Tag>("\"24\"").is_err());
    }
}
