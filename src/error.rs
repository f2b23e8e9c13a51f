//! Error types for MARC operations.
//!
//! This module provides the [`MarcError`] type for all library operations
//! and the [`Result`] convenience type.
//!
//! Inserting a second instance of a non-repeatable field is deliberately not
//! represented here: [`Record::insert_field`](crate::Record::insert_field)
//! reports it as `Ok(false)` and leaves the decision to the caller.

use crate::tag::Tag;
use thiserror::Error;

/// Error type for all MARC library operations.
#[derive(Error, Debug)]
pub enum MarcError {
    /// The 24-byte leader (or the 5-digit record length preceding it) is unusable.
    #[error("Malformed leader: {0}")]
    MalformedLeader(String),

    /// The directory of a binary record is inconsistent with its data segment.
    #[error("Malformed directory: {0}")]
    MalformedDirectory(String),

    /// A MARC-XML document deviates from the expected element structure.
    #[error("Malformed MARC-XML on line {line}: {message}")]
    MalformedXml {
        /// 1-based line number closest to the offending construct.
        line: u64,
        /// What was expected or found.
        message: String,
    },

    /// A non-local tag is missing from the repeatable-field table.
    #[error("Tag {0} is not in the repeatable-field table")]
    UnknownTag(Tag),

    /// Text that cannot be a tag (tags are exactly 3 bytes).
    #[error("Invalid tag: {0:?}")]
    InvalidTag(String),

    /// Field contents too long for a 4-digit directory length.
    #[error("Field {tag} is too long for the binary format ({length} bytes)")]
    FieldTooLong {
        /// Tag of the offending field.
        tag: Tag,
        /// Length of the field contents without terminator.
        length: usize,
    },

    /// A record failed structural validation and cannot be serialized.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// File type could not be determined, or the operation is not available for it.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Failure of the underlying file or stream.
    #[error("Stream I/O error: {0}")]
    StreamIo(#[from] std::io::Error),
}

impl MarcError {
    pub(crate) fn xml(line: u64, message: impl Into<String>) -> Self {
        MarcError::MalformedXml {
            line,
            message: message.into(),
        }
    }
}

/// Convenience type alias for [`std::result::Result`] with [`MarcError`].
pub type Result<T> = std::result::Result<T, MarcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_error_names_line() {
        let err = MarcError::xml(17, "closing </record> tag expected");
        assert_eq!(
            err.to_string(),
            "Malformed MARC-XML on line 17: closing </record> tag expected"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MarcError = io.into();
        assert!(matches!(err, MarcError::StreamIo(_)));
    }
}
