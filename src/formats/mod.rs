//! File-level access to MARC records in either serialization.
//!
//! [`Reader`] and [`Writer`] pick binary (ISO 2709) or MARC-XML handling from a
//! [`FileType`], which may be [`FileType::Auto`] to have it guessed from the
//! file's first bytes or its extension. Everything format-specific lives in
//! [`BinaryReader`](crate::BinaryReader)/[`BinaryWriter`](crate::BinaryWriter)
//! and [`XmlReader`](crate::XmlReader)/[`XmlWriter`](crate::XmlWriter); the
//! types here only open files and dispatch.
//!
//! # Format-Agnostic Processing
//!
//! ```no_run
//! use marcio::formats::{FileType, Reader, Writer, WriterMode};
//!
//! let mut reader = Reader::open("in.xml", FileType::Auto)?;
//! let mut writer = Writer::open("out.mrc", FileType::Auto, WriterMode::Overwrite)?;
//! while let Some(record) = reader.read()? {
//!     writer.write(&record)?;
//! }
//! writer.finish()?;
//! # Ok::<(), marcio::MarcError>(())
//! ```

mod file_io;
mod maintenance;
mod traits;

pub use file_io::{file_locked_write, Reader, Writer};
pub use maintenance::{
    collect_record_offsets, is_valid_marc_file, remove_duplicate_control_number_records,
};
pub use traits::{FormatReader, FormatReaderExt, FormatWriter, RecordIterator};

use crate::error::{MarcError, Result};
use lazy_static::lazy_static;
use regex::bytes::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// Bytes inspected when guessing a file's type from its contents.
const MAGIC_LENGTH: usize = 8;

lazy_static! {
    /// A 5-digit record length followed by a plausible record status and type.
    static ref BINARY_MAGIC: Option<Regex> = Regex::new(
        r"(^[0-9]{5})([acdnp][^bhlnqsu-z]|[acdnosx][z]|[cdn][uvxy]|[acdn][w]|[cdn][q])"
    )
    .ok();
}

/// Serialization of a MARC file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileType {
    /// Decide from the file's contents or extension.
    #[default]
    Auto,
    /// ISO 2709.
    Binary,
    /// MARC-XML.
    Xml,
}

impl FileType {
    /// Concrete type named by the extension of `path`, ignoring case.
    ///
    /// `.mrc`, `.marc` and `.raw` are binary; `.xml` is MARC-XML.
    ///
    /// ```
    /// use marcio::formats::FileType;
    ///
    /// assert_eq!(FileType::from_extension("records.MRC"), Some(FileType::Binary));
    /// assert_eq!(FileType::from_extension("records.xml"), Some(FileType::Xml));
    /// assert_eq!(FileType::from_extension("records.txt"), None);
    /// ```
    pub fn from_extension(path: impl AsRef<Path>) -> Option<FileType> {
        let extension = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "mrc" | "marc" | "raw" => Some(FileType::Binary),
            "xml" => Some(FileType::Xml),
            _ => None,
        }
    }

    /// Guess the type of `path`.
    ///
    /// With `read_file` set and the file present, its first bytes decide:
    /// a leading `<?xml` or `<` means MARC-XML, a record length followed by a
    /// known status/type combination means binary. Otherwise, or when the
    /// contents are inconclusive, the extension decides.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::UnsupportedFileType`] if neither the contents nor
    /// the extension identify the type, or an I/O error if reading fails.
    pub fn guess(path: impl AsRef<Path>, read_file: bool) -> Result<FileType> {
        let path = path.as_ref();
        if read_file && path.exists() {
            if let Some(file_type) = sniff(path)? {
                return Ok(file_type);
            }
        }
        FileType::from_extension(path).ok_or_else(|| {
            MarcError::UnsupportedFileType(format!(
                "can't guess the file type of \"{}\"",
                path.display()
            ))
        })
    }

    /// Resolve [`FileType::Auto`] for `path`; concrete types are returned as is.
    pub(crate) fn resolve(self, path: &Path, read_file: bool) -> Result<FileType> {
        match self {
            FileType::Auto => FileType::guess(path, read_file),
            concrete => Ok(concrete),
        }
    }
}

/// How [`Writer::open`] treats an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WriterMode {
    /// Truncate the file.
    #[default]
    Overwrite,
    /// Add records after the existing contents. Binary files only.
    Append,
}

fn sniff(path: &Path) -> Result<Option<FileType>> {
    let mut magic = Vec::with_capacity(MAGIC_LENGTH);
    File::open(path)?
        .take(MAGIC_LENGTH as u64)
        .read_to_end(&mut magic)?;
    Ok(sniff_bytes(&magic, path))
}

fn sniff_bytes(magic: &[u8], path: &Path) -> Option<FileType> {
    if magic.is_empty() {
        warn!(path = %path.display(), "empty file, falling back to its extension");
        return None;
    }
    if magic.starts_with(b"<?xml") || magic.starts_with(b"<") {
        return Some(FileType::Xml);
    }
    let is_binary = BINARY_MAGIC
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(magic));
    is_binary.then_some(FileType::Binary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sniffed(bytes: &[u8]) -> Option<FileType> {
        sniff_bytes(bytes, Path::new("test"))
    }

    #[test]
    fn test_magic_detection() {
        assert_eq!(sniffed(b"<?xml version"), Some(FileType::Xml));
        assert_eq!(sniffed(b"<collect"), Some(FileType::Xml));
        assert_eq!(sniffed(b"00123nam"), Some(FileType::Binary));
        assert_eq!(sniffed(b"00123cz "), Some(FileType::Binary));
        assert_eq!(sniffed(b"00123nb "), None);
        assert_eq!(sniffed(b"hello wo"), None);
        assert_eq!(sniffed(b""), None);
    }

    #[test]
    fn test_extension_detection() {
        assert_eq!(FileType::from_extension("a.marc"), Some(FileType::Binary));
        assert_eq!(FileType::from_extension("a.Raw"), Some(FileType::Binary));
        assert_eq!(FileType::from_extension("dir/a.XML"), Some(FileType::Xml));
        assert_eq!(FileType::from_extension("noext"), None);
    }

    #[test]
    fn test_guess_prefers_contents() {
        let mut file = tempfile::Builder::new().suffix(".mrc").tempfile().unwrap();
        file.write_all(b"<?xml version=\"1.0\"?><collection/>").unwrap();
        file.flush().unwrap();

        assert_eq!(FileType::guess(file.path(), true).unwrap(), FileType::Xml);
        assert_eq!(FileType::guess(file.path(), false).unwrap(), FileType::Binary);
    }

    #[test]
    fn test_guess_failure() {
        let err = FileType::guess("nowhere/records.dat", true).unwrap_err();
        assert!(matches!(err, MarcError::UnsupportedFileType(_)));
    }

    #[test]
    fn test_resolve_keeps_concrete_types() {
        let path = Path::new("records.txt");
        assert_eq!(FileType::Xml.resolve(path, true).unwrap(), FileType::Xml);
        assert!(FileType::Auto.resolve(path, false).is_err());
    }
}
