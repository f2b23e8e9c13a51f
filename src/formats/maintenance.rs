//! Whole-file operations built on [`Reader`] and [`Writer`].

use super::{FileType, Reader, Writer, WriterMode};
use crate::error::{MarcError, Result};
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Map every control number to the offset of its record, reading `reader` to the end.
///
/// Records without a `001` are indexed under the empty string. A control
/// number seen twice maps to its last occurrence.
///
/// # Errors
///
/// Returns an error if reading fails or the file is MARC-XML.
pub fn collect_record_offsets(reader: &mut Reader) -> Result<HashMap<String, u64>> {
    let mut offsets = HashMap::new();
    let mut offset = reader.tell()?;
    while let Some(record) = reader.read()? {
        offsets.insert(record.control_number().unwrap_or_default().to_string(), offset);
        offset = reader.tell()?;
    }
    Ok(offsets)
}

/// Check that `path` parses completely and every record passes [`Record::is_valid`](crate::Record::is_valid).
///
/// # Errors
///
/// Returns the first validation message, or the text of the first read error.
pub fn is_valid_marc_file(path: impl AsRef<Path>, file_type: FileType) -> std::result::Result<(), String> {
    let mut reader = Reader::open(path, file_type).map_err(|e| e.to_string())?;
    while let Some(record) = reader.read().map_err(|e| e.to_string())? {
        record.is_valid()?;
    }
    Ok(())
}

/// Rewrite `path` keeping only the first record for each control number.
///
/// The file keeps its type. Returns the number of records dropped.
///
/// Records are compared as the reader returns them, so in a binary file
/// adjacent records sharing a `001` are merged into one and never counted as
/// dropped. Records without a `001` all share the empty control number, so
/// only the first of them is kept.
///
/// # Errors
///
/// Returns an error if reading, writing or replacing the file fails.
pub fn remove_duplicate_control_number_records(path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    let mut temp_name = path
        .file_name()
        .map(OsString::from)
        .ok_or_else(|| MarcError::UnsupportedFileType(format!("\"{}\" is not a file", path.display())))?;
    temp_name.push(".dedup");
    let temp_path = path.with_file_name(temp_name);

    let mut dropped = 0usize;
    {
        let mut reader = Reader::open(path, FileType::Auto)?;
        let mut writer = Writer::open(&temp_path, reader.file_type(), WriterMode::Overwrite)?;
        let mut seen = HashSet::new();
        while let Some(record) = reader.read()? {
            let control_number = record.control_number().unwrap_or_default().to_string();
            if seen.insert(control_number) {
                writer.write(&record)?;
            } else {
                dropped += 1;
            }
        }
        writer.finish()?;
    }

    fs::rename(&temp_path, path)?;
    debug!(path = %path.display(), dropped, "removed duplicate control numbers");
    Ok(dropped)
}
