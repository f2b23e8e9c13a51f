//! Writing MARC records to binary format.
//!
//! This module provides [`BinaryWriter`] for serializing [`Record`] instances
//! to ISO 2709 binary format that can be written to any destination implementing
//! [`std::io::Write`].
//!
//! A record larger than [`MAX_RECORD_LENGTH`] is written as several physical
//! records (see [`RecordChunks`]). Every chunk after the first repeats the
//! `001` field so that it parses on its own, and
//! [`BinaryReader`](crate::BinaryReader) merges them again.
//!
//! # Examples
//!
//! ```
//! use marcio::{BibliographicLevel, BinaryWriter, Record, TypeOfRecord};
//!
//! let record = Record::new(TypeOfRecord::LanguageMaterial, BibliographicLevel::MonographOrItem, Some("1"));
//! let mut writer = BinaryWriter::new(Vec::new());
//! writer.write_record(&record)?;
//! let bytes = writer.into_inner();
//! assert_eq!(&bytes[..5], b"00040");
//! # Ok::<(), marcio::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::field::Field;
use crate::formats::FormatWriter;
use crate::leader::LEADER_LENGTH;
use crate::record::{
    Record, DIRECTORY_ENTRY_LENGTH, FIELD_TERMINATOR, MAX_RECORD_LENGTH,
    MAX_VARIABLE_FIELD_DATA_LENGTH, RECORD_TERMINATOR,
};
use std::io::Write;
use tracing::debug;

/// Writer for ISO 2709 binary MARC format.
///
/// Each record is validated with [`Record::is_valid`] before anything is written.
#[derive(Debug)]
pub struct BinaryWriter<W: Write> {
    writer: W,
    records_written: usize,
    finished: bool,
}

impl<W: Write> BinaryWriter<W> {
    /// Create a new binary writer.
    pub fn new(writer: W) -> Self {
        BinaryWriter {
            writer,
            records_written: 0,
            finished: false,
        }
    }

    /// Write a single MARC record, split into as many physical records as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The record fails [`Record::is_valid`]
    /// - A field is longer than [`MAX_VARIABLE_FIELD_DATA_LENGTH`]
    /// - The writer has been finished
    /// - An I/O error occurs during writing
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        if self.finished {
            return Err(MarcError::InvalidRecord(
                "Cannot write to a finished writer".to_string(),
            ));
        }

        record.is_valid().map_err(|message| {
            MarcError::InvalidRecord(format!(
                "{message} (control number: {})",
                record.control_number().unwrap_or_default()
            ))
        })?;

        let chunks = RecordChunks::new(record)?;
        let mut count = 0usize;
        for chunk in chunks {
            self.writer.write_all(&chunk)?;
            count += 1;
        }
        if count > 1 {
            debug!(
                control_number = record.control_number().unwrap_or_default(),
                chunks = count,
                "split oversized record"
            );
        }

        self.records_written += 1;
        Ok(())
    }

    /// Flush buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing the underlying writer fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and refuse further writes.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing the underlying writer fails.
    pub fn finish(&mut self) -> Result<()> {
        self.flush()?;
        self.finished = true;
        Ok(())
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// The underlying writer, mutably.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + std::fmt::Debug> FormatWriter for BinaryWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        BinaryWriter::write_record(self, record)
    }

    fn finish(&mut self) -> Result<()> {
        BinaryWriter::finish(self)
    }

    fn records_written(&self) -> Option<usize> {
        Some(self.records_written)
    }
}

/// The physical binary records one logical record is written as.
///
/// The first chunk starts with the record's own fields; every later chunk
/// starts with a copy of the first field (the `001`). Fields are added to a
/// chunk while its total size stays below [`MAX_RECORD_LENGTH`].
#[derive(Debug, Clone)]
pub struct RecordChunks<'a> {
    record: &'a Record,
    next_field: usize,
}

impl<'a> RecordChunks<'a> {
    /// Prepare to chunk `record`.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::FieldTooLong`] if any field's contents exceed
    /// [`MAX_VARIABLE_FIELD_DATA_LENGTH`].
    pub fn new(record: &'a Record) -> Result<Self> {
        if let Some(field) = record
            .fields()
            .iter()
            .find(|field| field.contents().len() > MAX_VARIABLE_FIELD_DATA_LENGTH)
        {
            return Err(MarcError::FieldTooLong {
                tag: field.tag(),
                length: field.contents().len(),
            });
        }
        Ok(RecordChunks {
            record,
            next_field: 0,
        })
    }
}

impl Iterator for RecordChunks<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        let fields = self.record.fields();
        let is_continuation = self.next_field > 0;
        if self.next_field >= fields.len() && (is_continuation || !fields.is_empty()) {
            return None;
        }

        let repeated = if is_continuation { fields.first() } else { None };
        let mut size = LEADER_LENGTH + 2 + repeated.map_or(0, entry_size);
        let start = self.next_field;
        let mut end = start;
        while end < fields.len() && size + entry_size(&fields[end]) < MAX_RECORD_LENGTH {
            size += entry_size(&fields[end]);
            end += 1;
        }
        self.next_field = end.max(start + 1);

        let chunk_fields: Vec<&Field> = repeated.into_iter().chain(&fields[start..end]).collect();
        Some(encode_chunk(self.record, &chunk_fields, size))
    }
}

/// Directory entry, contents and terminator.
fn entry_size(field: &Field) -> usize {
    DIRECTORY_ENTRY_LENGTH + field.contents().len() + 1
}

fn encode_chunk(record: &Record, fields: &[&Field], size: usize) -> Vec<u8> {
    let base_address = LEADER_LENGTH + fields.len() * DIRECTORY_ENTRY_LENGTH + 1;

    let mut leader = record.leader().clone();
    leader.record_length = u32::try_from(size).unwrap_or(u32::MAX);
    leader.data_base_address = u32::try_from(base_address).unwrap_or(u32::MAX);

    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(&leader.as_bytes());

    let mut offset = 0usize;
    for field in fields {
        let length = field.contents().len() + 1;
        out.extend_from_slice(field.tag().as_bytes());
        out.extend_from_slice(format!("{length:04}{offset:05}").as_bytes());
        offset += length;
    }
    out.push(FIELD_TERMINATOR);

    for field in fields {
        out.extend_from_slice(field.contents().as_bytes());
        out.push(FIELD_TERMINATOR);
    }
    out.push(RECORD_TERMINATOR);
    out
}
