//! Reading MARC records from binary streams.
//!
//! This module provides [`BinaryReader`] for reading ISO 2709 formatted MARC
//! records from any source that implements [`std::io::Read`].
//!
//! Records longer than the format allows are stored as several physical
//! records sharing one control number. The reader folds such chunks back into
//! a single logical record, so callers never see the split.
//!
//! # Examples
//!
//! Reading records from a file:
//!
//! ```no_run
//! use marcio::BinaryReader;
//! use std::fs::File;
//!
//! let file = File::open("records.mrc")?;
//! let mut reader = BinaryReader::new(file);
//!
//! while let Some(record) = reader.read_record()? {
//!     println!("{:?}", record.control_number());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Building an offset index and revisiting a record:
//!
//! ```no_run
//! use marcio::BinaryReader;
//! use std::fs::File;
//!
//! let mut reader = BinaryReader::new(File::open("records.mrc")?);
//! let mut offsets = Vec::new();
//! loop {
//!     let offset = reader.tell();
//!     if reader.read_record()?.is_none() {
//!         break;
//!     }
//!     offsets.push(offset);
//! }
//! reader.seek(offsets[0])?;
//! let first = reader.read_record()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::{MarcError, Result};
use crate::field::Field;
use crate::formats::FormatReader;
use crate::leader::{Leader, LEADER_LENGTH, RECORD_LENGTH_FIELD_LENGTH};
use crate::record::{Record, DIRECTORY_ENTRY_LENGTH, FIELD_TERMINATOR};
use crate::tag::Tag;
use std::borrow::Cow;
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, warn};

/// Reader for ISO 2709 binary MARC format.
///
/// `BinaryReader` yields one logical record per call. Physical chunks with the
/// same control number are merged and the result is sorted by tag.
#[derive(Debug)]
pub struct BinaryReader<R: Read> {
    reader: R,
    /// Stream offset just past the last physical record read.
    position: u64,
    accumulator: ChunkAccumulator,
    records_read: usize,
}

/// Folds physical chunks sharing a control number into logical records.
///
/// One chunk is always held back: a logical record is only complete once a
/// chunk with a different control number (or the end of input) shows up.
#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    pending: Option<(u64, Record)>,
}

impl ChunkAccumulator {
    /// Offer the chunk read at `offset`, or `None` at end of input.
    ///
    /// Returns the completed logical record, if `chunk` finished one.
    pub fn push(&mut self, offset: u64, chunk: Option<Record>) -> Option<Record> {
        let Some(chunk) = chunk else {
            return self.pending.take().map(|(_, record)| record);
        };

        match &mut self.pending {
            Some((_, pending)) if continues(pending, &chunk) => {
                debug!(
                    control_number = chunk.control_number().unwrap_or_default(),
                    fields = chunk.len(),
                    "merging continuation chunk"
                );
                pending.merge(&chunk);
                None
            },
            _ => self
                .pending
                .replace((offset, chunk))
                .map(|(_, record)| record),
        }
    }

    /// Stream offset of the held-back chunk.
    #[must_use]
    pub fn pending_offset(&self) -> Option<u64> {
        self.pending.as_ref().map(|(offset, _)| *offset)
    }

    /// Drop the held-back chunk.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}

/// A chunk continues `pending` only if both carry the same control number.
fn continues(pending: &Record, chunk: &Record) -> bool {
    matches!(
        (pending.control_number(), chunk.control_number()),
        (Some(a), Some(b)) if a == b
    )
}

impl<R: Read> BinaryReader<R> {
    /// Create a new binary reader.
    pub fn new(reader: R) -> Self {
        BinaryReader {
            reader,
            position: 0,
            accumulator: ChunkAccumulator::default(),
            records_read: 0,
        }
    }

    /// Read the next logical record.
    ///
    /// Returns `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if a physical record is malformed or an I/O error occurs.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        loop {
            let offset = self.position;
            let chunk = self.read_chunk()?;
            let at_end = chunk.is_none();
            if let Some(record) = self.accumulator.push(offset, chunk) {
                self.records_read += 1;
                return Ok(Some(record));
            }
            if at_end {
                return Ok(None);
            }
        }
    }

    /// Stream offset of the record the next [`read_record`](Self::read_record) returns.
    ///
    /// Passing this value to [`seek`](Self::seek) later re-reads that record.
    #[must_use]
    pub fn tell(&self) -> u64 {
        self.accumulator
            .pending_offset()
            .unwrap_or(self.position)
    }

    /// Read one physical record, or `None` at a clean end of input.
    fn read_chunk(&mut self) -> Result<Option<Record>> {
        let mut length_digits = [0u8; RECORD_LENGTH_FIELD_LENGTH];
        let got = read_fully(&mut self.reader, &mut length_digits)?;
        if got == 0 {
            return Ok(None);
        }
        if got < length_digits.len() {
            return Err(MarcError::MalformedLeader(format!(
                "failed to read record length at offset {}",
                self.position
            )));
        }

        let record_length = parse_number(&length_digits)
            .filter(|&length| length >= LEADER_LENGTH + 2)
            .ok_or_else(|| {
                MarcError::MalformedLeader(format!(
                    "invalid record length {:?} at offset {}",
                    String::from_utf8_lossy(&length_digits),
                    self.position
                ))
            })?;

        let mut buffer = vec![0u8; record_length];
        buffer[..RECORD_LENGTH_FIELD_LENGTH].copy_from_slice(&length_digits);
        if read_fully(&mut self.reader, &mut buffer[RECORD_LENGTH_FIELD_LENGTH..])?
            < record_length - RECORD_LENGTH_FIELD_LENGTH
        {
            return Err(MarcError::MalformedLeader(format!(
                "record at offset {} is truncated (expected {record_length} bytes)",
                self.position
            )));
        }
        self.position += record_length as u64;

        parse_record(&buffer).map(Some)
    }
}

impl<R: Read + Seek> BinaryReader<R> {
    /// Reposition to a record offset obtained from [`tell`](Self::tell).
    ///
    /// Any partially merged record is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying stream cannot seek.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.reader.seek(SeekFrom::Start(offset))?;
        self.position = offset;
        self.accumulator.clear();
        Ok(())
    }

    /// Restart from the beginning of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying stream cannot seek.
    pub fn rewind(&mut self) -> Result<()> {
        self.seek(0)
    }
}

impl<R: Read + std::fmt::Debug> FormatReader for BinaryReader<R> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        BinaryReader::read_record(self)
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

/// Parse one physical binary record.
///
/// The directory is walked from the end of the leader up to the
/// end-of-directory byte; each field's contents run from its offset up to the
/// first field terminator within the length the directory gives it. Fields are
/// returned sorted by tag.
///
/// # Errors
///
/// Returns [`MarcError::MalformedLeader`] if the leader is unusable or declares
/// more bytes than `bytes` holds, and [`MarcError::MalformedDirectory`] if a
/// directory entry is malformed or points outside the data segment.
pub fn parse_record(bytes: &[u8]) -> Result<Record> {
    let leader = Leader::from_bytes(bytes)?;
    leader.validate_for_reading()?;

    let record_length = leader.record_length as usize;
    let base_address = leader.data_base_address as usize;
    if record_length > bytes.len() {
        return Err(MarcError::MalformedLeader(format!(
            "record length {record_length} exceeds the {} bytes available",
            bytes.len()
        )));
    }
    let data = &bytes[base_address..record_length];

    let directory_area = &bytes[LEADER_LENGTH..base_address.saturating_sub(1).max(LEADER_LENGTH)];
    let directory_len = directory_area
        .iter()
        .position(|&b| b == FIELD_TERMINATOR)
        .unwrap_or(directory_area.len());
    let directory = &directory_area[..directory_len];
    if directory.len() % DIRECTORY_ENTRY_LENGTH != 0 {
        return Err(MarcError::MalformedDirectory(format!(
            "directory length {} is not a multiple of {DIRECTORY_ENTRY_LENGTH}",
            directory.len()
        )));
    }

    let mut fields = Vec::with_capacity(directory.len() / DIRECTORY_ENTRY_LENGTH);
    for entry in directory.chunks_exact(DIRECTORY_ENTRY_LENGTH) {
        let tag = Tag::from_bytes([entry[0], entry[1], entry[2]]).map_err(|_| {
            MarcError::MalformedDirectory(format!(
                "invalid tag {:?} in directory",
                String::from_utf8_lossy(&entry[0..3])
            ))
        })?;
        let (Some(field_length), Some(offset)) =
            (parse_number(&entry[3..7]), parse_number(&entry[7..12]))
        else {
            return Err(MarcError::MalformedDirectory(format!(
                "non-numeric length or offset in directory entry {:?}",
                String::from_utf8_lossy(entry)
            )));
        };
        if field_length == 0 || offset + field_length > data.len() {
            return Err(MarcError::MalformedDirectory(format!(
                "field {tag} (offset {offset}, length {field_length}) lies outside the {}-byte data segment",
                data.len()
            )));
        }

        let span = &data[offset..offset + field_length];
        let contents_len = span
            .iter()
            .position(|&b| b == FIELD_TERMINATOR)
            .unwrap_or(span.len());
        let contents = String::from_utf8_lossy(&span[..contents_len]);
        if let Cow::Owned(_) = contents {
            warn!(%tag, "field contents are not valid UTF-8, invalid bytes replaced");
        }
        fields.push(Field::new(tag, contents));
    }

    let mut record = Record::from_parts(leader, fields);
    record.sort_fields();
    Ok(record)
}

/// Decimal value of ASCII digits.
fn parse_number(digits: &[u8]) -> Option<usize> {
    digits.iter().try_fold(0usize, |acc, &b| {
        b.is_ascii_digit()
            .then(|| acc * 10 + usize::from(b - b'0'))
    })
}

/// Read until `buf` is full or the stream ends; returns the bytes read.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {},
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
