//! Format reader and writer traits for MARC records.
//!
//! [`BinaryReader`](crate::BinaryReader), [`XmlReader`](crate::XmlReader) and
//! the file-level [`Reader`](super::Reader) implement [`FormatReader`]; their
//! writer counterparts implement [`FormatWriter`]. Code written against the
//! traits converts between serializations without knowing either one.
//!
//! # Example
//!
//! ```
//! use marcio::formats::{FormatReader, FormatWriter};
//! use marcio::{BibliographicLevel, BinaryReader, BinaryWriter, Record, TypeOfRecord, XmlReader, XmlWriter};
//! use std::io::Cursor;
//!
//! fn convert<R: FormatReader, W: FormatWriter>(reader: &mut R, writer: &mut W) -> marcio::Result<usize> {
//!     let mut count = 0;
//!     while let Some(record) = reader.read_record()? {
//!         writer.write_record(&record)?;
//!         count += 1;
//!     }
//!     writer.finish()?;
//!     Ok(count)
//! }
//!
//! let record = Record::new(TypeOfRecord::LanguageMaterial, BibliographicLevel::MonographOrItem, Some("c1"));
//! let mut binary = BinaryWriter::new(Vec::new());
//! binary.write_record(&record)?;
//!
//! let mut reader = BinaryReader::new(Cursor::new(binary.into_inner()));
//! let mut writer = XmlWriter::new(Vec::new());
//! assert_eq!(convert(&mut reader, &mut writer)?, 1);
//!
//! let mut back = XmlReader::new(Cursor::new(writer.into_inner()?));
//! assert_eq!(back.read_record()?.unwrap().control_number(), Some("c1"));
//! # Ok::<(), marcio::MarcError>(())
//! ```

use crate::error::Result;
use crate::record::Record;

/// A source of MARC records.
///
/// Records come back with their fields sorted by tag, the order every
/// reader in this crate establishes.
pub trait FormatReader: std::fmt::Debug {
    /// Read the next record from the source.
    ///
    /// Returns `Ok(None)` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the source contains malformed data or I/O fails.
    fn read_record(&mut self) -> Result<Option<Record>>;

    /// Read all remaining records into a vector.
    ///
    /// # Errors
    ///
    /// Returns the first read error; records read before it are discarded.
    fn read_all(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Number of records read so far, if tracked.
    fn records_read(&self) -> Option<usize> {
        None
    }
}

/// A sink for MARC records.
///
/// Call [`finish`](Self::finish) when done: the XML writer only closes its
/// `<collection>` element there.
pub trait FormatWriter: std::fmt::Debug {
    /// Write a single record, fields in their current order.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or the output fails.
    fn write_record(&mut self, record: &Record) -> Result<()>;

    /// Write multiple records to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if any record cannot be written.
    fn write_batch(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Complete the output and flush it. Later writes fail.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or finalizing the output fails.
    fn finish(&mut self) -> Result<()>;

    /// Number of records written so far, if tracked.
    fn records_written(&self) -> Option<usize> {
        None
    }
}

/// Extension trait providing iterator-style access for format readers.
///
/// This trait is automatically implemented for all types implementing [`FormatReader`].
pub trait FormatReaderExt: FormatReader {
    /// Iterate over the remaining records.
    ///
    /// ```
    /// use marcio::formats::FormatReaderExt;
    /// use marcio::XmlReader;
    /// use std::io::Cursor;
    ///
    /// let mut reader = XmlReader::new(Cursor::new("<collection/>"));
    /// assert_eq!(reader.records().count(), 0);
    /// ```
    fn records(&mut self) -> RecordIterator<'_, Self>
    where
        Self: Sized,
    {
        RecordIterator { reader: self }
    }
}

impl<T: FormatReader> FormatReaderExt for T {}

/// Iterator adapter for [`FormatReader`].
///
/// Created by the [`records`](FormatReaderExt::records) method.
#[derive(Debug)]
pub struct RecordIterator<'a, R: FormatReader> {
    reader: &'a mut R,
}

impl<R: FormatReader> Iterator for RecordIterator<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
