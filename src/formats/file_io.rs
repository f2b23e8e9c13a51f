//! Opening MARC files and dispatching to the format readers and writers.

use super::{FileType, FormatReader, FormatWriter, WriterMode};
use crate::error::{MarcError, Result};
use crate::marcxml::{XmlReader, XmlWriter};
use crate::reader::BinaryReader;
use crate::record::Record;
use crate::writer::BinaryWriter;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug)]
enum ReaderKind {
    Binary(BinaryReader<BufReader<File>>),
    Xml(XmlReader<BufReader<File>>),
}

/// Reads records from a binary or MARC-XML file.
#[derive(Debug)]
pub struct Reader {
    path: PathBuf,
    inner: ReaderKind,
}

impl Reader {
    /// Open `path`, guessing its type from its contents if `file_type` is
    /// [`FileType::Auto`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its type guessed.
    pub fn open(path: impl AsRef<Path>, file_type: FileType) -> Result<Reader> {
        let path = path.as_ref();
        let file_type = file_type.resolve(path, true)?;
        let input = BufReader::new(File::open(path)?);
        let inner = match file_type {
            FileType::Xml => ReaderKind::Xml(XmlReader::new(input)),
            FileType::Binary | FileType::Auto => ReaderKind::Binary(BinaryReader::new(input)),
        };
        Ok(Reader {
            path: path.to_path_buf(),
            inner,
        })
    }

    /// Next record, or `None` at end of file.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed input or failed I/O.
    pub fn read(&mut self) -> Result<Option<Record>> {
        match &mut self.inner {
            ReaderKind::Binary(reader) => reader.read_record(),
            ReaderKind::Xml(reader) => reader.read_record(),
        }
    }

    /// Go back to the first record.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot seek.
    pub fn rewind(&mut self) -> Result<()> {
        match &mut self.inner {
            ReaderKind::Binary(reader) => reader.rewind(),
            ReaderKind::Xml(reader) => reader.rewind(),
        }
    }

    /// Offset of the next record, usable with [`seek`](Self::seek).
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::UnsupportedFileType`] for MARC-XML files.
    pub fn tell(&self) -> Result<u64> {
        match &self.inner {
            ReaderKind::Binary(reader) => Ok(reader.tell()),
            ReaderKind::Xml(_) => Err(self.xml_positioning_error()),
        }
    }

    /// Continue reading at `offset`, as returned by [`tell`](Self::tell).
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::UnsupportedFileType`] for MARC-XML files, or an I/O error.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        if let ReaderKind::Binary(reader) = &mut self.inner {
            return reader.seek(offset);
        }
        Err(self.xml_positioning_error())
    }

    /// The file being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The resolved type of the file.
    pub fn file_type(&self) -> FileType {
        match self.inner {
            ReaderKind::Binary(_) => FileType::Binary,
            ReaderKind::Xml(_) => FileType::Xml,
        }
    }

    fn xml_positioning_error(&self) -> MarcError {
        MarcError::UnsupportedFileType(format!(
            "\"{}\" is MARC-XML; only rewind is supported",
            self.path.display()
        ))
    }
}

impl FormatReader for Reader {
    fn read_record(&mut self) -> Result<Option<Record>> {
        self.read()
    }

    fn records_read(&self) -> Option<usize> {
        match &self.inner {
            ReaderKind::Binary(reader) => reader.records_read(),
            ReaderKind::Xml(reader) => reader.records_read(),
        }
    }
}

#[derive(Debug)]
enum WriterKind {
    Binary(BinaryWriter<BufWriter<File>>),
    Xml(XmlWriter<BufWriter<File>>),
}

/// Writes records to a binary or MARC-XML file.
#[derive(Debug)]
pub struct Writer {
    path: PathBuf,
    inner: WriterKind,
}

impl Writer {
    /// Create or open `path` for writing. [`FileType::Auto`] is resolved from
    /// the extension alone.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::UnsupportedFileType`] if the type cannot be guessed
    /// or MARC-XML is combined with [`WriterMode::Append`], or an I/O error.
    pub fn open(path: impl AsRef<Path>, file_type: FileType, mode: WriterMode) -> Result<Writer> {
        let path = path.as_ref();
        let file_type = file_type.resolve(path, false)?;
        if file_type == FileType::Xml && mode == WriterMode::Append {
            return Err(MarcError::UnsupportedFileType(format!(
                "can't append to MARC-XML file \"{}\"",
                path.display()
            )));
        }

        let file = match mode {
            WriterMode::Overwrite => File::create(path)?,
            WriterMode::Append => OpenOptions::new().create(true).append(true).open(path)?,
        };
        let output = BufWriter::new(file);
        let inner = match file_type {
            FileType::Xml => WriterKind::Xml(XmlWriter::new(output).with_indent(2)),
            FileType::Binary | FileType::Auto => WriterKind::Binary(BinaryWriter::new(output)),
        };
        Ok(Writer {
            path: path.to_path_buf(),
            inner,
        })
    }

    /// Write one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is rejected or I/O fails.
    pub fn write(&mut self, record: &Record) -> Result<()> {
        match &mut self.inner {
            WriterKind::Binary(writer) => writer.write_record(record),
            WriterKind::Xml(writer) => writer.write_record(record),
        }
    }

    /// Flush buffered output to the file.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        match &mut self.inner {
            WriterKind::Binary(writer) => writer.flush(),
            WriterKind::Xml(writer) => writer.flush(),
        }
    }

    /// Complete the file (closing the XML collection) and flush.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or flushing fails.
    pub fn finish(&mut self) -> Result<()> {
        match &mut self.inner {
            WriterKind::Binary(writer) => writer.finish(),
            WriterKind::Xml(writer) => writer.finish(),
        }
    }

    /// The file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The resolved type of the file.
    pub fn file_type(&self) -> FileType {
        match self.inner {
            WriterKind::Binary(_) => FileType::Binary,
            WriterKind::Xml(_) => FileType::Xml,
        }
    }
}

impl FormatWriter for Writer {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        self.write(record)
    }

    fn finish(&mut self) -> Result<()> {
        Writer::finish(self)
    }

    fn records_written(&self) -> Option<usize> {
        match &self.inner {
            WriterKind::Binary(writer) => writer.records_written(),
            WriterKind::Xml(writer) => writer.records_written(),
        }
    }
}

/// Exclusive advisory lock, released on drop.
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(file: File) -> Result<FileLock> {
        file.lock()?;
        Ok(FileLock { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(error = %e, "failed to release file lock");
        }
    }
}

/// Append `record` to a binary file shared with other processes.
///
/// Holds an exclusive advisory lock on the file while seeking to its end,
/// writing and flushing. The lock is released on every path, errors included.
///
/// # Errors
///
/// Returns [`MarcError::UnsupportedFileType`] for MARC-XML writers, or any
/// locking, write or flush error.
pub fn file_locked_write(writer: &mut Writer, record: &Record) -> Result<()> {
    let WriterKind::Binary(binary) = &mut writer.inner else {
        return Err(MarcError::UnsupportedFileType(format!(
            "locked writes need a binary file, \"{}\" is MARC-XML",
            writer.path.display()
        )));
    };

    let handle = binary.get_ref().get_ref().try_clone()?;
    let _lock = FileLock::acquire(handle)?;
    binary.get_mut().seek(SeekFrom::End(0))?;
    binary.write_record(record)?;
    binary.flush()
}
