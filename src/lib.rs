#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! ## Modules
//!
//! - [`record`]: the in-memory record, a leader plus tag-sorted fields
//! - [`field`] and [`subfields`]: field contents and their subfield runs
//! - [`tag`]: three-character field tags
//! - [`leader`]: the 24-byte leader
//! - [`reader`] and [`writer`]: ISO 2709 binary streams, including oversized-record chunking
//! - [`marcxml`]: MARC-XML streams
//! - [`formats`]: file-level reader and writer with type detection and file utilities
//! - [`local_block`]: locating and deleting `LOK` local data blocks
//! - [`repeatable`]: which tags may occur more than once
//! - [`checksum`]: order-independent record digests
//! - [`error`]: error types and result type

pub mod checksum;
pub mod error;
pub mod field;
/// File-level reading and writing in either serialization.
///
/// See the [`formats`] module documentation for type detection and the
/// format-agnostic traits.
pub mod formats;
pub mod leader;
pub mod local_block;
pub mod marcxml;
pub mod reader;
/// The MARC record and its mutation operations.
pub mod record;
pub mod repeatable;
pub mod subfields;
pub mod tag;
pub mod writer;
mod xml_events;

pub use error::{MarcError, Result};
pub use field::Field;
pub use formats::{FileType, FormatReader, FormatWriter, Reader, Writer, WriterMode};
pub use leader::{BibliographicLevel, Leader, RecordType, TypeOfRecord};
pub use local_block::LOCAL_BLOCK_TAG;
pub use marcxml::{XmlReader, XmlWriter};
pub use reader::BinaryReader;
pub use record::{Record, RecordBuilder};
pub use repeatable::is_repeatable_field;
pub use subfields::{Subfield, Subfields};
pub use tag::Tag;
pub use writer::BinaryWriter;
