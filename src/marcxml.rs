//! MARC-XML reading and writing.
//!
//! Documents follow the Library of Congress MARC-XML schema
//! (<https://www.loc.gov/standards/marcxml/>): a `collection` of `record`
//! elements, each with a `leader`, then `controlfield` elements, then
//! `datafield` elements whose `subfield` children carry a `code` attribute.
//!
//! Both default-namespace (`<collection xmlns="...">`) and prefixed
//! (`<marc:collection xmlns:marc="...">`) documents are read. Any other
//! namespace bound to `xmlns` or `xmlns:marc` is rejected. A document whose
//! root is a single `record` is accepted too.
//!
//! # Examples
//!
//! ```
//! use marcio::{BibliographicLevel, Record, TypeOfRecord, XmlReader, XmlWriter};
//! use std::io::Cursor;
//!
//! let record = Record::new(TypeOfRecord::LanguageMaterial, BibliographicLevel::MonographOrItem, Some("u1"));
//!
//! let mut writer = XmlWriter::new(Vec::new()).with_indent(2);
//! writer.write_record(&record)?;
//! let xml = writer.into_inner()?;
//!
//! let mut reader = XmlReader::new(Cursor::new(xml));
//! let read_back = reader.read_record()?.unwrap();
//! assert_eq!(read_back.control_number(), Some("u1"));
//! # Ok::<(), marcio::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::field::Field;
use crate::formats::{FormatReader, FormatWriter};
use crate::leader::{Leader, LEADER_LENGTH};
use crate::record::Record;
use crate::subfields::{Subfield, Subfields};
use crate::tag::Tag;
use crate::xml_events::{XmlEvent, XmlEventSource};
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::{BufRead, Seek, SeekFrom, Write};
use tracing::warn;

/// The MARC-XML namespace URI.
pub const MARCXML_NAMESPACE: &str = "http://www.loc.gov/MARC21/slim";

/// Namespace-declaring attributes that must name [`MARCXML_NAMESPACE`].
const CHECKED_NAMESPACE_ATTRIBUTES: [&str; 2] = ["xmlns", "xmlns:marc"];

/// Where the reader is in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentState {
    /// Nothing read yet.
    Start,
    /// Inside `<collection>`.
    InCollection,
    /// The root element is a lone `<record>` that has not been read yet.
    SingleRecord,
    /// Root element closed.
    Finished,
}

/// Reader for MARC-XML documents.
///
/// # Examples
///
/// ```
/// use marcio::XmlReader;
/// use std::io::Cursor;
///
/// let xml = r#"<collection xmlns="http://www.loc.gov/MARC21/slim">
///   <record>
///     <leader>00000nam a2200000   4500</leader>
///     <controlfield tag="001">123</controlfield>
///     <datafield tag="245" ind1="1" ind2="0"><subfield code="a">Title</subfield></datafield>
///   </record>
/// </collection>"#;
///
/// let mut reader = XmlReader::new(Cursor::new(xml));
/// let record = reader.read_record()?.unwrap();
/// assert_eq!(record.control_number(), Some("123"));
/// assert!(reader.read_record()?.is_none());
/// # Ok::<(), marcio::MarcError>(())
/// ```
#[derive(Debug)]
pub struct XmlReader<R: BufRead> {
    source: Option<XmlEventSource<R>>,
    state: DocumentState,
    records_read: usize,
}

impl<R: BufRead> XmlReader<R> {
    /// Create a reader over a MARC-XML document.
    pub fn new(input: R) -> Self {
        XmlReader {
            source: Some(XmlEventSource::new(input)),
            state: DocumentState::Start,
            records_read: 0,
        }
    }

    /// Read the next record, or `None` once the root element is closed.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::MalformedXml`] naming the line of the first
    /// structural problem. The reader yields nothing further after an error.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        let result = self.read_next();
        if result.is_err() {
            self.state = DocumentState::Finished;
        }
        result
    }

    fn read_next(&mut self) -> Result<Option<Record>> {
        let state = self.state;
        let source = self.source_mut()?;

        let next_state = match state {
            DocumentState::Finished => return Ok(None),
            DocumentState::Start => skip_to_root(source)?,
            other => other,
        };

        let record = match next_state {
            DocumentState::SingleRecord => {
                let record = parse_record(source)?;
                expect_end_of_document(source)?;
                Some(record)
            },
            DocumentState::InCollection => match source.next_significant_event()? {
                XmlEvent::OpeningTag { name, attributes } if name == "record" => {
                    check_namespaces(&attributes, source.line())?;
                    Some(parse_record(source)?)
                },
                XmlEvent::ClosingTag { name } if name == "collection" => None,
                other => {
                    return Err(unexpected(source, &other, "<record> or </collection>"));
                },
            },
            DocumentState::Start | DocumentState::Finished => None,
        };

        self.state = match (&record, next_state) {
            (Some(_), DocumentState::InCollection) => DocumentState::InCollection,
            _ => DocumentState::Finished,
        };
        if record.is_some() {
            self.records_read += 1;
        }
        Ok(record)
    }

    fn source_mut(&mut self) -> Result<&mut XmlEventSource<R>> {
        self.source.as_mut().ok_or_else(|| {
            MarcError::StreamIo(std::io::Error::other(
                "XML reader lost its input after a failed rewind",
            ))
        })
    }
}

impl<R: BufRead + Seek> XmlReader<R> {
    /// Restart from the beginning of the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying stream cannot seek.
    pub fn rewind(&mut self) -> Result<()> {
        let source = self.source.take().ok_or_else(|| {
            MarcError::StreamIo(std::io::Error::other("XML reader has no input"))
        })?;
        let mut input = source.into_inner();
        input.seek(SeekFrom::Start(0))?;
        self.source = Some(XmlEventSource::new(input));
        self.state = DocumentState::Start;
        self.records_read = 0;
        Ok(())
    }
}

impl<R: BufRead + std::fmt::Debug> FormatReader for XmlReader<R> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        XmlReader::read_record(self)
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }
}

fn unexpected<R: BufRead>(source: &XmlEventSource<R>, found: &XmlEvent, expected: &str) -> MarcError {
    MarcError::xml(
        source.line(),
        format!("expected {expected}, found {}", found.describe()),
    )
}

fn check_namespaces(attributes: &IndexMap<String, String>, line: u64) -> Result<()> {
    for key in CHECKED_NAMESPACE_ATTRIBUTES {
        if let Some(namespace) = attributes.get(key) {
            if namespace != MARCXML_NAMESPACE {
                return Err(MarcError::xml(
                    line,
                    format!("unsupported namespace {key}=\"{namespace}\""),
                ));
            }
        }
    }
    Ok(())
}

/// Consume events up to the root element and classify it.
fn skip_to_root<R: BufRead>(source: &mut XmlEventSource<R>) -> Result<DocumentState> {
    match source.next_significant_event()? {
        XmlEvent::OpeningTag { name, attributes } if name == "collection" => {
            check_namespaces(&attributes, source.line())?;
            Ok(DocumentState::InCollection)
        },
        XmlEvent::OpeningTag { name, attributes } if name == "record" => {
            check_namespaces(&attributes, source.line())?;
            Ok(DocumentState::SingleRecord)
        },
        other => Err(unexpected(source, &other, "<collection> or <record>")),
    }
}

fn expect_end_of_document<R: BufRead>(source: &mut XmlEventSource<R>) -> Result<()> {
    match source.next_significant_event()? {
        XmlEvent::EndOfDocument => Ok(()),
        other => Err(unexpected(source, &other, "end of document")),
    }
}

fn expect_opening<R: BufRead>(
    source: &mut XmlEventSource<R>,
    expected: &str,
) -> Result<IndexMap<String, String>> {
    match source.next_significant_event()? {
        XmlEvent::OpeningTag { name, attributes } if name == expected => Ok(attributes),
        other => Err(unexpected(source, &other, &format!("<{expected}>"))),
    }
}

fn expect_closing<R: BufRead>(source: &mut XmlEventSource<R>, expected: &str) -> Result<()> {
    match source.next_significant_event()? {
        XmlEvent::ClosingTag { name } if name == expected => Ok(()),
        other => Err(unexpected(source, &other, &format!("</{expected}>"))),
    }
}

/// Character data of an element whose opening tag was just read, through its closing tag.
///
/// Returns an empty string for an element without content.
fn element_text<R: BufRead>(source: &mut XmlEventSource<R>, element: &str) -> Result<String> {
    match source.next_event()? {
        XmlEvent::Characters(text) => {
            expect_closing(source, element)?;
            Ok(text)
        },
        XmlEvent::ClosingTag { name } if name == element => Ok(String::new()),
        other => Err(unexpected(source, &other, &format!("text or </{element}>"))),
    }
}

fn required_attribute<'a>(
    attributes: &'a IndexMap<String, String>,
    key: &str,
    element: &str,
    line: u64,
) -> Result<&'a str> {
    attributes
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| MarcError::xml(line, format!("<{element}> is missing the \"{key}\" attribute")))
}

fn single_char(value: &str, key: &str, line: u64) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(MarcError::xml(
            line,
            format!("attribute \"{key}\" must be a single character, found {value:?}"),
        )),
    }
}

fn parse_tag(attributes: &IndexMap<String, String>, element: &str, line: u64) -> Result<Tag> {
    let raw = required_attribute(attributes, "tag", element, line)?;
    Tag::new(raw).map_err(|_| MarcError::xml(line, format!("invalid tag {raw:?} on <{element}>")))
}

/// Leader text with blank numeric positions replaced by zeros.
fn parse_leader(text: &str, line: u64) -> Result<Leader> {
    if text.len() != LEADER_LENGTH || !text.is_ascii() {
        return Err(MarcError::xml(
            line,
            format!("leader must be {LEADER_LENGTH} ASCII characters, found {text:?}"),
        ));
    }
    let mut bytes = text.as_bytes().to_vec();
    for positions in [0..5, 12..17] {
        if bytes[positions.clone()].iter().all(|&b| b == b' ') {
            bytes[positions].fill(b'0');
        }
    }
    Leader::from_bytes(&bytes).map_err(|e| MarcError::xml(line, e.to_string()))
}

/// Parse one `<record>` whose opening tag has been consumed.
fn parse_record<R: BufRead>(source: &mut XmlEventSource<R>) -> Result<Record> {
    expect_opening(source, "leader")?;
    let line = source.line();
    let leader_text = element_text(source, "leader")?;
    let leader = parse_leader(&leader_text, line)?;

    let mut fields = Vec::new();
    let mut seen_data_field = false;
    loop {
        match source.next_significant_event()? {
            XmlEvent::OpeningTag { name, attributes } if name == "controlfield" => {
                let line = source.line();
                if seen_data_field {
                    return Err(MarcError::xml(line, "<controlfield> after <datafield>"));
                }
                let tag = parse_tag(&attributes, "controlfield", line)?;
                let contents = element_text(source, "controlfield")?;
                if contents.is_empty() {
                    warn!(%tag, line, "dropping empty control field");
                } else {
                    fields.push(Field::new(tag, contents));
                }
            },
            XmlEvent::OpeningTag { name, attributes } if name == "datafield" => {
                seen_data_field = true;
                let line = source.line();
                let tag = parse_tag(&attributes, "datafield", line)?;
                let indicator1 =
                    single_char(required_attribute(&attributes, "ind1", "datafield", line)?, "ind1", line)?;
                let indicator2 =
                    single_char(required_attribute(&attributes, "ind2", "datafield", line)?, "ind2", line)?;
                let subfields = parse_subfields(source, tag)?;
                if subfields.is_empty() {
                    warn!(%tag, line, "dropping data field without subfields");
                } else {
                    fields.push(Field::data(tag, indicator1, indicator2, &subfields));
                }
            },
            XmlEvent::ClosingTag { name } if name == "record" => break,
            other => {
                return Err(unexpected(
                    source,
                    &other,
                    "<controlfield>, <datafield> or </record>",
                ));
            },
        }
    }

    let mut record = Record::from_parts(leader, fields);
    record.sort_fields();
    Ok(record)
}

/// Subfields of a `<datafield>` through its closing tag. Empty subfields are dropped.
fn parse_subfields<R: BufRead>(source: &mut XmlEventSource<R>, tag: Tag) -> Result<Subfields> {
    let mut subfields = Subfields::new();
    loop {
        match source.next_significant_event()? {
            XmlEvent::OpeningTag { name, attributes } if name == "subfield" => {
                let line = source.line();
                let code = single_char(
                    required_attribute(&attributes, "code", "subfield", line)?,
                    "code",
                    line,
                )?;
                let value = element_text(source, "subfield")?;
                if value.is_empty() {
                    warn!(%tag, %code, line, "dropping empty subfield");
                } else {
                    subfields.push(code, value);
                }
            },
            XmlEvent::ClosingTag { name } if name == "datafield" => return Ok(subfields),
            other => return Err(unexpected(source, &other, "<subfield> or </datafield>")),
        }
    }
}

/// Writer for MARC-XML documents.
///
/// The `<collection>` start tag is written with the first record; the end tag
/// by [`finish`](Self::finish), or on drop if `finish` was never called.
pub struct XmlWriter<W: Write> {
    writer: Option<quick_xml::Writer<W>>,
    started: bool,
    finished: bool,
    records_written: usize,
}

impl<W: Write> XmlWriter<W> {
    /// Create a writer producing compact output.
    pub fn new(output: W) -> Self {
        XmlWriter {
            writer: Some(quick_xml::Writer::new(output)),
            started: false,
            finished: false,
            records_written: 0,
        }
    }

    /// Indent nested elements by `spaces`. Only takes effect before the first record.
    #[must_use]
    pub fn with_indent(mut self, spaces: usize) -> Self {
        if !self.started {
            if let Some(writer) = self.writer.take() {
                self.writer = Some(quick_xml::Writer::new_with_indent(
                    writer.into_inner(),
                    b' ',
                    spaces,
                ));
            }
        }
        self
    }

    /// Write one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer was finished or the output fails.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        if self.finished {
            return Err(MarcError::InvalidRecord(
                "Cannot write to a finished writer".to_string(),
            ));
        }
        self.start_document()?;
        let writer = self.xml()?;

        emit(writer, Event::Start(BytesStart::new("record")))?;
        emit_text_element(writer, BytesStart::new("leader"), &record.leader().to_leader_string())?;

        for field in record.fields() {
            let tag = field.tag();
            if field.is_control_field() {
                let start = BytesStart::new("controlfield").with_attributes([("tag", tag.as_str())]);
                emit_text_element(writer, start, field.contents())?;
                continue;
            }

            let indicator1 = field.indicator1().unwrap_or(' ').to_string();
            let indicator2 = field.indicator2().unwrap_or(' ').to_string();
            let start = BytesStart::new("datafield").with_attributes([
                ("tag", tag.as_str()),
                ("ind1", indicator1.as_str()),
                ("ind2", indicator2.as_str()),
            ]);
            emit(writer, Event::Start(start))?;
            for Subfield { code, value } in &field.subfields() {
                let code = code.to_string();
                let start = BytesStart::new("subfield").with_attributes([("code", code.as_str())]);
                emit_text_element(writer, start, value)?;
            }
            emit(writer, Event::End(BytesEnd::new("datafield")))?;
        }

        emit(writer, Event::End(BytesEnd::new("record")))?;
        self.records_written += 1;
        Ok(())
    }

    /// Flush buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.xml()?.get_mut().flush()?;
        Ok(())
    }

    /// Close the document and flush.
    ///
    /// # Errors
    ///
    /// Returns an error if the output fails.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.start_document()?;
        emit(self.xml()?, Event::End(BytesEnd::new("collection")))?;
        self.finished = true;
        self.flush()
    }

    /// Finish the document and return the output.
    ///
    /// # Errors
    ///
    /// Returns an error if closing the document fails.
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        let writer = self.writer.take();
        writer
            .map(quick_xml::Writer::into_inner)
            .ok_or_else(|| MarcError::StreamIo(std::io::Error::other("XML writer has no output")))
    }

    /// The underlying output.
    ///
    /// # Errors
    ///
    /// Returns an error if the output was already taken.
    pub fn get_mut(&mut self) -> Result<&mut W> {
        Ok(self.xml()?.get_mut())
    }

    fn xml(&mut self) -> Result<&mut quick_xml::Writer<W>> {
        self.writer
            .as_mut()
            .ok_or_else(|| MarcError::StreamIo(std::io::Error::other("XML writer has no output")))
    }

    fn start_document(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        let writer = self.xml()?;
        emit(writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let start = BytesStart::new("collection").with_attributes([("xmlns", MARCXML_NAMESPACE)]);
        emit(writer, Event::Start(start))?;
        self.started = true;
        Ok(())
    }
}

impl<W: Write> std::fmt::Debug for XmlWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlWriter")
            .field("started", &self.started)
            .field("finished", &self.finished)
            .field("records_written", &self.records_written)
            .finish_non_exhaustive()
    }
}

impl<W: Write> Drop for XmlWriter<W> {
    fn drop(&mut self) {
        if !self.finished && self.writer.is_some() {
            if let Err(e) = self.finish() {
                warn!(error = %e, "failed to close MARC-XML collection");
            }
        }
    }
}

impl<W: Write> FormatWriter for XmlWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        XmlWriter::write_record(self, record)
    }

    fn finish(&mut self) -> Result<()> {
        XmlWriter::finish(self)
    }

    fn records_written(&self) -> Option<usize> {
        Some(self.records_written)
    }
}

fn emit<W: Write>(writer: &mut quick_xml::Writer<W>, event: Event<'_>) -> Result<()> {
    writer.write_event(event).map_err(write_error)
}

fn emit_text_element<W: Write>(
    writer: &mut quick_xml::Writer<W>,
    start: BytesStart<'_>,
    text: &str,
) -> Result<()> {
    let end = BytesEnd::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    emit(writer, Event::Start(start))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(end))
}

fn write_error(error: quick_xml::Error) -> MarcError {
    match error {
        quick_xml::Error::Io(io) => MarcError::StreamIo(std::io::Error::new(io.kind(), io.to_string())),
        other => MarcError::StreamIo(std::io::Error::other(other.to_string())),
    }
}
