//! A simplified XML event stream over `quick-xml`.
//!
//! Only what MARC-XML needs survives: opening tags with their attributes,
//! closing tags, character data and end of document. Adjacent text and CDATA
//! sections are merged, entities are resolved, and declarations, comments and
//! processing instructions are skipped. Element names lose their namespace
//! prefix. Every event can be related to a 1-based line number.

use crate::error::{MarcError, Result};
use indexmap::IndexMap;
use memchr::memchr_iter;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{BufRead, Read};

/// Counts newlines as the wrapped reader's bytes are consumed.
#[derive(Debug)]
pub(crate) struct LineCounter<R> {
    inner: R,
    newlines: u64,
}

impl<R> LineCounter<R> {
    pub(crate) fn new(inner: R) -> Self {
        LineCounter { inner, newlines: 0 }
    }

    /// Line of the next unconsumed byte.
    pub(crate) fn line(&self) -> u64 {
        self.newlines + 1
    }

    pub(crate) fn into_inner(self) -> R {
        self.inner
    }
}

fn count_newlines(bytes: &[u8]) -> u64 {
    memchr_iter(b'\n', bytes).count() as u64
}

impl<R: Read> Read for LineCounter<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.newlines += count_newlines(&buf[..n]);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for LineCounter<R> {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        // The buffer is already filled here, so this does no I/O.
        if let Ok(buffered) = self.inner.fill_buf() {
            self.newlines += count_newlines(&buffered[..amt.min(buffered.len())]);
        }
        self.inner.consume(amt);
    }
}

/// One step of an XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum XmlEvent {
    /// Start of an element; the name is stripped of any namespace prefix.
    OpeningTag {
        name: String,
        /// Attributes by qualified name, in document order.
        attributes: IndexMap<String, String>,
    },
    /// End of an element.
    ClosingTag { name: String },
    /// Character data, unescaped.
    Characters(String),
    /// No more input.
    EndOfDocument,
}

impl XmlEvent {
    /// Short description for error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            XmlEvent::OpeningTag { name, .. } => format!("opening tag <{name}>"),
            XmlEvent::ClosingTag { name } => format!("closing tag </{name}>"),
            XmlEvent::Characters(text) => format!("character data {:?}", truncate(text, 40)),
            XmlEvent::EndOfDocument => "end of document".to_string(),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(end, _)| &text[..end])
}

/// Pull parser producing [`XmlEvent`]s.
pub(crate) struct XmlEventSource<R: BufRead> {
    reader: Reader<LineCounter<R>>,
    buf: Vec<u8>,
    peeked: Option<XmlEvent>,
}

impl<R: BufRead> std::fmt::Debug for XmlEventSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlEventSource")
            .field("line", &self.line())
            .field("peeked", &self.peeked)
            .finish_non_exhaustive()
    }
}

impl<R: BufRead> XmlEventSource<R> {
    pub(crate) fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(LineCounter::new(input));
        reader.trim_text(false);
        reader.expand_empty_elements(true);
        XmlEventSource {
            reader,
            buf: Vec::new(),
            peeked: None,
        }
    }

    /// Line the parser has reached.
    pub(crate) fn line(&self) -> u64 {
        self.reader.get_ref().line()
    }

    /// Give back the input stream.
    pub(crate) fn into_inner(self) -> R {
        self.reader.into_inner().into_inner()
    }

    /// Next event, with adjacent character data merged into one event.
    pub(crate) fn next_event(&mut self) -> Result<XmlEvent> {
        if let Some(event) = self.peeked.take() {
            return Ok(event);
        }

        let mut text: Option<String> = None;
        loop {
            let Some(event) = self.read_raw()? else {
                continue;
            };
            match event {
                XmlEvent::Characters(chunk) => {
                    text.get_or_insert_with(String::new).push_str(&chunk);
                },
                other => {
                    return Ok(match text {
                        Some(text) => {
                            self.peeked = Some(other);
                            XmlEvent::Characters(text)
                        },
                        None => other,
                    });
                },
            }
        }
    }

    /// Next event that is not whitespace-only character data.
    pub(crate) fn next_significant_event(&mut self) -> Result<XmlEvent> {
        loop {
            match self.next_event()? {
                XmlEvent::Characters(text) if text.trim().is_empty() => {},
                event => return Ok(event),
            }
        }
    }

    /// Convert one `quick-xml` event; `None` for events that are skipped.
    fn read_raw(&mut self) -> Result<Option<XmlEvent>> {
        let event = self
            .reader
            .read_event_into(&mut self.buf)
            .map_err(|e| MarcError::xml(self.reader.get_ref().line(), e.to_string()))?;
        let line = self.reader.get_ref().line();

        let converted = match event {
            Event::Start(start) => Some(XmlEvent::OpeningTag {
                name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
                attributes: attributes_of(&start, line)?,
            }),
            Event::End(end) => Some(XmlEvent::ClosingTag {
                name: String::from_utf8_lossy(end.local_name().as_ref()).into_owned(),
            }),
            Event::Text(text) => Some(XmlEvent::Characters(
                text.unescape()
                    .map_err(|e| MarcError::xml(line, e.to_string()))?
                    .into_owned(),
            )),
            Event::CData(cdata) => Some(XmlEvent::Characters(
                String::from_utf8_lossy(&cdata.into_inner()).into_owned(),
            )),
            Event::Eof => Some(XmlEvent::EndOfDocument),
            _ => None,
        };
        self.buf.clear();
        Ok(converted)
    }
}

fn attributes_of(start: &BytesStart<'_>, line: u64) -> Result<IndexMap<String, String>> {
    let mut attributes = IndexMap::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| MarcError::xml(line, e.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| MarcError::xml(line, e.to_string()))?
            .into_owned();
        attributes.insert(key, value);
    }
    Ok(attributes)
}
