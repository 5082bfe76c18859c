//! Serialization of records and chunk documents.

use std::borrow::Cow;
use std::io::{self, Write};

use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::Writer;

use crate::types::{Element, Node, RootSpec};

/// Sink that only counts the bytes written to it.
#[derive(Debug, Default)]
struct ByteCounter {
    count: u64,
}

impl Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.count += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn emit<'a, W: Write>(writer: &mut Writer<W>, event: impl Into<Event<'a>>) -> io::Result<()> {
    writer.write_event(event).map_err(io::Error::other)
}

/// Escape markup characters, then replace the listed characters with
/// character references so a parser reads them back unchanged.
fn escape_with_refs<'a>(value: &'a str, refs: &[(char, &str)]) -> Cow<'a, str> {
    let escaped = escape(value);
    if !escaped.contains(|c: char| refs.iter().any(|(r, _)| *r == c)) {
        return escaped;
    }

    let mut out = String::with_capacity(escaped.len() + 8);
    for c in escaped.chars() {
        match refs.iter().find(|(r, _)| *r == c) {
            Some((_, reference)) => out.push_str(reference),
            None => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Parsers turn literal tabs and line breaks in attribute values into spaces.
fn escape_attribute(value: &str) -> Cow<'_, str> {
    escape_with_refs(value, &[('\n', "&#10;"), ('\r', "&#13;"), ('\t', "&#9;")])
}

/// Line-end normalization turns a bare `\r` in text into `\n`.
fn escape_text(value: &str) -> Cow<'_, str> {
    escape_with_refs(value, &[('\r', "&#13;")])
}

fn start_tag<'a>(name: &'a str, attributes: &'a [(String, String)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for (key, value) in attributes {
        start.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value: match escape_attribute(value) {
                Cow::Borrowed(v) => Cow::Borrowed(v.as_bytes()),
                Cow::Owned(v) => Cow::Owned(v.into_bytes()),
            },
        });
    }
    start
}

/// Write one element and its subtree.
///
/// Elements without children are written as empty tags (`<a/>`).
pub fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> io::Result<()> {
    let start = start_tag(&element.name, &element.attributes);

    if element.children.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(nested) => write_element(writer, nested)?,
            Node::Text(text) => {
                emit(writer, Event::Text(BytesText::from_escaped(escape_text(text))))?
            }
            Node::CData(data) => emit(writer, Event::CData(BytesCData::new(data.as_str())))?,
            Node::Comment(comment) => {
                emit(writer, Event::Comment(BytesText::from_escaped(comment.as_str())))?
            }
        }
    }
    emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

/// Serialized byte length of a single element, measured on its own.
///
/// The wrapping root and any separators are not part of the measurement.
pub fn serialized_len(element: &Element) -> io::Result<u64> {
    let mut writer = Writer::new(ByteCounter::default());
    write_element(&mut writer, element)?;
    Ok(writer.into_inner().count)
}

/// Write a standalone chunk document.
///
/// Layout: XML declaration, the root start tag, each element on its own
/// line, then the root end tag.
pub fn write_chunk_document<W: Write>(
    inner: W,
    root: &RootSpec,
    elements: &[Element],
) -> io::Result<W> {
    let mut writer = Writer::new(inner);

    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.get_mut().write_all(b"\n")?;

    emit(&mut writer, Event::Start(start_tag(&root.name, &root.attributes)))?;
    writer.get_mut().write_all(b"\n")?;

    for element in elements {
        write_element(&mut writer, element)?;
        writer.get_mut().write_all(b"\n")?;
    }

    emit(&mut writer, Event::End(BytesEnd::new(root.name.as_str())))?;
    writer.get_mut().write_all(b"\n")?;

    Ok(writer.into_inner())
}
