//! Streaming reader that yields the top-level children of a document.
//!
//! Only the record currently being built is held in memory. The parse
//! buffer is cleared after every event, and a record is handed to the
//! caller as soon as its end tag is seen.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::error::{Result, SplitterError};
use crate::types::{Element, Node, RootSpec};

/// Owned form of one parse event.
#[derive(Debug)]
enum Token {
    Start {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Empty {
        name: String,
        attributes: Vec<(String, String)>,
    },
    End,
    Text(String),
    CData(String),
    Comment(String),
    /// Declarations, processing instructions and DOCTYPE.
    Other,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Inside the root, expecting records.
    InRoot,
    /// Root closed, only trailing misc content allowed.
    AfterRoot,
    Done,
}

fn is_blank(text: &str) -> bool {
    text.chars().all(|c| c.is_whitespace() || c == '\u{feff}')
}

fn decode_text(decoder: Decoder, bytes: &[u8]) -> std::result::Result<String, String> {
    decoder
        .decode(bytes)
        .map(Cow::into_owned)
        .map_err(|e| e.to_string())
}

fn decode_start(
    start: &BytesStart<'_>,
    decoder: Decoder,
) -> std::result::Result<(String, Vec<(String, String)>), String> {
    let name = decode_text(decoder, start.name().as_ref())?;
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = decode_text(decoder, attr.key.as_ref())?;
        let value = attr
            .decode_and_unescape_value(decoder)
            .map_err(|e| e.to_string())?;
        attributes.push((key, value.into_owned()));
    }
    Ok((name, attributes))
}

/// Convert an event into owned UTF-8, whatever the document's encoding.
fn tokenize(event: Event<'_>, decoder: Decoder) -> std::result::Result<Token, String> {
    let token = match event {
        Event::Start(start) => {
            let (name, attributes) = decode_start(&start, decoder)?;
            Token::Start { name, attributes }
        }
        Event::Empty(start) => {
            let (name, attributes) = decode_start(&start, decoder)?;
            Token::Empty { name, attributes }
        }
        Event::End(_) => Token::End,
        Event::Text(text) => Token::Text(text.unescape().map_err(|e| e.to_string())?.into_owned()),
        Event::CData(data) => Token::CData(data.decode().map_err(|e| e.to_string())?.into_owned()),
        Event::Comment(comment) => Token::Comment(decode_text(decoder, &comment)?),
        Event::Eof => Token::Eof,
        _ => Token::Other,
    };
    Ok(token)
}

/// Lazy, forward-only sequence of the root's direct child elements.
///
/// The root itself is read when the reader is created and is available
/// through [`RecordReader::root`]. Iteration stops after the root closes
/// and the rest of the input has been checked, or after the first error.
pub struct RecordReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    path: PathBuf,
    root: RootSpec,
    child_limit: Option<usize>,
    state: State,
}

impl RecordReader<BufReader<File>> {
    /// Open a file and read up to the root start tag.
    pub fn open(path: &Path) -> Result<Self> {
        let not_found = |source| SplitterError::NotFound {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(not_found)?;
        if !file.metadata().map_err(not_found)?.is_file() {
            return Err(not_found(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        Self::from_reader(BufReader::new(file), path)
    }
}

impl<R: BufRead> RecordReader<R> {
    /// Wrap any buffered source. `label` is used in error messages.
    pub fn from_reader(inner: R, label: impl Into<PathBuf>) -> Result<Self> {
        let mut reader = Reader::from_reader(inner);
        reader.config_mut().check_end_names = true;

        let mut this = Self {
            reader,
            buf: Vec::new(),
            path: label.into(),
            root: RootSpec::default(),
            child_limit: None,
            state: State::InRoot,
        };
        this.read_prolog()?;
        Ok(this)
    }

    /// Keep only the first `limit` direct children of every record.
    #[must_use]
    pub fn with_child_limit(mut self, limit: Option<usize>) -> Self {
        self.child_limit = limit;
        self
    }

    /// The source document's root element.
    pub fn root(&self) -> &RootSpec {
        &self.root
    }

    /// Byte offset of the parser in the input.
    pub fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    fn structural_error(&self, message: impl Into<String>) -> SplitterError {
        SplitterError::Parse {
            path: self.path.clone(),
            position: self.position(),
            message: message.into(),
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        let (token, position) = match self.reader.read_event_into(&mut self.buf) {
            Ok(event) => {
                // The decoder follows the encoding declared in the prolog.
                let decoder = self.reader.decoder();
                (tokenize(event, decoder), self.reader.buffer_position() as u64)
            }
            Err(quick_xml::Error::Io(source)) => {
                return Err(SplitterError::io(
                    self.path.clone(),
                    io::Error::new(source.kind(), source.to_string()),
                ));
            }
            Err(err) => (Err(err.to_string()), self.reader.error_position() as u64),
        };
        self.buf.clear();

        token.map_err(|message| SplitterError::Parse {
            path: self.path.clone(),
            position,
            message,
        })
    }

    fn read_prolog(&mut self) -> Result<()> {
        loop {
            match self.next_token()? {
                Token::Start { name, attributes } => {
                    self.root = RootSpec { name, attributes };
                    self.state = State::InRoot;
                    break;
                }
                Token::Empty { name, attributes } => {
                    self.root = RootSpec { name, attributes };
                    self.state = State::AfterRoot;
                    break;
                }
                Token::Text(text) if is_blank(&text) => {}
                Token::Comment(_) | Token::Other => {}
                Token::Eof => return Err(self.structural_error("document has no root element")),
                Token::End => return Err(self.structural_error("end tag before the root element")),
                Token::Text(_) | Token::CData(_) => {
                    return Err(self.structural_error("text before the root element"))
                }
            }
        }

        debug!(root = %self.root.name, attributes = self.root.attributes.len(), "Found root element");
        Ok(())
    }

    fn check_epilog(&mut self) -> Result<()> {
        loop {
            match self.next_token()? {
                Token::Eof => return Ok(()),
                Token::Text(text) if is_blank(&text) => {}
                Token::Comment(_) | Token::Other => {}
                Token::Start { name, .. } | Token::Empty { name, .. } => {
                    return Err(self.structural_error(format!(
                        "second root element <{name}> after </{}>",
                        self.root.name
                    )))
                }
                Token::End | Token::Text(_) | Token::CData(_) => {
                    return Err(self.structural_error(format!(
                        "content after the root element </{}>",
                        self.root.name
                    )))
                }
            }
        }
    }

    /// Build one record whose start tag has just been consumed.
    fn read_record(&mut self, record: Element) -> Result<Element> {
        let mut stack = vec![record];
        let mut kept = 0usize;
        // Nesting depth inside a direct child dropped by the child limit.
        let mut skip_depth = 0usize;

        loop {
            let token = self.next_token()?;

            if skip_depth > 0 {
                match token {
                    Token::Start { .. } => skip_depth += 1,
                    Token::End => skip_depth -= 1,
                    Token::Eof => return Err(self.unclosed(&stack)),
                    _ => {}
                }
                continue;
            }

            let at_record_level = stack.len() == 1;
            let full = at_record_level && self.child_limit.is_some_and(|limit| kept >= limit);

            match token {
                Token::Start { name, attributes } => {
                    if full {
                        skip_depth = 1;
                        continue;
                    }
                    if at_record_level {
                        kept += 1;
                    }
                    stack.push(Element {
                        name,
                        attributes,
                        children: Vec::new(),
                    });
                }
                Token::Empty { name, attributes } => {
                    if full {
                        continue;
                    }
                    if at_record_level {
                        kept += 1;
                    }
                    attach(
                        &mut stack,
                        Node::Element(Element {
                            name,
                            attributes,
                            children: Vec::new(),
                        }),
                    );
                }
                Token::End => {
                    let Some(finished) = stack.pop() else {
                        return Err(self.structural_error("unbalanced end tag"));
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(finished)),
                        None => return Ok(finished),
                    }
                }
                Token::Text(_) | Token::CData(_) | Token::Comment(_) if full => {}
                Token::Text(text) => attach(&mut stack, Node::Text(text)),
                Token::CData(data) => attach(&mut stack, Node::CData(data)),
                Token::Comment(comment) => attach(&mut stack, Node::Comment(comment)),
                Token::Other => {}
                Token::Eof => return Err(self.unclosed(&stack)),
            }
        }
    }

    fn unclosed(&self, stack: &[Element]) -> SplitterError {
        let name = stack
            .last()
            .map_or(self.root.name.as_str(), |e| e.name.as_str());
        self.structural_error(format!("unexpected end of document inside <{name}>"))
    }

    fn advance(&mut self) -> Result<Option<Element>> {
        loop {
            if self.state == State::AfterRoot {
                self.check_epilog()?;
                return Ok(None);
            }

            match self.next_token()? {
                Token::Start { name, attributes } => {
                    let record = Element {
                        name,
                        attributes,
                        children: Vec::new(),
                    };
                    return self.read_record(record).map(Some);
                }
                Token::Empty { name, attributes } => {
                    return Ok(Some(Element {
                        name,
                        attributes,
                        children: Vec::new(),
                    }));
                }
                Token::End => self.state = State::AfterRoot,
                // Text, comments and PIs between records do not belong to any record.
                Token::Text(_) | Token::CData(_) | Token::Comment(_) | Token::Other => {}
                Token::Eof => return Err(self.unclosed(&[])),
            }
        }
    }
}

fn attach(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == State::Done {
            return None;
        }

        match self.advance() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.state = State::Done;
                None
            }
            Err(e) => {
                self.state = State::Done;
                Some(Err(e))
            }
        }
    }
}

impl<R: BufRead> FusedIterator for RecordReader<R> {}
