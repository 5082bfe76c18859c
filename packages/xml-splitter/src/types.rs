//! Core data types for the splitter.
//!
//! A record is parsed into an owned [`Element`] tree. Records are moved into
//! exactly one [`Chunk`] and dropped once that chunk is written.

use std::path::PathBuf;

/// A node inside a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element.
    Element(Element),

    /// Character data, stored unescaped.
    Text(String),

    /// CDATA section content.
    CData(String),

    /// Comment content (without the `<!--` and `-->` delimiters).
    Comment(String),
}

/// An XML element with its attributes and children in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified tag name, including any namespace prefix.
    pub name: String,

    /// Attributes in source order, values unescaped.
    pub attributes: Vec<(String, String)>,

    /// Child nodes in source order.
    pub children: Vec<Node>,
}

impl Element {
    /// Create an element with no attributes or children.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Append an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Append a child element.
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Append a text node.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Look up an attribute value by qualified name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over direct child elements.
    pub fn element_children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Number of direct child elements.
    pub fn element_count(&self) -> usize {
        self.element_children().count()
    }

    /// Concatenated direct text and CDATA content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) | Node::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Tag and attributes of the source document's root element.
///
/// Every chunk is wrapped in a copy of this root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSpec {
    /// Qualified tag name.
    pub name: String,

    /// Attributes in source order, including namespace declarations.
    pub attributes: Vec<(String, String)>,
}

/// Records assigned to one output file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    /// Records in document order.
    pub elements: Vec<Element>,

    /// Sum of the independently measured record sizes.
    pub accumulated_size: u64,
}

impl Chunk {
    /// Number of records in the chunk.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the chunk holds no records.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Outcome of writing one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    /// 1-based index in emission order.
    pub index: u64,

    /// Final path of the chunk file.
    pub path: PathBuf,

    /// Number of records in the chunk.
    pub element_count: usize,

    /// Accumulated record size used for the threshold decision.
    pub accumulated_size: u64,

    /// Actual size of the written file, wrapper and declaration included.
    pub bytes_written: u64,
}

/// Result of a complete split run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSummary {
    /// Root of the source document.
    pub root: RootSpec,

    /// Written chunks in emission order.
    pub chunks: Vec<ChunkInfo>,

    /// Total number of records read.
    pub element_count: usize,
}

impl SplitSummary {
    /// Number of chunk files written.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Total bytes written across all chunk files.
    pub fn total_bytes(&self) -> u64 {
        self.chunks.iter().map(|c| c.bytes_written).sum()
    }
}
