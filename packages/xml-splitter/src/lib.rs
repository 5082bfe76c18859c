//! XML Splitter - Split large XML documents into size-bounded chunk files.
//!
//! The source document is streamed once. Each direct child of the root (a
//! "record") is parsed, measured and assigned to a chunk; every chunk is
//! written as a standalone document wrapped in a copy of the source root.
//!
//! # Example
//!
//! ```
//! use xml_splitter::{split_xml, SplitConfig};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let input = dir.path().join("books.xml");
//! std::fs::write(&input, "<catalog><book id=\"1\"/><book id=\"2\"/></catalog>").unwrap();
//!
//! let config = SplitConfig::new(&input, dir.path().join("chunks")).with_chunk_size_mb(1.0);
//! let summary = split_xml(&config).unwrap();
//!
//! assert_eq!(summary.chunk_count(), 1);
//! assert_eq!(summary.element_count, 2);
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Configuration constants, `SplitConfig` and file naming
//! - [`types`]: Core data types (Element, Chunk, ChunkInfo, etc.)
//! - [`error`]: Error types and Result alias
//! - [`xml`]: Streaming record reader and serialization
//! - [`splitting`]: Accumulator, flush policy, chunk writer and main loop
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod splitting;
pub mod types;
pub mod xml;

// Re-export main functions
pub use splitting::{split_xml, split_xml_with};

// Re-export commonly used items
pub use config::SplitConfig;
pub use error::{Result, SplitterError};
pub use splitting::FlushPolicy;
pub use types::{Chunk, ChunkInfo, Element, Node, RootSpec, SplitSummary};
