//! Size-bounded chunking of a document's top-level records.
//!
//! Records flow from [`crate::xml::RecordReader`] into a [`ChunkAccumulator`],
//! which decides per [`FlushPolicy`] when a chunk is complete, and each
//! complete chunk is persisted by a [`ChunkWriter`].

mod accumulator;
mod engine;
mod writer;

pub use accumulator::{ChunkAccumulator, FlushPolicy};
pub use engine::{split_xml, split_xml_with};
pub use writer::ChunkWriter;
