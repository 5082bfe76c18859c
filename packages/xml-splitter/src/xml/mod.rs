//! XML streaming input and chunk serialization.

mod reader;
mod serialize;

pub use reader::RecordReader;
pub use serialize::{serialized_len, write_chunk_document, write_element};
