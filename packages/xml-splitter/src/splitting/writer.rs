//! Chunk file writer.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::chunk_file_name;
use crate::error::{Result, SplitterError};
use crate::types::{Chunk, ChunkInfo, Element, RootSpec};
use crate::xml::write_chunk_document;

/// Writes chunks as `chunk_<index>.xml` files, numbered from 1.
#[derive(Debug)]
pub struct ChunkWriter {
    output_dir: PathBuf,
    root: RootSpec,
    index_width: usize,
    next_index: u64,
}

impl ChunkWriter {
    /// Create a writer for an existing output directory.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, root: RootSpec, index_width: usize) -> Self {
        Self {
            output_dir: output_dir.into(),
            root,
            index_width,
            next_index: 1,
        }
    }

    /// Index the next written chunk will get.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Final path of the chunk with the given index.
    pub fn chunk_path(&self, index: u64) -> PathBuf {
        self.output_dir.join(chunk_file_name(index, self.index_width))
    }

    /// Write a chunk as a standalone document.
    ///
    /// Uses atomic write pattern: writes to a hidden temp file in the output
    /// directory, syncs it to disk, then renames it into place. On failure
    /// the temp file is removed and the index is not consumed.
    pub fn write(&mut self, chunk: &Chunk) -> Result<ChunkInfo> {
        let index = self.next_index;
        let path = self.chunk_path(index);

        if chunk.is_empty() {
            return Err(SplitterError::io(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "refusing to write an empty chunk"),
            ));
        }

        let file_name = chunk_file_name(index, self.index_width);
        let temp_path = self.output_dir.join(format!(".{file_name}.tmp"));

        let bytes_written = match write_atomically(&temp_path, &path, &self.root, &chunk.elements)
        {
            Ok(bytes) => bytes,
            Err(e) => {
                // Best effort cleanup.
                let _ = fs::remove_file(&temp_path);
                return Err(SplitterError::io(path, e));
            }
        };

        self.next_index += 1;

        info!(
            chunk = %path.display(),
            records = chunk.len(),
            accumulated = chunk.accumulated_size,
            bytes = bytes_written,
            "Chunk written"
        );

        Ok(ChunkInfo {
            index,
            path,
            element_count: chunk.len(),
            accumulated_size: chunk.accumulated_size,
            bytes_written,
        })
    }
}

fn write_atomically(
    temp_path: &Path,
    final_path: &Path,
    root: &RootSpec,
    elements: &[Element],
) -> io::Result<u64> {
    let file = File::create(temp_path)?;
    let out = write_chunk_document(BufWriter::new(file), root, elements)?;
    let file = out.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    let bytes = file.metadata()?.len();
    drop(file);

    // On Windows, rename fails if the destination already exists
    #[cfg(target_os = "windows")]
    if final_path.exists() {
        fs::remove_file(final_path)?;
    }

    fs::rename(temp_path, final_path)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn root() -> RootSpec {
        RootSpec {
            name: "catalog".to_string(),
            attributes: vec![("lang".to_string(), "en".to_string())],
        }
    }

    fn chunk(ids: &[&str]) -> Chunk {
        Chunk {
            elements: ids
                .iter()
                .map(|id| Element::new("book").with_attribute("id", *id))
                .collect(),
            accumulated_size: 0,
        }
    }

    #[test]
    fn test_write_numbers_from_one() {
        let dir = tempdir().unwrap();
        let mut writer = ChunkWriter::new(dir.path(), root(), 0);

        let first = writer.write(&chunk(&["1", "2"])).unwrap();
        let second = writer.write(&chunk(&["3"])).unwrap();

        assert_eq!(first.index, 1);
        assert_eq!(first.path, dir.path().join("chunk_1.xml"));
        assert_eq!(first.element_count, 2);
        assert_eq!(second.index, 2);
        assert_eq!(second.path, dir.path().join("chunk_2.xml"));
        assert_eq!(writer.next_index(), 3);
    }

    #[test]
    fn test_write_content_and_size() {
        let dir = tempdir().unwrap();
        let mut writer = ChunkWriter::new(dir.path(), root(), 0);
        let info = writer.write(&chunk(&["a"])).unwrap();

        let content = fs::read_to_string(&info.path).unwrap();
        assert_eq!(
            content,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<catalog lang=\"en\">\n<book id=\"a\"/>\n</catalog>\n"
        );
        assert_eq!(info.bytes_written, content.len() as u64);
    }

    #[test]
    fn test_write_padded_names() {
        let dir = tempdir().unwrap();
        let mut writer = ChunkWriter::new(dir.path(), root(), 3);
        let info = writer.write(&chunk(&["a"])).unwrap();
        assert_eq!(info.path, dir.path().join("chunk_001.xml"));
    }

    #[test]
    fn test_no_temp_files_left() {
        let dir = tempdir().unwrap();
        let mut writer = ChunkWriter::new(dir.path(), root(), 0);
        writer.write(&chunk(&["a"])).unwrap();
        writer.write(&chunk(&["b"])).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| !n.ends_with(".tmp")));
    }

    #[test]
    fn test_empty_chunk_is_rejected() {
        let dir = tempdir().unwrap();
        let mut writer = ChunkWriter::new(dir.path(), root(), 0);

        assert!(writer.write(&Chunk::default()).is_err());
        assert_eq!(writer.next_index(), 1);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_output_dir() {
        let dir = tempdir().unwrap();
        let mut writer = ChunkWriter::new(dir.path().join("missing"), root(), 0);

        let err = writer.write(&chunk(&["a"])).unwrap_err();
        assert!(matches!(err, SplitterError::Io { .. }));
        assert_eq!(writer.next_index(), 1);
        assert!(!dir.path().join("missing").exists());
    }

    #[test]
    fn test_failed_rename_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        // A directory in the way makes the final rename fail after the
        // temp file has been fully written.
        fs::create_dir(dir.path().join("chunk_1.xml")).unwrap();
        let mut writer = ChunkWriter::new(dir.path(), root(), 0);

        let err = writer.write(&chunk(&["a"])).unwrap_err();

        assert!(matches!(err, SplitterError::Io { .. }));
        assert!(err.to_string().contains("chunk_1.xml"));
        assert!(!dir.path().join(".chunk_1.xml.tmp").exists());
        assert!(dir.path().join("chunk_1.xml").is_dir());
        assert_eq!(writer.next_index(), 1);
    }

    #[test]
    fn test_overwrites_existing_chunk() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("chunk_1.xml"), "stale").unwrap();

        let mut writer = ChunkWriter::new(dir.path(), root(), 0);
        let info = writer.write(&chunk(&["fresh"])).unwrap();

        let content = fs::read_to_string(info.path).unwrap();
        assert!(content.contains(r#"<book id="fresh"/>"#));
    }
}
