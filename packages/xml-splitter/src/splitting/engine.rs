//! Main split loop that ties reader, accumulator and writer together.

use std::fs;

use tracing::info;

use super::accumulator::ChunkAccumulator;
use super::writer::ChunkWriter;
use crate::config::SplitConfig;
use crate::error::{Result, SplitterError};
use crate::types::{Chunk, ChunkInfo, SplitSummary};
use crate::xml::RecordReader;

/// Split a document into chunk files.
///
/// # Arguments
/// * `config` - Input, output and chunking settings
///
/// # Returns
/// A `SplitSummary` describing every chunk written
///
/// # Errors
/// Fails on the first error. Chunks flushed before a parse or write error
/// stay on disk; the chunk in progress is discarded.
pub fn split_xml(config: &SplitConfig) -> Result<SplitSummary> {
    split_xml_with(config, |_| {})
}

/// Same as [`split_xml`], calling `on_chunk` after every chunk is written.
pub fn split_xml_with<F>(config: &SplitConfig, mut on_chunk: F) -> Result<SplitSummary>
where
    F: FnMut(&ChunkInfo),
{
    config.validate()?;

    // Open the input first so a missing file aborts before any output exists.
    let records = RecordReader::open(&config.input_file)?
        .with_child_limit(config.max_children_per_element);
    let root = records.root().clone();

    fs::create_dir_all(&config.output_dir)
        .map_err(|e| SplitterError::io(&config.output_dir, e))?;

    let mut accumulator = ChunkAccumulator::new(config.threshold_bytes(), config.policy);
    let mut writer = ChunkWriter::new(&config.output_dir, root.clone(), config.index_width);

    info!(
        input = %config.input_file.display(),
        output = %config.output_dir.display(),
        root = %root.name,
        threshold = accumulator.threshold(),
        policy = %config.policy,
        max_children = ?config.max_children_per_element,
        "Splitting document"
    );

    let mut chunks = Vec::new();
    let mut element_count = 0usize;

    let mut flush = |chunk: Chunk, chunks: &mut Vec<ChunkInfo>| -> Result<()> {
        let chunk_info = writer.write(&chunk)?;
        on_chunk(&chunk_info);
        chunks.push(chunk_info);
        Ok(())
    };

    for record in records {
        let record = record?;
        element_count += 1;

        let ready = accumulator
            .push(record)
            .map_err(|e| SplitterError::io(&config.input_file, e))?;
        if let Some(chunk) = ready {
            flush(chunk, &mut chunks)?;
        }
    }

    if let Some(chunk) = accumulator.finish() {
        flush(chunk, &mut chunks)?;
    }

    info!(
        records = element_count,
        chunks = chunks.len(),
        "Split complete"
    );

    Ok(SplitSummary {
        root,
        chunks,
        element_count,
    })
}
