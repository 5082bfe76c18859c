//! Configuration constants and the split configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SplitterError};
use crate::splitting::FlushPolicy;

/// Default chunk size in megabytes.
pub const DEFAULT_CHUNK_SIZE_MB: f64 = 1.0;

/// Bytes per megabyte used for the threshold conversion.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// File name prefix for chunk files.
pub const CHUNK_FILE_PREFIX: &str = "chunk_";

/// File extension for chunk files.
pub const CHUNK_FILE_EXTENSION: &str = "xml";

/// Widest zero padding that still makes sense for a `u64` index.
pub const MAX_INDEX_WIDTH: usize = 20;

fn default_chunk_size_mb() -> f64 {
    DEFAULT_CHUNK_SIZE_MB
}

/// Settings for one split run.
///
/// Can be built in code with the `with_*` methods or loaded from a YAML
/// file with [`SplitConfig::from_yaml_file`]:
///
/// ```yaml
/// input_file: exports/books.xml
/// output_dir: exports/chunks
/// chunk_size_mb: 15
/// max_children_per_element: 235
/// policy: post-check
/// index_width: 3
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitConfig {
    /// Source document.
    pub input_file: PathBuf,

    /// Destination directory, created if missing.
    pub output_dir: PathBuf,

    /// Target chunk size in megabytes.
    #[serde(default = "default_chunk_size_mb")]
    pub chunk_size_mb: f64,

    /// Keep only this many direct children of each record.
    #[serde(default)]
    pub max_children_per_element: Option<usize>,

    /// Which chunk the threshold-crossing record lands in.
    #[serde(default)]
    pub policy: FlushPolicy,

    /// Zero-pad chunk indices to this many digits (0 = no padding).
    #[serde(default)]
    pub index_width: usize,
}

impl SplitConfig {
    /// Create a configuration with default size, no truncation and pre-check flushing.
    #[must_use]
    pub fn new(input_file: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            output_dir: output_dir.into(),
            chunk_size_mb: DEFAULT_CHUNK_SIZE_MB,
            max_children_per_element: None,
            policy: FlushPolicy::default(),
            index_width: 0,
        }
    }

    /// Set the chunk size in megabytes.
    #[must_use]
    pub fn with_chunk_size_mb(mut self, megabytes: f64) -> Self {
        self.chunk_size_mb = megabytes;
        self
    }

    /// Set the per-record child limit.
    #[must_use]
    pub fn with_max_children(mut self, limit: Option<usize>) -> Self {
        self.max_children_per_element = limit;
        self
    }

    /// Set the flush policy.
    #[must_use]
    pub fn with_policy(mut self, policy: FlushPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the zero-padding width of chunk indices.
    #[must_use]
    pub fn with_index_width(mut self, width: usize) -> Self {
        self.index_width = width;
        self
    }

    /// Load and validate a configuration from a YAML file.
    ///
    /// Relative `input_file` and `output_dir` values are taken as-is,
    /// i.e. relative to the current working directory.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| SplitterError::io(path, e))?;
        let config: Self =
            serde_yaml_ng::from_str(&content).map_err(|source| SplitterError::ConfigFile {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all values are in range.
    pub fn validate(&self) -> Result<()> {
        if !self.chunk_size_mb.is_finite() || self.chunk_size_mb <= 0.0 {
            return Err(SplitterError::InvalidConfig(format!(
                "chunk_size_mb must be a positive number, got {}",
                self.chunk_size_mb
            )));
        }

        if self.index_width > MAX_INDEX_WIDTH {
            return Err(SplitterError::InvalidConfig(format!(
                "index_width must be at most {MAX_INDEX_WIDTH}, got {}",
                self.index_width
            )));
        }

        Ok(())
    }

    /// Byte threshold derived from `chunk_size_mb`.
    ///
    /// Never below one byte, so tiny fractional sizes still make progress.
    #[must_use]
    pub fn threshold_bytes(&self) -> u64 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let bytes = (self.chunk_size_mb * BYTES_PER_MB as f64) as u64;
        bytes.max(1)
    }
}

/// Build the file name for a chunk.
///
/// # Examples
/// ```
/// use xml_splitter::config::chunk_file_name;
///
/// assert_eq!(chunk_file_name(1, 0), "chunk_1.xml");
/// assert_eq!(chunk_file_name(7, 3), "chunk_007.xml");
/// assert_eq!(chunk_file_name(1234, 3), "chunk_1234.xml");
/// ```
pub fn chunk_file_name(index: u64, width: usize) -> String {
    format!("{CHUNK_FILE_PREFIX}{index:0width$}.{CHUNK_FILE_EXTENSION}")
}
