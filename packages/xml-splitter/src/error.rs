//! Error types for the splitter.
//!
//! Every variant carries the path it failed on so the CLI can print a
//! message that points the operator at the right file.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the splitter library.
#[derive(Debug, Error)]
pub enum SplitterError {
    /// Input file does not exist or cannot be opened.
    #[error("Input file not found or unreadable: {}: {source}", .path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input is not well-formed XML.
    #[error("XML parsing failed in {} at byte {position}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        position: u64,
        message: String,
    },

    /// Reading the input or writing a chunk failed.
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Config file could not be deserialized.
    #[error("Failed to read config file {}: {source}", .path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

impl SplitterError {
    /// Wrap an IO error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for splitter operations.
pub type Result<T> = std::result::Result<T, SplitterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_path() {
        let err = SplitterError::NotFound {
            path: PathBuf::from("books.xml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("books.xml"));
        assert!(err.to_string().contains("no such file"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = SplitterError::Parse {
            path: PathBuf::from("books.xml"),
            position: 42,
            message: "expecting </book> but found </books>".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "XML parsing failed in books.xml at byte 42: expecting </book> but found </books>"
        );
    }

    #[test]
    fn test_io_helper_keeps_path() {
        let err = SplitterError::io(
            "out/chunk_1.xml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, SplitterError::Io { .. }));
        assert!(err.to_string().starts_with("IO error on out/chunk_1.xml"));
    }

    #[test]
    fn test_invalid_config_display() {
        let err = SplitterError::InvalidConfig("chunk_size_mb must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: chunk_size_mb must be positive"
        );
    }
}
