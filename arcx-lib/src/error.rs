//! Error types for archive writing.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::packaging::WriterState;

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Boxed encoder failure, either from the zip writer or the tar builder.
pub type EncoderError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building an archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Creating, opening, reading or listing something on disk failed
    #[error("Filesystem error at '{path}': {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The encoder rejected an entry header, name or payload
    #[error("Failed to encode entry '{entry}': {source}")]
    Encoding {
        entry: String,
        #[source]
        source: EncoderError,
    },

    /// Operation invoked while the writer is not in a state that allows it
    #[error("Cannot {operation} an archive that is {state}")]
    InvalidState {
        state: WriterState,
        operation: &'static str,
    },
}

/// Coarse classification of [`ArchiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Filesystem,
    Encoding,
    InvalidState,
}

impl ArchiveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveError::Filesystem { .. } => ErrorKind::Filesystem,
            ArchiveError::Encoding { .. } => ErrorKind::Encoding,
            ArchiveError::InvalidState { .. } => ErrorKind::InvalidState,
        }
    }

    pub(crate) fn filesystem(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ArchiveError::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn encoding(entry: impl Into<String>, source: impl Into<EncoderError>) -> Self {
        ArchiveError::Encoding {
            entry: entry.into(),
            source: source.into(),
        }
    }
}
