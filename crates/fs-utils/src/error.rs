//! Error types for fs-utils

use std::path::{Path, PathBuf};

/// Result type for fs-utils operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fs-utils operations.
///
/// Deletions refused by the working-directory policy are not errors; see
/// [`crate::delete::delete`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to parse {format} data at {path}: {message}")]
    Parse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Failed to serialize {format} data for {path}: {message}")]
    Serialize {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Cannot encode or decode {path}: {message}")]
    Encoding { path: PathBuf, message: String },

    #[error("Invalid glob pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Background task failed: {message}")]
    Task { message: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Map an I/O error, promoting `NotFound` to [`Error::NotFound`].
    pub fn from_stat(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Convert a directory-walk failure, keeping the offending path.
    pub fn walk(root: &Path, err: walkdir::Error) -> Self {
        let path = err.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
        Self::io(path, std::io::Error::from(err))
    }

    /// True if this error reports a missing path.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task {
            message: err.to_string(),
        }
    }
}
