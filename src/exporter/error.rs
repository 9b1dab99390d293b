use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use zip::result::ZipError;

use crate::exporter::io::package::PackageError;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Error type covering the failures that abort an export or a record store
/// operation as a whole.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Raised when a required argument is missing or inconsistent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Raised when the template file does not exist.
    #[error("template not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Raised when the output directory cannot be created.
    #[error("cannot create output directory {}: {source}", path.display())]
    OutputRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Wrapper for IO failures such as reading or writing the record store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Failure of one template duplication.
#[derive(Debug, Error)]
pub enum DuplicationError {
    #[error("template not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("I/O failure on {}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed template {}: {detail}", path.display())]
    MalformedTemplate {
        path: PathBuf,
        detail: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl DuplicationError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        DuplicationError::MalformedTemplate {
            path: path.into(),
            detail: detail.into(),
            source: None,
        }
    }

    /// Maps a reader failure, keeping I/O problems apart from parse problems.
    pub(crate) fn from_read(path: impl Into<PathBuf>, error: calamine::XlsxError) -> Self {
        let path = path.into();
        match error {
            calamine::XlsxError::Io(source) => DuplicationError::IoFailure { path, source },
            other => DuplicationError::MalformedTemplate {
                path,
                detail: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }

    /// Maps a package failure, keeping I/O problems apart from structural ones.
    pub(crate) fn from_package(path: impl Into<PathBuf>, error: PackageError) -> Self {
        let path = path.into();
        match error {
            PackageError::Io(source) | PackageError::Zip(ZipError::Io(source)) => {
                DuplicationError::IoFailure { path, source }
            }
            other => DuplicationError::MalformedTemplate {
                path,
                detail: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            DuplicationError::SourceNotFound(_) => FailureKind::SourceNotFound,
            DuplicationError::IoFailure { .. } => FailureKind::IoFailure,
            DuplicationError::MalformedTemplate { .. } => FailureKind::MalformedTemplate,
        }
    }
}

/// Category of a per-record failure as it appears in a batch report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SourceNotFound,
    IoFailure,
    MalformedTemplate,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::SourceNotFound => write!(f, "source not found"),
            FailureKind::IoFailure => write!(f, "I/O failure"),
            FailureKind::MalformedTemplate => write!(f, "malformed template"),
        }
    }
}
