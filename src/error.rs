//! Error taxonomy for counter collection.
//!
//! Only two failures leave a reader: the source could not be read at all, or
//! it was read but does not have the minimum shape the parser relies on.
//! Individual numeric fields that fail to parse are defaulted to zero inside
//! the parsers and never surface here.

use std::io;
use std::path::Path;

/// Failure of a single reader or external collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// Kernel source or external tool missing or unreadable.
    #[error("{path} unavailable: {cause}")]
    SourceUnavailable {
        path: String,
        #[source]
        cause: io::Error,
    },

    /// Required key or line missing, or the line is too short.
    #[error("unexpected format in {path}: {reason}")]
    SourceFormat { path: String, reason: String },
}

impl CollectError {
    pub fn unavailable(path: impl AsRef<Path>, cause: io::Error) -> Self {
        CollectError::SourceUnavailable {
            path: path.as_ref().display().to_string(),
            cause,
        }
    }

    pub fn format(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        CollectError::SourceFormat {
            path: path.as_ref().display().to_string(),
            reason: reason.into(),
        }
    }

    /// True when the source does not exist on this host (adapters render "N/A").
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CollectError::SourceUnavailable { .. })
    }

    /// True when the underlying file vanished, e.g. a process exited mid-scan.
    pub fn is_not_found(&self) -> bool {
        match self {
            CollectError::SourceUnavailable { cause, .. } => {
                cause.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }

    /// Re-labels a parser error with the path it was read from.
    pub fn at(self, path: impl AsRef<Path>) -> Self {
        match self {
            CollectError::SourceFormat { reason, .. } => CollectError::format(path, reason),
            CollectError::SourceUnavailable { cause, .. } => {
                CollectError::unavailable(path, cause)
            }
        }
    }
}
