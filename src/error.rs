//! Error types for asset aggregation.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single `aggregate` call.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The target could not be statted (missing, permission denied, ...).
    ///
    /// The filesystem error is passed through untouched.
    #[error(transparent)]
    Stat(#[from] io::Error),

    /// The directory walk failed part way through.
    ///
    /// `partial` holds every tag rendered before the failure.
    #[error("traversal failed at {}: {source}", display_path(.path))]
    Traversal {
        partial: String,
        path: Option<PathBuf>,
        #[source]
        source: io::Error,
    },

    /// The aggregator was built with a pattern that does not compile.
    #[error("invalid asset pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl AggregateError {
    /// True for configuration faults that no retry or fallback can fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidPattern { .. })
    }

    /// Output accumulated before the failure. Empty unless the walk had started.
    pub fn partial(&self) -> &str {
        match self {
            Self::Traversal { partial, .. } => partial,
            _ => "",
        }
    }

    /// The underlying I/O error kind, if this is a filesystem failure.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Stat(e) => Some(e.kind()),
            Self::Traversal { source, .. } => Some(source.kind()),
            Self::InvalidPattern { .. } => None,
        }
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}
