//! Backend-agnostic storage failures shared by every match store.

use std::{error::Error, fmt};

use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Match-record operation a backend failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    /// Creating the record for a freshly issued challenge.
    Insert,
    /// Reading one record by code.
    Load,
    /// The versioned conditional replace.
    Update,
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchOp::Insert => "insert",
            MatchOp::Load => "load",
            MatchOp::Update => "update",
        })
    }
}

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend cannot be reached at all (connection, ping, index setup).
    #[error("storage backend unreachable: {message}")]
    Unreachable {
        /// Backend-specific description of the connectivity failure.
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// One match operation failed against an otherwise reachable backend.
    #[error("failed to {op} match `{code}`")]
    MatchOp {
        /// Which operation failed.
        op: MatchOp,
        /// Code of the match the operation targeted.
        code: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The open-match scan used by the stall sweep failed.
    #[error("failed to scan open matches")]
    Scan {
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Connectivity failure from any backend.
    pub fn unreachable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unreachable {
            message,
            source: Box::new(source),
        }
    }

    /// Failure of one match operation.
    pub fn match_op(op: MatchOp, code: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::MatchOp {
            op,
            code,
            source: Box::new(source),
        }
    }

    /// Failure of the open-match scan.
    pub fn scan(source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Scan {
            source: Box::new(source),
        }
    }
}
