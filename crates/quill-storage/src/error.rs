use miette::Diagnostic;
use thiserror::Error;

use crate::backend::BackendKind;

/// Storage errors.
///
/// `BackendUnavailable` only ever comes out of capability probing; the selector
/// swallows it and demotes to the next tier. Everything else is returned from a
/// bound backend and left to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum StorageError {
    #[error("{backend} storage unavailable: {message}")]
    #[diagnostic(code(storage::unavailable))]
    BackendUnavailable {
        backend: BackendKind,
        message: String,
    },

    #[error("record does not match any known shape: {message}")]
    #[diagnostic(
        code(storage::invalid_record),
        help("settings need `key` and `value`, documents need `id`, samples need `key` and `content`")
    )]
    InvalidRecord { message: String },

    #[error("write to {backend} storage failed: {message}")]
    #[diagnostic(code(storage::write))]
    StorageWriteFailed {
        backend: BackendKind,
        message: String,
    },

    #[error("read from {backend} storage failed: {message}")]
    #[diagnostic(code(storage::read))]
    StorageReadFailed {
        backend: BackendKind,
        message: String,
    },

    #[error("schema migration failed: {message}")]
    #[diagnostic(code(storage::migration))]
    Migration { message: String },

    #[error("{backend} storage lock poisoned")]
    #[diagnostic(code(storage::lock))]
    LockPoisoned { backend: BackendKind },

    #[error(transparent)]
    #[diagnostic(code(storage::serde))]
    Serde(#[from] serde_json::Error),
}

impl StorageError {
    pub fn unavailable(backend: BackendKind, message: impl ToString) -> Self {
        Self::BackendUnavailable {
            backend,
            message: message.to_string(),
        }
    }

    pub fn write_failed(backend: BackendKind, message: impl ToString) -> Self {
        Self::StorageWriteFailed {
            backend,
            message: message.to_string(),
        }
    }

    pub fn read_failed(backend: BackendKind, message: impl ToString) -> Self {
        Self::StorageReadFailed {
            backend,
            message: message.to_string(),
        }
    }
}
