//! Error types for the mdbatch library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BatchError`] is **fatal for one operation**, such as a rejected queue
//!   mutation or an export that could not be written. Returned as
//!   `Err(BatchError)` from [`crate::queue::BatchQueue`] and
//!   [`crate::export::Exporter`] methods. The queue itself is never damaged.
//!
//! * [`ConvertError`] is **non-fatal**: a single file failed to convert. Its
//!   message is stored on the [`crate::item::QueueItem`] and the batch moves
//!   on to the next file.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the mdbatch library.
///
/// Per-file conversion failures use [`ConvertError`] and are recorded on the
/// item rather than propagated here.
#[derive(Debug, Error)]
pub enum BatchError {
    // ── Queue errors ──────────────────────────────────────────────────────
    /// The queue is being processed; mutations are rejected until it finishes.
    #[error("Cannot {operation} while processing is active.\nStop or wait for the current batch first.")]
    QueueBusy { operation: &'static str },

    /// `process_all` was called while another pass was still running.
    #[error("A batch is already being processed")]
    AlreadyProcessing,

    /// The directory given to `add_directory` does not exist or is a file.
    #[error("Directory not found: '{path}'")]
    DirectoryNotFound { path: PathBuf },

    // ── Export errors ─────────────────────────────────────────────────────
    /// Export was requested but no item has status `Completed`.
    #[error("No completed files to export")]
    NothingToExport,

    /// Two items map to the same output path and the collision policy is `Error`.
    #[error("Output collision on '{path}': '{first}' and '{second}' produce the same file.\nEnable structure preservation or rename one of the sources.")]
    OutputCollision {
        path: String,
        first: String,
        second: String,
    },

    /// A single-file save was requested for an item that has no content.
    #[error("'{name}' has not been converted yet")]
    NotCompleted { name: String },

    /// Could not create or write an output file or directory.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The ZIP writer rejected an entry or failed to finalise the archive.
    #[error("Failed to build archive '{path}': {detail}")]
    Archive { path: PathBuf, detail: String },

    /// The summary document could not be serialised.
    #[error("Failed to serialise conversion summary: {0}")]
    Summary(#[from] serde_json::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single file.
///
/// Its `Display` text becomes the item's error message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConvertError {
    /// The converter succeeded but produced no text.
    #[error("No content extracted")]
    NoContent,

    /// The converter reported a failure.
    #[error("{detail}")]
    Failed { detail: String },

    /// The external converter program could not be started.
    #[error("Converter '{program}' is not available: {detail}\nInstall it with: pip install 'markitdown[all]'")]
    ConverterUnavailable { program: String, detail: String },

    /// Reading the source file failed.
    #[error("I/O error: {detail}")]
    Io { detail: String },

    /// The conversion task panicked or was aborted by the runtime.
    #[error("Conversion aborted: {detail}")]
    Aborted { detail: String },
}

impl ConvertError {
    /// Shorthand for [`ConvertError::Failed`].
    pub fn failed(detail: impl Into<String>) -> Self {
        ConvertError::Failed {
            detail: detail.into(),
        }
    }
}

impl From<std::io::Error> for ConvertError {
    fn from(e: std::io::Error) -> Self {
        ConvertError::Io {
            detail: e.to_string(),
        }
    }
}
