//! Observer trait for per-item batch events.
//!
//! Pass an [`Arc<dyn BatchObserver>`] to
//! [`crate::queue::BatchQueue::process_all`] to receive events as the queue
//! walks its items. The queue never holds presentation state; a terminal
//! progress bar, a GUI status line or a log sink all subscribe here.
//!
//! # Example
//!
//! ```rust
//! use mdbatch::BatchObserver;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[derive(Default)]
//! struct CountingObserver {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchObserver for CountingObserver {
//!     fn on_item_complete(&self, _index: usize, name: &str, markdown_len: usize) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}: {name} ({markdown_len} bytes)");
//!     }
//! }
//! ```

use crate::queue::BatchReport;
use std::sync::Arc;

/// Called by the queue as it processes each item.
///
/// Events arrive from the processing task, not the caller's thread, so
/// implementations must be `Send + Sync`. All methods have default
/// implementations so callers only override what they care about.
pub trait BatchObserver: Send + Sync {
    /// Called once before the walk, with the number of items not yet `Completed`.
    fn on_batch_start(&self, to_process: usize) {
        let _ = to_process;
    }

    /// Called just before an item is handed to the converter.
    ///
    /// # Arguments
    /// * `index`: position in the queue (0-based)
    /// * `name`: the item's display name
    fn on_item_start(&self, index: usize, name: &str) {
        let _ = (index, name);
    }

    /// Called when an item converted successfully.
    ///
    /// `markdown_len` is the byte length of the stored Markdown.
    fn on_item_complete(&self, index: usize, name: &str, markdown_len: usize) {
        let _ = (index, name, markdown_len);
    }

    /// Called when an item failed. The message is already on the item.
    fn on_item_error(&self, index: usize, name: &str, error: &str) {
        let _ = (index, name, error);
    }

    /// Asked after a failure when `skip_errors` is off. Returning `false`
    /// halts the walk; items not yet reached keep their status.
    ///
    /// Defaults to `true`, so a batch never stops without someone deciding to.
    fn continue_after_error(&self, index: usize, name: &str, error: &str) -> bool {
        let _ = (index, name, error);
        true
    }

    /// Called once after the walk ends (finished, cancelled or halted).
    fn on_batch_complete(&self, report: &BatchReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need events.
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Convenience alias for the shared observer handle.
pub type SharedObserver = Arc<dyn BatchObserver>;
