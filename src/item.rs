//! Queue items: one source file and its conversion record.
//!
//! Fields are private so the status/content/error invariant holds by
//! construction: `content` is non-empty exactly when the item is
//! `Completed`, and `error` is non-empty exactly when it is `Error`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Message recorded when a failure carries no text of its own.
const UNKNOWN_ERROR: &str = "Unknown conversion error";

/// Lifecycle status of a [`QueueItem`].
///
/// `Pending → Processing → {Completed | Error}`. `Completed` is terminal;
/// `Error` items are reattempted by the next processing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Error,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Error => "Error",
        }
    }

    /// `true` once the current pass is done with this item.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file in the batch queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    path: PathBuf,
    display_name: String,
    size_bytes: u64,
    status: ItemStatus,
    content: String,
    error: String,
}

impl QueueItem {
    /// Create a `Pending` item, capturing the file name and size now.
    ///
    /// A file that cannot be stat'ed gets size `0`; conversion will report
    /// the real problem later.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Self {
            path,
            display_name,
            size_bytes,
            status: ItemStatus::Pending,
            content: String::new(),
            error: String::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// Converted Markdown; empty unless `Completed`.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Failure message; `None` unless `Error`.
    pub fn error(&self) -> Option<&str> {
        (self.status == ItemStatus::Error).then_some(self.error.as_str())
    }

    pub fn is_completed(&self) -> bool {
        self.status == ItemStatus::Completed
    }

    /// Source stem with a `.md` extension, e.g. `report.docx` → `report.md`.
    pub fn markdown_file_name(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.display_name.clone());
        format!("{stem}.md")
    }

    // ── Transitions (queue-only) ──────────────────────────────────────────

    /// `Pending | Error → Processing`. Completed items are left alone.
    pub(crate) fn begin(&mut self) {
        if self.is_completed() {
            return;
        }
        self.status = ItemStatus::Processing;
        self.content.clear();
        self.error.clear();
    }

    /// Record converted text. Empty text is recorded as a failure.
    pub(crate) fn complete(&mut self, content: String) {
        if self.is_completed() {
            return;
        }
        if content.is_empty() {
            self.fail(crate::error::ConvertError::NoContent.to_string());
            return;
        }
        self.status = ItemStatus::Completed;
        self.content = content;
        self.error.clear();
    }

    /// Record a failure message.
    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        if self.is_completed() {
            return;
        }
        let message = message.into();
        self.status = ItemStatus::Error;
        self.content.clear();
        self.error = if message.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            message
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holds_invariant(item: &QueueItem) -> bool {
        (item.status() == ItemStatus::Completed) == !item.content().is_empty()
            && (item.status() == ItemStatus::Error) == !item.error.is_empty()
    }

    #[test]
    fn test_new_item_is_pending_with_name() {
        let item = QueueItem::new("/docs/report.docx");
        assert_eq!(item.status(), ItemStatus::Pending);
        assert_eq!(item.display_name(), "report.docx");
        assert_eq!(item.size_bytes(), 0);
        assert!(holds_invariant(&item));
    }

    #[test]
    fn test_size_is_captured_on_creation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello").unwrap();
        let item = QueueItem::new(&path);
        std::fs::write(&path, b"hello world").unwrap();
        assert_eq!(item.size_bytes(), 5);
    }

    #[test]
    fn test_finished_statuses() {
        assert!(!ItemStatus::Pending.is_finished());
        assert!(!ItemStatus::Processing.is_finished());
        assert!(ItemStatus::Completed.is_finished());
        assert!(ItemStatus::Error.is_finished());
    }

    #[test]
    fn test_markdown_name_replaces_extension() {
        assert_eq!(QueueItem::new("/x/report.docx").markdown_file_name(), "report.md");
        assert_eq!(QueueItem::new("/x/archive.tar.gz").markdown_file_name(), "archive.tar.md");
        assert_eq!(QueueItem::new("/x/README").markdown_file_name(), "README.md");
    }

    #[test]
    fn test_lifecycle_keeps_invariant() {
        let mut item = QueueItem::new("/x/a.pdf");
        item.begin();
        assert_eq!(item.status(), ItemStatus::Processing);
        assert!(holds_invariant(&item));

        item.fail("corrupt stream");
        assert_eq!(item.error(), Some("corrupt stream"));
        assert!(holds_invariant(&item));

        item.begin();
        assert_eq!(item.error(), None);
        item.complete("# A\n".into());
        assert_eq!(item.status(), ItemStatus::Completed);
        assert!(holds_invariant(&item));
    }

    #[test]
    fn test_empty_content_becomes_error() {
        let mut item = QueueItem::new("/x/a.pdf");
        item.begin();
        item.complete(String::new());
        assert_eq!(item.status(), ItemStatus::Error);
        assert_eq!(item.error(), Some("No content extracted"));
    }

    #[test]
    fn test_blank_failure_message_is_replaced() {
        let mut item = QueueItem::new("/x/a.pdf");
        item.fail("  ");
        assert_eq!(item.error(), Some(UNKNOWN_ERROR));
        assert!(holds_invariant(&item));
    }

    #[test]
    fn test_completed_is_sticky() {
        let mut item = QueueItem::new("/x/a.pdf");
        item.complete("text".into());
        item.begin();
        item.fail("late failure");
        assert!(item.is_completed());
        assert_eq!(item.content(), "text");
    }
}
