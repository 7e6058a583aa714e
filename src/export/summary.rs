//! Generated documents: the JSON conversion summary and the Markdown index.

use super::layout::PlannedFile;
use crate::error::BatchError;
use crate::item::{ItemStatus, QueueItem};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::Write as _;

/// Tool identifier written into both generated documents.
pub const TOOL_NAME: &str = concat!("mdbatch v", env!("CARGO_PKG_VERSION"));

/// Contents of `conversion_summary.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub conversion_info: ConversionInfo,
    /// One entry per queued item, whatever its status.
    pub files: Vec<FileSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionInfo {
    pub tool: String,
    /// RFC 3339, local time.
    pub timestamp: String,
    pub total_files: usize,
    pub completed_files: usize,
    pub error_files: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub original_filename: String,
    pub original_filepath: String,
    pub original_size: u64,
    pub status: ItemStatus,
    /// Length of the converted Markdown in characters (Unicode scalar
    /// values, not bytes), 0 unless `Completed`.
    pub markdown_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ConversionSummary {
    pub fn from_items(items: &[QueueItem], timestamp: DateTime<Local>) -> Self {
        let count = |status| items.iter().filter(|i| i.status() == status).count();
        Self {
            conversion_info: ConversionInfo {
                tool: TOOL_NAME.to_string(),
                timestamp: timestamp.to_rfc3339(),
                total_files: items.len(),
                completed_files: count(ItemStatus::Completed),
                error_files: count(ItemStatus::Error),
            },
            files: items
                .iter()
                .map(|item| FileSummary {
                    original_filename: item.display_name().to_string(),
                    original_filepath: item.path().display().to_string(),
                    original_size: item.size_bytes(),
                    status: item.status(),
                    markdown_size: item.content().chars().count(),
                    error_message: item.error().map(str::to_string),
                })
                .collect(),
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, BatchError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Markdown index linking every exported item file.
pub(crate) fn index_document<'f, 'a: 'f>(
    files: impl IntoIterator<Item = &'f PlannedFile<'a>>,
    timestamp: DateTime<Local>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Markdown Conversion Results\n");
    let _ = writeln!(out, "Generated by {TOOL_NAME}");
    let _ = writeln!(out, "Conversion Date: {}\n", timestamp.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "## Converted Files\n");

    let mut count = 0usize;
    let mut total_size = 0u64;
    for file in files {
        count += 1;
        total_size += file.source_size;
        let _ = writeln!(
            out,
            "- [{}]({}) ({})",
            file.name,
            link_target(&file.path),
            format_file_size(file.source_size)
        );
    }

    let _ = writeln!(out, "\n## Statistics\n");
    let _ = writeln!(out, "- Total files processed: {count}");
    let _ = writeln!(out, "- Total original size: {}", format_file_size(total_size));
    out
}

/// Paths with spaces need the `<...>` link form.
fn link_target(path: &str) -> Cow<'_, str> {
    if path.contains(char::is_whitespace) {
        Cow::Owned(format!("<{path}>"))
    } else {
        Cow::Borrowed(path)
    }
}

/// Human-readable size: `0 B`, otherwise one decimal in B/KB/MB/GB (base 1024).
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}
