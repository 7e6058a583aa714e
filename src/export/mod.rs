//! Exporting converted items: ZIP archives, directory trees, single files.
//!
//! ## Layout
//!
//! ```text
//! markitdown_export_20260314_120000/
//! ├── x/a.md                   one per Completed item
//! ├── y/b.md
//! ├── README.md                index (optional)
//! └── conversion_summary.json  always
//! ```
//!
//! Placement is resolved up front by [`layout`]; the writers in [`archive`]
//! and [`folder`] only copy the plan out. Exports never touch the queue.

mod archive;
mod folder;
pub mod layout;
pub mod summary;

pub use layout::{common_ancestor, INDEX_FILE_NAME, SUMMARY_FILE_NAME};
pub use summary::{format_file_size, ConversionSummary, FileSummary, TOOL_NAME};

use crate::config::ExportOptions;
use crate::error::BatchError;
use crate::item::QueueItem;
use chrono::{DateTime, Local};
use layout::ExportPlan;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::info;

/// What an export produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    /// The archive file or export directory.
    pub location: PathBuf,
    /// Converted Markdown files written (generated documents excluded).
    pub files_written: usize,
    /// Output paths claimed by more than one file; the later one won.
    pub collisions: usize,
}

/// Writes `Completed` queue items out as Markdown files.
///
/// Every method takes the *whole* queue snapshot: non-completed items are
/// not exported but still count towards the common ancestor and appear in
/// the summary.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    options: ExportOptions,
}

impl Exporter {
    pub fn new(options: ExportOptions) -> Result<Self, BatchError> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Build the archive at `destination`.
    ///
    /// If `destination` is an existing directory the archive is created
    /// inside it as `<prefix>_<YYYYmmdd_HHMMSS>.zip`; otherwise it is the
    /// archive path itself. The archive appears only once complete.
    pub fn export_zip(
        &self,
        items: &[QueueItem],
        destination: impl AsRef<Path>,
    ) -> Result<ExportReport, BatchError> {
        let now = Local::now();
        let plan = self.plan(items, now)?;

        let destination = destination.as_ref();
        let target = if destination.is_dir() {
            destination.join(format!("{}.zip", self.export_name(now)))
        } else {
            destination.to_path_buf()
        };
        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| BatchError::OutputWriteFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;

        let write_err = |e: std::io::Error| BatchError::OutputWriteFailed {
            path: target.clone(),
            source: e,
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(".mdbatch-")
            .suffix(".zip.tmp")
            .tempfile_in(parent)
            .map_err(write_err)?;
        archive::write_archive(&mut tmp, &plan, &target)?;
        tmp.persist(&target).map_err(|e| write_err(e.error))?;

        let report = self.report(target, &plan);
        info!(
            "ZIP exported: {} ({} files)",
            report.location.display(),
            report.files_written
        );
        Ok(report)
    }

    /// The same archive [`Exporter::export_zip`] writes, in memory.
    pub fn export_zip_bytes(&self, items: &[QueueItem]) -> Result<Vec<u8>, BatchError> {
        let plan = self.plan(items, Local::now())?;
        let cursor = archive::write_archive(Cursor::new(Vec::new()), &plan, Path::new("<memory>"))?;
        Ok(cursor.into_inner())
    }

    /// Write the export into a new `<prefix>_<YYYYmmdd_HHMMSS>` directory
    /// under `destination` (suffixed `_1`, `_2`, … if the name is taken).
    ///
    /// Nothing is cleaned up if a write fails part-way.
    pub fn export_folder(
        &self,
        items: &[QueueItem],
        destination: impl AsRef<Path>,
    ) -> Result<ExportReport, BatchError> {
        let now = Local::now();
        let plan = self.plan(items, now)?;

        let root = folder::create_unique_dir(destination.as_ref(), &self.export_name(now))?;
        folder::write_tree(&root, &plan)?;

        let report = self.report(root, &plan);
        info!(
            "Files exported to: {} ({} files)",
            report.location.display(),
            report.files_written
        );
        Ok(report)
    }

    /// The summary document for `items`, as it would be exported now.
    pub fn summary(&self, items: &[QueueItem]) -> ConversionSummary {
        ConversionSummary::from_items(items, Local::now())
    }

    fn plan<'a>(&self, items: &'a [QueueItem], now: DateTime<Local>) -> Result<ExportPlan<'a>, BatchError> {
        let mut plan = ExportPlan::for_items(items, &self.options)?;
        let policy = self.options.collision_policy;

        if self.options.create_index {
            let index = summary::index_document(plan.item_files(), now);
            plan.add_generated(INDEX_FILE_NAME, index, policy)?;
        }
        let json = ConversionSummary::from_items(items, now).to_json()?;
        plan.add_generated(SUMMARY_FILE_NAME, json, policy)?;
        Ok(plan)
    }

    fn export_name(&self, now: DateTime<Local>) -> String {
        format!("{}_{}", self.options.export_prefix, now.format("%Y%m%d_%H%M%S"))
    }

    fn report(&self, location: PathBuf, plan: &ExportPlan<'_>) -> ExportReport {
        ExportReport {
            location,
            files_written: plan.item_files().count(),
            collisions: plan.collisions,
        }
    }
}

/// Save one completed item's Markdown to `path`.
///
/// Parent directories are created. Uses atomic write (temp file + rename)
/// so a reader never sees a partial file.
pub async fn save_markdown(item: &QueueItem, path: impl AsRef<Path>) -> Result<(), BatchError> {
    if !item.is_completed() {
        return Err(BatchError::NotCompleted {
            name: item.display_name().to_string(),
        });
    }
    let path = path.as_ref();
    let write_err = |e: std::io::Error| BatchError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    // Atomic write: write to temp, then rename
    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, item.content())
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Saved {} to {}", item.display_name(), path.display());
    Ok(())
}
