//! The batch queue: an ordered, de-duplicated list of files and the
//! sequential loop that converts them.
//!
//! ## Concurrency model
//!
//! [`BatchQueue`] is a cheap `Clone` handle. One processing pass runs at a
//! time, usually on a background task started with
//! [`BatchQueue::spawn_processing`]; the controlling side keeps a clone to
//! read snapshots, poll [`BatchQueue::stats`], or call
//! [`BatchQueue::cancel`].
//!
//! Mutations (`add`, `add_directory`, `remove`, `clear`) are *rejected* with
//! [`BatchError::QueueBusy`] while a pass is active rather than queued behind
//! it. The item lock is never held across a conversion, so snapshots stay
//! responsive while a slow file is being converted.
//!
//! Cancellation is cooperative: the flag is checked once before each item,
//! and an in-flight conversion always runs to completion.

use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::export::{ExportReport, Exporter};
use crate::item::{ItemStatus, QueueItem};
use crate::pipeline::convert::{convert_file, Converter};
use crate::pipeline::input::{absolute_path, detect_category, scan_directory};
use crate::progress::BatchObserver;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

/// Outcome of one processing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Items handed to the converter during this pass.
    pub attempted: usize,
    /// Items that reached `Completed` during this pass.
    pub completed: usize,
    /// Items that ended in `Error` during this pass.
    pub failed: usize,
    /// Items skipped because they were already `Completed`.
    pub skipped: usize,
    /// The walk stopped because [`BatchQueue::cancel`] was called.
    pub cancelled: bool,
    /// The walk stopped because the observer declined to continue after an error.
    pub halted: bool,
    pub duration_ms: u64,
}

/// Point-in-time counts over the whole queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub errors: usize,
}

impl QueueStats {
    /// Fraction of items that are finished (`Completed` or `Error`), 0.0–1.0.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed + self.errors) as f64 / self.total as f64
        }
    }
}

/// Clears the processing flag when the pass ends, however it ends.
pub(crate) struct ProcessingGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Owner of the queue items and the sequential processing loop.
///
/// # Example
/// ```rust,no_run
/// use mdbatch::{BatchConfig, BatchQueue, CommandConverter, NoopObserver};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let queue = BatchQueue::new(BatchConfig::default());
/// queue.add(["report.docx", "slides.pptx"])?;
/// queue.add_directory("scans")?;
///
/// let report = queue
///     .process_all(Arc::new(CommandConverter::default()), Arc::new(NoopObserver))
///     .await?;
/// eprintln!("{} converted, {} failed", report.completed, report.failed);
///
/// queue.export_zip("out")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BatchQueue {
    items: Arc<RwLock<Vec<QueueItem>>>,
    processing: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    config: Arc<BatchConfig>,
}

impl Default for BatchQueue {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}

impl BatchQueue {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            processing: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    // ── Mutation ─────────────────────────────────────────────────────────

    /// Queue explicitly chosen files. Returns how many were new.
    ///
    /// Paths already queued are ignored. Unrecognised extensions are queued
    /// anyway with a warning; the converter gets the final say.
    pub fn add<I, P>(&self, paths: I) -> Result<usize, BatchError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths: Vec<PathBuf> = paths
            .into_iter()
            .map(|p| absolute_path(p.as_ref()))
            .collect();
        let added = self.insert(paths, "add files", true)?;
        info!("Added {} files to queue", added);
        Ok(added)
    }

    /// Queue every recognised file under `dir`, recursively. Returns how
    /// many were new. Unrecognised files are skipped without a warning.
    pub fn add_directory(&self, dir: impl AsRef<Path>) -> Result<usize, BatchError> {
        self.ensure_idle("add a folder")?;
        let dir = dir.as_ref();
        let files = scan_directory(dir)?;
        let added = self.insert(files, "add a folder", false)?;
        info!("Added {} files from folder {}", added, dir.display());
        Ok(added)
    }

    /// Remove the items at `indices`. Out-of-range and repeated indices are
    /// ignored. Returns how many were removed.
    pub fn remove(&self, indices: &[usize]) -> Result<usize, BatchError> {
        let mut items = self.write();
        self.ensure_idle("remove files")?;

        let mut sorted: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < items.len())
            .collect();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();

        for &index in &sorted {
            let item = items.remove(index);
            debug!("Removed {} from queue", item.display_name());
        }
        info!("Removed {} files", sorted.len());
        Ok(sorted.len())
    }

    /// Empty the queue. Returns how many items were dropped.
    pub fn clear(&self) -> Result<usize, BatchError> {
        let mut items = self.write();
        self.ensure_idle("clear the queue")?;
        let n = items.len();
        items.clear();
        info!("Queue cleared ({} files)", n);
        Ok(n)
    }

    fn insert(
        &self,
        paths: Vec<PathBuf>,
        operation: &'static str,
        warn_unsupported: bool,
    ) -> Result<usize, BatchError> {
        let mut items = self.write();
        self.ensure_idle(operation)?;

        let mut known: HashSet<PathBuf> = items.iter().map(|i| i.path().to_path_buf()).collect();
        let mut added = 0;
        for path in paths {
            if !known.insert(path.clone()) {
                debug!("Already queued: {}", path.display());
                continue;
            }
            match detect_category(&path) {
                Some(category) => debug!("Queued {} ({})", path.display(), category.as_str()),
                None if warn_unsupported => warn!(
                    "Unsupported file type, conversion will be attempted anyway: {}",
                    path.display()
                ),
                None => debug!("Queued {} (unknown type)", path.display()),
            }
            if !path.is_file() {
                warn!("Queued path is not a readable file: {}", path.display());
            }
            items.push(QueueItem::new(path));
            added += 1;
        }
        Ok(added)
    }

    // ── Processing ───────────────────────────────────────────────────────

    /// Convert every item that is not yet `Completed`, one at a time, in
    /// queue order.
    ///
    /// Per-item failures are recorded on the item and never abort the pass,
    /// unless `skip_errors` is off and the observer declines to continue.
    ///
    /// # Errors
    /// [`BatchError::AlreadyProcessing`] if another pass is active.
    pub async fn process_all(
        &self,
        converter: Arc<dyn Converter>,
        observer: Arc<dyn BatchObserver>,
    ) -> Result<BatchReport, BatchError> {
        let guard = self.try_begin()?;
        Ok(self.run(guard, converter, observer).await)
    }

    /// Start [`BatchQueue::process_all`] on a background Tokio task.
    ///
    /// The queue is marked busy before this returns, so mutations made right
    /// after spawning are already rejected.
    pub fn spawn_processing(
        &self,
        converter: Arc<dyn Converter>,
        observer: Arc<dyn BatchObserver>,
    ) -> Result<JoinHandle<BatchReport>, BatchError> {
        let guard = self.try_begin()?;
        let queue = self.clone();
        Ok(tokio::spawn(async move {
            queue.run(guard, converter, observer).await
        }))
    }

    /// Wait for a pass started with [`BatchQueue::spawn_processing`],
    /// escalating on interrupts.
    ///
    /// The first time `interrupt` resolves, the pass is cancelled and the
    /// item in flight may still finish. The second time, the task is aborted
    /// and `Ok(None)` is returned; the abandoned item stays `Processing` and
    /// its conversion keeps running on the blocking pool until it returns.
    pub async fn join_interruptible<F, Fut>(
        &self,
        handle: &mut JoinHandle<BatchReport>,
        mut interrupt: F,
    ) -> Result<Option<BatchReport>, BatchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let joined = |r: Result<BatchReport, JoinError>| {
            r.map(Some)
                .map_err(|e| BatchError::Internal(format!("processing task failed: {e}")))
        };

        tokio::select! {
            r = &mut *handle => return joined(r),
            () = interrupt() => {}
        }
        info!("Interrupted, stopping after the current item");
        self.cancel();

        tokio::select! {
            r = &mut *handle => joined(r),
            () = interrupt() => {
                warn!("Interrupted again, abandoning the item in flight");
                handle.abort();
                Ok(None)
            }
        }
    }

    fn try_begin(&self) -> Result<ProcessingGuard, BatchError> {
        self.processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| BatchError::AlreadyProcessing)?;
        self.cancel.store(false, Ordering::SeqCst);
        Ok(ProcessingGuard {
            flag: Arc::clone(&self.processing),
        })
    }

    async fn run(
        &self,
        _guard: ProcessingGuard,
        converter: Arc<dyn Converter>,
        observer: Arc<dyn BatchObserver>,
    ) -> BatchReport {
        let start = Instant::now();
        let (total, to_process) = {
            let items = self.read();
            (items.len(), items.iter().filter(|i| !i.is_completed()).count())
        };
        info!("Starting batch: {} of {} files to convert", to_process, total);
        observer.on_batch_start(to_process);

        let mut report = BatchReport::default();

        for index in 0..total {
            if self.cancel.load(Ordering::SeqCst) {
                info!("Processing stopped by user");
                report.cancelled = true;
                break;
            }

            let Some((path, name)) = self.begin_item(index) else {
                report.skipped += 1;
                continue;
            };
            report.attempted += 1;
            observer.on_item_start(index, &name);
            debug!("Converting: {}", path.display());

            match convert_file(Arc::clone(&converter), &path, self.config.clean_output).await {
                Ok(markdown) => {
                    let len = markdown.len();
                    self.update(index, |item| item.complete(markdown));
                    report.completed += 1;
                    debug!("Completed: {}", name);
                    observer.on_item_complete(index, &name, len);
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!("Error processing {}: {}", name, message);
                    self.update(index, |item| item.fail(message.clone()));
                    report.failed += 1;
                    observer.on_item_error(index, &name, &message);

                    if !self.config.skip_errors
                        && !observer.continue_after_error(index, &name, &message)
                    {
                        info!("Batch halted after error on {}", name);
                        report.halted = true;
                        break;
                    }
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Batch processing completed: {} successful, {} errors, {}ms",
            report.completed, report.failed, report.duration_ms
        );
        observer.on_batch_complete(&report);
        report
    }

    /// Mark item `index` as `Processing` and return what the converter
    /// needs, or `None` if it is already `Completed` (or gone).
    fn begin_item(&self, index: usize) -> Option<(PathBuf, String)> {
        let mut items = self.write();
        let item = items.get_mut(index)?;
        if item.is_completed() {
            return None;
        }
        item.begin();
        Some((item.path().to_path_buf(), item.display_name().to_string()))
    }

    fn update(&self, index: usize, f: impl FnOnce(&mut QueueItem)) {
        if let Some(item) = self.write().get_mut(index) {
            f(item);
        }
    }

    /// Ask the running pass to stop before its next item.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    // ── Reading ──────────────────────────────────────────────────────────

    /// Clone of every item, in queue order.
    pub fn snapshot(&self) -> Vec<QueueItem> {
        self.read().clone()
    }

    pub fn get(&self, index: usize) -> Option<QueueItem> {
        self.read().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Clones of the `Completed` items, in queue order.
    pub fn completed_items(&self) -> Vec<QueueItem> {
        self.read()
            .iter()
            .filter(|i| i.is_completed())
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> QueueStats {
        let items = self.read();
        let mut stats = QueueStats {
            total: items.len(),
            ..QueueStats::default()
        };
        for item in items.iter() {
            match item.status() {
                ItemStatus::Pending => stats.pending += 1,
                ItemStatus::Processing => stats.processing += 1,
                ItemStatus::Completed => stats.completed += 1,
                ItemStatus::Error => stats.errors += 1,
            }
        }
        stats
    }

    // ── Export shortcuts ─────────────────────────────────────────────────

    /// Export completed items to a ZIP using this queue's export options.
    /// See [`Exporter::export_zip`].
    pub fn export_zip(&self, destination: impl AsRef<Path>) -> Result<ExportReport, BatchError> {
        Exporter::new(self.config.export.clone())?.export_zip(&self.snapshot(), destination)
    }

    /// Export completed items to a fresh timestamped directory under
    /// `destination`. See [`Exporter::export_folder`].
    pub fn export_folder(&self, destination: impl AsRef<Path>) -> Result<ExportReport, BatchError> {
        Exporter::new(self.config.export.clone())?.export_folder(&self.snapshot(), destination)
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn ensure_idle(&self, operation: &'static str) -> Result<(), BatchError> {
        if self.is_processing() {
            warn!("Cannot {} while processing", operation);
            return Err(BatchError::QueueBusy { operation });
        }
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<QueueItem>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<QueueItem>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }
}
