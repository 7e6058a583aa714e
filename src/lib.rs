//! # mdbatch
//!
//! Batch-convert documents (Office files, PDFs, images, audio, web pages,
//! e-books) to Markdown, then export the results as a ZIP archive or a
//! directory tree.
//!
//! The conversion itself is delegated to a [`Converter`]. By default that is
//! [`CommandConverter`], which runs Microsoft's `markitdown` program; any
//! `Fn(&Path) -> Result<String, ConvertError>` closure works too. This crate
//! owns everything around it: the queue, per-file status tracking,
//! cancellation, error policy and export layout.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files / folders
//!  │
//!  ├─ 1. Queue    de-duplicate, detect formats, scan folders recursively
//!  ├─ 2. Convert  one file at a time on the blocking pool (spawn_blocking)
//!  ├─ 3. Clean    opt-in whitespace normalisation (off: text kept verbatim)
//!  ├─ 4. Record   Completed (Markdown) or Error (message) per item
//!  └─ 5. Export   ZIP or folder, optional README index + JSON summary
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mdbatch::{BatchConfig, BatchQueue, CommandConverter, NoopObserver};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue = BatchQueue::new(BatchConfig::default());
//!     queue.add_directory("inbox")?;
//!
//!     let report = queue
//!         .process_all(Arc::new(CommandConverter::default()), Arc::new(NoopObserver))
//!         .await?;
//!     eprintln!("{} converted, {} failed", report.completed, report.failed);
//!
//!     let export = queue.export_zip(".")?;
//!     println!("{}", export.location.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mdbatch` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! mdbatch = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod item;
pub mod pipeline;
pub mod progress;
pub mod queue;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BatchConfig, BatchConfigBuilder, CollisionPolicy, ExportOptions};
pub use error::{BatchError, ConvertError};
pub use export::{
    format_file_size, save_markdown, ConversionSummary, ExportReport, Exporter, FileSummary,
};
pub use item::{ItemStatus, QueueItem};
pub use pipeline::convert::{CommandConverter, Converter};
pub use pipeline::input::{detect_category, is_supported, FileCategory, SUPPORTED_EXTENSIONS};
pub use progress::{BatchObserver, NoopObserver, SharedObserver};
pub use queue::{BatchQueue, BatchReport, QueueStats};
