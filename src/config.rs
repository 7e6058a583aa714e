//! Configuration types for batch conversion and export.
//!
//! All batch behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. Export placement lives in the nested
//! [`ExportOptions`] so an [`crate::export::Exporter`] can be constructed
//! without a queue.

use crate::error::BatchError;
use serde::{Deserialize, Serialize};

/// Default name prefix for export archives and directories.
pub const DEFAULT_EXPORT_PREFIX: &str = "markitdown_export";

/// Configuration for a batch queue.
///
/// Built via [`BatchConfig::builder()`] or using [`BatchConfig::default()`].
///
/// # Example
/// ```rust
/// use mdbatch::{BatchConfig, CollisionPolicy};
///
/// let config = BatchConfig::builder()
///     .skip_errors(false)
///     .preserve_structure(false)
///     .collision_policy(CollisionPolicy::Error)
///     .build()
///     .unwrap();
/// assert!(!config.skip_errors);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Keep going after a failed file without asking. Default: true.
    ///
    /// When false, [`crate::progress::BatchObserver::continue_after_error`]
    /// is consulted after every failure and a `false` answer halts the walk.
    pub skip_errors: bool,

    /// Normalise converter output (line endings, trailing whitespace, blank
    /// runs, zero-width spaces). Default: false, so items hold the
    /// converter's text unchanged.
    pub clean_output: bool,

    /// Placement and extra documents for exports.
    pub export: ExportOptions,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            skip_errors: true,
            clean_output: false,
            export: ExportOptions::default(),
        }
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn skip_errors(mut self, v: bool) -> Self {
        self.config.skip_errors = v;
        self
    }

    pub fn clean_output(mut self, v: bool) -> Self {
        self.config.clean_output = v;
        self
    }

    pub fn preserve_structure(mut self, v: bool) -> Self {
        self.config.export.preserve_structure = v;
        self
    }

    pub fn create_index(mut self, v: bool) -> Self {
        self.config.export.create_index = v;
        self
    }

    pub fn collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.config.export.collision_policy = policy;
        self
    }

    pub fn export_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.export.export_prefix = prefix.into();
        self
    }

    pub fn export(mut self, options: ExportOptions) -> Self {
        self.config.export = options;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, BatchError> {
        self.config.export.validate()?;
        Ok(self.config)
    }
}

/// How exported Markdown files are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Mirror each source's directory relative to the common ancestor of
    /// all queued files. Default: true.
    pub preserve_structure: bool,

    /// Write a `README.md` index linking every converted file. Default: true.
    pub create_index: bool,

    /// What to do when two items map to the same output path. Default: overwrite.
    pub collision_policy: CollisionPolicy,

    /// Prefix for archive and directory names. Default: `markitdown_export`.
    pub export_prefix: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            preserve_structure: true,
            create_index: true,
            collision_policy: CollisionPolicy::default(),
            export_prefix: DEFAULT_EXPORT_PREFIX.to_string(),
        }
    }
}

impl ExportOptions {
    pub(crate) fn validate(&self) -> Result<(), BatchError> {
        let prefix = self.export_prefix.trim();
        if prefix.is_empty() {
            return Err(BatchError::InvalidConfig(
                "export prefix must not be empty".into(),
            ));
        }
        if prefix.contains(['/', '\\']) {
            return Err(BatchError::InvalidConfig(format!(
                "export prefix must not contain path separators, got '{}'",
                self.export_prefix
            )));
        }
        Ok(())
    }
}

/// Behaviour when two completed items produce the same output path.
///
/// Only reachable with structure preservation off (or when two sources in
/// one directory share a stem, e.g. `a.pdf` and `a.docx`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Last write wins; each collision is logged as a warning. (default)
    #[default]
    Overwrite,
    /// Abort the export before anything is written.
    Error,
}
