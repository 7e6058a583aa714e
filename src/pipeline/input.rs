//! Input resolution: recognised formats, path normalisation, directory scans.
//!
//! Explicit picks and directory scans filter differently on purpose. An
//! explicitly named file is always queued (an unrecognised extension only
//! earns a warning, because the converter may still handle it). A directory
//! scan queues recognised files only and skips the rest silently, since bulk
//! scans routinely pass over thumbnails, lock files and the like.

use crate::error::BatchError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Broad file categories the converter is known to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Office,
    Pdf,
    Image,
    Audio,
    Web,
    Archive,
    #[serde(rename = "ebook")]
    EBook,
    PlainText,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Office => "office",
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Web => "web",
            Self::Archive => "archive",
            Self::EBook => "ebook",
            Self::PlainText => "plain_text",
        }
    }
}

/// Recognised extensions (lower-case, no dot) and their categories.
pub const SUPPORTED_EXTENSIONS: &[(&str, FileCategory)] = &[
    ("doc", FileCategory::Office),
    ("docx", FileCategory::Office),
    ("xls", FileCategory::Office),
    ("xlsx", FileCategory::Office),
    ("ppt", FileCategory::Office),
    ("pptx", FileCategory::Office),
    ("pdf", FileCategory::Pdf),
    ("jpg", FileCategory::Image),
    ("jpeg", FileCategory::Image),
    ("png", FileCategory::Image),
    ("gif", FileCategory::Image),
    ("bmp", FileCategory::Image),
    ("tiff", FileCategory::Image),
    ("mp3", FileCategory::Audio),
    ("wav", FileCategory::Audio),
    ("m4a", FileCategory::Audio),
    ("flac", FileCategory::Audio),
    ("html", FileCategory::Web),
    ("htm", FileCategory::Web),
    ("csv", FileCategory::Web),
    ("json", FileCategory::Web),
    ("xml", FileCategory::Web),
    ("zip", FileCategory::Archive),
    ("epub", FileCategory::EBook),
    ("txt", FileCategory::PlainText),
];

/// Category of `path` by its (case-insensitive) extension.
pub fn detect_category(path: &Path) -> Option<FileCategory> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, c)| *c)
}

/// `true` when the extension is on the recognised list.
pub fn is_supported(path: &Path) -> bool {
    detect_category(path).is_some()
}

/// Make `path` absolute against the current directory without resolving
/// symlinks, so de-duplication compares what the user actually picked.
pub fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Recursively collect recognised files under `dir`, sorted by file name
/// within each directory. Symlinks are not followed.
///
/// Unreadable entries are skipped; only a missing or non-directory root is
/// an error.
pub fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let root = absolute_path(dir);
    let files: Vec<PathBuf> = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_supported(p))
        .collect();

    debug!("Scanned {}: {} recognised files", root.display(), files.len());
    Ok(files)
}
