//! Directory output.

use super::layout::ExportPlan;
use crate::error::BatchError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Create `parent/base`, or `parent/base_1`, `parent/base_2`, … if taken.
pub(crate) fn create_unique_dir(parent: &Path, base: &str) -> Result<PathBuf, BatchError> {
    fs::create_dir_all(parent).map_err(|e| BatchError::OutputWriteFailed {
        path: parent.to_path_buf(),
        source: e,
    })?;

    for n in 0u32..1000 {
        let candidate = if n == 0 {
            parent.join(base)
        } else {
            parent.join(format!("{base}_{n}"))
        };
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(BatchError::OutputWriteFailed {
                    path: candidate,
                    source: e,
                })
            }
        }
    }
    Err(BatchError::Internal(format!(
        "no free export directory name for '{base}' in {}",
        parent.display()
    )))
}

/// Write every planned file under `root`. Files already written stay on
/// disk if a later one fails.
pub(crate) fn write_tree(root: &Path, plan: &ExportPlan<'_>) -> Result<(), BatchError> {
    for file in plan.files() {
        let target = file.path.split('/').fold(root.to_path_buf(), |p, part| p.join(part));
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| BatchError::OutputWriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        fs::write(&target, file.contents.as_bytes()).map_err(|e| BatchError::OutputWriteFailed {
            path: target.clone(),
            source: e,
        })?;
        debug!("Wrote {}", target.display());
    }
    Ok(())
}
