//! ZIP output.

use super::layout::ExportPlan;
use crate::error::BatchError;
use std::fmt::Display;
use std::io::{Seek, Write};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write every planned file into a Deflate-compressed archive on `sink`.
///
/// `label` names the archive in errors (a path, or `<memory>`).
pub(crate) fn write_archive<W: Write + Seek>(
    sink: W,
    plan: &ExportPlan<'_>,
    label: &Path,
) -> Result<W, BatchError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(sink);

    for file in plan.files() {
        zip.start_file(file.path.as_str(), options)
            .map_err(|e| archive_error(label, e))?;
        zip.write_all(file.contents.as_bytes())
            .map_err(|e| archive_error(label, e))?;
        debug!("Archived {} ({} bytes)", file.path, file.contents.len());
    }

    zip.finish().map_err(|e| archive_error(label, e))
}

fn archive_error(label: &Path, e: impl Display) -> BatchError {
    BatchError::Archive {
        path: label.to_path_buf(),
        detail: e.to_string(),
    }
}
