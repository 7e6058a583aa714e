//! The conversion seam: turn one source file into Markdown text.
//!
//! The conversion itself is delegated. [`Converter`] is the only contract
//! the queue relies on; [`CommandConverter`] drives an external program
//! (Microsoft's `markitdown` CLI by default), and any
//! `Fn(&Path) -> Result<String, ConvertError>` closure is a converter too,
//! which is how embedders plug in their own back end.
//!
//! ## Why spawn_blocking?
//!
//! Converters are synchronous and can take minutes on a large PDF or an
//! audio file. [`convert_file`] runs them on Tokio's blocking pool so the
//! runtime's worker threads (and any UI polling them) never stall.

use crate::error::ConvertError;
use crate::pipeline::postprocess;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Program invoked by [`CommandConverter::default`].
pub const DEFAULT_CONVERTER_PROGRAM: &str = "markitdown";

/// Turns a document into Markdown text.
///
/// Implementations must be `Send + Sync`: the queue calls them from
/// Tokio's blocking pool. Returning empty text is allowed; the queue records
/// it as "No content extracted".
pub trait Converter: Send + Sync {
    fn convert(&self, path: &Path) -> Result<String, ConvertError>;
}

impl<F> Converter for F
where
    F: Fn(&Path) -> Result<String, ConvertError> + Send + Sync,
{
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        self(path)
    }
}

/// Runs `<program> [args...] <path>` and reads Markdown from its stdout.
///
/// # Example
/// ```rust
/// use mdbatch::CommandConverter;
///
/// let converter = CommandConverter::new("markitdown").arg("--keep-data-uris");
/// assert_eq!(converter.program(), std::path::Path::new("markitdown"));
/// ```
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Default for CommandConverter {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERTER_PROGRAM)
    }
}

impl CommandConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument placed before the input path.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Converter for CommandConverter {
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        let program = self.program.display().to_string();
        if program.is_empty() {
            return Err(ConvertError::ConverterUnavailable {
                program,
                detail: "no converter program configured".into(),
            });
        }
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConvertError::ConverterUnavailable {
                        program: program.clone(),
                        detail: e.to_string(),
                    }
                } else {
                    ConvertError::from(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = last_meaningful_line(&stderr)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{program} exited with {}", output.status));
            return Err(ConvertError::Failed { detail });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// The last non-blank stderr line; Python tracebacks end with the message.
fn last_meaningful_line(stderr: &str) -> Option<&str> {
    stderr.lines().map(str::trim).rfind(|l| !l.is_empty())
}

/// Convert one file on the blocking pool, optionally cleaning the output.
///
/// Only an empty string is [`ConvertError::NoContent`]; whitespace is content.
/// Cleanup never turns a success into a failure: text that would clean down
/// to nothing is kept as returned.
pub async fn convert_file(
    converter: Arc<dyn Converter>,
    path: &Path,
    clean: bool,
) -> Result<String, ConvertError> {
    let start = Instant::now();
    let owned = path.to_path_buf();

    let text = tokio::task::spawn_blocking(move || converter.convert(&owned))
        .await
        .map_err(|e| ConvertError::Aborted {
            detail: e.to_string(),
        })??;

    debug!(
        "Converted {} in {}ms ({} bytes)",
        path.display(),
        start.elapsed().as_millis(),
        text.len()
    );

    if text.is_empty() {
        return Err(ConvertError::NoContent);
    }
    if !clean {
        return Ok(text);
    }
    let cleaned = postprocess::clean_markdown(&text);
    Ok(if cleaned.is_empty() { text } else { cleaned })
}
