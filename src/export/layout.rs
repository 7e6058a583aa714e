//! Output placement: where each completed item lands inside an export.
//!
//! Every export is planned in full before anything is written, so a
//! collision under [`CollisionPolicy::Error`] aborts cleanly and the ZIP
//! writer never sees the same entry name twice.

use crate::config::{CollisionPolicy, ExportOptions};
use crate::error::BatchError;
use crate::item::QueueItem;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// File name of the generated index document.
pub const INDEX_FILE_NAME: &str = "README.md";

/// File name of the generated summary document.
pub const SUMMARY_FILE_NAME: &str = "conversion_summary.json";

/// One file to be written, relative to the export root.
#[derive(Debug, Clone)]
pub(crate) struct PlannedFile<'a> {
    /// `/`-separated path inside the export.
    pub path: String,
    pub contents: Cow<'a, str>,
    /// Display name of the source item, or the document name.
    pub name: String,
    /// Source path for items, a label for generated documents.
    pub origin: String,
    /// Byte size of the source, 0 for generated documents.
    pub source_size: u64,
    pub generated: bool,
}

/// The resolved set of files for one export.
#[derive(Debug, Default)]
pub(crate) struct ExportPlan<'a> {
    files: Vec<PlannedFile<'a>>,
    by_path: HashMap<String, usize>,
    pub collisions: usize,
}

impl<'a> ExportPlan<'a> {
    /// Lay out every `Completed` item in `items`.
    ///
    /// `items` is the whole queue: the common ancestor is computed over all
    /// of it, not only the completed subset.
    pub fn for_items(items: &'a [QueueItem], options: &ExportOptions) -> Result<Self, BatchError> {
        let root = if options.preserve_structure {
            common_ancestor(items.iter().filter_map(|i| i.path().parent()))
        } else {
            None
        };

        let mut plan = Self::default();
        for item in items.iter().filter(|i| i.is_completed()) {
            let path = output_path(item, root.as_deref());
            plan.insert(
                PlannedFile {
                    path,
                    contents: Cow::Borrowed(item.content()),
                    name: item.display_name().to_string(),
                    origin: item.path().display().to_string(),
                    source_size: item.size_bytes(),
                    generated: false,
                },
                options.collision_policy,
            )?;
        }

        if plan.files.is_empty() {
            return Err(BatchError::NothingToExport);
        }
        Ok(plan)
    }

    /// Add a generated document at the export root.
    pub fn add_generated(
        &mut self,
        name: &str,
        contents: String,
        policy: CollisionPolicy,
    ) -> Result<(), BatchError> {
        self.insert(
            PlannedFile {
                path: name.to_string(),
                contents: Cow::Owned(contents),
                name: name.to_string(),
                origin: format!("generated {name}"),
                source_size: 0,
                generated: true,
            },
            policy,
        )
    }

    fn insert(&mut self, file: PlannedFile<'a>, policy: CollisionPolicy) -> Result<(), BatchError> {
        match self.by_path.get(&file.path) {
            None => {
                self.by_path.insert(file.path.clone(), self.files.len());
                self.files.push(file);
            }
            Some(&slot) => {
                let previous = &self.files[slot];
                if policy == CollisionPolicy::Error {
                    return Err(BatchError::OutputCollision {
                        path: file.path,
                        first: previous.origin.clone(),
                        second: file.origin,
                    });
                }
                warn!(
                    "Output collision on {}: {} replaces {}",
                    file.path, file.origin, previous.origin
                );
                self.collisions += 1;
                self.files[slot] = file;
            }
        }
        Ok(())
    }

    /// Files in write order.
    pub fn files(&self) -> &[PlannedFile<'a>] {
        &self.files
    }

    /// The item files only (no generated documents), in write order.
    pub fn item_files(&self) -> impl Iterator<Item = &PlannedFile<'a>> {
        self.files.iter().filter(|f| !f.generated)
    }
}

/// Deepest directory containing every path in `dirs`, or `None` when there
/// is none (no inputs, or different roots/drives).
pub fn common_ancestor<'p>(dirs: impl IntoIterator<Item = &'p Path>) -> Option<PathBuf> {
    let mut dirs = dirs.into_iter();
    let mut prefix: Vec<Component<'p>> = dirs.next()?.components().collect();

    for dir in dirs {
        let shared = prefix
            .iter()
            .zip(dir.components())
            .take_while(|(a, b)| *a == b)
            .count();
        prefix.truncate(shared);
    }

    if prefix.is_empty() {
        None
    } else {
        Some(prefix.iter().collect())
    }
}

/// `/`-joined output path for `item`, nested under its directory relative to
/// `root` when one is given.
pub(crate) fn output_path(item: &QueueItem, root: Option<&Path>) -> String {
    let name = item.markdown_file_name();
    let relative = root.and_then(|root| item.path().parent()?.strip_prefix(root).ok());

    let mut parts: Vec<String> = relative
        .map(|rel| {
            rel.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    parts.push(name);
    parts.join("/")
}
