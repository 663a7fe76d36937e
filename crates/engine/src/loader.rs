//! Bulk preloading from directories
//!
//! Both loaders walk a directory tree with `walkdir`. Entries whose name
//! starts with `.` or `_` are skipped, and skipped directories are not
//! descended into. A file's id is its name up to the first `.`; files with an
//! empty id are ignored.
//!
//! Loaders go through the public store API only (`add` and
//! `design_create`), so a preloaded database is indistinguishable from one
//! filled by hand.

use crate::database::Database;
use std::path::{Path, PathBuf};
use tracing::debug;
use viewstore_core::{DesignDocument, Document, Error, Result, ViewDefinition};
use walkdir::{DirEntry, WalkDir};

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.') || name.starts_with('_'))
            .unwrap_or(false)
}

fn file_id(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let id = name.split('.').next().unwrap_or_default();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Files to load, as `(id, path)` in walk order
fn candidate_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
    {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(id) = file_id(entry.path()) {
            files.push((id, entry.into_path()));
        }
    }
    Ok(files)
}

/// Add one text document per file under `dir`
///
/// Returns the number of documents added. A duplicate id fails with
/// `KeyExists`.
pub fn load_documents(db: &Database, dir: &Path) -> Result<usize> {
    let files = candidate_files(dir)?;
    for (id, path) in &files {
        let contents = std::fs::read_to_string(path)?;
        db.add(id, Document::Text(contents))?;
        debug!(id = %id, path = %path.display(), "document loaded");
    }
    Ok(files.len())
}

/// Install every view definition under `dir` as one design
///
/// Each file holds a JSON view definition (`{"map": ..., "reduce": ...}`)
/// named after the file. Returns the number of views installed.
pub fn load_views(db: &Database, dir: &Path, design_name: &str) -> Result<usize> {
    let mut design = DesignDocument::new();
    for (name, path) in candidate_files(dir)? {
        let contents = std::fs::read_to_string(&path)?;
        let definition: ViewDefinition = serde_json::from_str(&contents).map_err(|e| {
            Error::Serialization(format!("view definition {}: {}", path.display(), e))
        })?;
        design.views.insert(name, definition);
    }
    let count = design.views.len();
    db.design_create(design_name, design);
    Ok(count)
}
