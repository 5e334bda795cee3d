//! File selection: find the convertible files in an extracted tree.
//!
//! Walks the working tree recursively and keeps every file whose extension
//! matches the declared source language's known extensions
//! (case-insensitively). The walk sorts siblings by file name so discovery
//! order is deterministic across platforms; the returned order is the
//! order the batch loop will process files in.
//!
//! An empty result is valid — zero convertible files is a successful
//! (if useless) batch, not an error.

use crate::error::ConvertError;
use crate::languages;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Collect all files under `root` convertible from `source_lang`, in
/// discovery order.
pub fn select_files(root: &Path, source_lang: &str) -> Result<Vec<PathBuf>, ConvertError> {
    let extensions = languages::extensions_for(source_lang);
    if extensions.is_empty() {
        debug!("no known extensions for language '{source_lang}'");
        return Ok(Vec::new());
    }

    let mut selected = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            ConvertError::io(
                path,
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(ext) = file_extension(entry.path()) {
            if languages::matches_language(source_lang, &ext) {
                debug!("selected {}", entry.path().display());
                selected.push(entry.into_path());
            }
        }
    }

    Ok(selected)
}

/// The file's extension with a leading dot, as-is (matching is the
/// caller's concern).
fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
}
