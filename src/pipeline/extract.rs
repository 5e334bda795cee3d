//! Bundle extraction: materialise an upload into the working directory.
//!
//! Two upload shapes exist: a flat set of individually named files with
//! relative paths (folder mode) and one or more zip archives (zip mode).
//! Both land under `<workdir>/extracted/` with relative paths preserved.
//!
//! Entry names are sanitised before touching the filesystem — an archive
//! or upload must never write outside the working directory, so absolute
//! paths and `..` components are rejected or skipped.

use crate::error::ConvertError;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// One uploaded file: a relative name and its raw bytes.
#[derive(Debug, Clone)]
pub struct BundleFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl BundleFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// An uploaded bundle, in one of the two upload modes.
#[derive(Debug, Clone)]
pub enum Bundle {
    /// Folder mode: individually uploaded files with relative path names.
    Files(Vec<BundleFile>),
    /// Zip mode: one or more zip archive blobs.
    Archives(Vec<BundleFile>),
}

/// Materialise `bundle` under `extract_dir`, creating intermediate
/// directories as needed.
pub fn materialize(bundle: &Bundle, extract_dir: &Path) -> Result<(), ConvertError> {
    std::fs::create_dir_all(extract_dir).map_err(|e| ConvertError::io(extract_dir, e))?;

    match bundle {
        Bundle::Files(files) => write_files(files, extract_dir),
        Bundle::Archives(archives) => extract_archives(archives, extract_dir),
    }
}

fn write_files(files: &[BundleFile], extract_dir: &Path) -> Result<(), ConvertError> {
    for file in files {
        if file.name.is_empty() {
            continue;
        }
        let Some(rel) = sanitize_relative(&file.name) else {
            warn!("skipping upload with unsafe path: {}", file.name);
            continue;
        };
        let dest = extract_dir.join(&rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConvertError::io(parent, e))?;
        }
        debug!("writing upload {} to {}", file.name, dest.display());
        std::fs::write(&dest, &file.bytes).map_err(|e| ConvertError::io(&dest, e))?;
    }
    Ok(())
}

fn extract_archives(archives: &[BundleFile], extract_dir: &Path) -> Result<(), ConvertError> {
    for archive in archives {
        if archive.name.is_empty() {
            continue;
        }
        // A non-.zip upload in zip mode is skipped, not fatal.
        if !archive.name.to_ascii_lowercase().ends_with(".zip") {
            warn!("'{}' is not a zip archive; skipping", archive.name);
            continue;
        }
        info!("extracting archive {} to {}", archive.name, extract_dir.display());
        extract_zip(&archive.name, &archive.bytes, extract_dir)?;
    }
    Ok(())
}

/// Extract one zip archive into `dest`, preserving relative entry paths.
fn extract_zip(name: &str, bytes: &[u8], dest: &Path) -> Result<(), ConvertError> {
    let cursor = Cursor::new(bytes);
    let mut archive =
        zip::ZipArchive::new(cursor).map_err(|e| ConvertError::ArchiveError {
            name: name.to_string(),
            detail: e.to_string(),
        })?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| ConvertError::ArchiveError {
            name: name.to_string(),
            detail: format!("entry {i}: {e}"),
        })?;

        // enclosed_name rejects absolute paths and `..` traversal.
        let Some(rel) = entry.enclosed_name() else {
            warn!("{name}: skipping entry with unsafe path: {}", entry.name());
            continue;
        };
        let dest_path = dest.join(rel);

        if entry.is_dir() {
            std::fs::create_dir_all(&dest_path).map_err(|e| ConvertError::io(&dest_path, e))?;
        } else {
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ConvertError::io(parent, e))?;
            }
            let mut out = std::fs::File::create(&dest_path)
                .map_err(|e| ConvertError::io(&dest_path, e))?;
            std::io::copy(&mut entry, &mut out).map_err(|e| ConvertError::ArchiveError {
                name: name.to_string(),
                detail: format!("entry '{}': {e}", dest_path.display()),
            })?;
        }
    }

    Ok(())
}

/// Normalise an upload name to a safe relative path, or `None` if it
/// escapes the extraction root.
fn sanitize_relative(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    let mut rel = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => rel.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if rel.as_os_str().is_empty() {
        None
    } else {
        Some(rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
            for (name, content) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn folder_mode_preserves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = Bundle::Files(vec![
            BundleFile::new("main.c", "int main(void) {}"),
            BundleFile::new("src/util.c", "void util(void) {}"),
        ]);
        materialize(&bundle, dir.path()).unwrap();
        assert!(dir.path().join("main.c").is_file());
        assert!(dir.path().join("src/util.c").is_file());
    }

    #[test]
    fn folder_mode_skips_unsafe_names() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = Bundle::Files(vec![
            BundleFile::new("../evil.c", "x"),
            BundleFile::new("/abs.c", "x"),
            BundleFile::new("ok.c", "int x;"),
        ]);
        materialize(&bundle, dir.path()).unwrap();
        assert!(dir.path().join("ok.c").is_file());
        assert!(!dir.path().parent().unwrap().join("evil.c").exists());
    }

    #[test]
    fn zip_mode_extracts_entries() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = zip_bytes(&[("a.py", "print(1)"), ("pkg/b.py", "print(2)")]);
        let bundle = Bundle::Archives(vec![BundleFile::new("project.zip", bytes)]);
        materialize(&bundle, dir.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.py")).unwrap(),
            "print(1)"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("pkg/b.py")).unwrap(),
            "print(2)"
        );
    }

    #[test]
    fn zip_mode_skips_non_zip_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = Bundle::Archives(vec![BundleFile::new("notes.txt", "hello")]);
        materialize(&bundle, dir.path()).unwrap();
        assert!(!dir.path().join("notes.txt").exists());
    }

    #[test]
    fn corrupt_zip_is_an_archive_error() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = Bundle::Archives(vec![BundleFile::new("bad.zip", b"not a zip".to_vec())]);
        let err = materialize(&bundle, dir.path()).unwrap_err();
        assert!(matches!(err, ConvertError::ArchiveError { .. }));
        assert!(err.to_string().contains("bad.zip"));
    }
}
