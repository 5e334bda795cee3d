//! Result packaging: re-archive the converted tree for download.
//!
//! Walks the working tree and writes a single deflate-compressed zip with
//! relative paths as entry names. The archive lands in the job's working
//! directory (next to, not inside, the extracted tree) so the registry's
//! storage reclamation covers it too.

use crate::error::ConvertError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File name of the result archive inside the job's working directory.
pub const ARCHIVE_NAME: &str = "converted_project.zip";

/// Archive everything under `src_dir` into `dest`, returning `dest`.
pub fn write_archive(src_dir: &Path, dest: &Path) -> Result<PathBuf, ConvertError> {
    let file = std::fs::File::create(dest).map_err(|e| ConvertError::io(dest, e))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0usize;
    for entry in WalkDir::new(src_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src_dir).to_path_buf();
            ConvertError::io(
                path,
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(src_dir)
            .expect("walkdir yields paths under src_dir");
        let name = rel.to_string_lossy().replace('\\', "/");

        debug!("archiving {name}");
        writer
            .start_file(&name, options)
            .map_err(|e| zip_io_error(dest, e))?;
        let bytes =
            std::fs::read(entry.path()).map_err(|e| ConvertError::io(entry.path(), e))?;
        writer
            .write_all(&bytes)
            .map_err(|e| ConvertError::io(dest, e))?;
        entries += 1;
    }

    writer.finish().map_err(|e| zip_io_error(dest, e))?;
    info!("packaged {entries} files into {}", dest.display());
    Ok(dest.to_path_buf())
}

fn zip_io_error(dest: &Path, e: zip::result::ZipError) -> ConvertError {
    ConvertError::io(dest, std::io::Error::other(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn archive_preserves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("extracted");
        write(&tree, "a.py", "print(1)");
        write(&tree, "pkg/b.py", "print(2)");

        let dest = dir.path().join(ARCHIVE_NAME);
        write_archive(&tree, &dest).unwrap();

        let file = std::fs::File::open(&dest).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = String::new();
        archive
            .by_name("pkg/b.py")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "print(2)");
    }

    #[test]
    fn empty_tree_produces_empty_archive() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("extracted");
        std::fs::create_dir_all(&tree).unwrap();

        let dest = dir.path().join(ARCHIVE_NAME);
        write_archive(&tree, &dest).unwrap();

        let file = std::fs::File::open(&dest).unwrap();
        let archive = zip::ZipArchive::new(file).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
