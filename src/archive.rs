//! Scratch space handling for downloaded subtitle archives.
//!
//! Everything written to the scratch directory is owned by a [`ScratchGuard`]
//! so that it is removed again on every path out of retrieval.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::SubtitleError;

/// Guard for scratch resources that are removed on drop
#[derive(Debug)]
pub enum ScratchGuard {
    File(PathBuf),
    Directory(PathBuf),
}

impl ScratchGuard {
    pub fn path(&self) -> &Path {
        match self {
            ScratchGuard::File(path) | ScratchGuard::Directory(path) => path,
        }
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        let result = match self {
            ScratchGuard::File(path) => fs::remove_file(path),
            ScratchGuard::Directory(path) => fs::remove_dir_all(path),
        };
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to clean up {}: {}", self.path().display(), e),
        }
    }
}

/// A downloaded archive and the directory it was unpacked into.
#[derive(Debug)]
pub struct RetrievedArchive {
    pub extract_dir: ScratchGuard,
    // Only held so the archive file is removed on drop
    #[allow(dead_code)]
    pub archive: ScratchGuard,
}

/// Sibling directory named after the archive without its extension.
pub fn extract_dir_for(archive_path: &Path) -> PathBuf {
    let stripped = archive_path.with_extension("");
    if stripped == archive_path {
        let mut name = stripped.into_os_string();
        name.push("_unpacked");
        PathBuf::from(name)
    } else {
        stripped
    }
}

/// Unpacks a zip archive into `dest`, creating it if needed.
pub fn unpack_zip(archive_path: &Path, dest: &Path) -> Result<(), SubtitleError> {
    let extraction_error = |reason: String| SubtitleError::Extraction {
        path: archive_path.to_path_buf(),
        reason,
    };

    let file = File::open(archive_path).map_err(|e| extraction_error(e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| extraction_error(e.to_string()))?;
    fs::create_dir_all(dest).map_err(|e| extraction_error(e.to_string()))?;
    archive
        .extract(dest)
        .map_err(|e| extraction_error(e.to_string()))
}

/// Files below `dir` whose extension satisfies `accept`, sorted by path.
pub fn list_files_with_extensions<F>(dir: &Path, accept: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> bool,
{
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Failed to read scratch entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| accept(ext))
        })
        .collect();
    files.sort();
    files
}
