//! Path expansion, subdirectory listing and removal.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::DeleteError;

/// Expand a leading `~` to the user's home directory.
pub fn expand_path(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) => rest,
        None => return PathBuf::from(path),
    };
    // `~user` is not supported; only `~`, `~/...` and `~\...`
    if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\')) {
        return PathBuf::from(path);
    }
    match dirs::home_dir() {
        Some(home) => {
            let rest = rest.trim_start_matches(['/', '\\']);
            if rest.is_empty() {
                home
            } else {
                home.join(rest)
            }
        }
        None => PathBuf::from(path),
    }
}

/// Immediate child directories of `path`, symlinks excluded. Empty when the
/// path is missing, not a directory, or unreadable. Order is whatever the OS
/// returns.
pub fn subdirectories(path: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("cannot list {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    entries
        .flatten()
        .filter(|entry| {
            // DirEntry::file_type does not follow symlinks
            entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
        })
        .map(|entry| entry.path())
        .collect()
}

/// [`subdirectories`] ordered by lowercased file name.
pub fn sorted_subdirectories(path: &Path) -> Vec<PathBuf> {
    let mut dirs = subdirectories(path);
    dirs.sort_by_cached_key(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });
    dirs
}

/// Permanently remove a file, symlink or directory tree. Symlinks are
/// unlinked, never followed.
pub fn remove_path(path: &Path) -> Result<(), DeleteError> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DeleteError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(DeleteError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        remove_link_or_file(path, &meta)
    };

    result.map_err(|source| DeleteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(windows)]
fn remove_link_or_file(path: &Path, meta: &fs::Metadata) -> io::Result<()> {
    use std::os::windows::fs::FileTypeExt;
    if meta.file_type().is_symlink_dir() {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(not(windows))]
fn remove_link_or_file(path: &Path, _meta: &fs::Metadata) -> io::Result<()> {
    fs::remove_file(path)
}
