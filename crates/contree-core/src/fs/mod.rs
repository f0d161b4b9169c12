//! Filesystem primitives shared by the reader, writer and backup manager.
//!
//! Everything here operates on absolute paths that were already checked by the
//! [`PathResolver`](crate::PathResolver). Symlinks are treated as absent: they
//! are never listed and never followed.

mod lock;

use std::io;
use std::path::{Path, PathBuf};

pub use lock::{PathLockGuard, PathLocks};
use uuid::Uuid;

use crate::TRACING_TARGET_FS;
use crate::error::{Error, Result};

/// Name of the metadata sidecar inside a directory node.
pub const SIDECAR_NAME: &str = ".content.json";

const BACKUP_PREFIX: &str = ".content-";
const BACKUP_SUFFIX: &str = ".json";
const TEMP_PREFIX: &str = ".contree-";
const TEMP_SUFFIX: &str = ".tmp";

/// Returns the backup file name for a version stamp.
pub fn backup_name(stamp: &str) -> String {
    format!("{BACKUP_PREFIX}{stamp}{BACKUP_SUFFIX}")
}

/// Returns `true` if `name` matches `.content-{stamp}.json`.
///
/// The stamp must be non-empty and consist of ASCII alphanumerics, `-` or `.`.
pub fn is_backup_name(name: &str) -> bool {
    name.strip_prefix(BACKUP_PREFIX)
        .and_then(|rest| rest.strip_suffix(BACKUP_SUFFIX))
        .is_some_and(|stamp| {
            !stamp.is_empty()
                && stamp
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        })
}

/// Returns `true` for the temporary names used by [`write_atomic`].
pub fn is_temp_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

/// Returns `true` for names the engine manages itself.
pub fn is_reserved_name(name: &str) -> bool {
    name == SIDECAR_NAME || is_backup_name(name) || is_temp_name(name)
}

/// Kind of a filesystem entry as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
}

/// A listed directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// UTF-8 basename of the entry.
    pub name: String,
    /// Whether the entry is a file or a directory.
    pub kind: EntryKind,
}

/// Returns the kind of the entry at `path`, or `None` if there is none.
///
/// Symlinks and special files are reported as absent.
pub async fn entry_kind(path: &Path) -> Result<Option<EntryKind>> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
            ) =>
        {
            return Ok(None);
        }
        Err(err) => return Err(Error::io("failed to inspect entry", err)),
    };

    let file_type = metadata.file_type();
    Ok(if file_type.is_dir() {
        Some(EntryKind::Directory)
    } else if file_type.is_file() {
        Some(EntryKind::File)
    } else {
        None
    })
}

/// Lists a directory, sorted by name.
///
/// Reserved names, symlinks, special files and non UTF-8 names are omitted.
pub async fn list_dir(path: &Path) -> Result<Vec<DirEntry>> {
    let mut reader = tokio::fs::read_dir(path)
        .await
        .map_err(|err| Error::io("failed to list directory", err))?;

    let mut entries = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|err| Error::io("failed to list directory", err))?
    {
        let Ok(name) = entry.file_name().into_string() else {
            tracing::debug!(
                target: TRACING_TARGET_FS,
                path = %entry.path().display(),
                "Skipping entry with a non UTF-8 name"
            );
            continue;
        };

        if is_reserved_name(&name) {
            continue;
        }

        let file_type = entry
            .file_type()
            .await
            .map_err(|err| Error::io("failed to inspect entry", err))?;

        let kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            tracing::debug!(
                target: TRACING_TARGET_FS,
                path = %entry.path().display(),
                "Skipping symlink or special file"
            );
            continue;
        };

        entries.push(DirEntry { name, kind });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Reads a file, returning `None` when it does not exist.
pub async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(Error::io("failed to read file", err)),
    }
}

/// Creates a directory and its parents.
///
/// A directory that already exists, possibly created by a concurrent writer,
/// is not an error.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|err| Error::io("failed to create directory", err))
}

/// Writes `bytes` to `path` through a temporary sibling and a rename.
///
/// Readers observe either the previous content or the new content in full.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp = temp_path(path)?;

    if let Err(err) = tokio::fs::write(&temp, bytes).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(Error::io("failed to write temporary file", err));
    }

    if let Err(err) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(Error::io("failed to move file into place", err));
    }

    tracing::trace!(
        target: TRACING_TARGET_FS,
        path = %path.display(),
        size = bytes.len(),
        "Wrote file atomically"
    );

    Ok(())
}

fn temp_path(path: &Path) -> Result<PathBuf> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::internal("cannot write to a path without a parent"))?;

    Ok(parent.join(format!("{TEMP_PREFIX}{}{TEMP_SUFFIX}", Uuid::now_v7().simple())))
}
