//! Point-in-time snapshots of sidecar metadata.
//!
//! A backup is a sibling of the live sidecar named `.content-{stamp}.json`,
//! where the stamp is the snapshotted document's `updatedAt` (or `createdAt`)
//! in epoch milliseconds. Promotion renames a backup over the live sidecar.

use std::path::Path;

use crate::TRACING_TARGET_BACKUP;
use crate::error::{Error, Result};
use crate::fs::{self, EntryKind, PathLocks, SIDECAR_NAME, backup_name, is_backup_name};
use crate::node::{Node, NodeDocument, Timestamp, decode_sidecar, encode_sidecar, merge_with_directory};
use crate::path::{PathResolver, ResolvedPath, Scope};
use crate::tree::shallow_children;

/// Creates, lists and promotes sidecar backups.
#[derive(Debug, Clone)]
pub struct BackupManager {
    resolver: PathResolver,
    locks: PathLocks,
}

impl BackupManager {
    /// Creates a backup manager.
    pub fn new(resolver: PathResolver, locks: PathLocks) -> Self {
        Self { resolver, locks }
    }

    /// Snapshots the live sidecar of the directory at `raw`.
    ///
    /// Returns the backup file name. The live sidecar is left untouched.
    pub async fn backup(&self, raw: &str) -> Result<String> {
        let resolved = self.resolve_directory(Scope::Backup, raw).await?;
        let dir = resolved.absolute();
        let _guard = self.locks.lock(dir).await;

        let Some(bytes) = fs::read_optional(&dir.join(SIDECAR_NAME)).await? else {
            return Err(Error::not_found(format!(
                "'{}' has no metadata to back up",
                resolved.logical()
            )));
        };

        let document = decode_sidecar(&bytes)?;
        self.snapshot(dir, &document).await
    }

    /// Lists the backup file names of the directory at `raw`, sorted by name.
    pub async fn list_backups(&self, raw: &str) -> Result<Vec<String>> {
        let resolved = self.resolve_directory(Scope::Backup, raw).await?;

        let mut reader = tokio::fs::read_dir(resolved.absolute())
            .await
            .map_err(|err| Error::io("failed to list backups", err))?;

        let mut names = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|err| Error::io("failed to list backups", err))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };

            let is_file = entry
                .file_type()
                .await
                .map_err(|err| Error::io("failed to list backups", err))?
                .is_file();

            if is_file && is_backup_name(&name) {
                names.push(name);
            }
        }

        names.sort();

        tracing::debug!(
            target: TRACING_TARGET_BACKUP,
            path = %resolved.logical(),
            count = names.len(),
            "Listed backups"
        );

        Ok(names)
    }

    /// Makes the backup `name` the live sidecar of the directory at `raw`.
    ///
    /// The name must match the backup pattern. The backup is decoded before
    /// anything changes, the current live sidecar is snapshotted, and the
    /// backup is then renamed over the live sidecar in a single step.
    pub async fn promote_backup(&self, raw: &str, name: &str) -> Result<Node> {
        if !is_backup_name(name) {
            tracing::warn!(
                target: TRACING_TARGET_BACKUP,
                name = %name,
                "Rejected promotion of a non-backup file"
            );
            return Err(Error::validation(format!("'{name}' is not a backup file name")));
        }

        let resolved = self.resolve_directory(Scope::Backup, raw).await?;
        let dir = resolved.absolute();
        let backup_path = dir.join(name);
        let live_path = dir.join(SIDECAR_NAME);
        let _guard = self.locks.lock(dir).await;

        if fs::entry_kind(&backup_path).await? != Some(EntryKind::File) {
            return Err(Error::not_found(format!(
                "backup '{name}' does not exist at '{}'",
                resolved.logical()
            )));
        }

        let Some(bytes) = fs::read_optional(&backup_path).await? else {
            return Err(Error::not_found(format!(
                "backup '{name}' does not exist at '{}'",
                resolved.logical()
            )));
        };
        let document = decode_sidecar(&bytes)?;

        if let Some(live) = fs::read_optional(&live_path).await? {
            match decode_sidecar(&live) {
                Ok(live) => {
                    self.snapshot(dir, &live).await?;
                }
                Err(_) => {
                    self.snapshot_raw(dir, &live).await?;
                }
            }
        }

        tokio::fs::rename(&backup_path, &live_path)
            .await
            .map_err(|err| Error::io("failed to promote backup", err))?;

        tracing::info!(
            target: TRACING_TARGET_BACKUP,
            path = %resolved.logical(),
            backup = %name,
            "Promoted backup to live metadata"
        );

        let children = shallow_children(dir).await?;
        Ok(merge_with_directory(Some(document), resolved.name(), children))
    }

    /// Writes `document` to its backup file in `dir` and returns the file name.
    ///
    /// An existing backup with the same name already holds this version and is
    /// kept as is.
    pub(crate) async fn snapshot(&self, dir: &Path, document: &NodeDocument) -> Result<String> {
        let stamp = document
            .version_stamp()
            .map(Timestamp::file_stamp)
            .unwrap_or_else(|| Timestamp::now().file_stamp());
        let name = backup_name(&stamp);
        let path = dir.join(&name);

        if fs::entry_kind(&path).await?.is_some() {
            tracing::debug!(
                target: TRACING_TARGET_BACKUP,
                backup = %name,
                "Backup for this version already exists"
            );
            return Ok(name);
        }

        fs::write_atomic(&path, &encode_sidecar(document)?).await?;

        tracing::debug!(
            target: TRACING_TARGET_BACKUP,
            dir = %dir.display(),
            backup = %name,
            "Created backup"
        );

        Ok(name)
    }

    /// Copies undecodable sidecar bytes to a backup stamped with the current time.
    ///
    /// A name already taken in the same millisecond gets a numeric suffix.
    pub(crate) async fn snapshot_raw(&self, dir: &Path, bytes: &[u8]) -> Result<String> {
        let stamp = Timestamp::now().file_stamp();
        let mut name = backup_name(&stamp);
        let mut attempt = 1;
        while fs::entry_kind(&dir.join(&name)).await?.is_some() {
            name = backup_name(&format!("{stamp}-{attempt}"));
            attempt += 1;
        }

        fs::write_atomic(&dir.join(&name), bytes).await?;

        tracing::warn!(
            target: TRACING_TARGET_BACKUP,
            dir = %dir.display(),
            backup = %name,
            "Preserved undecodable sidecar"
        );

        Ok(name)
    }

    async fn resolve_directory(&self, scope: Scope, raw: &str) -> Result<ResolvedPath> {
        let (resolved, kind) = self.resolver.resolve_existing(scope, raw).await?;

        match kind {
            EntryKind::Directory => Ok(resolved),
            EntryKind::File => Err(Error::not_found(format!(
                "'{}' is not a directory",
                resolved.logical()
            ))),
        }
    }
}
