use std::io;

use bytes::Bytes;
use serde_json::Value;

use super::shallow_children;
use crate::TRACING_TARGET_WRITER;
use crate::backup::BackupManager;
use crate::error::{Error, ErrorKind, Result};
use crate::fs::{self, EntryKind, PathLocks, SIDECAR_NAME};
use crate::node::{
    NameSource, Node, NodeDocument, NodeViolation, Timestamp, decode_sidecar, document_from_value,
    encode_sidecar, merge_with_directory, stamp_document, validate_node,
};
use crate::path::{PathResolver, ResolvedPath, Scope};

/// How a write request body is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// A node document for a directory's sidecar.
    Json,
    /// An opaque file payload.
    Raw,
    /// A structured body (form or multipart) that is not a byte payload.
    Structured,
}

impl ContentKind {
    /// Classifies a `Content-Type` header value.
    ///
    /// `application/json` and `+json` suffixes are JSON. Form and multipart
    /// bodies are structured. Anything else, including a missing header, is a
    /// raw payload.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return Self::Raw;
        };

        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/json" || essence.ends_with("+json") {
            Self::Json
        } else if essence == "application/x-www-form-urlencoded" || essence.starts_with("multipart/") {
            Self::Structured
        } else {
            Self::Raw
        }
    }
}

/// The result of a successful write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    /// The node as it exists after the write.
    pub node: Node,
    /// `true` if the filesystem entry did not exist before.
    pub created: bool,
}

/// Creates, updates and deletes nodes.
#[derive(Debug, Clone)]
pub struct TreeWriter {
    resolver: PathResolver,
    locks: PathLocks,
    backups: BackupManager,
    backup_on_update: bool,
}

impl TreeWriter {
    /// Creates a writer.
    pub fn new(
        resolver: PathResolver,
        locks: PathLocks,
        backups: BackupManager,
        backup_on_update: bool,
    ) -> Self {
        Self {
            resolver,
            locks,
            backups,
            backup_on_update,
        }
    }

    /// Creates or updates the node at `raw`.
    ///
    /// A JSON body replaces the directory's sidecar (creating the directory if
    /// needed); any other body is written verbatim as a file. A missing or
    /// empty body, or a structured body, is rejected before the filesystem is
    /// touched.
    pub async fn write_node(
        &self,
        raw: &str,
        content_type: Option<&str>,
        body: Option<Bytes>,
    ) -> Result<WriteOutcome> {
        let Some(body) = body.filter(|body| !body.is_empty()) else {
            return Err(Error::validation("request body is required"));
        };

        match ContentKind::from_content_type(content_type) {
            ContentKind::Json => {
                let document = parse_document(&body)?;
                let resolved = self.resolver.resolve_for_write(Scope::Content, raw).await?;
                self.write_document(resolved, document).await
            }
            ContentKind::Raw => {
                let resolved = self.resolver.resolve_for_write(Scope::Content, raw).await?;
                self.write_file(resolved, &body).await
            }
            ContentKind::Structured => Err(Error::validation(
                "file content must be sent as a raw byte payload",
            )),
        }
    }

    /// Recursively removes the node at `raw`.
    pub async fn delete_node(&self, raw: &str) -> Result<()> {
        let (resolved, kind) = self.resolver.resolve_existing(Scope::Content, raw).await?;

        if resolved.is_root() {
            return Err(Error::forbidden("the content root cannot be deleted"));
        }

        if fs::is_reserved_name(resolved.name()) {
            return Err(Error::validation(format!(
                "'{}' is managed by the engine and cannot be deleted",
                resolved.name()
            )));
        }

        let _guard = self.locks.lock(resolved.absolute()).await;
        let removed = match kind {
            EntryKind::Directory => tokio::fs::remove_dir_all(resolved.absolute()).await,
            EntryKind::File => tokio::fs::remove_file(resolved.absolute()).await,
        };

        removed.map_err(|err| {
            tracing::error!(
                target: TRACING_TARGET_WRITER,
                path = %resolved.logical(),
                error = %err,
                "Failed to delete node"
            );
            Error::io("failed to delete node", err)
        })?;

        tracing::debug!(
            target: TRACING_TARGET_WRITER,
            path = %resolved.logical(),
            "Deleted node"
        );

        Ok(())
    }

    async fn write_document(
        &self,
        resolved: ResolvedPath,
        mut document: NodeDocument,
    ) -> Result<WriteOutcome> {
        let dir = resolved.absolute();
        let _guard = self.locks.lock(dir).await;

        let existing = fs::entry_kind(dir).await?;
        if existing == Some(EntryKind::File) {
            return Err(Error::conflict(format!(
                "'{}' is a file and cannot hold node metadata",
                resolved.logical()
            )));
        }

        let previous = match existing {
            Some(EntryKind::Directory) => self.read_previous(&resolved).await?,
            _ => None,
        };

        if let Some(previous) = &previous {
            if previous.node_type != document.node_type {
                tracing::info!(
                    target: TRACING_TARGET_WRITER,
                    path = %resolved.logical(),
                    from = %previous.node_type,
                    to = %document.node_type,
                    "Changing node type"
                );
            }

            if self.backup_on_update {
                self.backups.snapshot(dir, previous).await?;
            }
        }

        stamp_document(&mut document, previous.as_ref(), Timestamp::now());

        let created = existing.is_none();
        if created {
            ensure_dir(&resolved).await?;
        }

        let bytes = encode_sidecar(&document)?;
        fs::write_atomic(&dir.join(SIDECAR_NAME), &bytes).await?;
        let children = shallow_children(dir).await?;

        tracing::debug!(
            target: TRACING_TARGET_WRITER,
            path = %resolved.logical(),
            node_type = %document.node_type,
            created,
            "Wrote node metadata"
        );

        Ok(WriteOutcome {
            node: merge_with_directory(Some(document), resolved.name(), children),
            created,
        })
    }

    /// Reads the live sidecar before an update.
    ///
    /// A corrupt sidecar is preserved as a raw backup and then replaced.
    async fn read_previous(&self, resolved: &ResolvedPath) -> Result<Option<NodeDocument>> {
        let dir = resolved.absolute();
        let Some(bytes) = fs::read_optional(&dir.join(SIDECAR_NAME)).await? else {
            return Ok(None);
        };

        match decode_sidecar(&bytes) {
            Ok(document) => Ok(Some(document)),
            Err(err) if err.kind() == ErrorKind::Parse => {
                let name = self.backups.snapshot_raw(dir, &bytes).await?;
                tracing::warn!(
                    target: TRACING_TARGET_WRITER,
                    path = %resolved.logical(),
                    backup = %name,
                    error = %err,
                    "Replacing corrupt sidecar"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn write_file(&self, resolved: ResolvedPath, body: &[u8]) -> Result<WriteOutcome> {
        let path = resolved.absolute();
        let _guard = self.locks.lock(path).await;

        let existing = fs::entry_kind(path).await?;
        if existing == Some(EntryKind::Directory) {
            return Err(Error::conflict(format!(
                "'{}' is a directory and cannot be overwritten with file content",
                resolved.logical()
            )));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| creation_error(&resolved, err))?;
        }

        fs::write_atomic(path, body).await?;
        let created = existing.is_none();

        tracing::debug!(
            target: TRACING_TARGET_WRITER,
            path = %resolved.logical(),
            size = body.len(),
            created,
            "Wrote file node"
        );

        Ok(WriteOutcome {
            node: Node::file(resolved.name()),
            created,
        })
    }
}

/// Parses and validates a JSON node document from a request body.
fn parse_document(body: &[u8]) -> Result<NodeDocument> {
    let mut value: Value = serde_json::from_slice(body).map_err(|err| {
        Error::validation(format!("request body is not valid JSON: {err}")).with_source(err)
    })?;

    validate_node(&value, NameSource::Path).inspect_err(|violation| {
        tracing::warn!(
            target: TRACING_TARGET_WRITER,
            field = %violation.field(),
            code = violation.code(),
            "Rejected invalid node document"
        );
    })?;

    let document = document_from_value(&mut value).map_err(|err| {
        Error::validation(format!("invalid node document: {err}")).with_source(err)
    })?;

    if !document.node_type.is_directory() {
        return Err(NodeViolation::new(
            "type",
            "file_metadata",
            "a node document must declare a directory type (folder, page or site)",
        )
        .into());
    }

    Ok(document)
}

async fn ensure_dir(resolved: &ResolvedPath) -> Result<()> {
    tokio::fs::create_dir_all(resolved.absolute())
        .await
        .map_err(|err| creation_error(resolved, err))
}

fn creation_error(resolved: &ResolvedPath, err: io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::AlreadyExists | io::ErrorKind::NotADirectory => Error::conflict(format!(
            "a file is in the way of '{}'",
            resolved.logical()
        ))
        .with_source(err),
        _ => Error::io("failed to create directory", err),
    }
}

#[cfg(test)]
mod tests {
    use std::fs as stdfs;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::node::NodeType;

    struct Fixture {
        _temp: TempDir,
        root: std::path::PathBuf,
        writer: TreeWriter,
    }

    fn fixture(backup_on_update: bool) -> anyhow::Result<Fixture> {
        let temp = TempDir::new()?;
        let root = temp.path().canonicalize()?;
        let resolver = PathResolver::new(&root);
        let locks = PathLocks::new(4);
        let backups = BackupManager::new(resolver.clone(), locks.clone());
        let writer = TreeWriter::new(resolver, locks, backups, backup_on_update);

        Ok(Fixture {
            _temp: temp,
            root,
            writer,
        })
    }

    fn json_body(value: serde_json::Value) -> Option<Bytes> {
        Some(Bytes::from(value.to_string()))
    }

    #[test]
    fn classifies_content_types() {
        use ContentKind::*;
        assert_eq!(ContentKind::from_content_type(Some("application/json")), Json);
        assert_eq!(
            ContentKind::from_content_type(Some("application/vnd.contree+json; charset=utf-8")),
            Json
        );
        assert_eq!(ContentKind::from_content_type(Some("multipart/form-data; boundary=x")), Structured);
        assert_eq!(
            ContentKind::from_content_type(Some("application/x-www-form-urlencoded")),
            Structured
        );
        assert_eq!(ContentKind::from_content_type(Some("image/png")), Raw);
        assert_eq!(ContentKind::from_content_type(None), Raw);
    }

    #[tokio::test]
    async fn json_write_creates_then_updates() -> anyhow::Result<()> {
        let fx = fixture(true)?;
        let body = json_body(json!({"type": "page", "name": "ignored", "title": "About"}));

        let first = fx.writer.write_node("/scr/site/about", Some("application/json"), body.clone()).await?;
        assert!(first.created);
        assert_eq!(first.node.name, "about");
        assert_eq!(first.node.node_type, NodeType::Page);
        assert!(fx.root.join("site/about").join(SIDECAR_NAME).is_file());

        let second = fx.writer.write_node("/scr/site/about", Some("application/json"), body).await?;
        assert!(!second.created);
        assert_eq!(second.node.metadata.id, first.node.metadata.id);
        assert_eq!(second.node.metadata.created_at, first.node.metadata.created_at);

        let stored: serde_json::Value =
            serde_json::from_slice(&stdfs::read(fx.root.join("site/about").join(SIDECAR_NAME))?)?;
        assert!(stored.get("name").is_none());
        assert!(stored.get("children").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn update_snapshots_previous_metadata() -> anyhow::Result<()> {
        let fx = fixture(true)?;
        stdfs::create_dir(fx.root.join("docs"))?;
        stdfs::write(
            fx.root.join("docs").join(SIDECAR_NAME),
            br#"{"type":"folder","id":"docs-1","createdAt":1,"updatedAt":1700000000000}"#,
        )?;

        let outcome = fx
            .writer
            .write_node("/scr/docs", Some("application/json"), json_body(json!({"type": "site"})))
            .await?;

        assert!(!outcome.created);
        assert_eq!(outcome.node.node_type, NodeType::Site);
        assert_eq!(outcome.node.metadata.id.as_deref(), Some("docs-1"));
        assert!(fx.root.join("docs/.content-1700000000000.json").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn update_without_backups_leaves_no_snapshot() -> anyhow::Result<()> {
        let fx = fixture(false)?;
        stdfs::create_dir(fx.root.join("docs"))?;
        stdfs::write(fx.root.join("docs").join(SIDECAR_NAME), br#"{"type":"folder","updatedAt":5}"#)?;

        fx.writer
            .write_node("/scr/docs", Some("application/json"), json_body(json!({"type": "folder"})))
            .await?;

        assert!(!fx.root.join("docs/.content-5.json").exists());
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_sidecar_is_preserved_before_replacement() -> anyhow::Result<()> {
        let fx = fixture(true)?;
        stdfs::create_dir(fx.root.join("docs"))?;
        stdfs::write(fx.root.join("docs").join(SIDECAR_NAME), b"{ broken")?;

        fx.writer
            .write_node("/scr/docs", Some("application/json"), json_body(json!({"type": "folder"})))
            .await?;

        let backups: Vec<_> = stdfs::read_dir(fx.root.join("docs"))?
            .filter_map(|entry| entry.ok()?.file_name().into_string().ok())
            .filter(|name| fs::is_backup_name(name))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(stdfs::read(fx.root.join("docs").join(&backups[0]))?, b"{ broken");
        Ok(())
    }

    #[tokio::test]
    async fn raw_write_creates_parents_and_reports_existence() -> anyhow::Result<()> {
        let fx = fixture(true)?;

        let first = fx
            .writer
            .write_node("/scr/a/b/notes.txt", Some("text/plain"), Some(Bytes::from_static(b"one")))
            .await?;
        assert!(first.created);
        assert_eq!(first.node, Node::file("notes.txt"));

        let second = fx
            .writer
            .write_node("/scr/a/b/notes.txt", None, Some(Bytes::from_static(b"two")))
            .await?;
        assert!(!second.created);
        assert_eq!(stdfs::read(fx.root.join("a/b/notes.txt"))?, b"two");
        Ok(())
    }

    #[tokio::test]
    async fn rejections_happen_before_any_write() -> anyhow::Result<()> {
        let fx = fixture(true)?;

        let cases = [
            (Some("application/json"), None, ErrorKind::Validation),
            (Some("text/plain"), Some(Bytes::new()), ErrorKind::Validation),
            (Some("multipart/form-data"), Some(Bytes::from_static(b"x")), ErrorKind::Validation),
            (Some("application/json"), Some(Bytes::from_static(b"{")), ErrorKind::Validation),
            (
                Some("application/json"),
                json_body(json!({"type": "widget"})),
                ErrorKind::Validation,
            ),
            (
                Some("application/json"),
                json_body(json!({"type": "file"})),
                ErrorKind::Validation,
            ),
            (
                Some("application/json"),
                json_body(json!({"type": "folder", "createdAt": "banana"})),
                ErrorKind::Validation,
            ),
        ];

        for (content_type, body, kind) in cases {
            let error = fx.writer.write_node("/scr/new", content_type, body).await.unwrap_err();
            assert_eq!(error.kind(), kind);
        }

        assert!(!fx.root.join("new").exists());
        Ok(())
    }

    #[tokio::test]
    async fn writes_never_change_entry_kind() -> anyhow::Result<()> {
        let fx = fixture(true)?;
        stdfs::write(fx.root.join("file.txt"), b"x")?;
        stdfs::create_dir(fx.root.join("dir"))?;

        let error = fx
            .writer
            .write_node("/scr/file.txt", Some("application/json"), json_body(json!({"type": "folder"})))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Conflict);

        let error = fx
            .writer
            .write_node("/scr/dir", Some("text/plain"), Some(Bytes::from_static(b"x")))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Conflict);

        let error = fx
            .writer
            .write_node("/scr/file.txt/inner", Some("text/plain"), Some(Bytes::from_static(b"x")))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Conflict);
        Ok(())
    }

    #[tokio::test]
    async fn reserved_names_cannot_be_written_or_deleted() -> anyhow::Result<()> {
        let fx = fixture(true)?;
        stdfs::write(fx.root.join(SIDECAR_NAME), b"{}")?;

        let error = fx
            .writer
            .write_node("/scr/.content.json", Some("text/plain"), Some(Bytes::from_static(b"x")))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);

        let error = fx.writer.delete_node("/scr/.content.json").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        Ok(())
    }

    #[tokio::test]
    async fn reserved_segments_never_become_hidden_nodes() -> anyhow::Result<()> {
        let fx = fixture(true)?;
        stdfs::create_dir(fx.root.join("docs"))?;

        let error = fx
            .writer
            .write_node(
                "/scr/docs/.content-9.json",
                Some("application/json"),
                json_body(json!({"type": "folder"})),
            )
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert!(!fx.root.join("docs/.content-9.json").exists());

        let error = fx
            .writer
            .write_node("/scr/.contree-x.tmp/f.txt", None, Some(Bytes::from_static(b"f")))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert!(!fx.root.join(".contree-x.tmp").exists());

        assert_eq!(stdfs::read_dir(fx.root.join("docs"))?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_updates_keep_a_single_identity() -> anyhow::Result<()> {
        let fx = fixture(true)?;
        let first = fx
            .writer
            .write_node("/scr/docs", Some("application/json"), json_body(json!({"type": "folder"})))
            .await?;

        let writes = (0..16).map(|i| {
            let writer = fx.writer.clone();
            tokio::spawn(async move {
                let body = json_body(json!({"type": "page", "title": format!("rev {i}")}));
                writer.write_node("/scr/docs", Some("application/json"), body).await
            })
        });

        for write in writes.collect::<Vec<_>>() {
            let outcome = write.await??;
            assert!(!outcome.created);
            assert_eq!(outcome.node.metadata.id, first.node.metadata.id);
            assert_eq!(outcome.node.metadata.created_at, first.node.metadata.created_at);
        }

        let stored = decode_sidecar(&stdfs::read(fx.root.join("docs").join(SIDECAR_NAME))?)?;
        assert_eq!(stored.node_type, NodeType::Page);
        assert_eq!(stored.metadata.id, first.node.metadata.id);
        assert_eq!(stored.metadata.created_at, first.node.metadata.created_at);

        let leftovers = stdfs::read_dir(fx.root.join("docs"))?
            .filter_map(|entry| entry.ok()?.file_name().into_string().ok())
            .filter(|name| fs::is_temp_name(name))
            .count();
        assert_eq!(leftovers, 0);
        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_subtrees() -> anyhow::Result<()> {
        let fx = fixture(true)?;
        stdfs::create_dir_all(fx.root.join("a/b/c"))?;
        stdfs::write(fx.root.join("a/b/c/d.txt"), b"d")?;

        fx.writer.delete_node("/scr/a").await?;
        assert!(!fx.root.join("a").exists());

        let error = fx.writer.delete_node("/scr/a").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);

        let error = fx.writer.delete_node("/scr").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Forbidden);
        assert!(fx.root.exists());
        Ok(())
    }
}
