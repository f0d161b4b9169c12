//! The content tree handle.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use crate::TRACING_TARGET_ENGINE;
use crate::backup::BackupManager;
use crate::config::ContentConfig;
use crate::error::{Error, Result};
use crate::fs::PathLocks;
use crate::node::Node;
use crate::path::PathResolver;
use crate::tree::{NodeContent, TreeReader, TreeWriter, WriteOutcome};

/// A handle to a content tree rooted at a directory.
///
/// The handle is created once at startup with [`ContentTree::open`] and is
/// cheap to clone. It keeps no cached state: every call re-reads the
/// filesystem.
#[derive(Debug, Clone)]
pub struct ContentTree {
    inner: Arc<ContentTreeInner>,
}

#[derive(Debug)]
struct ContentTreeInner {
    config: ContentConfig,
    resolver: PathResolver,
    reader: TreeReader,
    writer: TreeWriter,
    backups: BackupManager,
}

impl ContentTree {
    /// Opens the content tree described by `config`.
    ///
    /// The content root is created if it does not exist and is canonicalized
    /// so that every containment check compares resolved paths.
    pub async fn open(config: ContentConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.root)
            .await
            .map_err(|err| Error::io("failed to create content root", err))?;

        let root = tokio::fs::canonicalize(&config.root)
            .await
            .map_err(|err| Error::io("failed to canonicalize content root", err))?;

        let metadata = tokio::fs::metadata(&root)
            .await
            .map_err(|err| Error::io("failed to inspect content root", err))?;
        if !metadata.is_dir() {
            return Err(Error::internal(format!(
                "content root '{}' is not a directory",
                root.display()
            )));
        }

        let resolver = PathResolver::new(root);
        let locks = PathLocks::new(config.lock_stripes);
        let backups = BackupManager::new(resolver.clone(), locks.clone());
        let reader = TreeReader::new(
            resolver.clone(),
            config.max_walk_depth,
            config.walk_error_policy,
        );
        let writer = TreeWriter::new(
            resolver.clone(),
            locks,
            backups.clone(),
            config.backup_on_update,
        );

        tracing::info!(
            target: TRACING_TARGET_ENGINE,
            root = %resolver.root().display(),
            backup_on_update = config.backup_on_update,
            max_walk_depth = config.max_walk_depth,
            walk_error_policy = %config.walk_error_policy,
            lock_stripes = config.lock_stripes,
            "Opened content tree"
        );

        Ok(Self {
            inner: Arc::new(ContentTreeInner {
                config,
                resolver,
                reader,
                writer,
                backups,
            }),
        })
    }

    /// Returns the configuration the tree was opened with.
    pub fn config(&self) -> &ContentConfig {
        &self.inner.config
    }

    /// Returns the canonical content root.
    pub fn root(&self) -> &Path {
        self.inner.resolver.root()
    }

    /// Returns the path resolver.
    pub fn resolver(&self) -> &PathResolver {
        &self.inner.resolver
    }

    /// Builds a full snapshot of the tree. See [`TreeReader::get_tree`].
    pub async fn get_tree(&self) -> Result<Node> {
        self.inner.reader.get_tree().await
    }

    /// Reads one node. See [`TreeReader::get_node`].
    pub async fn get_node(&self, path: &str) -> Result<NodeContent> {
        self.inner.reader.get_node(path).await
    }

    /// Creates or updates one node. See [`TreeWriter::write_node`].
    pub async fn write_node(
        &self,
        path: &str,
        content_type: Option<&str>,
        body: Option<Bytes>,
    ) -> Result<WriteOutcome> {
        self.inner.writer.write_node(path, content_type, body).await
    }

    /// Recursively deletes one node. See [`TreeWriter::delete_node`].
    pub async fn delete_node(&self, path: &str) -> Result<()> {
        self.inner.writer.delete_node(path).await
    }

    /// Snapshots a directory's live metadata. See [`BackupManager::backup`].
    pub async fn backup(&self, path: &str) -> Result<String> {
        self.inner.backups.backup(path).await
    }

    /// Lists a directory's backups. See [`BackupManager::list_backups`].
    pub async fn list_backups(&self, path: &str) -> Result<Vec<String>> {
        self.inner.backups.list_backups(path).await
    }

    /// Restores a backup. See [`BackupManager::promote_backup`].
    pub async fn promote_backup(&self, path: &str, name: &str) -> Result<Node> {
        self.inner.backups.promote_backup(path, name).await
    }

    /// Returns `true` if the content root is still a readable directory.
    pub async fn is_healthy(&self) -> bool {
        match tokio::fs::read_dir(self.root()).await {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET_ENGINE,
                    root = %self.root().display(),
                    error = %err,
                    "Content root is not readable"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::ErrorKind;
    use crate::node::NodeType;

    async fn open(temp: &TempDir) -> anyhow::Result<ContentTree> {
        let config = ContentConfig::builder()
            .with_root(temp.path().join("content"))
            .build()?;
        Ok(ContentTree::open(config).await?)
    }

    #[tokio::test]
    async fn open_creates_the_root() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let tree = open(&temp).await?;

        assert!(tree.root().is_dir());
        assert!(tree.is_healthy().await);
        assert_eq!(tree.get_tree().await?, Node::folder("content"));
        Ok(())
    }

    #[tokio::test]
    async fn open_rejects_a_file_root() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        std::fs::write(temp.path().join("content"), b"x")?;

        let config = ContentConfig::new(temp.path().join("content"));
        let error = ContentTree::open(config).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Internal);
        Ok(())
    }

    #[tokio::test]
    async fn write_then_read_round_trips_metadata() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let tree = open(&temp).await?;
        let body = json!({
            "type": "page",
            "name": "ignored",
            "title": "About",
            "components": [{"kind": "hero"}],
        });

        let outcome = tree
            .write_node(
                "/scr/about",
                Some("application/json"),
                Some(Bytes::from(body.to_string())),
            )
            .await?;
        assert!(outcome.created);

        tree.write_node("/scr/about/team.txt", Some("text/plain"), Some(Bytes::from_static(b"hi")))
            .await?;

        let NodeContent::Node(node) = tree.get_node("/scr/about").await? else {
            anyhow::bail!("expected a directory node");
        };
        assert_eq!(node.name, "about");
        assert_eq!(node.node_type, NodeType::Page);
        assert_eq!(node.metadata.title.as_deref(), Some("About"));
        assert_eq!(node.metadata.extra["components"], json!([{"kind": "hero"}]));
        assert_eq!(node.metadata.id, outcome.node.metadata.id);
        assert_eq!(node.children(), [Node::file("team.txt")]);

        let again = tree.get_node("/scr/about").await?;
        assert_eq!(again, NodeContent::Node(node));
        Ok(())
    }

    #[tokio::test]
    async fn update_backup_and_promote_cycle() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let tree = open(&temp).await?;
        let json = Some("application/json");

        let first = tree
            .write_node("/scr/docs", json, Some(Bytes::from(json!({"type": "folder", "title": "v1"}).to_string())))
            .await?;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        tree.write_node("/scr/docs", json, Some(Bytes::from(json!({"type": "page", "title": "v2"}).to_string())))
            .await?;

        let backups = tree.list_backups("/backup/docs").await?;
        assert_eq!(backups.len(), 1);

        let restored = tree.promote_backup("/backup/docs", &backups[0]).await?;
        assert_eq!(restored.metadata.title.as_deref(), Some("v1"));
        assert_eq!(restored.node_type, NodeType::Folder);
        assert_eq!(restored.metadata.id, first.node.metadata.id);
        Ok(())
    }
}
