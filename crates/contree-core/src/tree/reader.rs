use std::path::{Path, PathBuf};

use bytes::Bytes;

use super::{NodeContent, read_sidecar, shallow_children};
use crate::TRACING_TARGET_READER;
use crate::config::WalkErrorPolicy;
use crate::error::{Error, Result};
use crate::fs::{self, DirEntry, EntryKind};
use crate::node::{Node, NodeDocument, merge_with_directory};
use crate::path::{PathResolver, Scope};

/// Builds tree snapshots and single-node views from the filesystem.
#[derive(Debug, Clone)]
pub struct TreeReader {
    resolver: PathResolver,
    max_depth: usize,
    policy: WalkErrorPolicy,
}

/// A directory whose entries are still being visited.
struct Frame {
    path: PathBuf,
    name: String,
    depth: usize,
    document: Option<NodeDocument>,
    pending: std::vec::IntoIter<DirEntry>,
    children: Vec<Node>,
}

impl TreeReader {
    /// Creates a reader over the resolver's content root.
    pub fn new(resolver: PathResolver, max_depth: usize, policy: WalkErrorPolicy) -> Self {
        Self {
            resolver,
            max_depth,
            policy,
        }
    }

    /// Walks the whole content root depth-first and returns the full tree.
    ///
    /// The walk uses an explicit stack. Symlinks are never followed and
    /// directories deeper than the configured maximum are emitted without
    /// children. A subtree that cannot be listed is handled according to the
    /// [`WalkErrorPolicy`]; a failure on the root itself always fails the walk.
    pub async fn get_tree(&self) -> Result<Node> {
        let root = self.resolver.resolve(Scope::Content, "/")?;
        let mut stack = vec![
            self.open_frame(root.absolute().to_path_buf(), root.name().to_owned(), 0)
                .await?,
        ];
        let mut visited = 1_usize;

        while let Some(frame) = stack.last_mut() {
            let Some(entry) = frame.pending.next() else {
                let Some(done) = stack.pop() else { break };
                let node = merge_with_directory(done.document, &done.name, done.children);

                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => {
                        tracing::debug!(
                            target: TRACING_TARGET_READER,
                            directories = visited,
                            "Built tree snapshot"
                        );
                        return Ok(node);
                    }
                }
                continue;
            };

            if entry.kind == EntryKind::File {
                frame.children.push(Node::file(entry.name));
                continue;
            }

            let depth = frame.depth + 1;
            let path = frame.path.join(&entry.name);
            if depth > self.max_depth {
                tracing::warn!(
                    target: TRACING_TARGET_READER,
                    path = %path.display(),
                    max_depth = self.max_depth,
                    "Walk depth limit reached, not descending"
                );
                frame.children.push(Node::folder(entry.name));
                continue;
            }

            match self.open_frame(path.clone(), entry.name, depth).await {
                Ok(child) => {
                    visited += 1;
                    stack.push(child);
                }
                Err(err) if self.policy == WalkErrorPolicy::Skip => {
                    tracing::warn!(
                        target: TRACING_TARGET_READER,
                        path = %path.display(),
                        error = %err,
                        "Skipping unreadable subtree"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        target: TRACING_TARGET_READER,
                        path = %path.display(),
                        error = %err,
                        "Aborting tree walk"
                    );
                    return Err(err);
                }
            }
        }

        Err(Error::internal("tree walk ended without a root node"))
    }

    /// Reads a single node.
    ///
    /// A file yields its raw bytes. A directory yields its sidecar merged with
    /// its shallow children, or a plain folder when it has no sidecar.
    pub async fn get_node(&self, raw: &str) -> Result<NodeContent> {
        let (resolved, kind) = self.resolver.resolve_existing(Scope::Content, raw).await?;

        match kind {
            EntryKind::File => {
                let bytes = tokio::fs::read(resolved.absolute())
                    .await
                    .map_err(|err| Error::io("failed to read file", err))?;

                tracing::debug!(
                    target: TRACING_TARGET_READER,
                    path = %resolved.logical(),
                    size = bytes.len(),
                    "Read file node"
                );

                Ok(NodeContent::File(Bytes::from(bytes)))
            }
            EntryKind::Directory => {
                let document = read_sidecar(resolved.absolute())
                    .await
                    .inspect_err(|err| self.log_sidecar_error(resolved.absolute(), err))?;
                let children = shallow_children(resolved.absolute()).await?;

                tracing::debug!(
                    target: TRACING_TARGET_READER,
                    path = %resolved.logical(),
                    children = children.len(),
                    has_sidecar = document.is_some(),
                    "Read directory node"
                );

                Ok(NodeContent::Node(merge_with_directory(
                    document,
                    resolved.name(),
                    children,
                )))
            }
        }
    }

    async fn open_frame(&self, path: PathBuf, name: String, depth: usize) -> Result<Frame> {
        let entries = fs::list_dir(&path).await?;

        let document = match read_sidecar(&path).await {
            Ok(document) => document,
            Err(err) if self.policy == WalkErrorPolicy::Skip => {
                self.log_sidecar_error(&path, &err);
                None
            }
            Err(err) => return Err(err),
        };

        Ok(Frame {
            path,
            name,
            depth,
            document,
            pending: entries.into_iter(),
            children: Vec::new(),
        })
    }

    fn log_sidecar_error(&self, path: &Path, err: &Error) {
        tracing::warn!(
            target: TRACING_TARGET_READER,
            path = %path.display(),
            error = %err,
            "Failed to read sidecar"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::fs as stdfs;

    use tempfile::TempDir;

    use super::*;
    use crate::ErrorKind;
    use crate::fs::SIDECAR_NAME;
    use crate::node::NodeType;

    fn reader(temp: &TempDir, policy: WalkErrorPolicy) -> anyhow::Result<TreeReader> {
        let resolver = PathResolver::new(temp.path().canonicalize()?);
        Ok(TreeReader::new(resolver, 8, policy))
    }

    fn fixture() -> anyhow::Result<TempDir> {
        let temp = TempDir::new()?;
        let root = temp.path();
        stdfs::write(root.join("a.txt"), b"hello")?;
        stdfs::create_dir_all(root.join("b/c"))?;
        stdfs::write(root.join("b/c/d.md"), b"# d")?;
        stdfs::write(root.join(SIDECAR_NAME), br#"{"type":"site","title":"Root"}"#)?;
        stdfs::write(
            root.join("b").join(SIDECAR_NAME),
            br#"{"type":"page","name":"ignored","title":"B"}"#,
        )?;
        Ok(temp)
    }

    #[tokio::test]
    async fn get_tree_merges_sidecars_recursively() -> anyhow::Result<()> {
        let temp = fixture()?;
        let tree = reader(&temp, WalkErrorPolicy::Skip)?.get_tree().await?;

        assert_eq!(tree.node_type, NodeType::Site);
        assert_eq!(tree.metadata.title.as_deref(), Some("Root"));

        let names: Vec<_> = tree.children().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a.txt", "b"]);

        let b = &tree.children()[1];
        assert_eq!(b.node_type, NodeType::Page);
        assert_eq!(b.name, "b");
        assert_eq!(b.children()[0].name, "c");
        assert_eq!(b.children()[0].children()[0], Node::file("d.md"));
        Ok(())
    }

    #[tokio::test]
    async fn get_tree_skips_or_aborts_on_corrupt_sidecars() -> anyhow::Result<()> {
        let temp = fixture()?;
        stdfs::write(temp.path().join("b/c").join(SIDECAR_NAME), b"{ not json")?;

        let tree = reader(&temp, WalkErrorPolicy::Skip)?.get_tree().await?;
        let c = &tree.children()[1].children()[0];
        assert_eq!(c.node_type, NodeType::Folder);
        assert_eq!(c.children().len(), 1);

        let error = reader(&temp, WalkErrorPolicy::Abort)?
            .get_tree()
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Parse);
        Ok(())
    }

    #[tokio::test]
    async fn get_tree_stops_at_max_depth() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        stdfs::create_dir_all(temp.path().join("1/2/3"))?;

        let resolver = PathResolver::new(temp.path().canonicalize()?);
        let tree = TreeReader::new(resolver, 1, WalkErrorPolicy::Skip)
            .get_tree()
            .await?;

        let one = &tree.children()[0];
        assert_eq!(one.children()[0], Node::folder("2"));
        Ok(())
    }

    #[tokio::test]
    async fn get_node_returns_shallow_children() -> anyhow::Result<()> {
        let temp = fixture()?;
        let reader = reader(&temp, WalkErrorPolicy::Skip)?;

        let NodeContent::Node(root) = reader.get_node("/scr").await? else {
            anyhow::bail!("expected a directory node");
        };
        assert_eq!(root.children(), [Node::file("a.txt"), Node::folder("b")]);

        let NodeContent::Node(b) = reader.get_node("/scr/b").await? else {
            anyhow::bail!("expected a directory node");
        };
        assert_eq!(b.node_type, NodeType::Page);
        assert_eq!(b.children(), [Node::folder("c")]);
        Ok(())
    }

    #[tokio::test]
    async fn get_node_returns_file_bytes() -> anyhow::Result<()> {
        let temp = fixture()?;
        let content = reader(&temp, WalkErrorPolicy::Skip)?.get_node("/scr/a.txt").await?;
        assert_eq!(content, NodeContent::File(Bytes::from_static(b"hello")));
        Ok(())
    }

    #[tokio::test]
    async fn get_node_distinguishes_missing_and_corrupt() -> anyhow::Result<()> {
        let temp = fixture()?;
        stdfs::write(temp.path().join("b").join(SIDECAR_NAME), b"[")?;
        let reader = reader(&temp, WalkErrorPolicy::Skip)?;

        let error = reader.get_node("/scr/missing").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);

        let error = reader.get_node("/scr/b").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Parse);
        Ok(())
    }

    #[tokio::test]
    async fn directory_without_sidecar_is_a_plain_folder() -> anyhow::Result<()> {
        let temp = fixture()?;
        let content = reader(&temp, WalkErrorPolicy::Skip)?.get_node("/scr/b/c").await?;
        let NodeContent::Node(node) = content else {
            anyhow::bail!("expected a directory node");
        };

        assert_eq!(node.node_type, NodeType::Folder);
        assert_eq!(node.name, "c");
        assert_eq!(node.metadata.id, None);
        Ok(())
    }
}
