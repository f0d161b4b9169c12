use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use strum::Display;

use crate::TRACING_TARGET_PATH;
use crate::error::{Error, Result};
use crate::fs::{self, EntryKind};

/// The logical namespace a request path belongs to.
///
/// Each scope has a fixed leading segment that is stripped before the path is
/// joined onto the content root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Scope {
    /// Content nodes, addressed under `/scr`.
    #[strum(serialize = "scr")]
    Content,
    /// Backup listings and promotion, addressed under `/backup`.
    #[strum(serialize = "backup")]
    Backup,
}

impl Scope {
    /// Returns the leading segment of this scope.
    #[inline]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Content => "scr",
            Self::Backup => "backup",
        }
    }
}

/// A logical path mapped onto the content root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    logical: String,
    name: String,
    absolute: PathBuf,
    is_root: bool,
}

impl ResolvedPath {
    /// Returns the normalized logical path, always starting with `/`.
    pub fn logical(&self) -> &str {
        &self.logical
    }

    /// Returns the basename of the target (the content root's own basename
    /// for the root node).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the absolute filesystem path.
    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    /// Returns `true` if the path designates the content root itself.
    pub fn is_root(&self) -> bool {
        self.is_root
    }
}

/// Maps logical tree paths to absolute paths under a fixed content root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: Arc<Path>,
    root_name: Arc<str>,
}

impl PathResolver {
    /// Creates a resolver for an already canonicalized content root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root_name = root
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("/")
            .into();

        Self {
            root: root.into(),
            root_name,
        }
    }

    /// Returns the content root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `raw` lexically, without touching the filesystem.
    ///
    /// Repeated and trailing separators collapse, a leading scope segment is
    /// stripped once, `.` segments are dropped and `..` segments pop the
    /// previous segment. A `..` that would climb above the content root is
    /// [`ErrorKind::Forbidden`]; a NUL byte is [`ErrorKind::Validation`].
    ///
    /// [`ErrorKind::Forbidden`]: crate::ErrorKind::Forbidden
    /// [`ErrorKind::Validation`]: crate::ErrorKind::Validation
    pub fn resolve(&self, scope: Scope, raw: &str) -> Result<ResolvedPath> {
        let mut segments = raw.split('/').filter(|segment| !segment.is_empty()).peekable();
        if segments.peek() == Some(&scope.prefix()) {
            segments.next();
        }

        let mut stack: Vec<&str> = Vec::new();
        for segment in segments {
            match segment {
                "." => {}
                ".." => {
                    if stack.pop().is_none() {
                        return Err(self.forbidden(raw));
                    }
                }
                segment if segment.contains('\0') => {
                    return Err(Error::validation("path contains a NUL byte"));
                }
                segment => stack.push(segment),
            }
        }

        let absolute = stack
            .iter()
            .fold(self.root.to_path_buf(), |path, segment| path.join(segment));

        if !absolute.starts_with(&self.root) {
            return Err(self.forbidden(raw));
        }

        let resolved = ResolvedPath {
            logical: format!("/{}", stack.join("/")),
            name: stack
                .last()
                .map_or_else(|| self.root_name.to_string(), |name| (*name).to_owned()),
            is_root: stack.is_empty(),
            absolute,
        };

        tracing::trace!(
            target: TRACING_TARGET_PATH,
            scope = %scope,
            raw = %raw,
            logical = %resolved.logical,
            "Resolved path"
        );

        Ok(resolved)
    }

    /// Resolves `raw` and requires the target to exist.
    ///
    /// Symlinks count as absent. When the target exists its canonical form must
    /// still lie under the content root.
    pub async fn resolve_existing(&self, scope: Scope, raw: &str) -> Result<(ResolvedPath, EntryKind)> {
        let resolved = self.resolve(scope, raw)?;

        let Some(kind) = fs::entry_kind(resolved.absolute()).await? else {
            return Err(Error::not_found(format!("no node at '{}'", resolved.logical())));
        };

        self.ensure_contained(resolved.absolute(), raw).await?;
        Ok((resolved, kind))
    }

    /// Resolves `raw` for a create or update, where the target may not exist.
    ///
    /// No segment may be a name the engine manages itself (sidecar, backup or
    /// temporary file), since listings hide those entries. The nearest existing
    /// ancestor is canonicalized and must lie under the content root.
    pub async fn resolve_for_write(&self, scope: Scope, raw: &str) -> Result<ResolvedPath> {
        let resolved = self.resolve(scope, raw)?;

        if let Some(reserved) = resolved
            .logical()
            .split('/')
            .find(|segment| fs::is_reserved_name(segment))
        {
            tracing::warn!(
                target: TRACING_TARGET_PATH,
                path = %resolved.logical(),
                segment = %reserved,
                "Rejected write through a reserved name"
            );
            return Err(Error::validation(format!(
                "'{reserved}' is managed by the engine and cannot be written directly"
            )));
        }

        for ancestor in resolved.absolute().ancestors() {
            match tokio::fs::canonicalize(ancestor).await {
                Ok(canonical) => {
                    self.check_canonical(&canonical, raw)?;
                    return Ok(resolved);
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                    ) =>
                {
                    if ancestor == &*self.root {
                        break;
                    }
                }
                Err(err) => return Err(Error::io("failed to canonicalize path", err)),
            }
        }

        Err(Error::internal("content root is missing"))
    }

    async fn ensure_contained(&self, absolute: &Path, raw: &str) -> Result<()> {
        let canonical = tokio::fs::canonicalize(absolute)
            .await
            .map_err(|err| Error::io("failed to canonicalize path", err))?;

        self.check_canonical(&canonical, raw)
    }

    fn check_canonical(&self, canonical: &Path, raw: &str) -> Result<()> {
        if canonical.starts_with(&self.root) {
            Ok(())
        } else {
            Err(self.forbidden(raw))
        }
    }

    fn forbidden(&self, raw: &str) -> Error {
        tracing::warn!(
            target: TRACING_TARGET_PATH,
            raw = %raw,
            "Rejected path outside the content root"
        );

        Error::forbidden("path escapes the content root")
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::ErrorKind;

    fn resolver() -> PathResolver {
        PathResolver::new("/srv/content")
    }

    #[test]
    fn strips_the_scope_prefix_once() -> Result<()> {
        let resolved = resolver().resolve(Scope::Content, "/scr/docs/intro")?;
        assert_eq!(resolved.logical(), "/docs/intro");
        assert_eq!(resolved.absolute(), Path::new("/srv/content/docs/intro"));
        assert_eq!(resolved.name(), "intro");

        let resolved = resolver().resolve(Scope::Content, "/scr/scr/x")?;
        assert_eq!(resolved.logical(), "/scr/x");

        let resolved = resolver().resolve(Scope::Content, "/docs/scr")?;
        assert_eq!(resolved.logical(), "/docs/scr");

        let resolved = resolver().resolve(Scope::Content, "/scrap")?;
        assert_eq!(resolved.logical(), "/scrap");
        Ok(())
    }

    #[test]
    fn collapses_separators() -> Result<()> {
        let resolved = resolver().resolve(Scope::Backup, "//backup///a//b/")?;
        assert_eq!(resolved.logical(), "/a/b");
        assert_eq!(resolved.absolute(), Path::new("/srv/content/a/b"));
        Ok(())
    }

    #[test]
    fn root_paths_resolve_to_the_root() -> Result<()> {
        for raw in ["", "/", "/scr", "/scr/", "scr//", "/scr/./"] {
            let resolved = resolver().resolve(Scope::Content, raw)?;
            assert!(resolved.is_root(), "{raw}");
            assert_eq!(resolved.absolute(), Path::new("/srv/content"));
            assert_eq!(resolved.name(), "content");
        }
        Ok(())
    }

    #[test]
    fn traversal_inside_the_root_is_allowed() -> Result<()> {
        let resolved = resolver().resolve(Scope::Content, "/scr/a/../b")?;
        assert_eq!(resolved.logical(), "/b");

        let resolved = resolver().resolve(Scope::Content, "/scr/a/..")?;
        assert!(resolved.is_root());
        Ok(())
    }

    #[test]
    fn traversal_outside_the_root_is_forbidden() {
        for raw in ["/scr/..", "/scr/../etc/passwd", "/scr/a/../../b", "../../x"] {
            let error = resolver().resolve(Scope::Content, raw).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Forbidden, "{raw}");
        }
    }

    #[test]
    fn nul_bytes_are_rejected() {
        let error = resolver().resolve(Scope::Content, "/scr/a\0b").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn resolve_existing_requires_the_target() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let resolver = PathResolver::new(temp.path().canonicalize()?);
        std::fs::create_dir(temp.path().join("docs"))?;

        let (resolved, kind) = resolver.resolve_existing(Scope::Content, "/scr/docs").await?;
        assert_eq!(kind, EntryKind::Directory);
        assert_eq!(resolved.name(), "docs");

        let error = resolver
            .resolve_existing(Scope::Content, "/scr/missing")
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        Ok(())
    }

    #[tokio::test]
    async fn resolve_for_write_accepts_missing_targets() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let resolver = PathResolver::new(temp.path().canonicalize()?);

        let resolved = resolver
            .resolve_for_write(Scope::Content, "/scr/new/deeply/nested")
            .await?;
        assert_eq!(resolved.logical(), "/new/deeply/nested");
        Ok(())
    }

    #[tokio::test]
    async fn resolve_for_write_rejects_reserved_segments() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let resolver = PathResolver::new(temp.path().canonicalize()?);

        for raw in [
            "/scr/docs/.content.json",
            "/scr/docs/.content-9.json",
            "/scr/.contree-x.tmp/f.txt",
            "/scr/a/.content-1.json/b",
        ] {
            let error = resolver.resolve_for_write(Scope::Content, raw).await.unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Validation, "{raw}");
        }

        resolver
            .resolve_for_write(Scope::Content, "/scr/docs/content.json")
            .await?;
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_escapes_are_forbidden() -> anyhow::Result<()> {
        let outside = TempDir::new()?;
        std::fs::write(outside.path().join("secret.txt"), b"secret")?;

        let temp = TempDir::new()?;
        let resolver = PathResolver::new(temp.path().canonicalize()?);
        std::os::unix::fs::symlink(outside.path(), temp.path().join("escape"))?;

        let error = resolver
            .resolve_existing(Scope::Content, "/scr/escape/secret.txt")
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Forbidden);

        let error = resolver
            .resolve_for_write(Scope::Content, "/scr/escape/new.txt")
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Forbidden);
        Ok(())
    }
}
