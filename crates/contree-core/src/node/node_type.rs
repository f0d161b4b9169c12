use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Semantic type of a content tree node.
///
/// `File` is reserved for non-directory entries. The other variants describe a
/// directory; a sidecar may refine a plain folder into a page or a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NodeType {
    /// A regular file; its content is an opaque byte payload.
    #[serde(alias = "FILE")]
    File,
    /// A plain directory.
    #[default]
    #[serde(alias = "FOLDER")]
    Folder,
    /// A directory rendered as a page.
    #[serde(alias = "PAGE")]
    Page,
    /// A directory acting as the root of a site.
    #[serde(alias = "SITE")]
    Site,
}

impl NodeType {
    /// Returns `true` for types that must be backed by a directory.
    #[inline]
    pub const fn is_directory(self) -> bool {
        !matches!(self, Self::File)
    }
}
