//! Engine configuration.

use std::path::PathBuf;

#[cfg(feature = "config")]
use clap::{Args, ValueEnum};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Default maximum directory depth visited by a full tree walk.
pub const DEFAULT_MAX_WALK_DEPTH: usize = 64;

/// Default number of lock stripes.
pub const DEFAULT_LOCK_STRIPES: usize = 64;

/// What a full tree walk does when a subtree cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WalkErrorPolicy {
    /// Log the failure and leave the subtree out of the snapshot.
    #[default]
    Skip,
    /// Fail the whole walk with the underlying error.
    Abort,
}

/// Configuration for a [`ContentTree`].
///
/// [`ContentTree`]: crate::ContentTree
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[cfg_attr(feature = "config", derive(Args))]
#[builder(
    name = "ContentConfigBuilder",
    pattern = "owned",
    setter(into, strip_option, prefix = "with"),
    build_fn(validate = "Self::validate_config")
)]
pub struct ContentConfig {
    /// Directory that holds the content tree
    #[cfg_attr(
        feature = "config",
        arg(long = "content-root", env = "CONTENT_ROOT", default_value = "./content")
    )]
    pub root: PathBuf,

    /// Snapshot the previous sidecar before every metadata update
    #[cfg_attr(
        feature = "config",
        arg(
            long = "backup-on-update",
            env = "BACKUP_ON_UPDATE",
            default_value_t = true,
            action = clap::ArgAction::Set
        )
    )]
    #[builder(default = "true")]
    pub backup_on_update: bool,

    /// Maximum directory depth visited by a full tree walk
    #[cfg_attr(
        feature = "config",
        arg(long = "max-walk-depth", env = "MAX_WALK_DEPTH", default_value_t = DEFAULT_MAX_WALK_DEPTH)
    )]
    #[builder(default = "DEFAULT_MAX_WALK_DEPTH")]
    pub max_walk_depth: usize,

    /// Behavior when a subtree fails during a full tree walk
    #[cfg_attr(
        feature = "config",
        arg(
            long = "walk-error-policy",
            env = "WALK_ERROR_POLICY",
            value_enum,
            default_value_t = WalkErrorPolicy::Skip
        )
    )]
    #[builder(default)]
    pub walk_error_policy: WalkErrorPolicy,

    /// Number of striped locks serializing writes to the same node
    #[cfg_attr(
        feature = "config",
        arg(long = "lock-stripes", env = "LOCK_STRIPES", default_value_t = DEFAULT_LOCK_STRIPES)
    )]
    #[builder(default = "DEFAULT_LOCK_STRIPES")]
    pub lock_stripes: usize,
}

impl ContentConfig {
    /// Creates a configuration with defaults for the given content root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            backup_on_update: true,
            max_walk_depth: DEFAULT_MAX_WALK_DEPTH,
            walk_error_policy: WalkErrorPolicy::default(),
            lock_stripes: DEFAULT_LOCK_STRIPES,
        }
    }

    /// Creates a new configuration builder.
    pub fn builder() -> ContentConfigBuilder {
        ContentConfigBuilder::default()
    }
}

impl ContentConfigBuilder {
    fn validate_config(&self) -> Result<(), String> {
        if let Some(root) = &self.root
            && root.as_os_str().is_empty()
        {
            return Err("Content root must not be empty".to_string());
        }

        if self.max_walk_depth == Some(0) {
            return Err("Max walk depth must be at least 1".to_string());
        }

        if self.lock_stripes == Some(0) {
            return Err("Lock stripes must be at least 1".to_string());
        }

        Ok(())
    }
}
