use contree_core::{ContentConfig, ContentTree};
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::service::{Error, Result};

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Content tree engine configuration.
    #[cfg_attr(feature = "config", command(flatten))]
    pub content: ContentConfig,
}

impl ServiceConfig {
    /// Creates a new service configuration around the engine configuration.
    pub fn new(content: ContentConfig) -> Self {
        Self { content }
    }

    /// Validates the configuration before any service is started.
    pub fn validate(&self) -> Result<()> {
        if self.content.root.as_os_str().is_empty() {
            return Err(Error::config("content root must not be empty"));
        }

        if self.content.max_walk_depth == 0 {
            return Err(Error::config("max walk depth must be at least 1"));
        }

        if self.content.lock_stripes == 0 {
            return Err(Error::config("lock stripes must be at least 1"));
        }

        Ok(())
    }

    /// Opens the content tree, creating its root directory if needed.
    pub async fn open_content_tree(&self) -> Result<ContentTree> {
        Ok(ContentTree::open(self.content.clone()).await?)
    }
}
