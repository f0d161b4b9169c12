use contree_core::ContentTree;

use crate::service::{Result, ServiceConfig};

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ServiceState {
    content_tree: ContentTree,
}

impl ServiceState {
    /// Initializes application state from configuration.
    ///
    /// Validates the configuration and opens the content tree once; every
    /// handler then shares the same handle.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;

        let service_state = Self {
            content_tree: config.open_content_tree().await?,
        };

        Ok(service_state)
    }

    /// Creates the state around an already opened content tree.
    pub fn from_content_tree(content_tree: ContentTree) -> Self {
        Self { content_tree }
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(content_tree: ContentTree);
