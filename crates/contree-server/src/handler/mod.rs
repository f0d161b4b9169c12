//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use contree_core::ContentConfig;
//! use contree_server::handler::routes;
//! use contree_server::service::{ServiceConfig, ServiceState};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServiceConfig::new(ContentConfig::new("./content"));
//! let state = ServiceState::from_config(&config).await?;
//! let app: axum::Router = routes().with_state(state);
//! # let _ = app;
//! # Ok(())
//! # }
//! ```
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod backups;
mod error;
mod monitors;
mod nodes;
pub mod request;
pub mod response;
mod tree;

use axum::Router;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{ContentResultExt, Error, ErrorKind, Result};
use crate::service::ServiceState;

#[inline]
async fn handler() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with all routes and the not-found fallback.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .merge(nodes::routes())
        .merge(tree::routes())
        .merge(backups::routes())
        .merge(monitors::routes())
        .fallback(handler)
}

#[cfg(test)]
mod test {
    use axum::Router;
    use axum_test::TestServer;
    use contree_core::ContentConfig;
    use tempfile::TempDir;

    use crate::handler::routes;
    use crate::service::{ServiceConfig, ServiceState};

    /// Returns a new [`ServiceState`] over an empty content root.
    ///
    /// The content root lives in the returned [`TempDir`], which must be kept
    /// alive for the duration of the test.
    pub async fn create_test_state() -> anyhow::Result<(ServiceState, TempDir)> {
        let temp = TempDir::new()?;
        let config = ServiceConfig::new(ContentConfig::new(temp.path().join("content")));
        let state = ServiceState::from_config(&config).await?;
        Ok((state, temp))
    }

    /// Returns a new [`TestServer`] with the given router.
    pub async fn create_test_server_with_router(
        router: impl Fn(ServiceState) -> Router<ServiceState>,
    ) -> anyhow::Result<(TestServer, TempDir)> {
        let (state, temp) = create_test_state().await?;
        let router = router(state.clone());
        let server = create_test_server_with_state(router, state).await?;
        Ok((server, temp))
    }

    /// Returns a new [`TestServer`] with the given router and state.
    pub async fn create_test_server_with_state(
        router: Router<ServiceState>,
        state: ServiceState,
    ) -> anyhow::Result<TestServer> {
        let app = router.with_state(state);
        let server = TestServer::new(app)?;
        Ok(server)
    }

    /// Returns a new [`TestServer`] with the default router and state.
    pub async fn create_test_server() -> anyhow::Result<(TestServer, TempDir)> {
        create_test_server_with_router(|_| routes()).await
    }

    #[tokio::test]
    async fn handlers() -> anyhow::Result<()> {
        let (server, _temp) = create_test_server().await?;
        assert!(server.is_running());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_routes_return_json_not_found() -> anyhow::Result<()> {
        let (server, _temp) = create_test_server().await?;

        let response = server.get("/nowhere").await;
        response.assert_status_not_found();

        let body = response.json::<serde_json::Value>();
        assert_eq!(body["name"], "not_found");
        Ok(())
    }
}
