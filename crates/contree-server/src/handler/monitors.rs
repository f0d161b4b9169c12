//! Content root health check handler.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use contree_core::ContentTree;
use jiff::Timestamp;

use super::response::MonitorStatus;
use crate::extract::Json;
use crate::handler::Result;
use crate::service::ServiceState;

/// Tracing target for monitor operations.
const TRACING_TARGET: &str = "contree_server::handler::monitors";

/// Reports whether the content root is still readable.
///
/// Responds with `503 Service Unavailable` and the same body when it is not.
#[tracing::instrument(skip_all)]
async fn health_status(
    State(content_tree): State<ContentTree>,
) -> Result<(StatusCode, Json<MonitorStatus>)> {
    let is_healthy = content_tree.is_healthy().await;

    let response = MonitorStatus {
        is_healthy,
        content_root: content_tree.root().display().to_string(),
        checked_at: Timestamp::now(),
    };

    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    tracing::debug!(
        target: TRACING_TARGET,
        is_healthy = is_healthy,
        status_code = status_code.as_u16(),
        "Health status response prepared"
    );

    Ok((status_code, Json(response)))
}

/// Returns a [`Router`] with all health monitoring routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/health", get(health_status))
}
