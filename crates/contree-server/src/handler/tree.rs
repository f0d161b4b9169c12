//! Full tree snapshot handler.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use contree_core::{ContentTree, Node};

use crate::extract::Json;
use crate::handler::Result;
use crate::service::ServiceState;

/// Tracing target for tree operations.
const TRACING_TARGET: &str = "contree_server::handler::tree";

/// Returns the whole content tree rooted at the content root.
#[tracing::instrument(skip_all)]
async fn read_tree(State(content_tree): State<ContentTree>) -> Result<(StatusCode, Json<Node>)> {
    let tree = content_tree.get_tree().await?;

    tracing::debug!(
        target: TRACING_TARGET,
        children = tree.children().len(),
        "Tree snapshot built"
    );

    Ok((StatusCode::OK, Json(tree)))
}

/// Returns a [`Router`] with the tree route.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/scrtree", get(read_tree))
}
