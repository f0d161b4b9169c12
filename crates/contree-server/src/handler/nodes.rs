//! Node read, write and delete handlers under `/scr`.
//!
//! The whole request path (prefix included) is passed to the content tree,
//! which strips the `/scr` prefix and checks containment.

use axum::Router;
use axum::extract::State;
use axum::http::header::{self, HeaderMap};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, get};
use contree_core::{ContentTree, Node, NodeContent};

use crate::extract::{Json, NodePath, Payload};
use crate::handler::{ContentResultExt, Result};
use crate::handler::response::DeletedNode;
use crate::service::ServiceState;

/// Tracing target for node operations.
const TRACING_TARGET: &str = "contree_server::handler::nodes";

/// Content type of raw file responses.
const FILE_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Returns a directory node with its shallow children, or the raw bytes of a file.
#[tracing::instrument(skip_all, fields(path = %path))]
async fn read_node(State(content_tree): State<ContentTree>, path: NodePath) -> Result<Response> {
    let response = match content_tree
        .get_node(path.as_str())
        .await
        .with_resource(path.as_str())? {
        NodeContent::File(bytes) => {
            tracing::debug!(
                target: TRACING_TARGET,
                size = bytes.len(),
                "Serving file content"
            );
            ([(header::CONTENT_TYPE, FILE_CONTENT_TYPE)], bytes).into_response()
        }
        NodeContent::Node(node) => {
            tracing::debug!(
                target: TRACING_TARGET,
                node_type = %node.node_type,
                children = node.children().len(),
                "Serving directory node"
            );
            (StatusCode::OK, Json(node)).into_response()
        }
    };

    Ok(response)
}

/// Creates or updates a node.
///
/// A JSON body is a node document for a directory; any other body is stored
/// as file content. Responds with `201` when the entry was created.
#[tracing::instrument(skip_all, fields(path = %path))]
async fn write_node(
    State(content_tree): State<ContentTree>,
    path: NodePath,
    headers: HeaderMap,
    Payload(body): Payload,
) -> Result<(StatusCode, Json<Node>)> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    let outcome = content_tree
        .write_node(path.as_str(), content_type, Some(body))
        .await
        .with_resource(path.as_str())?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    tracing::info!(
        target: TRACING_TARGET,
        node_type = %outcome.node.node_type,
        created = outcome.created,
        "Node written"
    );

    Ok((status, Json(outcome.node)))
}

/// Recursively deletes a node.
#[tracing::instrument(skip_all, fields(path = %path))]
async fn delete_node(
    State(content_tree): State<ContentTree>,
    path: NodePath,
) -> Result<(StatusCode, Json<DeletedNode>)> {
    content_tree
        .delete_node(path.as_str())
        .await
        .with_resource(path.as_str())?;

    tracing::info!(target: TRACING_TARGET, "Node deleted");

    let response = DeletedNode {
        path: path.into_inner(),
    };

    Ok((StatusCode::OK, Json(response)))
}

fn node_methods() -> MethodRouter<ServiceState> {
    get(read_node)
        .put(write_node)
        .post(write_node)
        .delete(delete_node)
}

/// Returns a [`Router`] with all node routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/scr", node_methods())
        .route("/scr/", node_methods())
        .route("/scr/{*path}", node_methods())
}
