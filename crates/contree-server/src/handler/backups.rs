//! Backup listing, snapshot and promotion handlers under `/backup`.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{MethodRouter, get};
use contree_core::{ContentTree, Node};

use crate::extract::{Json, NodePath};
use crate::handler::{ContentResultExt, Result};
use crate::handler::request::PromoteBackup;
use crate::handler::response::{BackupCreated, Backups};
use crate::service::ServiceState;

/// Tracing target for backup operations.
const TRACING_TARGET: &str = "contree_server::handler::backups";

/// Lists the backups of a directory, sorted by name.
#[tracing::instrument(skip_all, fields(path = %path))]
async fn list_backups(
    State(content_tree): State<ContentTree>,
    path: NodePath,
) -> Result<(StatusCode, Json<Backups>)> {
    let backups = content_tree
        .list_backups(path.as_str())
        .await
        .with_resource(path.as_str())?;

    tracing::debug!(
        target: TRACING_TARGET,
        count = backups.len(),
        "Backups listed"
    );

    let response = Backups {
        path: path.into_inner(),
        backups,
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Snapshots the live metadata of a directory.
#[tracing::instrument(skip_all, fields(path = %path))]
async fn create_backup(
    State(content_tree): State<ContentTree>,
    path: NodePath,
) -> Result<(StatusCode, Json<BackupCreated>)> {
    let name = content_tree
        .backup(path.as_str())
        .await
        .with_resource(path.as_str())?;

    tracing::info!(
        target: TRACING_TARGET,
        backup = %name,
        "Backup created"
    );

    let response = BackupCreated {
        path: path.into_inner(),
        name,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Promotes a backup to the live metadata of a directory.
#[tracing::instrument(skip_all, fields(path = %path, backup = %request.name))]
async fn promote_backup(
    State(content_tree): State<ContentTree>,
    path: NodePath,
    Json(request): Json<PromoteBackup>,
) -> Result<(StatusCode, Json<Node>)> {
    let node = content_tree
        .promote_backup(path.as_str(), &request.name)
        .await
        .with_resource(path.as_str())?;

    tracing::info!(target: TRACING_TARGET, "Backup promoted");

    Ok((StatusCode::OK, Json(node)))
}

fn backup_methods() -> MethodRouter<ServiceState> {
    get(list_backups).post(create_backup).put(promote_backup)
}

/// Returns a [`Router`] with all backup routes.
///
/// [`Router`]: axum::routing::Router
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/backup", backup_methods())
        .route("/backup/", backup_methods())
        .route("/backup/{*path}", backup_methods())
}
