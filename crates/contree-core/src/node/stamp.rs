use uuid::Uuid;

use super::{NodeDocument, Timestamp};

/// Assigns identity and timestamps to a document about to be written.
///
/// The live document's `id` and `createdAt` take precedence over the incoming
/// ones, so a rewrite of the same path keeps its identity. A missing or blank
/// `id` gets a fresh time-ordered UUIDv7, a missing `createdAt` gets `now`, and
/// `updatedAt` is always set to `now`.
pub fn stamp_document(document: &mut NodeDocument, previous: Option<&NodeDocument>, now: Timestamp) {
    let metadata = &mut document.metadata;

    let id = previous
        .and_then(|previous| previous.metadata.stable_id())
        .or_else(|| metadata.stable_id())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| Uuid::now_v7().to_string());
    metadata.id = Some(id);

    let created_at = previous
        .and_then(|previous| previous.metadata.created_at.clone())
        .or_else(|| metadata.created_at.take())
        .unwrap_or_else(|| now.clone());
    metadata.created_at = Some(created_at);

    metadata.updated_at = Some(now);
}
