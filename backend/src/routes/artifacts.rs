//! Saved content library.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get},
    Json, Router,
};
use mindful_common::{ArtifactView, SaveArtifactRequest};

use super::current_account;
use crate::error::{AppError, Result};
use crate::AppState;

/// GET /artifacts - saved items, newest first.
async fn list_artifacts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ArtifactView>>> {
    let account = current_account(&state, &headers).await?;
    let artifacts = state.store.list_artifacts(&account.id)?;
    Ok(Json(artifacts.into_iter().map(ArtifactView::from).collect()))
}

/// POST /artifacts - save generated content (paid plans only).
async fn save_artifact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SaveArtifactRequest>,
) -> Result<(StatusCode, Json<ArtifactView>)> {
    let account = current_account(&state, &headers).await?;
    let artifact = state.workflow.save_artifact(&account, request.into())?;
    Ok((StatusCode::CREATED, Json(artifact.into())))
}

/// DELETE /artifacts/:id
async fn delete_artifact(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(artifact_id): Path<String>,
) -> Result<StatusCode> {
    let account = current_account(&state, &headers).await?;

    if state.store.delete_artifact(&account.id, &artifact_id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("artifact {}", artifact_id)))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/artifacts", get(list_artifacts).post(save_artifact))
        .route("/artifacts/:id", delete(delete_artifact))
        .with_state(state)
}
