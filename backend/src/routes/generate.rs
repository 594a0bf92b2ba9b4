//! Metered generation endpoints.

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use mindful_common::{
    GenerateRequest, GenerateResponse, PersonaRequest, PlanRequest, PlanResponse, RefineRequest,
};

use super::current_account;
use crate::error::Result;
use crate::AppState;

/// POST /generate
async fn generate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    let account = current_account(&state, &headers).await?;

    let result = state
        .workflow
        .generate(
            &account,
            &request.topic,
            request.content_type,
            request.persona.as_deref(),
        )
        .await?;

    Ok(Json(GenerateResponse {
        content: result.value,
        usage: result.usage,
    }))
}

/// POST /generate/refine
async fn refine(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RefineRequest>,
) -> Result<Json<GenerateResponse>> {
    let account = current_account(&state, &headers).await?;

    let result = state
        .workflow
        .refine(&account, &request.previous_content, &request.instruction)
        .await?;

    Ok(Json(GenerateResponse {
        content: result.value,
        usage: result.usage,
    }))
}

/// POST /generate/persona
async fn persona(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<PersonaRequest>,
) -> Result<Json<GenerateResponse>> {
    let account = current_account(&state, &headers).await?;

    let result = state.workflow.persona(&account, &request.audience).await?;

    Ok(Json(GenerateResponse {
        content: result.value,
        usage: result.usage,
    }))
}

/// POST /generate/plan
async fn plan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<PlanRequest>,
) -> Result<Json<PlanResponse>> {
    let account = current_account(&state, &headers).await?;

    let result = state.workflow.plan(&account, &request.theme).await?;

    Ok(Json(PlanResponse {
        days: result.value,
        usage: result.usage,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/generate", post(generate))
        .route("/generate/refine", post(refine))
        .route("/generate/persona", post(persona))
        .route("/generate/plan", post(plan))
        .with_state(state)
}
