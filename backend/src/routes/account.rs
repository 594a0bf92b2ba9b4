//! Account document, plan changes and realtime change stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, put},
    Json, Router,
};
use futures_util::stream::Stream;
use mindful_common::{AccountView, ArtifactView, SetPlanRequest, SubscriptionPlan};
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use super::current_account;
use crate::error::{AppError, Result};
use crate::models::current_period;
use crate::store::StoreEvent;
use crate::AppState;

/// GET /account - the caller's account, created on first access.
async fn get_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AccountView>> {
    let account = current_account(&state, &headers).await?;
    Ok(Json(account.to_view(&current_period())))
}

/// PUT /account/plan - switch subscription plan.
///
/// Stands in for a billing webhook; the usage counter is left as is.
async fn set_plan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SetPlanRequest>,
) -> Result<Json<AccountView>> {
    let account = current_account(&state, &headers).await?;

    let plan = SubscriptionPlan::from_key(&request.plan)
        .ok_or_else(|| AppError::InvalidRequest(format!("Unknown plan: {}", request.plan)))?;

    let updated = state.store.set_plan(&account.id, plan)?;
    Ok(Json(updated.to_view(&current_period())))
}

/// Query parameters for SSE authentication.
#[derive(Deserialize)]
pub struct EventsQuery {
    token: String,
}

/// Render a store event as an SSE frame for its owner.
fn to_sse_event(event: &StoreEvent) -> Option<Event> {
    let data = match event {
        StoreEvent::AccountChanged { account } => {
            serde_json::to_value(account.to_view(&current_period())).ok()?
        }
        StoreEvent::ArtifactSaved { artifact } => {
            serde_json::to_value(ArtifactView::from(artifact.clone())).ok()?
        }
        StoreEvent::ArtifactDeleted { artifact_id, .. } => json!({ "id": artifact_id }),
    };
    Some(Event::default().event(event.event_type()).data(data.to_string()))
}

/// GET /account/events - SSE stream of changes to the caller's documents.
///
/// Authentication is done via query parameter since EventSource doesn't
/// support headers.
async fn account_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let user = state.sessions.validate_token(&query.token).await?;
    let account = state
        .store
        .get_or_create_account(&user.uid, user.email.as_deref())?;

    // Subscribe before taking the snapshot so no change can fall in between.
    let rx = state.store.subscribe();
    let snapshot = Event::default()
        .event("account_changed")
        .data(json!(account.to_view(&current_period())).to_string());

    let uid = user.uid;
    let updates = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.user_id() == uid => to_sse_event(&event).map(Ok),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Account event stream lagged: {}", e);
            None
        }
    });

    let stream = tokio_stream::once(Ok(snapshot)).chain(updates);

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/account", get(get_account))
        .route("/account/plan", put(set_plan))
        .route("/account/events", get(account_events))
        .with_state(state)
}
