//! Email/password sign-up, login and logout.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use mindful_common::{CredentialsRequest, SessionResponse};

use crate::error::{AppError, Result};
use crate::identity::{IdentityProvider, IdentityUser};
use crate::workflow::WorkflowError;
use crate::AppState;

fn identity(state: &AppState) -> Result<&dyn IdentityProvider> {
    state.identity.as_deref().ok_or_else(|| {
        AppError::from(WorkflowError::ServiceUnready(
            "Authentication service not ready.".to_string(),
        ))
    })
}

fn validate(credentials: &CredentialsRequest) -> Result<()> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(AppError::InvalidRequest(
            "Email and password are required.".to_string(),
        ));
    }
    Ok(())
}

/// Make sure the account document exists and hand the session back.
fn open_session(state: &AppState, user: IdentityUser) -> Result<Json<SessionResponse>> {
    state
        .store
        .get_or_create_account(&user.uid, Some(&user.email))?;

    Ok(Json(SessionResponse {
        uid: user.uid,
        email: user.email,
        id_token: user.id_token,
        refresh_token: user.refresh_token,
    }))
}

/// POST /auth/signup - create an identity and its free-plan account.
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>> {
    validate(&credentials)?;
    let user = identity(&state)?
        .sign_up(&credentials.email, &credentials.password)
        .await?;

    tracing::info!("Signed up {}", user.uid);
    open_session(&state, user)
}

/// POST /auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>> {
    validate(&credentials)?;
    let user = identity(&state)?
        .sign_in(&credentials.email, &credentials.password)
        .await?;

    tracing::debug!("Signed in {}", user.uid);
    open_session(&state, user)
}

/// POST /auth/logout - tokens are stateless; the client drops its token.
async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .with_state(state)
}
