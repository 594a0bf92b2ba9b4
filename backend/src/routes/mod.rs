//! HTTP routes.

pub mod account;
pub mod artifacts;
pub mod auth;
pub mod generate;
pub mod health;
pub mod plans;

use axum::http::HeaderMap;

use crate::error::Result;
use crate::models::UserAccount;
use crate::AppState;

/// Authenticate the caller and load (or lazily create) their account.
pub(crate) async fn current_account(state: &AppState, headers: &HeaderMap) -> Result<UserAccount> {
    let user = state.sessions.authenticate(headers).await?;
    let account = state
        .store
        .get_or_create_account(&user.uid, user.email.as_deref())?;
    Ok(account)
}
