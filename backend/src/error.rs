//! Service-wide error type and its HTTP rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::identity::IdentityError;
use crate::store::StoreError;
use crate::workflow::WorkflowError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Workflow(e) => match e {
                WorkflowError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
                WorkflowError::QuotaExhausted => (StatusCode::PAYMENT_REQUIRED, "quota_exhausted"),
                WorkflowError::GenerationFailed(_) => (StatusCode::BAD_GATEWAY, "generation_failed"),
                WorkflowError::PlanRestricted => (StatusCode::FORBIDDEN, "plan_restricted"),
                WorkflowError::ServiceUnready(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "service_unready")
                }
            },
            AppError::Auth(AuthError::JwksFetchError(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unready")
            }
            AppError::Auth(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Identity(IdentityError::Rejected(_)) => {
                (StatusCode::BAD_REQUEST, "identity_rejected")
            }
            AppError::Identity(_) => (StatusCode::BAD_GATEWAY, "identity_unavailable"),
            AppError::Store(StoreError::AccountNotFound(_)) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            AppError::Store(StoreError::Unavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unready")
            }
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        if status.is_server_error() {
            tracing::error!(error_type = error_type, "{}", self);
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
