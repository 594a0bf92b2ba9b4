pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod llm;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod store;
#[cfg(any(test, feature = "test-util"))]
pub mod test_util;
pub mod workflow;

pub use auth::{AuthUser, SessionVerifier};
pub use config::Config;
pub use error::AppError;
pub use identity::{IdentityProvider, RestIdentityClient};
pub use llm::{GeminiClient, GenerationBackend};
pub use metrics::Metrics;
pub use store::AccountStore;
pub use workflow::ContentWorkflow;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionVerifier,
    /// Sign-up/sign-in provider; `None` when no identity API key is configured.
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub store: Arc<AccountStore>,
    pub workflow: ContentWorkflow,
    pub metrics: Arc<Metrics>,
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors
        .origin_list()
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// Build the full HTTP application.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(routes::health::router(state.clone()))
        .merge(routes::plans::router())
        .merge(routes::auth::router(state.clone()))
        .merge(routes::account::router(state.clone()))
        .merge(routes::generate::router(state.clone()))
        .merge(routes::artifacts::router(state))
        .layer(middleware::from_fn(logging::request_logger))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
