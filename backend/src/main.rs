use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mindful_backend::{
    app, AccountStore, AppState, Config, ContentWorkflow, GeminiClient, IdentityProvider, Metrics,
    RestIdentityClient, SessionVerifier,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if env::args().any(|a| a == "--version" || a == "-V") {
        println!("mindful-backend {}", VERSION);
        return Ok(());
    }

    // Load configuration
    let config = Config::load().map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Make sure config.toml exists or set MINDFUL__IDENTITY__ISSUER.",
            e
        )
    })?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Mindful Content Studio API {}", VERSION);

    // Initialize components
    let sessions = SessionVerifier::new(&config.identity).await?;
    let store = Arc::new(AccountStore::new(&config.database.url)?);
    let gemini = Arc::new(GeminiClient::new(&config.gemini)?);
    let metrics = Arc::new(Metrics::new()?);
    let workflow = ContentWorkflow::new(gemini, store.clone(), metrics.clone());

    let identity: Option<Arc<dyn IdentityProvider>> = match &config.identity.api_key {
        Some(key) if !key.trim().is_empty() => Some(Arc::new(RestIdentityClient::new(
            &config.identity.base_url,
            key.trim(),
        ))),
        _ => {
            tracing::warn!("No identity API key configured; sign-up and login are disabled");
            None
        }
    };

    tracing::info!(
        "Generation model {} at {}",
        config.gemini.model,
        config.gemini.base_url
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = Arc::new(AppState {
        config,
        sessions,
        identity,
        store,
        workflow,
        metrics,
    });

    // Start server
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
