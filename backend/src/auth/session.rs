use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use crate::config::IdentityConfig;

/// Minimum time between key refreshes triggered by unknown key ids.
pub const KEY_REFRESH_COOLDOWN: Duration = Duration::from_secs(60);

/// Signed-in user extracted from a verified ID token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    /// Identity provider user id (`sub`).
    pub uid: String,
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Invalid Authorization header format")]
    InvalidFormat,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("JWKS fetch error: {0}")]
    JwksFetchError(String),
    #[error("Key not found for kid: {0}")]
    KeyNotFound(String),
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OidcDiscovery {
    jwks_uri: String,
}

/// Extract the bearer token from an Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get("authorization")
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

/// Verifies identity-provider ID tokens against the provider's signing keys.
pub struct SessionVerifier {
    http_client: Client,
    jwks_uri: String,
    keys: Arc<RwLock<HashMap<String, DecodingKey>>>,
    /// When keys were last fetched. Held across on-demand refreshes.
    last_refresh: Mutex<Instant>,
    refresh_cooldown: Duration,
    issuer: String,
    audience: Option<String>,
}

impl SessionVerifier {
    /// Resolve the key endpoint (explicit or via OIDC discovery) and fetch the
    /// current keys.
    pub async fn new(config: &IdentityConfig) -> Result<Self, AuthError> {
        let http_client = Client::new();

        let jwks_uri = match &config.jwks_url {
            Some(url) => url.clone(),
            None => {
                let discovery_url = format!(
                    "{}/.well-known/openid-configuration",
                    config.issuer.trim_end_matches('/')
                );
                let discovery: OidcDiscovery = http_client
                    .get(&discovery_url)
                    .send()
                    .await
                    .map_err(|e| AuthError::JwksFetchError(e.to_string()))?
                    .json()
                    .await
                    .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;
                discovery.jwks_uri
            }
        };

        let verifier = Self {
            http_client,
            jwks_uri,
            keys: Arc::new(RwLock::new(HashMap::new())),
            last_refresh: Mutex::new(Instant::now()),
            refresh_cooldown: KEY_REFRESH_COOLDOWN,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        };

        verifier.refresh_keys().await?;

        Ok(verifier)
    }

    async fn refresh_keys(&self) -> Result<(), AuthError> {
        tracing::info!("Fetching JWKS from {}", self.jwks_uri);

        let response: JwksResponse = self
            .http_client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        let fresh: HashMap<String, DecodingKey> = response
            .keys
            .into_iter()
            .filter(|jwk| jwk.kty == "RSA")
            .filter_map(|jwk| {
                let (n, e) = (jwk.n.as_deref()?, jwk.e.as_deref()?);
                match DecodingKey::from_rsa_components(n, e) {
                    Ok(key) => Some((jwk.kid, key)),
                    Err(err) => {
                        tracing::warn!("Failed to parse RSA key {}: {}", jwk.kid, err);
                        None
                    }
                }
            })
            .collect();

        tracing::info!("Loaded {} JWKS keys", fresh.len());
        *self.keys.write().await = fresh;
        Ok(())
    }

    /// Override the on-demand refresh cooldown.
    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }

    async fn key_for(&self, kid: &str) -> Option<DecodingKey> {
        self.keys.read().await.get(kid).cloned()
    }

    /// Look up a key id missing from the cache, refreshing at most once per
    /// cooldown. The header is not yet authenticated here, so a failed
    /// refresh is reported as an unknown key rather than an outage.
    async fn refresh_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let mut last_refresh = self.last_refresh.lock().await;

        // A concurrent request may have refreshed while we waited.
        if let Some(key) = self.key_for(kid).await {
            return Ok(key);
        }

        if last_refresh.elapsed() < self.refresh_cooldown {
            tracing::debug!("Unknown kid {} within refresh cooldown", kid);
            return Err(AuthError::KeyNotFound(kid.to_string()));
        }

        *last_refresh = Instant::now();
        if let Err(e) = self.refresh_keys().await {
            tracing::warn!("Key refresh for kid {} failed: {}", kid, e);
            return Err(AuthError::KeyNotFound(kid.to_string()));
        }

        self.key_for(kid)
            .await
            .ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))
    }

    /// Validate the bearer token in `headers`.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let token = bearer_token(headers)?;
        self.validate_token(token).await
    }

    /// Validate a raw ID token. Unknown key ids may trigger a key refresh,
    /// which picks up rotated signing keys.
    pub async fn validate_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("Missing kid in token header".to_string()))?;

        let key = match self.key_for(&kid).await {
            Some(key) => key,
            None => self.refresh_for(&kid).await?,
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(AuthUser {
            uid: data.claims.sub,
            email: data.claims.email,
        })
    }
}
