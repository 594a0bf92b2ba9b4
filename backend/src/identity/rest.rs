use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{normalize_error, IdentityError, IdentityProvider, IdentityUser};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the identity service's REST account endpoints.
pub struct RestIdentityClient {
    http_client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl RestIdentityClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn password_call(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<IdentityUser, IdentityError> {
        let url = format!("{}/v1/accounts:{}", self.base_url, action);

        tracing::debug!("Identity request: {}", action);

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&PasswordRequest {
                email: email.trim(),
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| IdentityError::RequestFailed(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| normalize_error(&envelope.error.message))
                .unwrap_or_else(|_| format!("Identity service returned {}", status));
            return Err(IdentityError::Rejected(message));
        }

        let account: AccountResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.without_url().to_string()))?;

        Ok(IdentityUser {
            uid: account.local_id,
            email: account.email.unwrap_or_else(|| email.trim().to_string()),
            id_token: account.id_token,
            refresh_token: account.refresh_token,
        })
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError> {
        self.password_call("signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError> {
        self.password_call("signInWithPassword", email, password)
            .await
    }
}
