//! Account, artifact and auth payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ContentType, SubscriptionPlan, TokenUsage};

/// Account as seen by the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    pub id: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub subscription_plan: SubscriptionPlan,
    pub usage: TokenUsage,
}

/// PUT /account/plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetPlanRequest {
    pub plan: String,
}

/// POST /artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveArtifactRequest {
    pub content: String,
    pub prompt: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub persona: Option<String>,
}

/// A saved piece of generated content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactView {
    pub id: String,
    pub content: String,
    pub prompt: String,
    pub content_type: ContentType,
    pub persona: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// POST /auth/signup and POST /auth/login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Session handed back after a successful sign-up or sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub uid: String,
    pub email: String,
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}
