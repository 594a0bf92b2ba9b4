//! Hosted identity service: account creation and password sign-in.

mod rest;

pub use rest::RestIdentityClient;

use async_trait::async_trait;

/// A user returned by the identity service after sign-up or sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityUser {
    pub uid: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Rejected by the provider; the message is already user-facing.
    #[error("{0}")]
    Rejected(String),
    #[error("Identity service request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid identity service response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError>;
}

/// Turn a provider error message into something a user can read.
///
/// Known error codes get a sentence; provider prefixes such as `Firebase: `
/// and trailing error-code annotations are stripped from everything else.
pub fn normalize_error(raw: &str) -> String {
    let message = raw.trim();
    let message = message.strip_prefix("Firebase:").unwrap_or(message).trim();

    // "WEAK_PASSWORD : Password should be at least 6 characters"
    let (code, detail) = match message.split_once(" : ") {
        Some((code, detail)) => (code.trim(), Some(detail.trim())),
        None => (message, None),
    };

    let known = match code {
        "EMAIL_EXISTS" => Some("An account with this email already exists."),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            Some("Invalid email or password.")
        }
        "INVALID_EMAIL" => Some("Please enter a valid email address."),
        "MISSING_PASSWORD" => Some("Please enter a password."),
        "USER_DISABLED" => Some("This account has been disabled."),
        "OPERATION_NOT_ALLOWED" => Some("Email/password sign-in is not enabled."),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => {
            Some("Too many attempts. Please wait a moment and try again.")
        }
        _ => None,
    };

    if let Some(text) = known {
        return text.to_string();
    }
    if let Some(detail) = detail.filter(|d| !d.is_empty()) {
        return detail.to_string();
    }

    // "Error (auth/weak-password)." style suffixes.
    let message = match message.find(" (auth/") {
        Some(idx) => message[..idx].trim_end_matches('.'),
        None => message,
    };
    message.to_string()
}
