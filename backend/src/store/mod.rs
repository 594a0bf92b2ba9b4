//! Persistence for accounts and saved artifacts.

mod sqlite;

pub use sqlite::AccountStore;

use serde::Serialize;

use crate::models::{Artifact, UserAccount};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

/// Change notification pushed to realtime subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    AccountChanged { account: UserAccount },
    ArtifactSaved { artifact: Artifact },
    ArtifactDeleted { user_id: String, artifact_id: String },
}

impl StoreEvent {
    /// Owner of the changed document.
    pub fn user_id(&self) -> &str {
        match self {
            StoreEvent::AccountChanged { account } => &account.id,
            StoreEvent::ArtifactSaved { artifact } => &artifact.user_id,
            StoreEvent::ArtifactDeleted { user_id, .. } => user_id,
        }
    }

    /// SSE event name.
    pub fn event_type(&self) -> &'static str {
        match self {
            StoreEvent::AccountChanged { .. } => "account_changed",
            StoreEvent::ArtifactSaved { .. } => "artifact_saved",
            StoreEvent::ArtifactDeleted { .. } => "artifact_deleted",
        }
    }
}
