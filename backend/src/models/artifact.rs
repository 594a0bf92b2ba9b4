use chrono::{DateTime, Utc};
use mindful_common::{ArtifactView, ContentType, SaveArtifactRequest};
use serde::Serialize;

/// Saved generated content. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub prompt: String,
    pub content_type: ContentType,
    pub persona: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller when saving.
#[derive(Debug, Clone)]
pub struct NewArtifact {
    pub content: String,
    pub prompt: String,
    pub content_type: ContentType,
    pub persona: Option<String>,
}

impl From<SaveArtifactRequest> for NewArtifact {
    fn from(req: SaveArtifactRequest) -> Self {
        Self {
            content: req.content,
            prompt: req.prompt,
            content_type: req.content_type,
            persona: req.persona.filter(|p| !p.trim().is_empty()),
        }
    }
}

impl Artifact {
    pub fn new(user_id: &str, new: NewArtifact) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            content: new.content,
            prompt: new.prompt,
            content_type: new.content_type,
            persona: new.persona,
            created_at: Utc::now(),
        }
    }
}

impl From<Artifact> for ArtifactView {
    fn from(a: Artifact) -> Self {
        Self {
            id: a.id,
            content: a.content,
            prompt: a.prompt,
            content_type: a.content_type,
            persona: a.persona,
            created_at: a.created_at,
        }
    }
}
