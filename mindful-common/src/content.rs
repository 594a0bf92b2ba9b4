//! Generation request and response payloads.

use serde::{Deserialize, Serialize};

/// Kind of content the user wants generated.
///
/// Serialized as the label shown in the dashboard dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContentType {
    #[default]
    #[serde(rename = "Instagram Post")]
    InstagramPost,
    #[serde(rename = "Blog Post Idea")]
    BlogPostIdea,
    #[serde(rename = "Short Video Script")]
    ShortVideoScript,
    #[serde(rename = "Client Worksheet Idea")]
    ClientWorksheetIdea,
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::InstagramPost,
        ContentType::BlogPostIdea,
        ContentType::ShortVideoScript,
        ContentType::ClientWorksheetIdea,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::InstagramPost => "Instagram Post",
            Self::BlogPostIdea => "Blog Post Idea",
            Self::ShortVideoScript => "Short Video Script",
            Self::ClientWorksheetIdea => "Client Worksheet Idea",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ct| ct.label() == label)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// POST /generate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub topic: String,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub persona: Option<String>,
}

/// POST /generate/refine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineRequest {
    /// Text produced by an earlier generation.
    pub previous_content: String,
    /// e.g. "Make it more formal", "Shorten for X/Twitter".
    pub instruction: String,
}

/// POST /generate/persona
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaRequest {
    pub audience: String,
}

/// POST /generate/plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub theme: String,
}

/// One day of a weekly content plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: String,
    pub topic: String,
    pub format: String,
    pub prompt: String,
}

impl DayPlan {
    pub fn is_complete(&self) -> bool {
        [&self.day, &self.topic, &self.format, &self.prompt]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

/// Number of entries in a weekly plan.
pub const WEEK_LENGTH: usize = 7;

/// Usage figures returned with every metered call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub tokens_used: u32,
    pub tokens_limit: u32,
    pub tokens_remaining: u32,
}

impl TokenUsage {
    pub fn new(tokens_used: u32, tokens_limit: u32) -> Self {
        Self {
            tokens_used,
            tokens_limit,
            tokens_remaining: tokens_limit.saturating_sub(tokens_used),
        }
    }
}

/// Response for generate, refine and persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub content: String,
    pub usage: TokenUsage,
}

/// Response for the weekly planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub days: Vec<DayPlan>,
    pub usage: TokenUsage,
}
