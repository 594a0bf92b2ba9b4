//! Generative-language boundary.
//!
//! The workflow talks to [`GenerationBackend`]; [`GeminiClient`] is the
//! production implementation.

mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

/// One request/response generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_instruction: Option<String>,
    pub prompt: String,
    /// When set, the model is asked for JSON matching this schema.
    pub response_schema: Option<serde_json::Value>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: None,
            prompt: prompt.into(),
            response_schema: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_response_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("No content was generated. Please try again.")]
    EmptyResponse,
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Returns the generated text (a JSON document when a schema was declared).
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
