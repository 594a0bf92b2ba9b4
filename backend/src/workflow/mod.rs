//! Token-metered generation workflow.
//!
//! Every metered operation runs the same sequence:
//!
//! 1. admission: refuse when the caller's plan has no allotment left;
//! 2. input validation;
//! 3. one call to the generation backend (no retry);
//! 4. on success only, one atomic counter increment in the store.
//!
//! Validation, quota and backend failures leave the counter untouched.

pub mod prompts;

use std::sync::Arc;

use mindful_common::{ContentType, DayPlan, TokenUsage, WEEK_LENGTH};

use crate::llm::{GenerationBackend, GenerationError, GenerationRequest};
use crate::metrics::Metrics;
use crate::models::{current_period, Artifact, NewArtifact, UserAccount};
use crate::store::{AccountStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),
    #[error("You've used all your tokens for this month. Please upgrade your plan to continue generating content.")]
    QuotaExhausted,
    #[error("Failed to generate content: {0}")]
    GenerationFailed(String),
    #[error("Saving content requires a paid plan. Please upgrade to save your work.")]
    PlanRestricted,
    #[error("Service not ready: {0}")]
    ServiceUnready(String),
}

impl From<GenerationError> for WorkflowError {
    fn from(e: GenerationError) -> Self {
        WorkflowError::GenerationFailed(e.to_string())
    }
}

impl From<StoreError> for WorkflowError {
    fn from(e: StoreError) -> Self {
        WorkflowError::ServiceUnready(e.to_string())
    }
}

/// Result of a metered call with the caller's usage after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Metered<T> {
    pub value: T,
    pub usage: TokenUsage,
}

fn require(value: &str, message: &str) -> Result<(), WorkflowError> {
    if value.trim().is_empty() {
        return Err(WorkflowError::Validation(message.to_string()));
    }
    Ok(())
}

/// Parse the planner's JSON reply into exactly one week of complete entries.
pub fn parse_week(raw: &str) -> Result<Vec<DayPlan>, WorkflowError> {
    let days: Vec<DayPlan> = serde_json::from_str(raw.trim())
        .map_err(|e| WorkflowError::GenerationFailed(format!("Invalid plan response: {}", e)))?;

    if days.len() != WEEK_LENGTH {
        return Err(WorkflowError::GenerationFailed(format!(
            "Expected {} plan entries, got {}",
            WEEK_LENGTH,
            days.len()
        )));
    }
    if let Some(position) = days.iter().position(|d| !d.is_complete()) {
        return Err(WorkflowError::GenerationFailed(format!(
            "Plan entry {} is missing fields",
            position + 1
        )));
    }

    Ok(days)
}

/// Coordinates quota admission, generation and usage recording.
#[derive(Clone)]
pub struct ContentWorkflow {
    backend: Arc<dyn GenerationBackend>,
    store: Arc<AccountStore>,
    metrics: Arc<Metrics>,
}

impl ContentWorkflow {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        store: Arc<AccountStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            backend,
            store,
            metrics,
        }
    }

    /// Generate a piece of content about `topic`.
    pub async fn generate(
        &self,
        account: &UserAccount,
        topic: &str,
        content_type: ContentType,
        persona: Option<&str>,
    ) -> Result<Metered<String>, WorkflowError> {
        let period = current_period();
        self.admit(account, "generate", &period)?;
        require(topic, "Please enter a topic or idea.")?;

        let request = GenerationRequest::new(prompts::generate_prompt(topic, content_type, persona))
            .with_system_instruction(prompts::system_instruction());
        let text = self.call(account, "generate", &request).await?;

        let usage = self.record(account, "generate", &period)?;
        Ok(Metered { value: text, usage })
    }

    /// Rework previously generated text according to `instruction`.
    pub async fn refine(
        &self,
        account: &UserAccount,
        previous: &str,
        instruction: &str,
    ) -> Result<Metered<String>, WorkflowError> {
        let period = current_period();
        self.admit(account, "refine", &period)?;
        require(previous, "There is no generated content to refine yet.")?;
        require(instruction, "Please choose how the content should be refined.")?;

        let request = GenerationRequest::new(prompts::refine_prompt(previous, instruction))
            .with_system_instruction(prompts::system_instruction());
        let text = self.call(account, "refine", &request).await?;

        let usage = self.record(account, "refine", &period)?;
        Ok(Metered { value: text, usage })
    }

    /// Turn an audience description into a one-paragraph persona.
    pub async fn persona(
        &self,
        account: &UserAccount,
        audience: &str,
    ) -> Result<Metered<String>, WorkflowError> {
        let period = current_period();
        self.admit(account, "persona", &period)?;
        require(audience, "Please describe your target audience.")?;

        let request = GenerationRequest::new(prompts::persona_prompt(audience))
            .with_system_instruction(prompts::persona_system_instruction());
        let text = self.call(account, "persona", &request).await?;

        let usage = self.record(account, "persona", &period)?;
        Ok(Metered {
            value: text.trim().to_string(),
            usage,
        })
    }

    /// Build a seven-day content plan around `theme`.
    pub async fn plan(
        &self,
        account: &UserAccount,
        theme: &str,
    ) -> Result<Metered<Vec<DayPlan>>, WorkflowError> {
        let period = current_period();
        self.admit(account, "plan", &period)?;
        require(theme, "Please enter a theme for the week.")?;

        let request = GenerationRequest::new(prompts::plan_prompt(theme))
            .with_system_instruction(prompts::system_instruction())
            .with_response_schema(prompts::plan_schema());
        let raw = self.call(account, "plan", &request).await?;

        let days = parse_week(&raw).inspect_err(|e| {
            self.metrics.generation_failed("plan");
            tracing::warn!("Discarding plan response for {}: {}", account.id, e);
        })?;

        let usage = self.record(account, "plan", &period)?;
        Ok(Metered { value: days, usage })
    }

    /// Save generated content to the caller's library. Not metered; only
    /// paid plans may save.
    pub fn save_artifact(
        &self,
        account: &UserAccount,
        new: NewArtifact,
    ) -> Result<Artifact, WorkflowError> {
        if !account.subscription_plan.can_save_artifacts() {
            return Err(WorkflowError::PlanRestricted);
        }
        require(&new.content, "There is no content to save.")?;
        require(&new.prompt, "Saved content needs the prompt it came from.")?;

        Ok(self.store.save_artifact(&account.id, new)?)
    }

    fn admit(
        &self,
        account: &UserAccount,
        operation: &str,
        period: &str,
    ) -> Result<(), WorkflowError> {
        if account.remaining_in(period) <= 0 {
            self.metrics.quota_refused(operation);
            tracing::warn!(
                "Quota exhausted for {} ({} plan, {} used)",
                account.id,
                account.subscription_plan,
                account.tokens_used_in(period)
            );
            return Err(WorkflowError::QuotaExhausted);
        }
        Ok(())
    }

    async fn call(
        &self,
        account: &UserAccount,
        operation: &str,
        request: &GenerationRequest,
    ) -> Result<String, WorkflowError> {
        self.backend.generate(request).await.map_err(|e| {
            self.metrics.generation_failed(operation);
            tracing::warn!("Generation failed for {}: {}", account.id, e);
            WorkflowError::from(e)
        })
    }

    /// Count one generation. A concurrent session may have used the last
    /// token since admission; the result is then refused as over quota.
    fn record(
        &self,
        account: &UserAccount,
        operation: &str,
        period: &str,
    ) -> Result<TokenUsage, WorkflowError> {
        let allotment = account.subscription_plan.allotment();
        match self.store.record_generation(&account.id, allotment, period)? {
            Some(updated) => {
                self.metrics.generation_succeeded(operation);
                let usage = updated.usage_in(period);
                tracing::info!(
                    "Generation recorded for {}: {}/{}",
                    account.id,
                    usage.tokens_used,
                    usage.tokens_limit
                );
                Ok(usage)
            }
            None => {
                self.metrics.quota_refused(operation);
                tracing::warn!("Quota reached concurrently for {}", account.id);
                Err(WorkflowError::QuotaExhausted)
            }
        }
    }
}
