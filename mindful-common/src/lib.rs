//! Mindful Content Studio Common Types
//!
//! Shared types used by the backend and by API clients.

pub mod account;
pub mod content;
pub mod plan;

pub use account::{
    AccountView, ArtifactView, CredentialsRequest, SaveArtifactRequest, SessionResponse,
    SetPlanRequest,
};
pub use content::{
    ContentType, DayPlan, GenerateRequest, GenerateResponse, PersonaRequest, PlanRequest,
    PlanResponse, RefineRequest, TokenUsage, WEEK_LENGTH,
};
pub use plan::{pricing_table, PlanDetails, PlanEntry, SubscriptionPlan};
