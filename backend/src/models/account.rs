use chrono::{DateTime, Utc};
use mindful_common::{AccountView, SubscriptionPlan, TokenUsage};
use serde::Serialize;

/// Calendar month (UTC) that a usage counter belongs to, formatted `YYYY-MM`.
pub fn current_period() -> String {
    period_of(Utc::now())
}

pub fn period_of(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

/// Account document keyed by the identity provider's user id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserAccount {
    /// User ID from the identity provider (sub claim)
    pub id: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub subscription_plan: SubscriptionPlan,
    /// Generations recorded during `usage_period`.
    pub tokens_used_this_month: u32,
    pub usage_period: String,
}

impl UserAccount {
    /// Counter value for `period`. A counter from an earlier month reads as 0.
    pub fn tokens_used_in(&self, period: &str) -> u32 {
        if self.usage_period == period {
            self.tokens_used_this_month
        } else {
            0
        }
    }

    pub fn usage_in(&self, period: &str) -> TokenUsage {
        TokenUsage::new(
            self.tokens_used_in(period),
            self.subscription_plan.allotment(),
        )
    }

    /// Remaining allotment for `period`; negative when over the limit
    /// (e.g. after a downgrade).
    pub fn remaining_in(&self, period: &str) -> i64 {
        i64::from(self.subscription_plan.allotment()) - i64::from(self.tokens_used_in(period))
    }

    pub fn to_view(&self, period: &str) -> AccountView {
        AccountView {
            id: self.id.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
            subscription_plan: self.subscription_plan,
            usage: self.usage_in(period),
        }
    }
}
