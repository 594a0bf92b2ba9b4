//! Subscription plans and their monthly allotments.

use serde::{Deserialize, Serialize};

/// Subscription tier attached to every account.
///
/// Each tier maps to exactly one [`PlanDetails`] through [`SubscriptionPlan::details`],
/// so there is no lookup that can come back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    #[default]
    Free,
    Pro,
    Team,
}

/// Static pricing data for a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanDetails {
    pub name: &'static str,
    pub price: &'static str,
    pub price_description: &'static str,
    /// Generations allowed per calendar month.
    pub tokens: u32,
    pub features: &'static [&'static str],
}

const FREE: PlanDetails = PlanDetails {
    name: "Free",
    price: "$0",
    price_description: "per month",
    tokens: 5,
    features: &[
        "5 AI Generations/mo",
        "Access to Basic Prompts",
        "Community Support",
    ],
};

const PRO: PlanDetails = PlanDetails {
    name: "Pro",
    price: "$29",
    price_description: "per month",
    tokens: 50,
    features: &[
        "50 AI Generations/mo",
        "Access to All Prompts",
        "Advanced Content Types",
        "Priority Email Support",
    ],
};

const TEAM: PlanDetails = PlanDetails {
    name: "Team",
    price: "$79",
    price_description: "per month",
    tokens: 200,
    features: &[
        "200 AI Generations/mo",
        "Up to 5 Team Members",
        "Collaborative Workspace",
        "Dedicated Account Manager",
    ],
};

impl SubscriptionPlan {
    /// All plans in display order.
    pub const ALL: [SubscriptionPlan; 3] = [
        SubscriptionPlan::Free,
        SubscriptionPlan::Pro,
        SubscriptionPlan::Team,
    ];

    /// Parse a plan key ("free", "pro", "team").
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "free" => Some(Self::Free),
            "pro" => Some(Self::Pro),
            "team" => Some(Self::Team),
            _ => None,
        }
    }

    /// Storage/wire key.
    pub fn as_key(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Team => "team",
        }
    }

    pub fn details(&self) -> &'static PlanDetails {
        match self {
            Self::Free => &FREE,
            Self::Pro => &PRO,
            Self::Team => &TEAM,
        }
    }

    /// Monthly generation allotment.
    pub fn allotment(&self) -> u32 {
        self.details().tokens
    }

    /// Whether generated content can be saved to the library.
    pub fn can_save_artifacts(&self) -> bool {
        !matches!(self, Self::Free)
    }
}

impl std::fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

/// One row of the public pricing table.
#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub key: SubscriptionPlan,
    #[serde(flatten)]
    pub details: PlanDetails,
}

/// Pricing table in display order.
pub fn pricing_table() -> Vec<PlanEntry> {
    SubscriptionPlan::ALL
        .iter()
        .map(|plan| PlanEntry {
            key: *plan,
            details: plan.details().clone(),
        })
        .collect()
}
