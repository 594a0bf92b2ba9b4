//! Public pricing table.

use axum::{routing::get, Json, Router};
use mindful_common::{pricing_table, PlanEntry};

/// GET /plans - plans in display order with price, allotment and features.
async fn list_plans() -> Json<Vec<PlanEntry>> {
    Json(pricing_table())
}

pub fn router() -> Router {
    Router::new().route("/plans", get(list_plans))
}
