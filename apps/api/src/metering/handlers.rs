//! Plan catalog, usage summary, and admin reset endpoints.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::metering::ledger::{UsageCheck, UsageSummary};
use crate::metering::plans::{BillingCycle, Feature, Limit, PlanId};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallerQuery {
    pub user_id: Uuid,
    #[serde(default)]
    pub plan: PlanId,
}

#[derive(Debug, Serialize)]
pub struct PlanView {
    pub id: PlanId,
    pub name: String,
    pub monthly_price: f64,
    pub yearly_price: f64,
    pub description: String,
    pub features: Vec<String>,
    pub limits: BTreeMap<Feature, Limit>,
}

/// GET /api/v1/plans
pub async fn handle_list_plans(State(state): State<AppState>) -> Json<Vec<PlanView>> {
    let plans = state
        .plans
        .plans()
        .map(|plan| PlanView {
            id: plan.id,
            name: plan.name.clone(),
            monthly_price: plan.monthly_price,
            yearly_price: plan.price_for(BillingCycle::Yearly),
            description: plan.description.clone(),
            features: plan.features.clone(),
            limits: plan.limits.clone(),
        })
        .collect();
    Json(plans)
}

/// GET /api/v1/usage
pub async fn handle_usage_summary(
    State(state): State<AppState>,
    Query(caller): Query<CallerQuery>,
) -> Result<Json<UsageSummary>, AppError> {
    let summary = state
        .ledger
        .usage_summary(caller.user_id, caller.plan)
        .await?;
    Ok(Json(summary))
}

/// GET /api/v1/usage/:feature/check
///
/// Read-only: reports whether one more use would be allowed, without
/// consuming anything.
pub async fn handle_usage_check(
    State(state): State<AppState>,
    Path(feature): Path<String>,
    Query(caller): Query<CallerQuery>,
) -> Result<Json<UsageCheck>, AppError> {
    let feature = feature
        .parse::<Feature>()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let check = state
        .ledger
        .check_limit(caller.user_id, caller.plan, feature)
        .await?;
    Ok(Json(check))
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub user_id: Uuid,
    /// Omit to clear every counter for the user.
    pub feature: Option<String>,
}

/// POST /api/v1/usage/reset
///
/// Admin-only: requires the X-Admin-Key header to match ADMIN_API_KEY.
pub async fn handle_usage_reset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ResetRequest>,
) -> Result<StatusCode, AppError> {
    let presented = headers.get("x-admin-key").and_then(|v| v.to_str().ok());
    let expected = state.config.admin_api_key.as_deref();
    // Both must be present and equal; an unset key disables the endpoint.
    match (presented, expected) {
        (Some(presented), Some(expected)) if presented == expected => {}
        _ => return Err(AppError::Forbidden),
    }

    let feature = request
        .feature
        .as_deref()
        .map(str::parse::<Feature>)
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state.ledger.reset(request.user_id, feature).await?;
    info!(
        user_id = %request.user_id,
        feature = feature.map(|f| f.as_str()).unwrap_or("all"),
        "Usage counters reset"
    );
    Ok(StatusCode::NO_CONTENT)
}
