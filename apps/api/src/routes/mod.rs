pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::extraction::handlers as extraction;
use crate::matching::handlers as matching;
use crate::metering::handlers as metering;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Résumé API
        .route(
            "/api/v1/resumes/parse",
            post(extraction::handle_parse_resume),
        )
        // Matching API
        .route("/api/v1/jobs/match", post(matching::handle_match_job))
        .route("/api/v1/chat", post(matching::handle_chat))
        .route(
            "/api/v1/skills/recommendations",
            post(matching::handle_skill_recommendations),
        )
        .route("/api/v1/market/trends", post(matching::handle_market_trends))
        // Plans and usage API
        .route("/api/v1/plans", get(metering::handle_list_plans))
        .route("/api/v1/usage", get(metering::handle_usage_summary))
        .route(
            "/api/v1/usage/:feature/check",
            get(metering::handle_usage_check),
        )
        .route("/api/v1/usage/reset", post(metering::handle_usage_reset))
        .with_state(state)
}
