use std::sync::Arc;

use crate::config::Config;
use crate::extraction::skills::SkillExtractor;
use crate::llm_client::LlmClient;
use crate::matching::engine::MatchEngine;
use crate::metering::ledger::UsageLedger;
use crate::metering::plans::PlanRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<UsageLedger>,
    pub plans: Arc<PlanRegistry>,
    pub extractor: SkillExtractor,
    pub engine: Arc<MatchEngine>,
    /// `None` when no API key is configured; the chat endpoint reports the
    /// feature as unavailable in that case.
    pub llm: Option<LlmClient>,
    pub config: Config,
}
