mod config;
mod db;
mod errors;
mod extraction;
mod llm_client;
mod matching;
mod metering;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::extraction::lexicon::SkillLexicon;
use crate::extraction::skills::SkillExtractor;
use crate::llm_client::LlmClient;
use crate::matching::analyzer::{FallbackAnalyzer, LlmMatchAnalyzer, MatchAnalyzer};
use crate::matching::engine::MatchEngine;
use crate::metering::ledger::UsageLedger;
use crate::metering::plans::PlanRegistry;
use crate::metering::store::{PgUsageStore, UsageStore};
use crate::routes::build_router;
use crate::state::AppState;

/// Tracing targets use the crate's module path, so the package name's hyphen
/// must become an underscore or the default directive matches nothing.
fn default_filter_directive(level: &str) -> String {
    format!("{}={}", env!("CARGO_PKG_NAME").replace('-', "_"), level)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter_directive(&config.rust_log))))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PathForge API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;

    // Built-in skill lexicon and plan catalog
    let lexicon = Arc::new(SkillLexicon::builtin());
    info!("Skill lexicon loaded ({} skills)", lexicon.len());
    let plans = Arc::new(PlanRegistry::builtin());

    let extractor = SkillExtractor::new(lexicon);

    // Initialize LLM client when a key is configured
    let llm = config.anthropic_api_key.clone().map(LlmClient::new);

    // Analyzer backend: AI commentary when an LLM is available, otherwise
    // the deterministic fallback
    let analyzer: Arc<dyn MatchAnalyzer> = match &llm {
        Some(llm) => {
            info!("Match analyzer: AI (model: {})", llm_client::MODEL);
            Arc::new(LlmMatchAnalyzer::new(llm.clone()))
        }
        None => {
            info!("Match analyzer: deterministic fallback (no ANTHROPIC_API_KEY)");
            Arc::new(FallbackAnalyzer)
        }
    };
    let engine = Arc::new(MatchEngine::new(
        extractor.clone(),
        analyzer,
        Duration::from_secs(config.match_analysis_timeout_secs),
    ));

    // Usage ledger over PostgreSQL
    let store: Arc<dyn UsageStore> = Arc::new(PgUsageStore::new(db));
    let ledger = Arc::new(UsageLedger::new(store, Arc::clone(&plans)));

    // Build app state
    let state = AppState {
        ledger,
        plans,
        extractor,
        engine,
        llm,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
