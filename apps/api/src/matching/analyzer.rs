//! Match Analyzer — pluggable qualitative commentary on a computed match.
//!
//! Two backends: `LlmMatchAnalyzer` (AI commentary via the LLM client) and
//! `FallbackAnalyzer` (deterministic, built purely from the computed sets).
//! The backend is selected once at startup and carried in `AppState` as
//! `Arc<dyn MatchAnalyzer>`; the engine substitutes the deterministic
//! fallback whenever the selected backend fails.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm_client::LlmClient;
use crate::matching::prompts::{MATCH_ANALYSIS_PROMPT, MATCH_ANALYSIS_SYSTEM};

/// Qualitative commentary attached to a match result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCommentary {
    pub summary: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub interview_tips: Vec<String>,
    /// "ai" | "fallback" — which backend produced the commentary.
    #[serde(default = "ai_source")]
    pub source: String,
}

fn ai_source() -> String {
    "ai".to_string()
}

/// Inputs the analyzer sees: the job text plus everything already computed.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub job_description: &'a str,
    pub profile_skills: &'a BTreeSet<String>,
    pub matched: &'a BTreeSet<String>,
    pub missing: &'a BTreeSet<String>,
    pub score: f64,
}

#[async_trait]
pub trait MatchAnalyzer: Send + Sync {
    async fn analyze(&self, ctx: &MatchContext<'_>) -> anyhow::Result<MatchCommentary>;
}

/// AI commentary via the Anthropic client.
pub struct LlmMatchAnalyzer {
    llm: LlmClient,
}

impl LlmMatchAnalyzer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl MatchAnalyzer for LlmMatchAnalyzer {
    async fn analyze(&self, ctx: &MatchContext<'_>) -> anyhow::Result<MatchCommentary> {
        let skills = ctx
            .profile_skills
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = MATCH_ANALYSIS_PROMPT
            .replace("{job_description}", ctx.job_description)
            .replace("{candidate_skills}", &skills)
            .replace("{score}", &format!("{:.0}", ctx.score));

        let mut commentary: MatchCommentary = self
            .llm
            .call_json(&prompt, MATCH_ANALYSIS_SYSTEM)
            .await?;
        commentary.source = "ai".to_string();
        Ok(commentary)
    }
}

/// Deterministic backend used when no LLM is configured.
pub struct FallbackAnalyzer;

#[async_trait]
impl MatchAnalyzer for FallbackAnalyzer {
    async fn analyze(&self, ctx: &MatchContext<'_>) -> anyhow::Result<MatchCommentary> {
        Ok(fallback_commentary(ctx))
    }
}

/// Commentary built purely from the already-computed sets. Also substituted
/// by the engine when the configured analyzer fails or times out.
pub fn fallback_commentary(ctx: &MatchContext<'_>) -> MatchCommentary {
    let required = ctx.matched.len() + ctx.missing.len();
    let summary = format!(
        "Matched {} of {} required skills ({:.0}%).",
        ctx.matched.len(),
        required,
        ctx.score
    );

    let mut interview_tips = Vec::new();
    if ctx.matched.is_empty() {
        interview_tips.push("Focus on transferable skills relevant to the role.".to_string());
    } else {
        let leading: Vec<&str> = ctx.matched.iter().take(3).map(String::as_str).collect();
        interview_tips.push(format!(
            "Highlight your hands-on experience with {}.",
            leading.join(", ")
        ));
    }
    if !ctx.missing.is_empty() {
        let gaps: Vec<&str> = ctx.missing.iter().take(3).map(String::as_str).collect();
        interview_tips.push(format!(
            "Be ready to discuss how you would close the gap on {}.",
            gaps.join(", ")
        ));
    }

    MatchCommentary {
        summary,
        strengths: ctx.matched.iter().cloned().collect(),
        improvements: ctx.missing.iter().cloned().collect(),
        interview_tips,
        source: "fallback".to_string(),
    }
}
