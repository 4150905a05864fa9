//! Match Engine — turns a candidate skill set and a job description into a
//! ranked match with actionable gaps.
//!
//! Scoring is deterministic set arithmetic and always completes; the AI
//! commentary step is best-effort behind a bounded timeout and can never
//! block or fail the score.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::extraction::skills::SkillExtractor;
use crate::matching::analyzer::{fallback_commentary, MatchAnalyzer, MatchCommentary, MatchContext};

/// Full match output.
///
/// Invariants: `matched ∪ missing` is exactly the skills extracted from the
/// job description, `matched` and `missing` are disjoint, and
/// `score = 100·|matched| / max(1, |job skills|)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub matched: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    pub extra: BTreeSet<String>,
    pub score: f64,
    pub commentary: MatchCommentary,
}

/// Stateless between calls; safe to share behind an `Arc`.
pub struct MatchEngine {
    extractor: SkillExtractor,
    analyzer: Arc<dyn MatchAnalyzer>,
    analysis_timeout: Duration,
}

impl MatchEngine {
    pub fn new(
        extractor: SkillExtractor,
        analyzer: Arc<dyn MatchAnalyzer>,
        analysis_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            analyzer,
            analysis_timeout,
        }
    }

    pub async fn match_skills(
        &self,
        profile_skills: &BTreeSet<String>,
        job_description: &str,
    ) -> MatchResult {
        let job_skills = self.extractor.extract(job_description);

        let matched: BTreeSet<String> =
            job_skills.intersection(profile_skills).cloned().collect();
        let missing: BTreeSet<String> = job_skills.difference(profile_skills).cloned().collect();
        let extra: BTreeSet<String> = profile_skills.difference(&job_skills).cloned().collect();
        let score = 100.0 * matched.len() as f64 / job_skills.len().max(1) as f64;

        let ctx = MatchContext {
            job_description,
            profile_skills,
            matched: &matched,
            missing: &missing,
            score,
        };

        let commentary =
            match tokio::time::timeout(self.analysis_timeout, self.analyzer.analyze(&ctx)).await {
                Ok(Ok(commentary)) => commentary,
                Ok(Err(e)) => {
                    warn!("match analysis failed, substituting deterministic commentary: {e:#}");
                    fallback_commentary(&ctx)
                }
                Err(_) => {
                    warn!(
                        "match analysis exceeded {:?}, substituting deterministic commentary",
                        self.analysis_timeout
                    );
                    fallback_commentary(&ctx)
                }
            };

        MatchResult {
            matched,
            missing,
            extra,
            score,
            commentary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::lexicon::SkillLexicon;
    use crate::matching::analyzer::FallbackAnalyzer;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct FailingAnalyzer;

    #[async_trait]
    impl MatchAnalyzer for FailingAnalyzer {
        async fn analyze(&self, _ctx: &MatchContext<'_>) -> anyhow::Result<MatchCommentary> {
            Err(anyhow!("AI backend unreachable"))
        }
    }

    struct HangingAnalyzer;

    #[async_trait]
    impl MatchAnalyzer for HangingAnalyzer {
        async fn analyze(&self, _ctx: &MatchContext<'_>) -> anyhow::Result<MatchCommentary> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            unreachable!("analysis should have timed out first")
        }
    }

    fn engine_with(names: &[&str], analyzer: Arc<dyn MatchAnalyzer>) -> MatchEngine {
        let extractor = SkillExtractor::new(Arc::new(SkillLexicon::from_names(names)));
        MatchEngine::new(extractor, analyzer, Duration::from_millis(200))
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_reference_scenario_scores_75() {
        let engine = engine_with(&["Python", "Flask", "Git", "AWS"], Arc::new(FallbackAnalyzer));
        let candidate = set(&["Python", "Flask", "SQL", "Git"]);
        let jd = "We need a python developer with flask, git, and aws skills.";

        let result = engine.match_skills(&candidate, jd).await;
        assert_eq!(result.matched, set(&["Python", "Flask", "Git"]));
        assert_eq!(result.missing, set(&["AWS"]));
        assert_eq!(result.extra, set(&["SQL"]));
        assert!((result.score - 75.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_empty_job_description_scores_zero() {
        let engine = engine_with(&["Python", "Flask"], Arc::new(FallbackAnalyzer));
        let candidate = set(&["Python", "Flask"]);

        let result = engine.match_skills(&candidate, "").await;
        assert!(result.matched.is_empty());
        assert!(result.missing.is_empty());
        assert_eq!(result.extra, candidate);
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn test_matched_and_missing_partition_the_job_skills() {
        let engine = engine_with(
            &["Python", "Flask", "Git", "AWS", "Docker"],
            Arc::new(FallbackAnalyzer),
        );
        let candidate = set(&["Python", "Docker"]);
        let jd = "Looking for python, flask and docker; aws is a plus.";

        let extractor = SkillExtractor::new(Arc::new(SkillLexicon::from_names(&[
            "Python", "Flask", "Git", "AWS", "Docker",
        ])));
        let job_skills = extractor.extract(jd);

        let result = engine.match_skills(&candidate, jd).await;
        let union: BTreeSet<String> = result.matched.union(&result.missing).cloned().collect();
        assert_eq!(union, job_skills);
        assert!(result.matched.is_disjoint(&result.missing));
    }

    #[tokio::test]
    async fn test_score_stays_in_bounds() {
        let engine = engine_with(&["Python"], Arc::new(FallbackAnalyzer));
        let candidate = set(&["Python", "SQL", "Git"]);

        let result = engine.match_skills(&candidate, "python python python").await;
        assert!(result.score >= 0.0 && result.score <= 100.0);
    }

    #[tokio::test]
    async fn test_analyzer_failure_falls_back_without_erroring() {
        let engine = engine_with(&["Python", "AWS"], Arc::new(FailingAnalyzer));
        let candidate = set(&["Python"]);

        let result = engine
            .match_skills(&candidate, "python and aws required")
            .await;
        assert!((result.score - 50.0).abs() < f64::EPSILON);
        assert_eq!(result.commentary.source, "fallback");
        assert_eq!(result.commentary.strengths, vec!["Python"]);
        assert_eq!(result.commentary.improvements, vec!["AWS"]);
    }

    #[tokio::test]
    async fn test_analyzer_timeout_falls_back_without_erroring() {
        let engine = engine_with(&["Python"], Arc::new(HangingAnalyzer));
        let candidate = set(&["Python"]);

        let result = engine.match_skills(&candidate, "python shop").await;
        assert_eq!(result.commentary.source, "fallback");
        assert!((result.score - 100.0).abs() < f64::EPSILON);
    }
}
