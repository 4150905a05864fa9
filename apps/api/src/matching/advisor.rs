//! Career advisory content beyond a single job match: skill recommendations
//! toward a target role and market trend analysis for a skill set.
//!
//! Same posture as the match engine: AI content when an LLM is available,
//! a deterministic substitute otherwise, and no AI failure ever escapes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::extraction::skills::SkillExtractor;
use crate::llm_client::LlmClient;
use crate::matching::prompts::{
    MARKET_TRENDS_PROMPT, MARKET_TRENDS_SYSTEM, SKILL_RECOMMENDATIONS_PROMPT,
    SKILL_RECOMMENDATIONS_SYSTEM,
};

fn ai_source() -> String {
    "ai".to_string()
}

/// Upskilling plan toward a target role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRecommendations {
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub learning_path: String,
    #[serde(default)]
    pub time_to_acquire: String,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub market_demand: String,
    #[serde(default)]
    pub salary_impact: String,
    /// "ai" | "fallback" — which backend produced the plan.
    #[serde(default = "ai_source")]
    pub source: String,
}

/// Market assessment for a skill set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketTrends {
    #[serde(default)]
    pub demand_trends: String,
    #[serde(default)]
    pub salary_trends: String,
    #[serde(default)]
    pub opportunities: String,
    #[serde(default)]
    pub risks: String,
    #[serde(default)]
    pub outlook: String,
    #[serde(default)]
    pub hotspots: Vec<String>,
    #[serde(default = "ai_source")]
    pub source: String,
}

/// Recommends skills for `target_role` given `current_skills`. Falls back to
/// the deterministic plan when no LLM is configured or the call fails.
pub async fn recommend_skills(
    llm: Option<&LlmClient>,
    extractor: &SkillExtractor,
    current_skills: &[String],
    target_role: &str,
) -> SkillRecommendations {
    if let Some(llm) = llm {
        let prompt = SKILL_RECOMMENDATIONS_PROMPT
            .replace("{current_skills}", &current_skills.join(", "))
            .replace("{target_role}", target_role);
        match llm
            .call_json::<SkillRecommendations>(&prompt, SKILL_RECOMMENDATIONS_SYSTEM)
            .await
        {
            Ok(mut recommendations) => {
                recommendations.source = ai_source();
                return recommendations;
            }
            Err(e) => {
                warn!("skill recommendation call failed, substituting deterministic plan: {e}");
            }
        }
    }
    fallback_recommendations(extractor, current_skills, target_role)
}

/// Deterministic plan: gaps are the role's extracted skills the candidate
/// does not already hold; the rest is generic guidance.
pub fn fallback_recommendations(
    extractor: &SkillExtractor,
    current_skills: &[String],
    target_role: &str,
) -> SkillRecommendations {
    let held: BTreeSet<&str> = current_skills.iter().map(String::as_str).collect();
    let missing_skills: Vec<String> = extractor
        .extract(target_role)
        .into_iter()
        .filter(|skill| !held.contains(skill.as_str()))
        .collect();

    SkillRecommendations {
        missing_skills,
        priority: "Medium".to_string(),
        learning_path: "Online courses followed by hands-on projects".to_string(),
        time_to_acquire: "3-6 months".to_string(),
        resources: vec![
            "Coursera".to_string(),
            "Udemy".to_string(),
            "YouTube".to_string(),
        ],
        market_demand: "High".to_string(),
        salary_impact: "10-20% increase".to_string(),
        source: "fallback".to_string(),
    }
}

/// Assesses the market for `skills`. Falls back to the static assessment
/// when no LLM is configured or the call fails.
pub async fn analyze_market_trends(llm: Option<&LlmClient>, skills: &[String]) -> MarketTrends {
    if let Some(llm) = llm {
        let prompt = MARKET_TRENDS_PROMPT.replace("{skills}", &skills.join(", "));
        match llm
            .call_json::<MarketTrends>(&prompt, MARKET_TRENDS_SYSTEM)
            .await
        {
            Ok(mut trends) => {
                trends.source = ai_source();
                return trends;
            }
            Err(e) => {
                warn!("market trend call failed, substituting static assessment: {e}");
            }
        }
    }
    fallback_trends()
}

pub fn fallback_trends() -> MarketTrends {
    MarketTrends {
        demand_trends: "Stable".to_string(),
        salary_trends: "Increasing".to_string(),
        opportunities: "Good".to_string(),
        risks: "Low".to_string(),
        outlook: "Positive".to_string(),
        hotspots: vec![
            "Silicon Valley".to_string(),
            "New York".to_string(),
            "London".to_string(),
        ],
        source: "fallback".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::lexicon::SkillLexicon;
    use std::sync::Arc;

    fn extractor(names: &[&str]) -> SkillExtractor {
        SkillExtractor::new(Arc::new(SkillLexicon::from_names(names)))
    }

    #[tokio::test]
    async fn test_no_llm_falls_back_with_computed_gaps() {
        let ex = extractor(&["Python", "Docker", "Kubernetes"]);
        let current = vec!["Python".to_string()];

        let recs = recommend_skills(
            None,
            &ex,
            &current,
            "DevOps engineer with docker and kubernetes",
        )
        .await;
        assert_eq!(recs.source, "fallback");
        assert_eq!(recs.missing_skills, vec!["Docker", "Kubernetes"]);
    }

    #[test]
    fn test_fallback_gaps_exclude_held_skills() {
        let ex = extractor(&["Python", "SQL"]);
        let current = vec!["Python".to_string(), "SQL".to_string()];

        let recs = fallback_recommendations(&ex, &current, "python and sql analyst");
        assert!(recs.missing_skills.is_empty());
        assert!(!recs.resources.is_empty());
    }

    #[tokio::test]
    async fn test_no_llm_trends_use_static_assessment() {
        let trends = analyze_market_trends(None, &["Rust".to_string()]).await;
        assert_eq!(trends.source, "fallback");
        assert_eq!(trends.outlook, "Positive");
        assert!(!trends.hotspots.is_empty());
    }

    #[test]
    fn test_recommendations_deserialize_with_missing_fields() {
        // the LLM is not asked for a source field and may omit others
        let json = r#"{"missing_skills": ["Kubernetes"], "priority": "High"}"#;
        let recs: SkillRecommendations = serde_json::from_str(json).unwrap();
        assert_eq!(recs.source, "ai");
        assert_eq!(recs.missing_skills, vec!["Kubernetes"]);
        assert!(recs.learning_path.is_empty());
    }
}
