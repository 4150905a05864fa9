//! Plan Registry — the static plan → feature → limit table, plus the plan
//! metadata the catalog endpoint serves. Constructed once at startup and
//! injected by `Arc`; tests build registries with alternate tables.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every metered feature in the product.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    ResumeAnalysis,
    ResumeRewrite,
    CoverLetter,
    JobMatching,
    ImageGeneration,
    AiChat,
    VoiceAssistant,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::ResumeAnalysis => "resume_analysis",
            Feature::ResumeRewrite => "resume_rewrite",
            Feature::CoverLetter => "cover_letter",
            Feature::JobMatching => "job_matching",
            Feature::ImageGeneration => "image_generation",
            Feature::AiChat => "ai_chat",
            Feature::VoiceAssistant => "voice_assistant",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown feature: {0}")]
pub struct UnknownFeature(pub String);

impl FromStr for Feature {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resume_analysis" => Ok(Feature::ResumeAnalysis),
            "resume_rewrite" => Ok(Feature::ResumeRewrite),
            "cover_letter" => Ok(Feature::CoverLetter),
            "job_matching" => Ok(Feature::JobMatching),
            "image_generation" => Ok(Feature::ImageGeneration),
            "ai_chat" => Ok(Feature::AiChat),
            "voice_assistant" => Ok(Feature::VoiceAssistant),
            other => Err(UnknownFeature(other.to_string())),
        }
    }
}

/// Subscription tiers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    #[default]
    Free,
    Plus,
    Pro,
    Business,
}

impl PlanId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanId::Free => "free",
            PlanId::Plus => "plus",
            PlanId::Pro => "pro",
            PlanId::Business => "business",
        }
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-feature cap. `Unlimited` is a real sentinel — distinct from a
/// limit of zero, which means "never available on this plan."
///
/// Wire form is an integer with -1 meaning unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Limited(u32),
    Unlimited,
}

impl Limit {
    pub fn allows(&self, current_usage: u32) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::Limited(n) => current_usage < *n,
        }
    }

    pub fn remaining(&self, current_usage: u32) -> Limit {
        match self {
            Limit::Unlimited => Limit::Unlimited,
            Limit::Limited(n) => Limit::Limited(n.saturating_sub(current_usage)),
        }
    }

    /// `None` means no ceiling (unlimited).
    pub fn ceiling(&self) -> Option<u32> {
        match self {
            Limit::Unlimited => None,
            Limit::Limited(n) => Some(*n),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Limit::Unlimited => serializer.serialize_i64(-1),
            Limit::Limited(n) => serializer.serialize_i64(i64::from(*n)),
        }
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        if raw < 0 {
            Ok(Limit::Unlimited)
        } else {
            Ok(Limit::Limited(raw.min(i64::from(u32::MAX)) as u32))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

/// One subscription tier: display metadata plus the limit table.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub monthly_price: f64,
    pub description: String,
    pub features: Vec<String>,
    pub limits: BTreeMap<Feature, Limit>,
}

impl Plan {
    /// Yearly billing carries a 20% discount.
    pub fn price_for(&self, cycle: BillingCycle) -> f64 {
        match cycle {
            BillingCycle::Monthly => self.monthly_price,
            BillingCycle::Yearly => self.monthly_price * 12.0 * 0.8,
        }
    }
}

/// Immutable lookup table over all plans.
#[derive(Debug, Clone)]
pub struct PlanRegistry {
    plans: BTreeMap<PlanId, Plan>,
}

impl PlanRegistry {
    pub fn new(plans: Vec<Plan>) -> Self {
        Self {
            plans: plans.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    pub fn plan(&self, id: PlanId) -> Option<&Plan> {
        self.plans.get(&id)
    }

    pub fn plans(&self) -> impl Iterator<Item = &Plan> {
        self.plans.values()
    }

    /// The limit for (plan, feature). Unknown combinations are a limit of
    /// zero, never a silent unlimited.
    pub fn limit(&self, plan: PlanId, feature: Feature) -> Limit {
        self.plans
            .get(&plan)
            .and_then(|p| p.limits.get(&feature).copied())
            .unwrap_or(Limit::Limited(0))
    }

    /// The built-in tier table.
    pub fn builtin() -> Self {
        let limited = |entries: &[(Feature, u32)]| -> BTreeMap<Feature, Limit> {
            entries
                .iter()
                .map(|&(f, n)| (f, Limit::Limited(n)))
                .collect()
        };
        let unlimited_all = || -> BTreeMap<Feature, Limit> {
            [
                Feature::ResumeAnalysis,
                Feature::ResumeRewrite,
                Feature::CoverLetter,
                Feature::JobMatching,
                Feature::ImageGeneration,
                Feature::AiChat,
                Feature::VoiceAssistant,
            ]
            .into_iter()
            .map(|f| (f, Limit::Unlimited))
            .collect()
        };

        Self::new(vec![
            Plan {
                id: PlanId::Free,
                name: "Free".to_string(),
                monthly_price: 0.0,
                description: "Basic career tools to get started".to_string(),
                features: vec![
                    "3 résumé analyses per month".to_string(),
                    "Basic AI chat (5 per month)".to_string(),
                    "Basic job matching (3 per month)".to_string(),
                ],
                limits: limited(&[
                    (Feature::ResumeAnalysis, 3),
                    (Feature::AiChat, 5),
                    (Feature::JobMatching, 3),
                    (Feature::ResumeRewrite, 0),
                    (Feature::CoverLetter, 0),
                    (Feature::ImageGeneration, 0),
                    (Feature::VoiceAssistant, 0),
                ]),
            },
            Plan {
                id: PlanId::Plus,
                name: "Plus".to_string(),
                monthly_price: 599.0,
                description: "Advanced career optimization tools".to_string(),
                features: vec![
                    "Résumé analysis and rewriting (45 per month)".to_string(),
                    "Cover letter generation (45 per month)".to_string(),
                    "Job matching (50 per month)".to_string(),
                    "Advanced AI chat (100 per month)".to_string(),
                    "Voice assistant".to_string(),
                ],
                limits: limited(&[
                    (Feature::ResumeAnalysis, 45),
                    (Feature::ResumeRewrite, 45),
                    (Feature::CoverLetter, 45),
                    (Feature::JobMatching, 50),
                    (Feature::ImageGeneration, 20),
                    (Feature::AiChat, 100),
                    (Feature::VoiceAssistant, 50),
                ]),
            },
            Plan {
                id: PlanId::Pro,
                name: "Pro".to_string(),
                monthly_price: 1399.0,
                description: "Complete career optimization suite".to_string(),
                features: vec![
                    "Everything in Plus".to_string(),
                    "All features unlimited".to_string(),
                    "Priority support".to_string(),
                ],
                limits: unlimited_all(),
            },
            Plan {
                id: PlanId::Business,
                name: "Business".to_string(),
                monthly_price: 1999.0,
                description: "Enterprise-grade career optimization for teams".to_string(),
                features: vec![
                    "Everything in Pro".to_string(),
                    "Team management".to_string(),
                    "Priority support".to_string(),
                ],
                limits: unlimited_all(),
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_allows_any_usage() {
        assert!(Limit::Unlimited.allows(0));
        assert!(Limit::Unlimited.allows(u32::MAX));
        assert_eq!(Limit::Unlimited.remaining(12345), Limit::Unlimited);
    }

    #[test]
    fn test_zero_limit_is_not_unlimited() {
        assert!(!Limit::Limited(0).allows(0));
        assert_eq!(Limit::Limited(0).remaining(0), Limit::Limited(0));
    }

    #[test]
    fn test_limited_allows_below_limit_only() {
        let limit = Limit::Limited(3);
        assert!(limit.allows(2));
        assert!(!limit.allows(3));
        assert_eq!(limit.remaining(1), Limit::Limited(2));
        assert_eq!(limit.remaining(5), Limit::Limited(0));
    }

    #[test]
    fn test_limit_wire_form_uses_minus_one_sentinel() {
        assert_eq!(serde_json::to_string(&Limit::Unlimited).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&Limit::Limited(0)).unwrap(), "0");
        let parsed: Limit = serde_json::from_str("-1").unwrap();
        assert_eq!(parsed, Limit::Unlimited);
    }

    #[test]
    fn test_builtin_free_plan_limits() {
        let registry = PlanRegistry::builtin();
        assert_eq!(
            registry.limit(PlanId::Free, Feature::JobMatching),
            Limit::Limited(3)
        );
        assert_eq!(
            registry.limit(PlanId::Free, Feature::VoiceAssistant),
            Limit::Limited(0)
        );
        assert_eq!(
            registry.limit(PlanId::Pro, Feature::JobMatching),
            Limit::Unlimited
        );
    }

    #[test]
    fn test_yearly_billing_has_20_percent_discount() {
        let registry = PlanRegistry::builtin();
        let plus = registry.plan(PlanId::Plus).unwrap();
        let yearly = plus.price_for(BillingCycle::Yearly);
        assert!((yearly - 599.0 * 12.0 * 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_feature_round_trips_through_str() {
        for feature in [
            Feature::ResumeAnalysis,
            Feature::JobMatching,
            Feature::AiChat,
        ] {
            assert_eq!(feature.as_str().parse::<Feature>().unwrap(), feature);
        }
        assert!("teleportation".parse::<Feature>().is_err());
    }
}
