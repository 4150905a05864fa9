//! Usage Ledger — the metering gate every paid feature goes through.
//!
//! Storage failures deny the operation (fail closed); handlers surface them
//! as a retryable service error, never as a free pass.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::metering::plans::{Feature, Limit, PlanId, PlanRegistry};
use crate::metering::store::{IncrementOutcome, Period, StorageError, UsageStore};

/// Outcome of a limit check or a gated increment.
#[derive(Debug, Clone, Serialize)]
pub struct UsageCheck {
    pub allowed: bool,
    pub feature: Feature,
    pub plan: PlanId,
    pub limit: Limit,
    /// Count for the current period, after the increment if one happened.
    pub current_usage: u32,
    pub remaining: Limit,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureUsage {
    pub used: u32,
    pub limit: Limit,
    pub remaining: Limit,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    pub user_id: Uuid,
    pub plan: PlanId,
    pub period: Period,
    pub features: BTreeMap<Feature, FeatureUsage>,
}

pub struct UsageLedger {
    store: Arc<dyn UsageStore>,
    plans: Arc<PlanRegistry>,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn UsageStore>, plans: Arc<PlanRegistry>) -> Self {
        Self { store, plans }
    }

    /// Current-period usage for (user, feature). A stored record from an
    /// earlier period reads as zero; nothing is written.
    async fn current_usage(
        &self,
        user_id: Uuid,
        feature: Feature,
        period: Period,
    ) -> Result<u32, StorageError> {
        Ok(self
            .store
            .fetch(user_id, feature)
            .await?
            .filter(|r| r.period_start == period)
            .map(|r| r.count)
            .unwrap_or(0))
    }

    /// Read-only: would one more use of `feature` be allowed right now?
    pub async fn check_limit(
        &self,
        user_id: Uuid,
        plan: PlanId,
        feature: Feature,
    ) -> Result<UsageCheck, StorageError> {
        let limit = self.plans.limit(plan, feature);
        let current = self.current_usage(user_id, feature, Period::current()).await?;
        Ok(UsageCheck {
            allowed: limit.allows(current),
            feature,
            plan,
            limit,
            current_usage: current,
            remaining: limit.remaining(current),
        })
    }

    /// The gate: atomically consume one use of `feature` if the plan allows
    /// it. On `allowed: false` nothing was consumed.
    pub async fn increment_usage(
        &self,
        user_id: Uuid,
        plan: PlanId,
        feature: Feature,
    ) -> Result<UsageCheck, StorageError> {
        let limit = self.plans.limit(plan, feature);
        let period = Period::current();

        // A zero limit can never be satisfied; skip the write path entirely.
        if limit == Limit::Limited(0) {
            let current = self.current_usage(user_id, feature, period).await?;
            return Ok(UsageCheck {
                allowed: false,
                feature,
                plan,
                limit,
                current_usage: current,
                remaining: Limit::Limited(0),
            });
        }

        match self
            .store
            .try_increment(user_id, feature, period, limit.ceiling())
            .await?
        {
            IncrementOutcome::Incremented(record) => Ok(UsageCheck {
                allowed: true,
                feature,
                plan,
                limit,
                current_usage: record.count,
                remaining: limit.remaining(record.count),
            }),
            IncrementOutcome::AtCeiling(current) => Ok(UsageCheck {
                allowed: false,
                feature,
                plan,
                limit,
                current_usage: current,
                remaining: limit.remaining(current),
            }),
        }
    }

    /// Hands back one use consumed by `increment_usage` when the metered
    /// work failed after the gate.
    pub async fn release(&self, user_id: Uuid, feature: Feature) -> Result<(), StorageError> {
        self.store.release(user_id, feature, Period::current()).await
    }

    pub async fn reset(&self, user_id: Uuid, feature: Option<Feature>) -> Result<(), StorageError> {
        self.store.reset(user_id, feature).await
    }

    /// Every feature on the plan with current-period usage and remaining
    /// allowance. Features never touched report zero usage.
    pub async fn usage_summary(
        &self,
        user_id: Uuid,
        plan: PlanId,
    ) -> Result<UsageSummary, StorageError> {
        let period = Period::current();
        let records = self.store.list_for_user(user_id).await?;
        let counts: BTreeMap<Feature, u32> = records
            .into_iter()
            .filter(|r| r.period_start == period)
            .map(|r| (r.feature, r.count))
            .collect();

        let mut features = BTreeMap::new();
        if let Some(plan_def) = self.plans.plan(plan) {
            for (&feature, &limit) in &plan_def.limits {
                let used = counts.get(&feature).copied().unwrap_or(0);
                features.insert(
                    feature,
                    FeatureUsage {
                        used,
                        limit,
                        remaining: limit.remaining(used),
                    },
                );
            }
        }

        Ok(UsageSummary {
            user_id,
            plan,
            period,
            features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metering::store::{InMemoryUsageStore, UsageRecord};
    use async_trait::async_trait;

    fn ledger() -> (UsageLedger, Arc<InMemoryUsageStore>) {
        let store = Arc::new(InMemoryUsageStore::new());
        let ledger = UsageLedger::new(
            Arc::clone(&store) as Arc<dyn UsageStore>,
            Arc::new(PlanRegistry::builtin()),
        );
        (ledger, store)
    }

    #[tokio::test]
    async fn test_free_plan_walks_down_to_denial() {
        let (ledger, _) = ledger();
        let user = Uuid::new_v4();

        for expected_remaining in [2u32, 1, 0] {
            let check = ledger
                .increment_usage(user, PlanId::Free, Feature::JobMatching)
                .await
                .unwrap();
            assert!(check.allowed);
            assert_eq!(check.remaining, Limit::Limited(expected_remaining));
        }

        let check = ledger
            .increment_usage(user, PlanId::Free, Feature::JobMatching)
            .await
            .unwrap();
        assert!(!check.allowed);
        assert_eq!(check.current_usage, 3);
        assert_eq!(check.remaining, Limit::Limited(0));
    }

    #[tokio::test]
    async fn test_unlimited_plan_never_denies() {
        let (ledger, _) = ledger();
        let user = Uuid::new_v4();

        for _ in 0..50 {
            let check = ledger
                .increment_usage(user, PlanId::Pro, Feature::AiChat)
                .await
                .unwrap();
            assert!(check.allowed);
            assert_eq!(check.remaining, Limit::Unlimited);
        }
    }

    #[tokio::test]
    async fn test_zero_limit_feature_denied_without_writing() {
        let (ledger, store) = ledger();
        let user = Uuid::new_v4();

        let check = ledger
            .increment_usage(user, PlanId::Free, Feature::VoiceAssistant)
            .await
            .unwrap();
        assert!(!check.allowed);
        assert_eq!(check.current_usage, 0);
        assert!(store
            .fetch(user, Feature::VoiceAssistant)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_stale_record_reads_as_zero_and_rolls_over() {
        let (ledger, store) = ledger();
        let user = Uuid::new_v4();
        let current = Period::current();
        store.seed(UsageRecord {
            user_id: user,
            feature: Feature::ResumeAnalysis,
            count: 3,
            period_start: Period {
                year: if current.month == 1 { current.year - 1 } else { current.year },
                month: if current.month == 1 { 12 } else { current.month - 1 },
            },
        });

        let check = ledger
            .check_limit(user, PlanId::Free, Feature::ResumeAnalysis)
            .await
            .unwrap();
        assert!(check.allowed);
        assert_eq!(check.current_usage, 0);

        let check = ledger
            .increment_usage(user, PlanId::Free, Feature::ResumeAnalysis)
            .await
            .unwrap();
        assert!(check.allowed);
        assert_eq!(check.current_usage, 1);
    }

    #[tokio::test]
    async fn test_release_hands_a_use_back() {
        let (ledger, _) = ledger();
        let user = Uuid::new_v4();

        for _ in 0..3 {
            ledger
                .increment_usage(user, PlanId::Free, Feature::JobMatching)
                .await
                .unwrap();
        }
        ledger.release(user, Feature::JobMatching).await.unwrap();

        let check = ledger
            .increment_usage(user, PlanId::Free, Feature::JobMatching)
            .await
            .unwrap();
        assert!(check.allowed);
    }

    #[tokio::test]
    async fn test_summary_covers_untouched_features() {
        let (ledger, _) = ledger();
        let user = Uuid::new_v4();
        ledger
            .increment_usage(user, PlanId::Free, Feature::AiChat)
            .await
            .unwrap();

        let summary = ledger.usage_summary(user, PlanId::Free).await.unwrap();
        let chat = &summary.features[&Feature::AiChat];
        assert_eq!(chat.used, 1);
        assert_eq!(chat.remaining, Limit::Limited(4));
        let matching = &summary.features[&Feature::JobMatching];
        assert_eq!(matching.used, 0);
        assert_eq!(matching.limit, Limit::Limited(3));
    }

    struct FailingStore;

    #[async_trait]
    impl UsageStore for FailingStore {
        async fn try_increment(
            &self,
            _: Uuid,
            _: Feature,
            _: Period,
            _: Option<u32>,
        ) -> Result<IncrementOutcome, StorageError> {
            Err(StorageError::Corrupt("backend down".to_string()))
        }

        async fn fetch(&self, _: Uuid, _: Feature) -> Result<Option<UsageRecord>, StorageError> {
            Err(StorageError::Corrupt("backend down".to_string()))
        }

        async fn list_for_user(&self, _: Uuid) -> Result<Vec<UsageRecord>, StorageError> {
            Err(StorageError::Corrupt("backend down".to_string()))
        }

        async fn release(&self, _: Uuid, _: Feature, _: Period) -> Result<(), StorageError> {
            Err(StorageError::Corrupt("backend down".to_string()))
        }

        async fn reset(&self, _: Uuid, _: Option<Feature>) -> Result<(), StorageError> {
            Err(StorageError::Corrupt("backend down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_an_error_not_an_allow() {
        let ledger = UsageLedger::new(
            Arc::new(FailingStore),
            Arc::new(PlanRegistry::builtin()),
        );
        let user = Uuid::new_v4();

        let result = ledger
            .increment_usage(user, PlanId::Free, Feature::AiChat)
            .await;
        assert!(result.is_err());
    }
}
