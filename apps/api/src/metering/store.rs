//! Usage Ledger storage — per-(user, feature) monthly counters.
//!
//! Two backends behind `UsageStore`: `PgUsageStore` for production and
//! `InMemoryUsageStore` for tests. The check-and-increment is atomic in both:
//! Postgres does it in a single conditional upsert, the in-memory store holds
//! its mutex across the read-modify-write.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::metering::plans::Feature;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("usage storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("corrupt usage record: {0}")]
    Corrupt(String),
}

/// A billing month. Counters reset when the stored period predates the
/// current one; nothing is reset eagerly at month boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn current() -> Self {
        let now = Utc::now();
        Self {
            year: now.year(),
            month: now.month(),
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The first day of the month, the form the database stores.
    pub fn first_day(&self) -> NaiveDate {
        // month is always 1..=12 for values built via current()/from_date()
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageRecord {
    pub user_id: Uuid,
    pub feature: Feature,
    pub count: u32,
    pub period_start: Period,
}

/// Result of an atomic check-and-increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncrementOutcome {
    Incremented(UsageRecord),
    /// The counter was already at the ceiling; nothing was written.
    AtCeiling(u32),
}

#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Increments the (user, feature) counter for `period` unless it is
    /// already at `ceiling`. A stored record from an earlier period is
    /// rolled over (count restarts at 1). `ceiling: None` means no cap.
    async fn try_increment(
        &self,
        user_id: Uuid,
        feature: Feature,
        period: Period,
        ceiling: Option<u32>,
    ) -> Result<IncrementOutcome, StorageError>;

    async fn fetch(
        &self,
        user_id: Uuid,
        feature: Feature,
    ) -> Result<Option<UsageRecord>, StorageError>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<UsageRecord>, StorageError>;

    /// Compensates a failed metered operation. Decrements by one, never
    /// below zero, and only if the stored period matches.
    async fn release(
        &self,
        user_id: Uuid,
        feature: Feature,
        period: Period,
    ) -> Result<(), StorageError>;

    /// Admin reset. `feature: None` clears every counter for the user.
    async fn reset(&self, user_id: Uuid, feature: Option<Feature>) -> Result<(), StorageError>;
}

/// Test and development backend.
#[derive(Default)]
pub struct InMemoryUsageStore {
    records: Mutex<HashMap<(Uuid, Feature), UsageRecord>>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a record directly, bypassing the increment path. Used by
    /// tests to stage counters from earlier periods.
    pub fn seed(&self, record: UsageRecord) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert((record.user_id, record.feature), record);
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn try_increment(
        &self,
        user_id: Uuid,
        feature: Feature,
        period: Period,
        ceiling: Option<u32>,
    ) -> Result<IncrementOutcome, StorageError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let entry = records.entry((user_id, feature)).or_insert(UsageRecord {
            user_id,
            feature,
            count: 0,
            period_start: period,
        });
        if entry.period_start < period {
            entry.count = 0;
            entry.period_start = period;
        }
        if let Some(cap) = ceiling {
            if entry.count >= cap {
                return Ok(IncrementOutcome::AtCeiling(entry.count));
            }
        }
        entry.count += 1;
        Ok(IncrementOutcome::Incremented(entry.clone()))
    }

    async fn fetch(
        &self,
        user_id: Uuid,
        feature: Feature,
    ) -> Result<Option<UsageRecord>, StorageError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(&(user_id, feature)).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<UsageRecord>, StorageError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<UsageRecord> = records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.feature);
        Ok(out)
    }

    async fn release(
        &self,
        user_id: Uuid,
        feature: Feature,
        period: Period,
    ) -> Result<(), StorageError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = records.get_mut(&(user_id, feature)) {
            if entry.period_start == period {
                entry.count = entry.count.saturating_sub(1);
            }
        }
        Ok(())
    }

    async fn reset(&self, user_id: Uuid, feature: Option<Feature>) -> Result<(), StorageError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        match feature {
            Some(feature) => {
                records.remove(&(user_id, feature));
            }
            None => records.retain(|(uid, _), _| *uid != user_id),
        }
        Ok(())
    }
}

/// Production backend.
pub struct PgUsageStore {
    pool: PgPool,
}

impl PgUsageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn record_from_row(
        user_id: Uuid,
        feature: Feature,
        count: i64,
        period_start: NaiveDate,
    ) -> Result<UsageRecord, StorageError> {
        let count = u32::try_from(count)
            .map_err(|_| StorageError::Corrupt(format!("negative count {count}")))?;
        Ok(UsageRecord {
            user_id,
            feature,
            count,
            period_start: Period::from_date(period_start),
        })
    }
}

#[async_trait]
impl UsageStore for PgUsageStore {
    async fn try_increment(
        &self,
        user_id: Uuid,
        feature: Feature,
        period: Period,
        ceiling: Option<u32>,
    ) -> Result<IncrementOutcome, StorageError> {
        // Single statement so concurrent requests cannot both pass the check.
        // The upsert rolls an old period over to count = 1, otherwise adds 1.
        // Both arms honor the ceiling (NULL = no cap): the SELECT refuses a
        // fresh row when the ceiling is zero, the DO UPDATE WHERE refuses
        // when the effective count for this period is already at the ceiling.
        let row: Option<(i64, NaiveDate)> = sqlx::query_as(
            r#"
            INSERT INTO usage_records (user_id, feature, count, period_start)
            SELECT $1, $2, 1, $3
            WHERE $4::bigint IS NULL OR $4 > 0
            ON CONFLICT (user_id, feature) DO UPDATE
            SET count = CASE
                    WHEN usage_records.period_start < $3 THEN 1
                    ELSE usage_records.count + 1
                END,
                period_start = $3
            WHERE $4::bigint IS NULL
               OR (CASE
                       WHEN usage_records.period_start < $3 THEN 0
                       ELSE usage_records.count
                   END) < $4
            RETURNING count, period_start
            "#,
        )
        .bind(user_id)
        .bind(feature.as_str())
        .bind(period.first_day())
        .bind(ceiling.map(i64::from))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((count, period_start)) => Ok(IncrementOutcome::Incremented(
                Self::record_from_row(user_id, feature, count, period_start)?,
            )),
            None => {
                // Upsert refused: counter is at the ceiling for this period.
                let current = self
                    .fetch(user_id, feature)
                    .await?
                    .filter(|r| r.period_start == period)
                    .map(|r| r.count)
                    .unwrap_or(0);
                Ok(IncrementOutcome::AtCeiling(current))
            }
        }
    }

    async fn fetch(
        &self,
        user_id: Uuid,
        feature: Feature,
    ) -> Result<Option<UsageRecord>, StorageError> {
        let row: Option<(i64, NaiveDate)> = sqlx::query_as(
            "SELECT count, period_start FROM usage_records WHERE user_id = $1 AND feature = $2",
        )
        .bind(user_id)
        .bind(feature.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(count, period_start)| Self::record_from_row(user_id, feature, count, period_start))
            .transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<UsageRecord>, StorageError> {
        let rows: Vec<(String, i64, NaiveDate)> = sqlx::query_as(
            "SELECT feature, count, period_start FROM usage_records \
             WHERE user_id = $1 ORDER BY feature",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(feature, count, period_start)| {
                let feature = feature
                    .parse::<Feature>()
                    .map_err(|e| StorageError::Corrupt(e.to_string()))?;
                Self::record_from_row(user_id, feature, count, period_start)
            })
            .collect()
    }

    async fn release(
        &self,
        user_id: Uuid,
        feature: Feature,
        period: Period,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE usage_records \
             SET count = GREATEST(count - 1, 0) \
             WHERE user_id = $1 AND feature = $2 AND period_start = $3",
        )
        .bind(user_id)
        .bind(feature.as_str())
        .bind(period.first_day())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reset(&self, user_id: Uuid, feature: Option<Feature>) -> Result<(), StorageError> {
        match feature {
            Some(feature) => {
                sqlx::query("DELETE FROM usage_records WHERE user_id = $1 AND feature = $2")
                    .bind(user_id)
                    .bind(feature.as_str())
                    .execute(&self.pool)
                    .await?;
            }
            None => {
                sqlx::query("DELETE FROM usage_records WHERE user_id = $1")
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn period(year: i32, month: u32) -> Period {
        Period { year, month }
    }

    #[tokio::test]
    async fn test_increment_counts_up_from_zero() {
        let store = InMemoryUsageStore::new();
        let user = Uuid::new_v4();

        for expected in 1..=3u32 {
            let outcome = store
                .try_increment(user, Feature::AiChat, period(2026, 8), Some(10))
                .await
                .unwrap();
            match outcome {
                IncrementOutcome::Incremented(record) => assert_eq!(record.count, expected),
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_increment_refuses_at_ceiling() {
        let store = InMemoryUsageStore::new();
        let user = Uuid::new_v4();
        let p = period(2026, 8);

        store
            .try_increment(user, Feature::JobMatching, p, Some(1))
            .await
            .unwrap();
        let outcome = store
            .try_increment(user, Feature::JobMatching, p, Some(1))
            .await
            .unwrap();
        assert_eq!(outcome, IncrementOutcome::AtCeiling(1));

        // nothing was written on refusal
        let record = store.fetch(user, Feature::JobMatching).await.unwrap().unwrap();
        assert_eq!(record.count, 1);
    }

    // Contract: a zero ceiling refuses even the very first increment, with
    // no row created or counted.
    #[tokio::test]
    async fn test_zero_ceiling_refuses_a_fresh_row() {
        let store = InMemoryUsageStore::new();
        let user = Uuid::new_v4();

        let outcome = store
            .try_increment(user, Feature::VoiceAssistant, period(2026, 8), Some(0))
            .await
            .unwrap();
        assert_eq!(outcome, IncrementOutcome::AtCeiling(0));
    }

    #[tokio::test]
    async fn test_stale_period_rolls_over_to_one() {
        let store = InMemoryUsageStore::new();
        let user = Uuid::new_v4();
        store.seed(UsageRecord {
            user_id: user,
            feature: Feature::ResumeAnalysis,
            count: 3,
            period_start: period(2026, 7),
        });

        let outcome = store
            .try_increment(user, Feature::ResumeAnalysis, period(2026, 8), Some(3))
            .await
            .unwrap();
        match outcome {
            IncrementOutcome::Incremented(record) => {
                assert_eq!(record.count, 1);
                assert_eq!(record.period_start, period(2026, 8));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_release_floors_at_zero_and_checks_period() {
        let store = InMemoryUsageStore::new();
        let user = Uuid::new_v4();
        let p = period(2026, 8);

        store
            .try_increment(user, Feature::AiChat, p, None)
            .await
            .unwrap();
        store.release(user, Feature::AiChat, p).await.unwrap();
        store.release(user, Feature::AiChat, p).await.unwrap();
        let record = store.fetch(user, Feature::AiChat).await.unwrap().unwrap();
        assert_eq!(record.count, 0);

        // a release against a different period is a no-op
        store
            .try_increment(user, Feature::AiChat, p, None)
            .await
            .unwrap();
        store.release(user, Feature::AiChat, period(2026, 7)).await.unwrap();
        let record = store.fetch(user, Feature::AiChat).await.unwrap().unwrap();
        assert_eq!(record.count, 1);
    }

    #[tokio::test]
    async fn test_reset_single_feature_and_all() {
        let store = InMemoryUsageStore::new();
        let user = Uuid::new_v4();
        let p = period(2026, 8);
        store.try_increment(user, Feature::AiChat, p, None).await.unwrap();
        store
            .try_increment(user, Feature::JobMatching, p, None)
            .await
            .unwrap();

        store.reset(user, Some(Feature::AiChat)).await.unwrap();
        assert!(store.fetch(user, Feature::AiChat).await.unwrap().is_none());
        assert!(store.fetch(user, Feature::JobMatching).await.unwrap().is_some());

        store.reset(user, None).await.unwrap();
        assert!(store.list_for_user(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_increments_respect_ceiling() {
        let store = Arc::new(InMemoryUsageStore::new());
        let user = Uuid::new_v4();
        let p = period(2026, 8);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.try_increment(user, Feature::AiChat, p, Some(1)).await
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if let IncrementOutcome::Incremented(_) = handle.await.unwrap().unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 1);
        let record = store.fetch(user, Feature::AiChat).await.unwrap().unwrap();
        assert_eq!(record.count, 1);
    }

    #[tokio::test]
    async fn test_list_for_user_is_scoped_to_the_user() {
        let store = InMemoryUsageStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let p = period(2026, 8);
        store.try_increment(alice, Feature::AiChat, p, None).await.unwrap();
        store.try_increment(bob, Feature::AiChat, p, None).await.unwrap();

        let records = store.list_for_user(alice).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, alice);
    }

    #[test]
    fn test_period_orders_chronologically() {
        assert!(period(2026, 7) < period(2026, 8));
        assert!(period(2025, 12) < period(2026, 1));
        assert_eq!(period(2026, 8).to_string(), "2026-08");
    }
}
