//! Review Scheduler
//!
//! Tracks one review record per rated item and answers "what is due now".
//!
//! Interval policy: the harder the rating, the sooner the next review.
//! Rating an item that has no record yet creates one (idempotent upsert),
//! so ids the corpus does not know are accepted rather than rejected.

use chrono::Duration;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::config::ReviewConfig;
use crate::config::loader::ConfigLoader;
use crate::error::{AppError, Result};
use crate::models::review::{BucketStats, Difficulty, DueFilter, ReviewRecord};
use crate::models::vocabulary::{VocabularyCorpus, VocabularyItem};
use crate::services::clock::Clock;
use crate::storage::kv::{KeyValueStore, keys, read_or_default, write_json};

type RecordTable = BTreeMap<String, ReviewRecord>;

/// Difficulty -> interval mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPolicy {
    pub hard: Duration,
    pub medium: Duration,
    pub easy: Duration,
    /// Window used by `stats()` for "upcoming"
    pub upcoming_window: Duration,
}

impl IntervalPolicy {
    pub fn from_config(config: &ReviewConfig) -> Result<Self> {
        ConfigLoader::validate_review(config)?;
        Ok(Self {
            hard: Duration::hours(config.hard_interval_hours),
            medium: Duration::hours(config.medium_interval_hours),
            easy: Duration::hours(config.easy_interval_hours),
            upcoming_window: Duration::hours(config.upcoming_window_hours),
        })
    }

    pub fn interval(&self, difficulty: Difficulty) -> Duration {
        match difficulty {
            Difficulty::Hard => self.hard,
            Difficulty::Medium => self.medium,
            Difficulty::Easy => self.easy,
        }
    }
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self {
            hard: Duration::days(1),
            medium: Duration::days(3),
            easy: Duration::days(7),
            upcoming_window: Duration::hours(24),
        }
    }
}

/// Review Scheduler
///
/// Sole owner of review records. Every call reads the record table from the
/// store, so two schedulers over the same store see each other's writes.
pub struct ReviewScheduler {
    store: Arc<dyn KeyValueStore>,
    corpus: Arc<VocabularyCorpus>,
    clock: Arc<dyn Clock>,
    policy: IntervalPolicy,
}

impl ReviewScheduler {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        corpus: Arc<VocabularyCorpus>,
        clock: Arc<dyn Clock>,
        policy: IntervalPolicy,
    ) -> Self {
        Self {
            store,
            corpus,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &IntervalPolicy {
        &self.policy
    }

    async fn load(&self) -> RecordTable {
        read_or_default(self.store.as_ref(), keys::REVIEW_RECORDS).await
    }

    /// Record a rating and reschedule the item
    pub async fn rate(&self, item_id: &str, difficulty: Difficulty) -> Result<ReviewRecord> {
        if item_id.trim().is_empty() {
            return Err(AppError::InvalidArgument("item id must not be empty".to_string()));
        }

        let now = self.clock.now();
        let interval = self.policy.interval(difficulty);
        let mut records = self.load().await;

        let record = match records.get_mut(item_id) {
            Some(existing) => {
                existing.apply(difficulty, now, interval);
                existing.clone()
            }
            None => {
                if self.corpus.find_item(item_id).is_none() {
                    tracing::debug!("Rating item {} that is not in the corpus", item_id);
                }
                let created = ReviewRecord::new(item_id, difficulty, now, interval);
                records.insert(item_id.to_string(), created.clone());
                created
            }
        };

        write_json(self.store.as_ref(), keys::REVIEW_RECORDS, &records).await?;

        tracing::info!(
            "Rated {} as {} (count {}), next due {}",
            item_id,
            difficulty,
            record.rating_count,
            record.next_due
        );
        Ok(record)
    }

    pub async fn record(&self, item_id: &str) -> Option<ReviewRecord> {
        self.load().await.remove(item_id)
    }

    /// Due records, most overdue first; `limit == 0` means unbounded
    pub async fn due_records(&self, filter: DueFilter, limit: usize) -> Vec<ReviewRecord> {
        let now = self.clock.now();
        let mut due: Vec<ReviewRecord> = self
            .load()
            .await
            .into_values()
            .filter(|r| r.is_due(now) && filter.matches(r.difficulty))
            .collect();

        due.sort_by(|a, b| {
            a.next_due
                .cmp(&b.next_due)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        if limit > 0 {
            due.truncate(limit);
        }
        due
    }

    /// Due vocabulary items, most overdue first
    ///
    /// Records whose ids are missing from the corpus are skipped; the limit
    /// applies to the returned items.
    pub async fn due(&self, filter: DueFilter, limit: usize) -> Vec<VocabularyItem> {
        let mut items: Vec<VocabularyItem> = self
            .due_records(filter, 0)
            .await
            .iter()
            .filter_map(|record| self.corpus.find_item(&record.item_id).cloned())
            .collect();
        if limit > 0 {
            items.truncate(limit);
        }
        items
    }

    /// Per-difficulty totals
    pub async fn stats(&self) -> BTreeMap<Difficulty, BucketStats> {
        let now = self.clock.now();
        let horizon = now + self.policy.upcoming_window;

        let mut stats: BTreeMap<Difficulty, BucketStats> = Difficulty::ALL
            .iter()
            .map(|d| (*d, BucketStats::default()))
            .collect();

        for record in self.load().await.values() {
            let bucket = stats.entry(record.difficulty).or_default();
            bucket.total += 1;
            if record.is_due(now) {
                bucket.due += 1;
            } else if record.next_due <= horizon {
                bucket.upcoming_within_24h += 1;
            }
        }
        stats
    }

    /// Items whose latest rating is `Hard`
    pub async fn struggling_count(&self) -> usize {
        self.load()
            .await
            .values()
            .filter(|r| r.difficulty == Difficulty::Hard)
            .count()
    }

    /// Items rated at least once
    pub async fn learned_count(&self) -> usize {
        self.load().await.len()
    }

    /// Clear every review record and completion record. Irreversible.
    pub async fn reset(&self) -> Result<()> {
        self.store.remove(keys::REVIEW_RECORDS).await?;
        self.store.remove(keys::COMPLETED_SESSIONS).await?;
        tracing::warn!("Review records and session completions were reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use crate::storage::kv::MockKeyValueStore;
    use crate::storage::memory::MemoryStore;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn corpus() -> Arc<VocabularyCorpus> {
        Arc::new(VocabularyCorpus::new().with_category(
            "basics",
            vec![
                VocabularyItem::new("w1", "uno", "one", 1),
                VocabularyItem::new("w2", "dos", "two", 1),
                VocabularyItem::new("w3", "tres", "three", 2),
            ],
        ))
    }

    fn scheduler() -> (ReviewScheduler, Arc<ManualClock>, Arc<MemoryStore>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()));
        let store = Arc::new(MemoryStore::new());
        let scheduler =
            ReviewScheduler::new(store.clone(), corpus(), clock.clone(), IntervalPolicy::default());
        (scheduler, clock, store)
    }

    #[tokio::test]
    async fn test_hard_rating_due_after_one_day() {
        let (scheduler, clock, _) = scheduler();
        let t0 = clock.now();

        let record = scheduler.rate("w1", Difficulty::Hard).await.unwrap();
        assert_eq!(record.next_due, t0 + Duration::days(1));

        clock.set(t0 + Duration::hours(12));
        assert!(scheduler.due(DueFilter::All, 0).await.is_empty());

        clock.set(t0 + Duration::days(2));
        let due = scheduler.due(DueFilter::All, 0).await;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "w1");
    }

    #[tokio::test]
    async fn test_harder_never_later_than_easier() {
        let (scheduler, _, _) = scheduler();
        let hard = scheduler.rate("w1", Difficulty::Hard).await.unwrap();
        let medium = scheduler.rate("w2", Difficulty::Medium).await.unwrap();
        let easy = scheduler.rate("w3", Difficulty::Easy).await.unwrap();

        assert!(hard.next_due <= medium.next_due);
        assert!(medium.next_due <= easy.next_due);
    }

    #[tokio::test]
    async fn test_repeated_ratings_stay_ahead_of_last_review() {
        let (scheduler, clock, _) = scheduler();
        for difficulty in [Difficulty::Easy, Difficulty::Hard, Difficulty::Medium, Difficulty::Hard] {
            let record = scheduler.rate("w2", difficulty).await.unwrap();
            assert!(record.next_due > record.last_reviewed);
            clock.advance(Duration::hours(30));
        }

        let record = scheduler.record("w2").await.unwrap();
        assert_eq!(record.rating_count, 4);
        assert_eq!(record.history.len(), 4);
        assert_eq!(record.difficulty, Difficulty::Hard);
    }

    #[tokio::test]
    async fn test_due_is_ordered_filtered_and_limited() {
        let (scheduler, clock, _) = scheduler();
        let t0 = clock.now();
        scheduler.rate("w3", Difficulty::Easy).await.unwrap();
        clock.set(t0 + Duration::hours(1));
        scheduler.rate("w1", Difficulty::Hard).await.unwrap();
        clock.set(t0 + Duration::hours(2));
        scheduler.rate("w2", Difficulty::Hard).await.unwrap();

        clock.set(t0 + Duration::days(10));
        let ids: Vec<String> = scheduler
            .due(DueFilter::All, 0)
            .await
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["w1", "w2", "w3"]);

        let hard = scheduler.due(DueFilter::Only(Difficulty::Hard), 1).await;
        assert_eq!(hard.len(), 1);
        assert_eq!(hard[0].id, "w1");
    }

    #[tokio::test]
    async fn test_unknown_item_is_upserted_but_not_listed() {
        let (scheduler, clock, _) = scheduler();
        let record = scheduler.rate("ghost", Difficulty::Medium).await.unwrap();
        assert_eq!(record.rating_count, 1);

        clock.advance(Duration::days(5));
        assert_eq!(scheduler.due_records(DueFilter::All, 0).await.len(), 1);
        assert!(scheduler.due(DueFilter::All, 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_stats_split_due_and_upcoming() {
        let (scheduler, clock, _) = scheduler();
        let t0 = clock.now();
        scheduler.rate("w1", Difficulty::Hard).await.unwrap();
        clock.set(t0 + Duration::hours(20));
        scheduler.rate("w2", Difficulty::Hard).await.unwrap();
        scheduler.rate("w3", Difficulty::Easy).await.unwrap();

        clock.set(t0 + Duration::hours(25));
        let stats = scheduler.stats().await;

        let hard = stats[&Difficulty::Hard];
        assert_eq!(hard.total, 2);
        assert_eq!(hard.due, 1);
        assert_eq!(hard.upcoming_within_24h, 1);
        assert_eq!(stats[&Difficulty::Easy].total, 1);
        assert_eq!(stats[&Difficulty::Easy].upcoming_within_24h, 0);
        assert_eq!(stats[&Difficulty::Medium], BucketStats::default());
    }

    #[tokio::test]
    async fn test_reset_clears_reviews_and_completions() {
        let (scheduler, _, store) = scheduler();
        scheduler.rate("w1", Difficulty::Easy).await.unwrap();
        store
            .set(keys::COMPLETED_SESSIONS, json!([{"session_id": "basics:1"}]))
            .await
            .unwrap();

        scheduler.reset().await.unwrap();

        assert_eq!(scheduler.learned_count().await, 0);
        assert!(store.get(keys::COMPLETED_SESSIONS).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_table_is_treated_as_empty() {
        let (scheduler, _, store) = scheduler();
        store.set(keys::REVIEW_RECORDS, json!("garbage")).await.unwrap();

        assert_eq!(scheduler.learned_count().await, 0);
        let record = scheduler.rate("w1", Difficulty::Medium).await.unwrap();
        assert_eq!(record.rating_count, 1);
    }

    #[tokio::test]
    async fn test_write_failure_surfaces_store_unavailable() {
        let mut store = MockKeyValueStore::new();
        store.expect_get().returning(|_| Ok(None));
        store
            .expect_set()
            .returning(|_, _| Err(AppError::StoreUnavailable("disk full".into())));

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let scheduler =
            ReviewScheduler::new(Arc::new(store), corpus(), clock, IntervalPolicy::default());

        let err = scheduler.rate("w1", Difficulty::Hard).await.unwrap_err();
        assert_eq!(err.code(), "STORE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_read_failure_falls_back_to_empty() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .returning(|_| Err(AppError::StoreUnavailable("offline".into())));

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let scheduler =
            ReviewScheduler::new(Arc::new(store), corpus(), clock, IntervalPolicy::default());

        assert!(scheduler.due(DueFilter::All, 0).await.is_empty());
        assert_eq!(scheduler.stats().await[&Difficulty::Hard].total, 0);
    }

    #[test]
    fn test_policy_from_config_rejects_inverted_order() {
        let config = ReviewConfig {
            hard_interval_hours: 100,
            medium_interval_hours: 50,
            easy_interval_hours: 200,
            upcoming_window_hours: 24,
        };
        assert!(IntervalPolicy::from_config(&config).is_err());
    }
}
