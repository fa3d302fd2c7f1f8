//! Store wrappers that inject faults into the in-memory backend
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use popbadge::models::{
    Achievement, AchievementType, Event, LedgerWrite, StatsDelta, TokenClaim, UserAchievement,
    UserStats,
};
use popbadge::stats::StreakChange;
use popbadge::store::{
    CatalogStore, EventStore, MemoryStore, StatsStore, StoreError, StoreResult,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

/// Memory store with switchable faults.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    /// Make `credit_award` fail as if the connection dropped.
    pub fail_credit: AtomicBool,
    /// Make `has_wallet_claimed` always answer false, as a concurrent
    /// request would see before the other claim commits.
    pub stale_claim_check: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for FaultyStore {
    async fn list_achievements(&self) -> StoreResult<Vec<Achievement>> {
        self.inner.list_achievements().await
    }

    async fn list_achievements_by_type(
        &self,
        achievement_type: AchievementType,
    ) -> StoreResult<Vec<Achievement>> {
        self.inner.list_achievements_by_type(achievement_type).await
    }

    async fn count_achievements(&self) -> StoreResult<u64> {
        self.inner.count_achievements().await
    }

    async fn insert_achievements(&self, achievements: Vec<Achievement>) -> StoreResult<()> {
        self.inner.insert_achievements(achievements).await
    }

    async fn clear_achievements(&self) -> StoreResult<u64> {
        self.inner.clear_achievements().await
    }
}

#[async_trait]
impl StatsStore for FaultyStore {
    async fn get_stats(&self, user_id: &str) -> StoreResult<Option<UserStats>> {
        self.inner.get_stats(user_id).await
    }

    async fn get_or_init_stats(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<UserStats> {
        self.inner.get_or_init_stats(user_id, now).await
    }

    async fn increment_stats(&self, user_id: &str, delta: &StatsDelta) -> StoreResult<()> {
        self.inner.increment_stats(user_id, delta).await
    }

    async fn set_level_if_higher(&self, user_id: &str, level: u64) -> StoreResult<bool> {
        self.inner.set_level_if_higher(user_id, level).await
    }

    async fn apply_streak(
        &self,
        user_id: &str,
        change: StreakChange,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.inner.apply_streak(user_id, change, now).await
    }

    async fn list_user_achievements(&self, user_id: &str) -> StoreResult<Vec<UserAchievement>> {
        self.inner.list_user_achievements(user_id).await
    }

    async fn find_completed_achievement_ids(&self, user_id: &str) -> StoreResult<HashSet<String>> {
        self.inner.find_completed_achievement_ids(user_id).await
    }

    async fn upsert_user_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
        progress: u8,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<LedgerWrite> {
        self.inner
            .upsert_user_achievement(user_id, achievement_id, progress, completed_at)
            .await
    }

    async fn credit_award(
        &self,
        user_id: &str,
        achievement_id: &str,
        points: u32,
    ) -> StoreResult<bool> {
        if self.fail_credit.load(Ordering::SeqCst) {
            return Err(StoreError::Database("connection reset".to_string()));
        }
        self.inner.credit_award(user_id, achievement_id, points).await
    }
}

#[async_trait]
impl EventStore for FaultyStore {
    async fn insert_event(&self, event: Event) -> StoreResult<Event> {
        self.inner.insert_event(event).await
    }

    async fn get_event(&self, id: &str) -> StoreResult<Option<Event>> {
        self.inner.get_event(id).await
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        self.inner.list_events().await
    }

    async fn list_events_by_creator(&self, creator: &str) -> StoreResult<Vec<Event>> {
        self.inner.list_events_by_creator(creator).await
    }

    async fn insert_claim(
        &self,
        claim: TokenClaim,
        max_attendees: Option<u32>,
    ) -> StoreResult<TokenClaim> {
        self.inner.insert_claim(claim, max_attendees).await
    }

    async fn has_wallet_claimed(&self, event_id: &str, wallet_address: &str) -> StoreResult<bool> {
        if self.stale_claim_check.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.has_wallet_claimed(event_id, wallet_address).await
    }

    async fn count_claims_for_event(&self, event_id: &str) -> StoreResult<u64> {
        self.inner.count_claims_for_event(event_id).await
    }

    async fn list_claims_by_wallet(&self, wallet_address: &str) -> StoreResult<Vec<TokenClaim>> {
        self.inner.list_claims_by_wallet(wallet_address).await
    }

    async fn count_distinct_claimed_events(&self, wallet_address: &str) -> StoreResult<u64> {
        self.inner.count_distinct_claimed_events(wallet_address).await
    }
}
