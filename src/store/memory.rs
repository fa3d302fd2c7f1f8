//! In-memory store backend.
//!
//! Each collection is a `DashMap`. Read-modify-write operations hold the
//! shard lock of the affected key for their whole duration, which makes
//! counter increments and claim inserts atomic. When two locks are needed
//! they are always taken ledger first, stats second.

use super::{
    CatalogStore, ConflictKind, EventStore, StatsStore, StoreError, StoreResult,
};
use crate::models::{
    new_id, Achievement, AchievementType, Event, LedgerWrite, StatsDelta, TokenClaim,
    UserAchievement, UserStats,
};
use crate::stats::StreakChange;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;

/// Process-local store. State is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    achievements: DashMap<String, Achievement>,
    stats: DashMap<String, UserStats>,
    /// Keyed by (user_id, achievement_id).
    ledger: DashMap<(String, String), UserAchievement>,
    events: DashMap<String, Event>,
    /// Claims grouped by event id.
    claims: DashMap<String, Vec<TokenClaim>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        log::info!("MemoryStore initialized");
        Self::default()
    }

    fn sorted_achievements(&self, filter: impl Fn(&Achievement) -> bool) -> Vec<Achievement> {
        let mut list: Vec<Achievement> = self
            .achievements
            .iter()
            .filter(|a| filter(a.value()))
            .map(|a| a.value().clone())
            .collect();
        list.sort_by(|a, b| a.points.cmp(&b.points).then_with(|| a.title.cmp(&b.title)));
        list
    }

    fn newest_first(mut events: Vec<Event>) -> Vec<Event> {
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_achievements(&self) -> StoreResult<Vec<Achievement>> {
        Ok(self.sorted_achievements(|_| true))
    }

    async fn list_achievements_by_type(
        &self,
        achievement_type: AchievementType,
    ) -> StoreResult<Vec<Achievement>> {
        Ok(self.sorted_achievements(|a| a.achievement_type == achievement_type))
    }

    async fn count_achievements(&self) -> StoreResult<u64> {
        Ok(self.achievements.len() as u64)
    }

    async fn insert_achievements(&self, achievements: Vec<Achievement>) -> StoreResult<()> {
        for achievement in achievements {
            self.achievements.insert(achievement.id.clone(), achievement);
        }
        Ok(())
    }

    async fn clear_achievements(&self) -> StoreResult<u64> {
        let removed = self.achievements.len() as u64;
        self.achievements.clear();
        Ok(removed)
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn get_stats(&self, user_id: &str) -> StoreResult<Option<UserStats>> {
        Ok(self.stats.get(user_id).map(|s| s.value().clone()))
    }

    async fn get_or_init_stats(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<UserStats> {
        let stats = self
            .stats
            .entry(user_id.to_owned())
            .or_insert_with(|| {
                log::debug!("Creating new user stats for {}", user_id);
                UserStats::new(user_id, now)
            });
        Ok(stats.value().clone())
    }

    async fn increment_stats(&self, user_id: &str, delta: &StatsDelta) -> StoreResult<()> {
        let mut stats = self
            .stats
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("stats for {}", user_id)))?;
        stats.events_created += delta.events_created;
        stats.events_attended += delta.events_attended;
        stats.tokens_collected += delta.tokens_collected;
        stats.achievements_earned += delta.achievements_earned;
        stats.total_points += delta.total_points;
        if let Some(last_active) = delta.last_active {
            stats.last_active = last_active;
        }
        Ok(())
    }

    async fn set_level_if_higher(&self, user_id: &str, level: u64) -> StoreResult<bool> {
        let mut stats = self
            .stats
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("stats for {}", user_id)))?;
        if level > stats.level {
            stats.level = level;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn apply_streak(
        &self,
        user_id: &str,
        change: StreakChange,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut stats = self
            .stats
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("stats for {}", user_id)))?;
        stats.streak_days = change.apply(stats.streak_days);
        stats.last_active = now;
        Ok(())
    }

    async fn list_user_achievements(&self, user_id: &str) -> StoreResult<Vec<UserAchievement>> {
        Ok(self
            .ledger
            .iter()
            .filter(|row| row.key().0 == user_id)
            .map(|row| row.value().clone())
            .collect())
    }

    async fn find_completed_achievement_ids(&self, user_id: &str) -> StoreResult<HashSet<String>> {
        Ok(self
            .ledger
            .iter()
            .filter(|row| row.key().0 == user_id && row.value().is_completed())
            .map(|row| row.key().1.clone())
            .collect())
    }

    async fn upsert_user_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
        progress: u8,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<LedgerWrite> {
        let progress = progress.min(100);
        match self
            .ledger
            .entry((user_id.to_owned(), achievement_id.to_owned()))
        {
            Entry::Occupied(mut occupied) => {
                let row = occupied.get_mut();
                if row.is_completed() {
                    return Ok(LedgerWrite {
                        row: row.clone(),
                        newly_completed: false,
                    });
                }
                if completed_at.is_some() {
                    row.progress = 100;
                    row.completed_at = completed_at;
                } else {
                    row.progress = row.progress.max(progress);
                }
                Ok(LedgerWrite {
                    row: row.clone(),
                    newly_completed: completed_at.is_some(),
                })
            }
            Entry::Vacant(vacant) => {
                let row = UserAchievement {
                    id: new_id(),
                    user_id: user_id.to_owned(),
                    achievement_id: achievement_id.to_owned(),
                    earned_at: completed_at.unwrap_or_else(Utc::now),
                    progress,
                    completed_at,
                    credited: false,
                    metadata: None,
                };
                vacant.insert(row.clone());
                Ok(LedgerWrite {
                    row,
                    newly_completed: completed_at.is_some(),
                })
            }
        }
    }

    async fn credit_award(
        &self,
        user_id: &str,
        achievement_id: &str,
        points: u32,
    ) -> StoreResult<bool> {
        let key = (user_id.to_owned(), achievement_id.to_owned());
        let mut row = self.ledger.get_mut(&key).ok_or_else(|| {
            StoreError::NotFound(format!("ledger row {}/{}", user_id, achievement_id))
        })?;
        if row.credited || !row.is_completed() {
            return Ok(false);
        }
        let mut stats = self
            .stats
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(format!("stats for {}", user_id)))?;
        stats.achievements_earned += 1;
        stats.total_points += u64::from(points);
        row.credited = true;
        Ok(true)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_event(&self, event: Event) -> StoreResult<Event> {
        self.events.insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: &str) -> StoreResult<Option<Event>> {
        Ok(self.events.get(id).map(|e| e.value().clone()))
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        Ok(Self::newest_first(
            self.events.iter().map(|e| e.value().clone()).collect(),
        ))
    }

    async fn list_events_by_creator(&self, creator: &str) -> StoreResult<Vec<Event>> {
        Ok(Self::newest_first(
            self.events
                .iter()
                .filter(|e| e.value().creator == creator)
                .map(|e| e.value().clone())
                .collect(),
        ))
    }

    async fn insert_claim(
        &self,
        claim: TokenClaim,
        max_attendees: Option<u32>,
    ) -> StoreResult<TokenClaim> {
        let mut claims = self.claims.entry(claim.event_id.clone()).or_default();
        if claims
            .iter()
            .any(|c| c.wallet_address == claim.wallet_address)
        {
            return Err(StoreError::Conflict(ConflictKind::AlreadyClaimed));
        }
        if let Some(max) = max_attendees {
            if claims.len() >= max as usize {
                return Err(StoreError::Conflict(ConflictKind::CapacityReached));
            }
        }
        claims.push(claim.clone());
        Ok(claim)
    }

    async fn has_wallet_claimed(&self, event_id: &str, wallet_address: &str) -> StoreResult<bool> {
        Ok(self
            .claims
            .get(event_id)
            .map(|claims| claims.iter().any(|c| c.wallet_address == wallet_address))
            .unwrap_or(false))
    }

    async fn count_claims_for_event(&self, event_id: &str) -> StoreResult<u64> {
        Ok(self
            .claims
            .get(event_id)
            .map(|claims| claims.len() as u64)
            .unwrap_or(0))
    }

    async fn list_claims_by_wallet(&self, wallet_address: &str) -> StoreResult<Vec<TokenClaim>> {
        let mut found = Vec::new();
        for claims in self.claims.iter() {
            found.extend(
                claims
                    .value()
                    .iter()
                    .filter(|c| c.wallet_address == wallet_address)
                    .cloned(),
            );
        }
        found.sort_by(|a, b| a.claimed_at.cmp(&b.claimed_at));
        Ok(found)
    }

    async fn count_distinct_claimed_events(&self, wallet_address: &str) -> StoreResult<u64> {
        Ok(self
            .claims
            .iter()
            .filter(|claims| {
                claims
                    .value()
                    .iter()
                    .any(|c| c.wallet_address == wallet_address)
            })
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewTokenClaim;

    fn claim(event_id: &str, wallet: &str) -> TokenClaim {
        NewTokenClaim {
            event_id: event_id.to_string(),
            wallet_address: wallet.to_string(),
            transaction_signature: "sig".to_string(),
        }
        .into_claim(Utc::now())
    }

    #[actix_rt::test]
    async fn test_duplicate_claim_is_rejected() {
        let store = MemoryStore::new();
        store.insert_claim(claim("e1", "w1"), None).await.unwrap();

        let second = store.insert_claim(claim("e1", "w1"), None).await;
        assert!(matches!(
            second,
            Err(StoreError::Conflict(ConflictKind::AlreadyClaimed))
        ));
        assert_eq!(store.count_claims_for_event("e1").await.unwrap(), 1);
    }

    #[actix_rt::test]
    async fn test_capacity_is_enforced_on_insert() {
        let store = MemoryStore::new();
        store.insert_claim(claim("e1", "w1"), Some(2)).await.unwrap();
        store.insert_claim(claim("e1", "w2"), Some(2)).await.unwrap();

        let third = store.insert_claim(claim("e1", "w3"), Some(2)).await;
        assert!(matches!(
            third,
            Err(StoreError::Conflict(ConflictKind::CapacityReached))
        ));
    }

    #[actix_rt::test]
    async fn test_distinct_event_count() {
        let store = MemoryStore::new();
        store.insert_claim(claim("e1", "w1"), None).await.unwrap();
        store.insert_claim(claim("e2", "w1"), None).await.unwrap();
        store.insert_claim(claim("e2", "w2"), None).await.unwrap();

        assert_eq!(store.count_distinct_claimed_events("w1").await.unwrap(), 2);
        assert_eq!(store.count_distinct_claimed_events("w2").await.unwrap(), 1);
        assert_eq!(store.count_distinct_claimed_events("w3").await.unwrap(), 0);
    }

    #[actix_rt::test]
    async fn test_increment_requires_initialized_stats() {
        let store = MemoryStore::new();
        let delta = StatsDelta {
            events_created: 1,
            ..Default::default()
        };
        assert!(matches!(
            store.increment_stats("nobody", &delta).await,
            Err(StoreError::NotFound(_))
        ));

        store.get_or_init_stats("w1", Utc::now()).await.unwrap();
        store.increment_stats("w1", &delta).await.unwrap();
        store.increment_stats("w1", &delta).await.unwrap();
        let stats = store.get_stats("w1").await.unwrap().unwrap();
        assert_eq!(stats.events_created, 2);
    }

    #[actix_rt::test]
    async fn test_level_never_regresses() {
        let store = MemoryStore::new();
        store.get_or_init_stats("w1", Utc::now()).await.unwrap();

        assert!(store.set_level_if_higher("w1", 3).await.unwrap());
        assert!(!store.set_level_if_higher("w1", 2).await.unwrap());
        assert!(!store.set_level_if_higher("w1", 3).await.unwrap());
        assert_eq!(store.get_stats("w1").await.unwrap().unwrap().level, 3);
    }

    #[actix_rt::test]
    async fn test_credit_award_applies_once() {
        let store = MemoryStore::new();
        store.get_or_init_stats("w1", Utc::now()).await.unwrap();
        store
            .upsert_user_achievement("w1", "a1", 100, Some(Utc::now()))
            .await
            .unwrap();

        assert!(store.credit_award("w1", "a1", 10).await.unwrap());
        assert!(!store.credit_award("w1", "a1", 10).await.unwrap());

        let stats = store.get_stats("w1").await.unwrap().unwrap();
        assert_eq!(stats.total_points, 10);
        assert_eq!(stats.achievements_earned, 1);
    }

    #[actix_rt::test]
    async fn test_progress_row_completes_in_place() {
        let store = MemoryStore::new();
        let first = store
            .upsert_user_achievement("w1", "a1", 40, None)
            .await
            .unwrap();
        assert!(!first.newly_completed);

        let lower = store
            .upsert_user_achievement("w1", "a1", 20, None)
            .await
            .unwrap();
        assert_eq!(lower.row.progress, 40);

        let done = store
            .upsert_user_achievement("w1", "a1", 100, Some(Utc::now()))
            .await
            .unwrap();
        assert!(done.newly_completed);
        assert_eq!(done.row.earned_at, first.row.earned_at);
        assert_eq!(done.row.id, first.row.id);

        let again = store
            .upsert_user_achievement("w1", "a1", 100, Some(Utc::now()))
            .await
            .unwrap();
        assert!(!again.newly_completed);
        assert_eq!(store.list_user_achievements("w1").await.unwrap().len(), 1);
    }
}
