//! Achievement evaluation and awarding.
//!
//! Activity triggers bump the user's counters and then evaluate every
//! catalog entry of the matching type that the user has not completed.
//! Awards are applied one achievement at a time. Each award first marks
//! the ledger row completed and then credits points through
//! [`StatsStore::credit_award`], which is idempotent; a row left completed
//! but uncredited by a failure is credited on the next evaluation.

pub mod catalog;
pub mod requirement;

use crate::cache::{CachedCatalog, CatalogCache};
use crate::models::{Achievement, AchievementType, StatsDelta, UserAchievement, UserStats};
use crate::stats::{level_for_points, StreakChange};
use crate::store::{CatalogStore, EventStore, SharedStore, StatsStore, StoreError};
use chrono::{DateTime, Utc};
use requirement::{Facts, Requirement};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Engine failures. Every failure originates in storage.
#[derive(Debug)]
pub enum EngineError {
    Store(StoreError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Store(e) => write!(f, "Achievement processing failed: {}", e),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Store(e) => Some(e),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// What one evaluation changed.
#[derive(Clone, Debug, Default)]
pub struct EvaluationReport {
    /// Achievements credited during this evaluation, including retried ones.
    pub awarded: Vec<Achievement>,
    /// Ledger rows whose partial progress moved forward.
    pub progressed: usize,
}

impl EvaluationReport {
    pub fn awarded_titles(&self) -> Vec<&str> {
        self.awarded.iter().map(|a| a.title.as_str()).collect()
    }
}

/// An achievement the user has completed.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedAchievement {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub earned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// An achievement still open to the user, with its recorded progress.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableAchievement {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub progress: u8,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct UserAchievements {
    pub earned: Vec<EarnedAchievement>,
    pub available: Vec<AvailableAchievement>,
}

pub struct AchievementEngine {
    store: SharedStore,
    catalog: CatalogCache,
}

impl AchievementEngine {
    pub fn new(store: SharedStore, catalog_ttl: Duration) -> Self {
        Self {
            store,
            catalog: CatalogCache::new(catalog_ttl),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Count a newly created event and evaluate creator achievements.
    pub async fn on_event_created(&self, user_id: &str) -> EngineResult<EvaluationReport> {
        let now = Utc::now();
        self.store.get_or_init_stats(user_id, now).await?;
        self.store
            .increment_stats(
                user_id,
                &StatsDelta {
                    events_created: 1,
                    last_active: Some(now),
                    ..Default::default()
                },
            )
            .await?;

        self.evaluate(user_id, AchievementType::Creator, now).await
    }

    /// Count a token claim and evaluate participant achievements.
    pub async fn on_token_claimed(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> EngineResult<EvaluationReport> {
        let now = Utc::now();
        self.store.get_or_init_stats(user_id, now).await?;
        self.store
            .increment_stats(
                user_id,
                &StatsDelta {
                    events_attended: 1,
                    tokens_collected: 1,
                    last_active: Some(now),
                    ..Default::default()
                },
            )
            .await?;
        log::debug!("Recorded claim of event {} by {}", event_id, user_id);

        self.evaluate(user_id, AchievementType::Participant, now).await
    }

    /// Re-evaluate without touching counters.
    pub async fn check_achievements(
        &self,
        user_id: &str,
        achievement_type: AchievementType,
    ) -> EngineResult<EvaluationReport> {
        self.evaluate(user_id, achievement_type, Utc::now()).await
    }

    pub async fn update_streak(&self, user_id: &str) -> EngineResult<()> {
        self.update_streak_at(user_id, Utc::now()).await
    }

    /// Move the user's streak as if they were seen at `now`. Users without
    /// stats are left alone.
    pub async fn update_streak_at(&self, user_id: &str, now: DateTime<Utc>) -> EngineResult<()> {
        let stats = match self.store.get_stats(user_id).await? {
            Some(stats) => stats,
            None => return Ok(()),
        };

        let change = StreakChange::between(stats.last_active, now);
        self.store.apply_streak(user_id, change, now).await?;
        Ok(())
    }

    /// Stats as shown on a profile: initialize, update the streak, read.
    pub async fn user_stats(&self, user_id: &str) -> EngineResult<Option<UserStats>> {
        self.store.get_or_init_stats(user_id, Utc::now()).await?;
        self.update_streak(user_id).await?;
        Ok(self.store.get_stats(user_id).await?)
    }

    /// The whole catalog, by points.
    pub async fn all_achievements(&self) -> EngineResult<Vec<Achievement>> {
        Ok(self.store.list_achievements().await?)
    }

    /// Split the catalog into what the user earned and what is left.
    pub async fn user_achievements(&self, user_id: &str) -> EngineResult<UserAchievements> {
        let catalog = self.store.list_achievements().await?;
        let ledger: HashMap<String, UserAchievement> = self
            .store
            .list_user_achievements(user_id)
            .await?
            .into_iter()
            .map(|row| (row.achievement_id.clone(), row))
            .collect();

        let mut view = UserAchievements::default();
        for achievement in catalog {
            match ledger.get(&achievement.id) {
                Some(row) if row.is_completed() => view.earned.push(EarnedAchievement {
                    achievement,
                    earned_at: row.earned_at,
                    completed_at: row.completed_at,
                }),
                row => view.available.push(AvailableAchievement {
                    achievement,
                    progress: row.map(|r| r.progress).unwrap_or(0),
                }),
            }
        }
        view.earned.sort_by_key(|e| e.completed_at);

        Ok(view)
    }

    /// Insert the default catalog if none exists.
    pub async fn seed_catalog(&self) -> EngineResult<usize> {
        let inserted = catalog::seed_if_empty(self.store.as_ref()).await?;
        self.catalog.invalidate_all();
        Ok(inserted)
    }

    /// Replace the catalog with the defaults.
    pub async fn reset_catalog(&self) -> EngineResult<usize> {
        let inserted = catalog::reset_catalog(self.store.as_ref()).await?;
        self.catalog.invalidate_all();
        Ok(inserted)
    }

    pub fn invalidate_catalog(&self) {
        self.catalog.invalidate_all();
    }

    async fn catalog_for(&self, achievement_type: AchievementType) -> EngineResult<CachedCatalog> {
        if let Some(cached) = self.catalog.get(achievement_type) {
            return Ok(cached);
        }
        let achievements = self.store.list_achievements_by_type(achievement_type).await?;
        Ok(self.catalog.insert(achievement_type, achievements))
    }

    async fn evaluate(
        &self,
        user_id: &str,
        achievement_type: AchievementType,
        now: DateTime<Utc>,
    ) -> EngineResult<EvaluationReport> {
        let mut report = EvaluationReport::default();
        let ledger = self.store.list_user_achievements(user_id).await?;

        self.credit_pending(user_id, &ledger, &mut report).await?;

        let completed = self.store.find_completed_achievement_ids(user_id).await?;
        let catalog = self.catalog_for(achievement_type).await?;
        let candidates: Vec<(&Achievement, Requirement)> = catalog
            .iter()
            .filter(|a| !completed.contains(&a.id))
            .map(|a| (a, Requirement::for_achievement(a)))
            .collect();
        if candidates.is_empty() {
            return Ok(report);
        }

        let stats = self.store.get_or_init_stats(user_id, now).await?;
        let facts = self
            .gather_facts(user_id, stats, candidates.iter().map(|(_, r)| r))
            .await?;

        let recorded: HashMap<&str, u8> = ledger
            .iter()
            .map(|row| (row.achievement_id.as_str(), row.progress))
            .collect();

        for (achievement, requirement) in candidates {
            if requirement.is_met(&facts) {
                if self.award(user_id, achievement, now).await? {
                    report.awarded.push(achievement.clone());
                }
                continue;
            }

            let progress = requirement.progress(&facts);
            let previous = recorded.get(achievement.id.as_str()).copied().unwrap_or(0);
            if progress > previous {
                self.store
                    .upsert_user_achievement(user_id, &achievement.id, progress, None)
                    .await?;
                report.progressed += 1;
            }
        }

        Ok(report)
    }

    /// Credit rows completed by an earlier evaluation that failed before
    /// crediting.
    async fn credit_pending(
        &self,
        user_id: &str,
        ledger: &[UserAchievement],
        report: &mut EvaluationReport,
    ) -> EngineResult<()> {
        let pending: Vec<&UserAchievement> = ledger
            .iter()
            .filter(|row| row.is_completed() && !row.credited)
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let catalog: HashMap<String, Achievement> = self
            .store
            .list_achievements()
            .await?
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();

        for row in pending {
            let achievement = match catalog.get(&row.achievement_id) {
                Some(a) => a,
                None => {
                    log::warn!(
                        "Ledger row {} references missing achievement {}",
                        row.id,
                        row.achievement_id
                    );
                    continue;
                }
            };
            if self.credit(user_id, achievement).await? {
                log::info!(
                    "Credited pending achievement \"{}\" to {}",
                    achievement.title,
                    user_id
                );
                report.awarded.push(achievement.clone());
            }
        }

        Ok(())
    }

    async fn gather_facts<'a>(
        &self,
        user_id: &str,
        stats: UserStats,
        requirements: impl Iterator<Item = &'a Requirement>,
    ) -> EngineResult<Facts> {
        let (mut distinct, mut latencies) = (false, false);
        for requirement in requirements {
            distinct |= requirement.needs_distinct_events();
            latencies |= requirement.needs_claim_latencies();
        }

        let mut facts = Facts::from_stats(stats);
        if distinct {
            facts.distinct_events = Some(self.store.count_distinct_claimed_events(user_id).await?);
        }
        if latencies {
            facts.claim_latencies_ms = self.claim_latencies(user_id).await?;
        }
        Ok(facts)
    }

    async fn claim_latencies(&self, user_id: &str) -> EngineResult<Vec<i64>> {
        let claims = self.store.list_claims_by_wallet(user_id).await?;
        let mut created: HashMap<String, Option<DateTime<Utc>>> = HashMap::new();
        let mut latencies = Vec::with_capacity(claims.len());

        for claim in claims {
            let event_created = match created.get(&claim.event_id) {
                Some(at) => *at,
                None => {
                    let at = self
                        .store
                        .get_event(&claim.event_id)
                        .await?
                        .map(|e| e.created_at);
                    created.insert(claim.event_id.clone(), at);
                    at
                }
            };
            if let Some(event_created) = event_created {
                latencies.push(
                    claim
                        .claimed_at
                        .signed_duration_since(event_created)
                        .num_milliseconds(),
                );
            }
        }

        Ok(latencies)
    }

    /// Complete the ledger row and credit it. Returns whether this call
    /// applied the points.
    async fn award(
        &self,
        user_id: &str,
        achievement: &Achievement,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        let write = self
            .store
            .upsert_user_achievement(user_id, &achievement.id, 100, Some(now))
            .await?;
        // A concurrent completion owns the credit; a failed one is picked
        // up by the next evaluation.
        if !write.newly_completed {
            return Ok(false);
        }

        let credited = self.credit(user_id, achievement).await?;
        if credited {
            log::info!(
                "Awarded achievement \"{}\" to {}",
                achievement.title,
                user_id
            );
        }
        Ok(credited)
    }

    async fn credit(&self, user_id: &str, achievement: &Achievement) -> EngineResult<bool> {
        if !self
            .store
            .credit_award(user_id, &achievement.id, achievement.points)
            .await?
        {
            return Ok(false);
        }
        self.raise_level(user_id).await?;
        Ok(true)
    }

    async fn raise_level(&self, user_id: &str) -> EngineResult<()> {
        if let Some(stats) = self.store.get_stats(user_id).await? {
            let level = level_for_points(stats.total_points);
            if self.store.set_level_if_higher(user_id, level).await? {
                log::info!("{} reached level {}", user_id, level);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    async fn engine() -> AchievementEngine {
        let engine = AchievementEngine::new(Arc::new(MemoryStore::new()), Duration::from_secs(60));
        engine.seed_catalog().await.unwrap();
        engine
    }

    #[actix_rt::test]
    async fn test_first_event_awards_organizer() {
        let engine = engine().await;
        let report = engine.on_event_created("creator1").await.unwrap();
        assert_eq!(report.awarded_titles(), vec!["Event Organizer"]);

        let stats = engine.store().get_stats("creator1").await.unwrap().unwrap();
        assert_eq!(stats.events_created, 1);
        assert_eq!(stats.total_points, 10);
        assert_eq!(stats.level, 1);
        assert_eq!(stats.achievements_earned, 1);
    }

    #[actix_rt::test]
    async fn test_partial_progress_is_recorded() {
        let engine = engine().await;
        engine.on_event_created("creator2").await.unwrap();
        engine.on_event_created("creator2").await.unwrap();

        let view = engine.user_achievements("creator2").await.unwrap();
        let builder = view
            .available
            .iter()
            .find(|a| a.achievement.slug == "community-builder")
            .unwrap();
        assert_eq!(builder.progress, 40);
        assert_eq!(view.earned.len(), 1);
    }

    #[actix_rt::test]
    async fn test_check_without_activity_awards_nothing() {
        let engine = engine().await;
        let report = engine
            .check_achievements("nobody", AchievementType::Creator)
            .await
            .unwrap();
        assert!(report.awarded.is_empty());
        assert!(engine.store().list_user_achievements("nobody").await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn test_streak_update_skips_unknown_user() {
        let engine = engine().await;
        engine.update_streak("ghost").await.unwrap();
        assert!(engine.store().get_stats("ghost").await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn test_claim_without_event_has_no_latency() {
        let engine = engine().await;
        let store = engine.store().clone();
        let claim = crate::models::NewTokenClaim {
            event_id: "missing".to_string(),
            wallet_address: "p1".to_string(),
            transaction_signature: "sig".to_string(),
        }
        .into_claim(Utc::now());
        store.insert_claim(claim, None).await.unwrap();

        assert!(engine.claim_latencies("p1").await.unwrap().is_empty());
    }
}
