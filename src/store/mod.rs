//! Storage strategy for the catalog, stats, ledger, events and claims.
//!
//! Supports multiple backends:
//! - `memory`: process-local maps, for development and tests
//! - `database`: SeaORM over PostgreSQL or SQLite
//!
//! The backend is picked once at startup and handed to the engine and the
//! web layer as an `Arc<dyn Store>`.

pub mod memory;
pub mod sql;

use crate::app_config::{StorageBackend, StorageConfig};
use crate::models::{
    Achievement, AchievementType, Event, LedgerWrite, StatsDelta, TokenClaim, UserAchievement,
    UserStats,
};
use crate::stats::StreakChange;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

pub use memory::MemoryStore;
pub use sql::SqlStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Why a write was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictKind {
    /// The wallet already holds a claim for the event.
    AlreadyClaimed,
    /// The event reached its attendee limit.
    CapacityReached,
}

/// Storage operation errors.
#[derive(Debug)]
pub enum StoreError {
    /// Record not found
    NotFound(String),
    /// Uniqueness or capacity violation
    Conflict(ConflictKind),
    /// Backend failure
    Database(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StoreError::Conflict(ConflictKind::AlreadyClaimed) => {
                write!(f, "Conflict: token already claimed by this wallet")
            }
            StoreError::Conflict(ConflictKind::CapacityReached) => {
                write!(f, "Conflict: maximum number of attendees reached")
            }
            StoreError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sea_orm::DbErr> for StoreError {
    fn from(e: sea_orm::DbErr) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Achievement catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All achievements, ordered by points then title.
    async fn list_achievements(&self) -> StoreResult<Vec<Achievement>>;

    async fn list_achievements_by_type(
        &self,
        achievement_type: AchievementType,
    ) -> StoreResult<Vec<Achievement>>;

    async fn count_achievements(&self) -> StoreResult<u64>;

    async fn insert_achievements(&self, achievements: Vec<Achievement>) -> StoreResult<()>;

    /// Delete the whole catalog, returning the number of removed rows.
    async fn clear_achievements(&self) -> StoreResult<u64>;
}

/// Per-user stats and the achievement ledger.
///
/// Every counter mutation is atomic at the storage layer; callers never
/// read-modify-write counters themselves.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn get_stats(&self, user_id: &str) -> StoreResult<Option<UserStats>>;

    /// Lookup, create if absent. Safe to call repeatedly and concurrently.
    async fn get_or_init_stats(&self, user_id: &str, now: DateTime<Utc>)
        -> StoreResult<UserStats>;

    /// Add `delta` to the user's counters. Fails with `NotFound` for an
    /// uninitialized user.
    async fn increment_stats(&self, user_id: &str, delta: &StatsDelta) -> StoreResult<()>;

    /// Raise the stored level to `level` if it is strictly higher.
    /// Returns whether a write happened.
    async fn set_level_if_higher(&self, user_id: &str, level: u64) -> StoreResult<bool>;

    async fn apply_streak(
        &self,
        user_id: &str,
        change: StreakChange,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn list_user_achievements(&self, user_id: &str) -> StoreResult<Vec<UserAchievement>>;

    async fn find_completed_achievement_ids(&self, user_id: &str) -> StoreResult<HashSet<String>>;

    /// Find-or-create the ledger row for the pair and move it forward.
    ///
    /// Progress only ever increases. A completed row is returned untouched.
    async fn upsert_user_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
        progress: u8,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<LedgerWrite>;

    /// Apply an earned achievement's rewards exactly once.
    ///
    /// Atomically flips the completed row's `credited` flag and adds one
    /// achievement and `points` to the stats. Returns false when the row is
    /// already credited or not completed.
    async fn credit_award(&self, user_id: &str, achievement_id: &str, points: u32)
        -> StoreResult<bool>;
}

/// Events and token claims.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_event(&self, event: Event) -> StoreResult<Event>;

    async fn get_event(&self, id: &str) -> StoreResult<Option<Event>>;

    /// All events, newest first.
    async fn list_events(&self) -> StoreResult<Vec<Event>>;

    async fn list_events_by_creator(&self, creator: &str) -> StoreResult<Vec<Event>>;

    /// Persist a claim. Enforces one claim per (event, wallet) and the
    /// optional attendee limit as part of the write itself.
    async fn insert_claim(
        &self,
        claim: TokenClaim,
        max_attendees: Option<u32>,
    ) -> StoreResult<TokenClaim>;

    async fn has_wallet_claimed(&self, event_id: &str, wallet_address: &str) -> StoreResult<bool>;

    async fn count_claims_for_event(&self, event_id: &str) -> StoreResult<u64>;

    /// Claims of a wallet, oldest first.
    async fn list_claims_by_wallet(&self, wallet_address: &str) -> StoreResult<Vec<TokenClaim>>;

    async fn count_distinct_claimed_events(&self, wallet_address: &str) -> StoreResult<u64>;
}

/// Everything the engine and the HTTP layer need from storage.
pub trait Store: CatalogStore + StatsStore + EventStore {}

impl<T: CatalogStore + StatsStore + EventStore> Store for T {}

pub type SharedStore = Arc<dyn Store>;

/// Build the configured backend. A database backend gets its schema
/// created on connect.
pub async fn from_config(config: &StorageConfig) -> StoreResult<SharedStore> {
    match config.backend {
        StorageBackend::Memory => {
            log::info!("Using in-memory storage");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Database => {
            let db = crate::db::connect(&config.database_url).await?;
            Ok(Arc::new(SqlStore::new(db)))
        }
    }
}
