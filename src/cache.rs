//! In-memory caching for catalog reads.
//! Uses moka for TTL-based caching.

use crate::models::{Achievement, AchievementType};
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Achievements of one type, shared between evaluations.
pub type CachedCatalog = Arc<Vec<Achievement>>;

/// Per-type catalog cache. The catalog only changes on seed or reset,
/// both of which invalidate.
#[derive(Clone)]
pub struct CatalogCache {
    inner: Cache<AchievementType, CachedCatalog>,
    enabled: bool,
}

impl CatalogCache {
    /// A cache keeping entries for `ttl`. A zero TTL disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().time_to_live(ttl).max_capacity(8).build(),
            enabled: !ttl.is_zero(),
        }
    }

    pub fn get(&self, achievement_type: AchievementType) -> Option<CachedCatalog> {
        self.inner.get(&achievement_type)
    }

    pub fn insert(
        &self,
        achievement_type: AchievementType,
        achievements: Vec<Achievement>,
    ) -> CachedCatalog {
        let shared = Arc::new(achievements);
        if self.enabled {
            self.inner.insert(achievement_type, shared.clone());
        }
        shared
    }

    /// Drop every cached type.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}
