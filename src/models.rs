//! Domain records shared by the stores, the achievement engine and the web layer.
//!
//! Field names serialize in camelCase to match the public JSON API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::orm::achievements::{
    AchievementCategory, AchievementRarity, AchievementType, RequirementType,
};

/// Generate a new canonical identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A catalog entry. Immutable once seeded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    /// Stable identifier; special requirements are keyed on it.
    pub slug: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub achievement_type: AchievementType,
    pub category: AchievementCategory,
    pub badge_image_url: String,
    pub points: u32,
    pub rarity: AchievementRarity,
    pub requirement_type: RequirementType,
    pub requirement_value: u32,
    pub requirement_details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ledger row linking a user to a catalog entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievement {
    pub id: String,
    pub user_id: String,
    pub achievement_id: String,
    pub earned_at: DateTime<Utc>,
    /// 0 through 100.
    pub progress: u8,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub credited: bool,
    pub metadata: Option<String>,
}

impl UserAchievement {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Result of a find-or-create on the ledger.
#[derive(Clone, Debug)]
pub struct LedgerWrite {
    pub row: UserAchievement,
    /// True only for the call that moved the row from open to completed.
    pub newly_completed: bool,
}

/// Per-user aggregate counters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_id: String,
    pub display_name: Option<String>,
    pub total_points: u64,
    pub level: u64,
    pub events_created: u64,
    pub events_attended: u64,
    pub tokens_collected: u64,
    pub achievements_earned: u64,
    pub streak_days: u64,
    pub last_active: DateTime<Utc>,
    pub joined_at: DateTime<Utc>,
    pub profile_image_url: Option<String>,
}

impl UserStats {
    /// A freshly initialized row: every counter zero, level 1.
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_owned(),
            display_name: None,
            total_points: 0,
            level: 1,
            events_created: 0,
            events_attended: 0,
            tokens_collected: 0,
            achievements_earned: 0,
            streak_days: 0,
            last_active: now,
            joined_at: now,
            profile_image_url: None,
        }
    }
}

/// Counter increments applied atomically by the stats store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatsDelta {
    pub events_created: u64,
    pub events_attended: u64,
    pub tokens_collected: u64,
    pub achievements_earned: u64,
    pub total_points: u64,
    pub last_active: Option<DateTime<Utc>>,
}

impl StatsDelta {
    pub fn is_empty(&self) -> bool {
        self.events_created == 0
            && self.events_attended == 0
            && self.tokens_collected == 0
            && self.achievements_earned == 0
            && self.total_points == 0
            && self.last_active.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub creator: String,
    pub token_mint_address: String,
    pub qr_code_data: String,
    pub max_attendees: Option<u32>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Event fields supplied by its creator.
#[derive(Clone, Debug)]
pub struct NewEvent {
    pub name: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub creator: String,
    pub token_mint_address: String,
    pub qr_code_data: String,
    pub max_attendees: Option<u32>,
    pub image_url: Option<String>,
}

impl NewEvent {
    pub fn into_event(self, created_at: DateTime<Utc>) -> Event {
        Event {
            id: new_id(),
            name: self.name,
            description: self.description,
            date: self.date,
            creator: self.creator,
            token_mint_address: self.token_mint_address,
            qr_code_data: self.qr_code_data,
            max_attendees: self.max_attendees,
            image_url: self.image_url,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaim {
    pub id: String,
    pub event_id: String,
    pub wallet_address: String,
    pub transaction_signature: String,
    pub claimed_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewTokenClaim {
    pub event_id: String,
    pub wallet_address: String,
    pub transaction_signature: String,
}

impl NewTokenClaim {
    pub fn into_claim(self, claimed_at: DateTime<Utc>) -> TokenClaim {
        TokenClaim {
            id: new_id(),
            event_id: self.event_id,
            wallet_address: self.wallet_address,
            transaction_signature: self.transaction_signature,
            claimed_at,
        }
    }
}
