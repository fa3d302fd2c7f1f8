//! Default achievement catalog and seeding.

use crate::models::{
    new_id, Achievement, AchievementCategory, AchievementRarity, AchievementType, RequirementType,
};
use crate::store::{CatalogStore, Store, StoreResult};
use chrono::Utc;

struct Seed {
    slug: &'static str,
    title: &'static str,
    description: &'static str,
    achievement_type: AchievementType,
    category: AchievementCategory,
    badge: &'static str,
    points: u32,
    rarity: AchievementRarity,
    requirement_type: RequirementType,
    requirement_value: u32,
}

const SEEDS: &[Seed] = &[
    // Creator
    Seed {
        slug: "event-organizer",
        title: "Event Organizer",
        description: "Create your first event",
        achievement_type: AchievementType::Creator,
        category: AchievementCategory::Creation,
        badge: "first-event",
        points: 10,
        rarity: AchievementRarity::Common,
        requirement_type: RequirementType::Count,
        requirement_value: 1,
    },
    Seed {
        slug: "community-builder",
        title: "Community Builder",
        description: "Create 5 events",
        achievement_type: AchievementType::Creator,
        category: AchievementCategory::Creation,
        badge: "event-creator",
        points: 25,
        rarity: AchievementRarity::Uncommon,
        requirement_type: RequirementType::Count,
        requirement_value: 5,
    },
    Seed {
        slug: "event-master",
        title: "Event Master",
        description: "Create 20 events",
        achievement_type: AchievementType::Creator,
        category: AchievementCategory::Creation,
        badge: "event-master",
        points: 50,
        rarity: AchievementRarity::Rare,
        requirement_type: RequirementType::Count,
        requirement_value: 20,
    },
    Seed {
        slug: "consistent-creator",
        title: "Consistent Creator",
        description: "Create events for 3 consecutive weeks",
        achievement_type: AchievementType::Creator,
        category: AchievementCategory::Creation,
        badge: "event-streak",
        points: 30,
        rarity: AchievementRarity::Rare,
        requirement_type: RequirementType::Streak,
        requirement_value: 21,
    },
    Seed {
        slug: "crowd-magnet",
        title: "Crowd Magnet",
        description: "Have 50 total token claims across all your events",
        achievement_type: AchievementType::Creator,
        category: AchievementCategory::Social,
        badge: "crowd-magnet",
        points: 40,
        rarity: AchievementRarity::Rare,
        requirement_type: RequirementType::Count,
        requirement_value: 50,
    },
    // Participant
    Seed {
        slug: "first-attendance",
        title: "First Attendance",
        description: "Claim your first event token",
        achievement_type: AchievementType::Participant,
        category: AchievementCategory::Attendance,
        badge: "first-attendance",
        points: 5,
        rarity: AchievementRarity::Common,
        requirement_type: RequirementType::Count,
        requirement_value: 1,
    },
    Seed {
        slug: "regular-attendee",
        title: "Regular Attendee",
        description: "Claim tokens from 5 different events",
        achievement_type: AchievementType::Participant,
        category: AchievementCategory::Attendance,
        badge: "regular-attendee",
        points: 15,
        rarity: AchievementRarity::Uncommon,
        requirement_type: RequirementType::Count,
        requirement_value: 5,
    },
    Seed {
        slug: "event-enthusiast",
        title: "Event Enthusiast",
        description: "Claim tokens from 20 different events",
        achievement_type: AchievementType::Participant,
        category: AchievementCategory::Attendance,
        badge: "event-enthusiast",
        points: 35,
        rarity: AchievementRarity::Rare,
        requirement_type: RequirementType::Count,
        requirement_value: 20,
    },
    Seed {
        slug: "dedicated-participant",
        title: "Dedicated Participant",
        description: "Attend events for 3 consecutive weeks",
        achievement_type: AchievementType::Participant,
        category: AchievementCategory::Attendance,
        badge: "dedicated-participant",
        points: 25,
        rarity: AchievementRarity::Rare,
        requirement_type: RequirementType::Streak,
        requirement_value: 21,
    },
    Seed {
        slug: "lightning-fast",
        title: "Lightning Fast",
        description: "Claim a token within 1 hour of event creation",
        achievement_type: AchievementType::Participant,
        category: AchievementCategory::Special,
        badge: "lightning-fast",
        points: 20,
        rarity: AchievementRarity::Uncommon,
        requirement_type: RequirementType::Special,
        requirement_value: 1,
    },
];

/// The default catalog with fresh ids.
pub fn default_achievements() -> Vec<Achievement> {
    let now = Utc::now();
    SEEDS
        .iter()
        .map(|seed| Achievement {
            id: new_id(),
            slug: seed.slug.to_string(),
            title: seed.title.to_string(),
            description: seed.description.to_string(),
            achievement_type: seed.achievement_type,
            category: seed.category,
            badge_image_url: format!("/achievements/{}.svg", seed.badge),
            points: seed.points,
            rarity: seed.rarity,
            requirement_type: seed.requirement_type,
            requirement_value: seed.requirement_value,
            requirement_details: None,
            created_at: now,
        })
        .collect()
}

/// Insert the default catalog if the store has no achievements.
/// Returns the number of inserted rows.
pub async fn seed_if_empty(store: &dyn Store) -> StoreResult<usize> {
    let existing = store.count_achievements().await?;
    if existing > 0 {
        log::info!(
            "Found {} existing achievements, skipping initialization",
            existing
        );
        return Ok(0);
    }

    let defaults = default_achievements();
    let count = defaults.len();
    store.insert_achievements(defaults).await?;
    log::info!("Created {} default achievements", count);
    Ok(count)
}

/// Replace the whole catalog with the defaults. Ledger rows are untouched.
pub async fn reset_catalog(store: &dyn Store) -> StoreResult<usize> {
    let removed = store.clear_achievements().await?;
    log::info!("Deleted {} existing achievements", removed);

    let defaults = default_achievements();
    let count = defaults.len();
    store.insert_achievements(defaults).await?;
    log::info!("Created {} default achievements", count);
    Ok(count)
}
