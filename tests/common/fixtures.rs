//! Test fixtures for creating test data
#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use popbadge::achievements::AchievementEngine;
use popbadge::chain::DemoIssuer;
use popbadge::models::{Event, NewEvent, NewTokenClaim, TokenClaim};
use popbadge::store::{EventStore, MemoryStore, SharedStore};
use popbadge::web::AppServices;
use std::sync::Arc;

pub const CACHE_TTL: std::time::Duration = std::time::Duration::from_secs(60);

pub fn memory_store() -> SharedStore {
    Arc::new(MemoryStore::new())
}

/// Engine over `store` with the default catalog seeded.
pub async fn seeded_engine_with(store: SharedStore) -> AchievementEngine {
    let engine = AchievementEngine::new(store, CACHE_TTL);
    engine
        .seed_catalog()
        .await
        .expect("Failed to seed catalog");
    engine
}

pub async fn seeded_engine() -> AchievementEngine {
    seeded_engine_with(memory_store()).await
}

/// Services for an in-memory app with the default catalog seeded.
pub async fn seeded_services() -> AppServices {
    seeded_services_with(memory_store()).await
}

pub async fn seeded_services_with(store: SharedStore) -> AppServices {
    let services = AppServices::new(store, Arc::new(DemoIssuer), CACHE_TTL);
    services
        .engine
        .seed_catalog()
        .await
        .expect("Failed to seed catalog");
    services
}

pub fn sample_event(creator: &str, created_at: DateTime<Utc>) -> Event {
    NewEvent {
        name: "Rust Meetup".to_string(),
        description: "Monthly meetup".to_string(),
        date: created_at + Duration::days(7),
        creator: creator.to_string(),
        token_mint_address: "solTestMint".to_string(),
        qr_code_data: "pop-testcode".to_string(),
        max_attendees: None,
        image_url: None,
    }
    .into_event(created_at)
}

/// Store an event created `age` ago.
pub async fn create_event_aged(store: &SharedStore, creator: &str, age: Duration) -> Event {
    store
        .insert_event(sample_event(creator, Utc::now() - age))
        .await
        .expect("Failed to insert event")
}

pub async fn create_claim_at(
    store: &SharedStore,
    event: &Event,
    wallet: &str,
    claimed_at: DateTime<Utc>,
) -> TokenClaim {
    let claim = NewTokenClaim {
        event_id: event.id.clone(),
        wallet_address: wallet.to_string(),
        transaction_signature: "testsig".to_string(),
    }
    .into_claim(claimed_at);
    store
        .insert_claim(claim, event.max_attendees)
        .await
        .expect("Failed to insert claim")
}
