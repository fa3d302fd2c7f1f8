//! SeaORM entities backing the SQL store.

pub mod achievements;
pub mod events;
pub mod token_claims;
pub mod user_achievements;
pub mod user_stats;
