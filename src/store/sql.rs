//! SeaORM store backend.
//!
//! Counter updates are issued as `SET col = col + n` so concurrent requests
//! never lose increments. Claim and ledger uniqueness are enforced by
//! unique indexes created in `crate::db`.

use super::{
    CatalogStore, ConflictKind, EventStore, StatsStore, StoreError, StoreResult,
};
use crate::models::{
    new_id, Achievement, AchievementType, Event, LedgerWrite, StatsDelta, TokenClaim,
    UserAchievement, UserStats,
};
use crate::orm::{achievements, events, token_claims, user_achievements, user_stats};
use crate::stats::StreakChange;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use sea_orm::{
    entity::*, query::*, sea_query::Expr, ConnectionTrait, DatabaseConnection, DbErr,
    PaginatorTrait, Set, TransactionTrait,
};
use std::collections::HashSet;

/// Store backed by a SQL database.
pub struct SqlStore {
    db: DatabaseConnection,
}

impl SqlStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&naive)
}

fn to_count(value: i64) -> u64 {
    value.max(0) as u64
}

/// Whether `err` reports a unique constraint violation.
///
/// SeaORM surfaces driver errors as strings, so this matches on the
/// messages of PostgreSQL and SQLite.
fn is_unique_violation(err: &DbErr) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("unique constraint") || msg.contains("duplicate key")
}

impl From<achievements::Model> for Achievement {
    fn from(m: achievements::Model) -> Self {
        Achievement {
            id: m.id,
            slug: m.slug,
            title: m.title,
            description: m.description,
            achievement_type: m.achievement_type,
            category: m.category,
            badge_image_url: m.badge_image_url,
            points: m.points.max(0) as u32,
            rarity: m.rarity,
            requirement_type: m.requirement_type,
            requirement_value: m.requirement_value.max(0) as u32,
            requirement_details: m.requirement_details,
            created_at: to_utc(m.created_at),
        }
    }
}

impl From<user_achievements::Model> for UserAchievement {
    fn from(m: user_achievements::Model) -> Self {
        UserAchievement {
            id: m.id,
            user_id: m.user_id,
            achievement_id: m.achievement_id,
            earned_at: to_utc(m.earned_at),
            progress: m.progress.clamp(0, 100) as u8,
            completed_at: m.completed_at.map(to_utc),
            credited: m.credited,
            metadata: m.metadata,
        }
    }
}

impl From<user_stats::Model> for UserStats {
    fn from(m: user_stats::Model) -> Self {
        UserStats {
            user_id: m.user_id,
            display_name: m.display_name,
            total_points: to_count(m.total_points),
            level: to_count(m.level).max(1),
            events_created: to_count(m.events_created),
            events_attended: to_count(m.events_attended),
            tokens_collected: to_count(m.tokens_collected),
            achievements_earned: to_count(m.achievements_earned),
            streak_days: to_count(m.streak_days),
            last_active: to_utc(m.last_active),
            joined_at: to_utc(m.joined_at),
            profile_image_url: m.profile_image_url,
        }
    }
}

impl From<events::Model> for Event {
    fn from(m: events::Model) -> Self {
        Event {
            id: m.id,
            name: m.name,
            description: m.description,
            date: to_utc(m.date),
            creator: m.creator,
            token_mint_address: m.token_mint_address,
            qr_code_data: m.qr_code_data,
            max_attendees: m.max_attendees.map(|n| n.max(0) as u32),
            image_url: m.image_url,
            created_at: to_utc(m.created_at),
        }
    }
}

impl From<token_claims::Model> for TokenClaim {
    fn from(m: token_claims::Model) -> Self {
        TokenClaim {
            id: m.id,
            event_id: m.event_id,
            wallet_address: m.wallet_address,
            transaction_signature: m.transaction_signature,
            claimed_at: to_utc(m.claimed_at),
        }
    }
}

/// Insert one statement's worth of rows without reading back a primary key.
async fn insert_rows<C, A, I>(conn: &C, models: I) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    A: ActiveModelTrait,
    I: IntoIterator<Item = A>,
{
    let backend = conn.get_database_backend();
    let insert = <A::Entity as EntityTrait>::insert_many(models);
    conn.execute(insert.build(backend)).await?;
    Ok(())
}

/// Add `delta` to the stats row of `user_id` on any connection or transaction.
async fn apply_delta<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    delta: &StatsDelta,
) -> StoreResult<()> {
    if delta.is_empty() {
        return Ok(());
    }

    let mut update = user_stats::Entity::update_many();
    let counters = [
        (user_stats::Column::EventsCreated, delta.events_created),
        (user_stats::Column::EventsAttended, delta.events_attended),
        (user_stats::Column::TokensCollected, delta.tokens_collected),
        (
            user_stats::Column::AchievementsEarned,
            delta.achievements_earned,
        ),
        (user_stats::Column::TotalPoints, delta.total_points),
    ];
    for (column, amount) in counters {
        if amount > 0 {
            update = update.col_expr(column, Expr::col(column).add(amount as i64));
        }
    }
    if let Some(last_active) = delta.last_active {
        update = update.col_expr(
            user_stats::Column::LastActive,
            Expr::value(last_active.naive_utc()),
        );
    }

    let result = update
        .filter(user_stats::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(StoreError::NotFound(format!("stats for {}", user_id)));
    }
    Ok(())
}

#[async_trait]
impl CatalogStore for SqlStore {
    async fn list_achievements(&self) -> StoreResult<Vec<Achievement>> {
        Ok(achievements::Entity::find()
            .order_by_asc(achievements::Column::Points)
            .order_by_asc(achievements::Column::Title)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Achievement::from)
            .collect())
    }

    async fn list_achievements_by_type(
        &self,
        achievement_type: AchievementType,
    ) -> StoreResult<Vec<Achievement>> {
        Ok(achievements::Entity::find()
            .filter(achievements::Column::AchievementType.eq(achievement_type))
            .order_by_asc(achievements::Column::Points)
            .order_by_asc(achievements::Column::Title)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Achievement::from)
            .collect())
    }

    async fn count_achievements(&self) -> StoreResult<u64> {
        Ok(achievements::Entity::find().count(&self.db).await? as u64)
    }

    async fn insert_achievements(&self, list: Vec<Achievement>) -> StoreResult<()> {
        if list.is_empty() {
            return Ok(());
        }
        let models = list.into_iter().map(|a| achievements::ActiveModel {
            id: Set(a.id),
            slug: Set(a.slug),
            title: Set(a.title),
            description: Set(a.description),
            achievement_type: Set(a.achievement_type),
            category: Set(a.category),
            badge_image_url: Set(a.badge_image_url),
            points: Set(a.points as i32),
            rarity: Set(a.rarity),
            requirement_type: Set(a.requirement_type),
            requirement_value: Set(a.requirement_value as i32),
            requirement_details: Set(a.requirement_details),
            created_at: Set(a.created_at.naive_utc()),
        });
        insert_rows(&self.db, models).await?;
        Ok(())
    }

    async fn clear_achievements(&self) -> StoreResult<u64> {
        let result = achievements::Entity::delete_many().exec(&self.db).await?;
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl StatsStore for SqlStore {
    async fn get_stats(&self, user_id: &str) -> StoreResult<Option<UserStats>> {
        Ok(user_stats::Entity::find_by_id(user_id.to_owned())
            .one(&self.db)
            .await?
            .map(UserStats::from))
    }

    async fn get_or_init_stats(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<UserStats> {
        if let Some(stats) = self.get_stats(user_id).await? {
            return Ok(stats);
        }

        log::debug!("Creating new user stats for {}", user_id);
        let fresh = UserStats::new(user_id, now);
        let row = user_stats::ActiveModel {
            user_id: Set(fresh.user_id.clone()),
            display_name: Set(None),
            total_points: Set(0),
            level: Set(1),
            events_created: Set(0),
            events_attended: Set(0),
            tokens_collected: Set(0),
            achievements_earned: Set(0),
            streak_days: Set(0),
            last_active: Set(now.naive_utc()),
            joined_at: Set(now.naive_utc()),
            profile_image_url: Set(None),
        };
        match insert_rows(&self.db, [row]).await {
            Ok(_) => Ok(fresh),
            // Lost the race against a concurrent initializer
            Err(e) if is_unique_violation(&e) => self
                .get_stats(user_id)
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("stats for {}", user_id))),
            Err(e) => Err(e.into()),
        }
    }

    async fn increment_stats(&self, user_id: &str, delta: &StatsDelta) -> StoreResult<()> {
        apply_delta(&self.db, user_id, delta).await
    }

    async fn set_level_if_higher(&self, user_id: &str, level: u64) -> StoreResult<bool> {
        let result = user_stats::Entity::update_many()
            .col_expr(user_stats::Column::Level, Expr::value(level as i64))
            .filter(user_stats::Column::UserId.eq(user_id))
            .filter(user_stats::Column::Level.lt(level as i64))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn apply_streak(
        &self,
        user_id: &str,
        change: StreakChange,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut update = user_stats::Entity::update_many().col_expr(
            user_stats::Column::LastActive,
            Expr::value(now.naive_utc()),
        );
        update = match change {
            StreakChange::Extend => update.col_expr(
                user_stats::Column::StreakDays,
                Expr::col(user_stats::Column::StreakDays).add(1),
            ),
            StreakChange::Restart => {
                update.col_expr(user_stats::Column::StreakDays, Expr::value(1i64))
            }
            StreakChange::Touch => update,
        };
        let result = update
            .filter(user_stats::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("stats for {}", user_id)));
        }
        Ok(())
    }

    async fn list_user_achievements(&self, user_id: &str) -> StoreResult<Vec<UserAchievement>> {
        Ok(user_achievements::Entity::find()
            .filter(user_achievements::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(UserAchievement::from)
            .collect())
    }

    async fn find_completed_achievement_ids(&self, user_id: &str) -> StoreResult<HashSet<String>> {
        Ok(user_achievements::Entity::find()
            .filter(user_achievements::Column::UserId.eq(user_id))
            .filter(user_achievements::Column::CompletedAt.is_not_null())
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| row.achievement_id)
            .collect())
    }

    async fn upsert_user_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
        progress: u8,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<LedgerWrite> {
        let progress = progress.min(100) as i32;
        let existing = user_achievements::Entity::find()
            .filter(user_achievements::Column::UserId.eq(user_id))
            .filter(user_achievements::Column::AchievementId.eq(achievement_id))
            .one(&self.db)
            .await?;

        if let Some(row) = existing {
            if row.completed_at.is_some() {
                return Ok(LedgerWrite {
                    row: row.into(),
                    newly_completed: false,
                });
            }
            // Guard on completed_at so two concurrent completions yield one winner
            let mut update = user_achievements::Entity::update_many()
                .filter(user_achievements::Column::Id.eq(row.id.clone()))
                .filter(user_achievements::Column::CompletedAt.is_null());
            update = match completed_at {
                Some(done) => update
                    .col_expr(user_achievements::Column::Progress, Expr::value(100))
                    .col_expr(
                        user_achievements::Column::CompletedAt,
                        Expr::value(Some(done.naive_utc())),
                    ),
                None => update
                    .col_expr(user_achievements::Column::Progress, Expr::value(progress))
                    .filter(user_achievements::Column::Progress.lt(progress)),
            };
            let result = update.exec(&self.db).await?;
            let updated = user_achievements::Entity::find_by_id(row.id.clone())
                .one(&self.db)
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("ledger row {}", row.id)))?;
            return Ok(LedgerWrite {
                row: updated.into(),
                newly_completed: completed_at.is_some() && result.rows_affected > 0,
            });
        }

        let earned_at = completed_at.unwrap_or_else(Utc::now);
        let id = new_id();
        let model = user_achievements::ActiveModel {
            id: Set(id.clone()),
            user_id: Set(user_id.to_owned()),
            achievement_id: Set(achievement_id.to_owned()),
            earned_at: Set(earned_at.naive_utc()),
            progress: Set(progress),
            completed_at: Set(completed_at.map(|t| t.naive_utc())),
            credited: Set(false),
            metadata: Set(None),
        };
        match insert_rows(&self.db, [model]).await {
            Ok(()) => Ok(LedgerWrite {
                row: UserAchievement {
                    id,
                    user_id: user_id.to_owned(),
                    achievement_id: achievement_id.to_owned(),
                    earned_at,
                    progress: progress as u8,
                    completed_at,
                    credited: false,
                    metadata: None,
                },
                newly_completed: completed_at.is_some(),
            }),
            // A concurrent writer created the row first; retry as an update
            Err(e) if is_unique_violation(&e) => {
                self.upsert_user_achievement(user_id, achievement_id, progress as u8, completed_at)
                    .await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn credit_award(
        &self,
        user_id: &str,
        achievement_id: &str,
        points: u32,
    ) -> StoreResult<bool> {
        let txn = self.db.begin().await?;
        let flipped = user_achievements::Entity::update_many()
            .col_expr(user_achievements::Column::Credited, Expr::value(true))
            .filter(user_achievements::Column::UserId.eq(user_id))
            .filter(user_achievements::Column::AchievementId.eq(achievement_id))
            .filter(user_achievements::Column::CompletedAt.is_not_null())
            .filter(user_achievements::Column::Credited.eq(false))
            .exec(&txn)
            .await?;
        if flipped.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }
        let delta = StatsDelta {
            achievements_earned: 1,
            total_points: u64::from(points),
            ..Default::default()
        };
        apply_delta(&txn, user_id, &delta).await?;
        txn.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl EventStore for SqlStore {
    async fn insert_event(&self, event: Event) -> StoreResult<Event> {
        let model = events::ActiveModel {
            id: Set(event.id.clone()),
            name: Set(event.name.clone()),
            description: Set(event.description.clone()),
            date: Set(event.date.naive_utc()),
            creator: Set(event.creator.clone()),
            token_mint_address: Set(event.token_mint_address.clone()),
            qr_code_data: Set(event.qr_code_data.clone()),
            max_attendees: Set(event.max_attendees.map(|n| n as i32)),
            image_url: Set(event.image_url.clone()),
            created_at: Set(event.created_at.naive_utc()),
            claim_count: Set(0),
        };
        insert_rows(&self.db, [model]).await?;
        Ok(event)
    }

    async fn get_event(&self, id: &str) -> StoreResult<Option<Event>> {
        Ok(events::Entity::find_by_id(id.to_owned())
            .one(&self.db)
            .await?
            .map(Event::from))
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        Ok(events::Entity::find()
            .order_by_desc(events::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Event::from)
            .collect())
    }

    async fn list_events_by_creator(&self, creator: &str) -> StoreResult<Vec<Event>> {
        Ok(events::Entity::find()
            .filter(events::Column::Creator.eq(creator))
            .order_by_desc(events::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Event::from)
            .collect())
    }

    async fn insert_claim(
        &self,
        claim: TokenClaim,
        max_attendees: Option<u32>,
    ) -> StoreResult<TokenClaim> {
        let txn = self.db.begin().await?;

        // Writing first takes the write lock up front, so concurrent claims
        // for the event queue here and see each other's count.
        let mut bump = events::Entity::update_many()
            .col_expr(
                events::Column::ClaimCount,
                Expr::col(events::Column::ClaimCount).add(1),
            )
            .filter(events::Column::Id.eq(claim.event_id.clone()));
        if let Some(max) = max_attendees {
            bump = bump.filter(events::Column::ClaimCount.lt(max as i32));
        }
        let bumped = bump.exec(&txn).await?;
        if max_attendees.is_some() && bumped.rows_affected == 0 {
            txn.rollback().await?;
            return Err(StoreError::Conflict(ConflictKind::CapacityReached));
        }

        let model = token_claims::ActiveModel {
            id: Set(claim.id.clone()),
            event_id: Set(claim.event_id.clone()),
            wallet_address: Set(claim.wallet_address.clone()),
            transaction_signature: Set(claim.transaction_signature.clone()),
            claimed_at: Set(claim.claimed_at.naive_utc()),
        };
        match insert_rows(&txn, [model]).await {
            Ok(_) => {
                txn.commit().await?;
                Ok(claim)
            }
            Err(e) if is_unique_violation(&e) => {
                txn.rollback().await?;
                Err(StoreError::Conflict(ConflictKind::AlreadyClaimed))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn has_wallet_claimed(&self, event_id: &str, wallet_address: &str) -> StoreResult<bool> {
        let count = token_claims::Entity::find()
            .filter(token_claims::Column::EventId.eq(event_id))
            .filter(token_claims::Column::WalletAddress.eq(wallet_address))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn count_claims_for_event(&self, event_id: &str) -> StoreResult<u64> {
        Ok(token_claims::Entity::find()
            .filter(token_claims::Column::EventId.eq(event_id))
            .count(&self.db)
            .await? as u64)
    }

    async fn list_claims_by_wallet(&self, wallet_address: &str) -> StoreResult<Vec<TokenClaim>> {
        Ok(token_claims::Entity::find()
            .filter(token_claims::Column::WalletAddress.eq(wallet_address))
            .order_by_asc(token_claims::Column::ClaimedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(TokenClaim::from)
            .collect())
    }

    async fn count_distinct_claimed_events(&self, wallet_address: &str) -> StoreResult<u64> {
        let event_ids: HashSet<String> = token_claims::Entity::find()
            .filter(token_claims::Column::WalletAddress.eq(wallet_address))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|claim| claim.event_id)
            .collect();
        Ok(event_ids.len() as u64)
    }
}
