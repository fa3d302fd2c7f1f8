//! Database connection and schema setup for the SQL store.

use crate::orm::{achievements, events, token_claims, user_achievements, user_stats};
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema, Statement,
};

/// Uniqueness the application relies on, plus lookup indexes. The claim
/// index is the actual guard against double claims; the handler's
/// pre-check is a fast path.
const INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_token_claims_event_wallet ON token_claims (event_id, wallet_address)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_user_achievements_user_achievement ON user_achievements (user_id, achievement_id)",
    "CREATE INDEX IF NOT EXISTS idx_user_achievements_achievement ON user_achievements (achievement_id)",
    "CREATE INDEX IF NOT EXISTS idx_token_claims_wallet ON token_claims (wallet_address)",
    "CREATE INDEX IF NOT EXISTS idx_events_creator ON events (creator)",
];

/// Connect to `database_url` and make sure the schema exists.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;
    create_schema(&db).await?;
    log::info!("Connected to database ({:?})", db.get_database_backend());
    Ok(db)
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let mut stmt = Schema::new(backend).create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Create all tables and indexes. Idempotent.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Parents before children
    create_table(db, achievements::Entity).await?;
    create_table(db, user_achievements::Entity).await?;
    create_table(db, user_stats::Entity).await?;
    create_table(db, events::Entity).await?;
    create_table(db, token_claims::Entity).await?;

    let backend = db.get_database_backend();
    for sql in INDEXES {
        db.execute(Statement::from_string(backend, sql.to_string()))
            .await?;
    }

    Ok(())
}
