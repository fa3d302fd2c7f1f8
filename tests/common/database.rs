//! Test database setup and management
#![allow(dead_code)]

use popbadge::store::SqlStore;
use sea_orm::{DatabaseConnection, DbErr};
use tempfile::TempDir;

/// A SQLite database in a throwaway directory. The file is removed when
/// this is dropped.
pub struct TestDatabase {
    pub conn: DatabaseConnection,
    _dir: TempDir,
}

impl TestDatabase {
    pub fn store(&self) -> SqlStore {
        SqlStore::new(self.conn.clone())
    }
}

pub fn sqlite_url(dir: &TempDir) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join("popbadge_test.db").display())
}

/// Connect to a fresh SQLite database with the schema in place.
pub async fn setup_test_database() -> Result<TestDatabase, DbErr> {
    let dir = tempfile::tempdir().map_err(|e| DbErr::Custom(e.to_string()))?;
    let conn = popbadge::db::connect(&sqlite_url(&dir)).await?;
    Ok(TestDatabase { conn, _dir: dir })
}
