//! Wipe the achievement catalog and insert the defaults again.
//!
//! Only meaningful against a database; the in-memory store does not outlive
//! the process. User ledgers and stats are left as they are.

use anyhow::{bail, Context};
use env_logger::Env;
use popbadge::achievements::catalog;
use popbadge::app_config::{self, StorageBackend};
use popbadge::db;
use popbadge::store::SqlStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = app_config::storage();
    if config.backend != StorageBackend::Database {
        bail!("Resetting achievements requires storage.backend = \"database\"");
    }

    let conn = db::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let store = SqlStore::new(conn);

    let count = catalog::reset_catalog(&store)
        .await
        .context("Failed to reset achievements")?;
    log::info!("Achievement reset complete: {} achievements", count);

    Ok(())
}
