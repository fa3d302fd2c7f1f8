pub mod achievements;
pub mod claims;
pub mod error;
pub mod events;

use crate::achievements::AchievementEngine;
use crate::chain::TokenIssuer;
use crate::store::SharedStore;
use actix_web::web::{Data, JsonConfig, ServiceConfig};
use std::sync::Arc;
use std::time::Duration;

/// Request bodies are small JSON documents.
const JSON_LIMIT: usize = 64 * 1024;

/// Handles shared by every handler. Built once at startup.
#[derive(Clone)]
pub struct AppServices {
    pub store: SharedStore,
    pub engine: Arc<AchievementEngine>,
    pub issuer: Arc<dyn TokenIssuer>,
}

impl AppServices {
    pub fn new(store: SharedStore, issuer: Arc<dyn TokenIssuer>, catalog_ttl: Duration) -> Self {
        let engine = Arc::new(AchievementEngine::new(store.clone(), catalog_ttl));
        Self {
            store,
            engine,
            issuer,
        }
    }

    /// Register the shared handles and every route.
    pub fn configure(&self, conf: &mut ServiceConfig) {
        conf.app_data(Data::new(self.store.clone()))
            .app_data(Data::from(self.engine.clone()))
            .app_data(Data::new(self.issuer.clone()));
        configure(conf);
    }
}

pub fn json_config() -> JsonConfig {
    JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(error::json_error_handler)
}

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut ServiceConfig) {
    conf.app_data(json_config());
    achievements::configure(conf);
    claims::configure(conf);
    events::configure(conf);
}
