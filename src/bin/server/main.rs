use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{App, HttpServer};
use anyhow::{bail, Context};
use env_logger::Env;
use popbadge::app_config::{self, AppConfig};
use popbadge::chain::{DemoIssuer, TokenIssuer};
use popbadge::store;
use popbadge::web::AppServices;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_lib_mods();
    app_config::init();
    let config = app_config::get_config();

    let store = store::from_config(&config.storage)
        .await
        .context("Failed to initialize storage")?;
    let issuer = token_issuer(&config)?;
    let services = AppServices::new(store, issuer, config.achievements.catalog_cache_ttl());

    if config.achievements.seed_on_startup {
        services
            .engine
            .seed_catalog()
            .await
            .context("Failed to seed achievement catalog")?;
    }

    let bind = (config.server.bind_address.clone(), config.server.port);
    log::info!("Listening on {}:{}", bind.0, bind.1);

    let mut server = HttpServer::new(move || {
        let services = services.clone();

        // Middleware is listed in reverse execution order.
        App::new()
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .wrap(Logger::new("%a %r %s %Dms"))
            .configure(move |conf| services.configure(conf))
    });
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.bind(bind)?.run().await?;
    Ok(())
}

fn token_issuer(config: &AppConfig) -> anyhow::Result<Arc<dyn TokenIssuer>> {
    if !config.chain.demo_mode {
        bail!("No on-chain token issuer is available; set chain.demo_mode = true");
    }
    log::info!("Token issuer running in demo mode");
    Ok(Arc::new(DemoIssuer))
}

/// Initialize third party crates we rely on but don't have control over.
fn init_lib_mods() {
    // A missing .env is fine; everything has a default.
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}
