use actix_web::middleware::Logger;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use env_logger::Env;
use podium::app_config::AppConfig;
use podium::db;
use podium::{EntryService, SystemClock};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_lib_mods();

    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    });

    let database_url = config
        .database_url()
        .context("DATABASE_URL or PODIUM_DATABASE__URL must be set")?;
    let conn = db::connect(&database_url, config.database.max_connections).await?;
    db::create_schema(&conn).await?;

    let service = Data::new(EntryService::new(
        conn,
        Arc::new(SystemClock),
        config.lifecycle_settings(),
    ));

    if config.visibility.sweep_enabled {
        let sweeper = service.clone();
        let period = config.sweep_interval();
        log::info!(
            "Visibility sweep every {}s; normal feed may lag a round start by that much",
            period.as_secs()
        );
        actix_web::rt::spawn(async move {
            let mut interval = actix_web::rt::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = sweeper.reconcile_visibility().await {
                    log::warn!("Visibility sweep failed: {}", e);
                }
            }
        });
    }

    let bind_address = config.server.bind_address.clone();
    log::info!("Listening on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(Logger::new("%a %r %s %Dms"))
            .configure(podium::web::configure)
    })
    .bind(bind_address)?
    .run()
    .await?;

    Ok(())
}

/// Initialize third party crates we rely on but don't have control over.
fn init_lib_mods() {
    if let Err(e) = dotenv::dotenv() {
        // A missing .env is normal outside development
        eprintln!("No .env loaded: {}", e);
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}
