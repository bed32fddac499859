use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use taverna_server::config::settings;
use taverna_server::generator::{GeneratorService, HttpGenerator};
use taverna_server::{db, http, metrics};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cfg = settings();

    // Postgres pool + schema
    let db_pool = db::connect(cfg)
        .await
        .context("failed to create Postgres pool")?;
    db::MIGRATOR
        .run(&db_pool)
        .await
        .context("failed to run migrations")?;

    // Generator client; an unreachable generator is not fatal at boot
    let generator: Arc<dyn GeneratorService> = Arc::new(
        HttpGenerator::new(&cfg.generator_url, cfg.generator_timeout)
            .context("invalid AI_SERVICE_URL")?,
    );
    match generator.health().await {
        Ok(()) => log::info!("generator service at {} is healthy", cfg.generator_url),
        Err(e) => log::warn!("generator service at {} unavailable: {e}", cfg.generator_url),
    }
    let generator = web::Data::from(generator);

    log::info!("listening on {}", cfg.server_addr);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(metrics::METRICS.clone())
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(generator.clone())
            .configure(http::routes::init_routes)
    })
    .bind(&cfg.server_addr)
    .with_context(|| format!("failed to bind {}", cfg.server_addr))?
    .run()
    .await
    .context("server error")?;

    Ok(())
}
