//! Readiness probe

use actix_web::{get, web, HttpResponse};
use serde_json::json;
use sqlx::PgPool;

use crate::generator::GeneratorService;

/// GET /api/healthz
#[get("/healthz")]
pub async fn healthz(
    db: web::Data<PgPool>,
    generator: Option<web::Data<dyn GeneratorService>>,
) -> HttpResponse {
    if sqlx::query("SELECT 1").execute(db.get_ref()).await.is_err() {
        return HttpResponse::ServiceUnavailable().body("db");
    }

    // The generator is optional; its state is reported, never fatal.
    let generator = match generator {
        Some(client) => match client.health().await {
            Ok(()) => "healthy",
            Err(e) => {
                log::warn!("generator health check failed: {e}");
                "unavailable"
            }
        },
        None => "disabled",
    };

    HttpResponse::Ok().json(json!({ "status": "ok", "generator": generator }))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(healthz);
}
