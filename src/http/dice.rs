//! Dice rolling. Stateless; rolls are not persisted.

use actix_web::{post, web, HttpResponse};

use super::auth::JwtAuth;
use crate::error::AppError;
use crate::game::dice::{self, RollRequest};

/// POST /api/dice/roll
#[post("/dice/roll")]
pub async fn roll(auth: JwtAuth, body: web::Json<RollRequest>) -> Result<HttpResponse, AppError> {
    let result = dice::roll(&body)?;
    log::debug!(
        "user {} rolled {} = {}",
        auth.user_id,
        result.notation,
        result.total
    );
    Ok(HttpResponse::Ok().json(result))
}

/// POST /api/dice/roll-multiple
#[post("/dice/roll-multiple")]
pub async fn roll_multiple(
    _auth: JwtAuth,
    body: web::Json<Vec<RollRequest>>,
) -> Result<HttpResponse, AppError> {
    let results = dice::roll_batch(&body)?;
    Ok(HttpResponse::Ok().json(results))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(roll).service(roll_multiple);
}
