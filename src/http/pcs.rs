//! Player-character endpoints, always scoped to the caller.

use actix_web::{delete, get, post, put, web, HttpResponse};
use sqlx::PgPool;

use super::auth::JwtAuth;
use super::extract::{positive_id, PageQuery};
use super::response::{Envelope, Paginated};
use crate::error::AppError;
use crate::service::pcs::{self, PcRequest};
use crate::service::with_deadline;

/// GET /api/pcs
#[get("/pcs")]
pub async fn list(
    auth: JwtAuth,
    query: web::Query<PageQuery>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let page = with_deadline(pcs::list(db.get_ref(), auth.caller(), query.pagination())).await?;
    Ok(HttpResponse::Ok().json(Paginated::from(page)))
}

/// POST /api/pcs
#[post("/pcs")]
pub async fn create(
    auth: JwtAuth,
    body: web::Json<PcRequest>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let pc = with_deadline(pcs::create(db.get_ref(), auth.caller(), body.into_inner())).await?;
    Ok(HttpResponse::Created().json(Envelope::new("PC created successfully", pc)))
}

/// GET /api/pcs/{id}
#[get("/pcs/{id}")]
pub async fn detail(
    auth: JwtAuth,
    path: web::Path<i64>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = positive_id(path.into_inner())?;
    let pc = with_deadline(pcs::get(db.get_ref(), auth.caller(), id)).await?;
    Ok(HttpResponse::Ok().json(pc))
}

/// PUT /api/pcs/{id}
#[put("/pcs/{id}")]
pub async fn update(
    auth: JwtAuth,
    path: web::Path<i64>,
    body: web::Json<PcRequest>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = positive_id(path.into_inner())?;
    let pc = with_deadline(pcs::update(db.get_ref(), auth.caller(), id, body.into_inner())).await?;
    Ok(HttpResponse::Ok().json(pc))
}

/// DELETE /api/pcs/{id}
#[delete("/pcs/{id}")]
pub async fn remove(
    auth: JwtAuth,
    path: web::Path<i64>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = positive_id(path.into_inner())?;
    with_deadline(pcs::delete(db.get_ref(), auth.caller(), id)).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/pcs/{id}/campaigns
#[get("/pcs/{id}/campaigns")]
pub async fn campaigns(
    auth: JwtAuth,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = positive_id(path.into_inner())?;
    let page = with_deadline(pcs::campaigns(
        db.get_ref(),
        auth.caller(),
        id,
        query.pagination(),
    ))
    .await?;
    Ok(HttpResponse::Ok().json(Paginated::from(page)))
}

/// GET /api/pcs/{id}/availability
#[get("/pcs/{id}/availability")]
pub async fn availability(
    auth: JwtAuth,
    path: web::Path<i64>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = positive_id(path.into_inner())?;
    let status = with_deadline(pcs::availability(db.get_ref(), auth.caller(), id)).await?;
    Ok(HttpResponse::Ok().json(status))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list)
        .service(create)
        .service(detail)
        .service(update)
        .service(remove)
        .service(campaigns)
        .service(availability);
}
