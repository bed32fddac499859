//! Campaign characters: attach a PC, play it, detach it.

use actix_web::{delete, get, post, put, web, HttpResponse};
use sqlx::PgPool;

use super::auth::JwtAuth;
use super::extract::{positive_id, PageQuery};
use super::response::{Envelope, Paginated};
use crate::error::AppError;
use crate::service::characters::{
    self, AttachRequest, FullCharacterRequest, UpdateCharacterRequest,
};
use crate::service::pcs::PcView;
use crate::service::{with_deadline, Page};

fn ids(path: web::Path<(i64, i64)>) -> Result<(i64, i64), AppError> {
    let (campaign_id, character_id) = path.into_inner();
    Ok((positive_id(campaign_id)?, positive_id(character_id)?))
}

/// GET /api/campaigns/{id}/characters
#[get("/campaigns/{id}/characters")]
pub async fn list(
    auth: JwtAuth,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let campaign_id = positive_id(path.into_inner())?;
    let page = with_deadline(characters::list(
        db.get_ref(),
        auth.caller(),
        campaign_id,
        query.pagination(),
    ))
    .await?;
    Ok(HttpResponse::Ok().json(Paginated::from(page)))
}

/// GET /api/campaigns/{id}/available-characters
#[get("/campaigns/{id}/available-characters")]
pub async fn available(
    auth: JwtAuth,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let campaign_id = positive_id(path.into_inner())?;
    let page = with_deadline(characters::available(
        db.get_ref(),
        auth.caller(),
        campaign_id,
        query.pagination(),
    ))
    .await?;
    let page = Page {
        items: page.items.into_iter().map(PcView::from).collect(),
        page: page.page,
        total: page.total,
    };
    Ok(HttpResponse::Ok().json(Paginated::from(page)))
}

/// POST /api/campaigns/{id}/characters
#[post("/campaigns/{id}/characters")]
pub async fn attach(
    auth: JwtAuth,
    path: web::Path<i64>,
    body: web::Json<AttachRequest>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let campaign_id = positive_id(path.into_inner())?;
    let character = with_deadline(characters::attach(
        db.get_ref(),
        auth.caller(),
        campaign_id,
        body.source_pc_id,
    ))
    .await?;
    Ok(HttpResponse::Created().json(Envelope::new("Character added to campaign", character)))
}

/// GET /api/campaigns/{id}/characters/{cid}
#[get("/campaigns/{id}/characters/{cid}")]
pub async fn detail(
    auth: JwtAuth,
    path: web::Path<(i64, i64)>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let (campaign_id, character_id) = ids(path)?;
    let character = with_deadline(characters::get(
        db.get_ref(),
        auth.caller(),
        campaign_id,
        character_id,
    ))
    .await?;
    Ok(HttpResponse::Ok().json(character))
}

/// PUT /api/campaigns/{id}/characters/{cid}
#[put("/campaigns/{id}/characters/{cid}")]
pub async fn update(
    auth: JwtAuth,
    path: web::Path<(i64, i64)>,
    body: web::Json<UpdateCharacterRequest>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let (campaign_id, character_id) = ids(path)?;
    let character = with_deadline(characters::update_play_state(
        db.get_ref(),
        auth.caller(),
        campaign_id,
        character_id,
        body.into_inner(),
    ))
    .await?;
    Ok(HttpResponse::Ok().json(character))
}

/// PUT /api/campaigns/{id}/characters/{cid}/full
#[put("/campaigns/{id}/characters/{cid}/full")]
pub async fn update_full(
    auth: JwtAuth,
    path: web::Path<(i64, i64)>,
    body: web::Json<FullCharacterRequest>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let (campaign_id, character_id) = ids(path)?;
    let character = with_deadline(characters::update_full(
        db.get_ref(),
        auth.caller(),
        campaign_id,
        character_id,
        body.into_inner(),
    ))
    .await?;
    Ok(HttpResponse::Ok().json(character))
}

/// DELETE /api/campaigns/{id}/characters/{cid}
#[delete("/campaigns/{id}/characters/{cid}")]
pub async fn detach(
    auth: JwtAuth,
    path: web::Path<(i64, i64)>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let (campaign_id, character_id) = ids(path)?;
    with_deadline(characters::detach(
        db.get_ref(),
        auth.caller(),
        campaign_id,
        character_id,
    ))
    .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list)
        .service(available)
        .service(attach)
        .service(detail)
        .service(update)
        .service(update_full)
        .service(detach);
}
