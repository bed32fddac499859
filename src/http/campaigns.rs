//! Campaign endpoints (CRUD, join / leave, invite codes)

use actix_web::{delete, get, post, put, web, HttpResponse};
use sqlx::PgPool;

use super::auth::JwtAuth;
use super::extract::{positive_id, PageQuery};
use super::response::{Envelope, InviteCodeResponse, Paginated};
use crate::error::AppError;
use crate::service::campaigns::{self, CreateCampaignRequest, JoinRequest, UpdateCampaignRequest};
use crate::service::with_deadline;

/// GET /api/campaigns
#[get("/campaigns")]
pub async fn list(
    auth: JwtAuth,
    query: web::Query<PageQuery>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let page = with_deadline(campaigns::list_for_user(
        db.get_ref(),
        auth.caller(),
        query.pagination(),
    ))
    .await?;
    Ok(HttpResponse::Ok().json(Paginated::from(page)))
}

/// POST /api/campaigns
#[post("/campaigns")]
pub async fn create(
    auth: JwtAuth,
    body: web::Json<CreateCampaignRequest>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let view = with_deadline(campaigns::create(db.get_ref(), auth.caller(), body.into_inner()))
        .await?;
    Ok(HttpResponse::Created().json(Envelope::new("Campaign created successfully", view)))
}

/// POST /api/campaigns/join
#[post("/campaigns/join")]
pub async fn join(
    auth: JwtAuth,
    body: web::Json<JoinRequest>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let campaign = with_deadline(campaigns::join_by_code(
        db.get_ref(),
        auth.caller(),
        &body.invite_code,
    ))
    .await?;
    Ok(HttpResponse::Ok().json(Envelope::new("Joined campaign successfully", campaign)))
}

/// GET /api/campaigns/{id}
#[get("/campaigns/{id}")]
pub async fn detail(
    auth: JwtAuth,
    path: web::Path<i64>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = positive_id(path.into_inner())?;
    let view = with_deadline(campaigns::get(db.get_ref(), auth.caller(), id)).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// PUT /api/campaigns/{id}
#[put("/campaigns/{id}")]
pub async fn update(
    auth: JwtAuth,
    path: web::Path<i64>,
    body: web::Json<UpdateCampaignRequest>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = positive_id(path.into_inner())?;
    let view = with_deadline(campaigns::update(
        db.get_ref(),
        auth.caller(),
        id,
        body.into_inner(),
    ))
    .await?;
    Ok(HttpResponse::Ok().json(view))
}

/// DELETE /api/campaigns/{id}
#[delete("/campaigns/{id}")]
pub async fn remove(
    auth: JwtAuth,
    path: web::Path<i64>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = positive_id(path.into_inner())?;
    with_deadline(campaigns::delete(db.get_ref(), auth.caller(), id)).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /api/campaigns/{id}/leave
#[delete("/campaigns/{id}/leave")]
pub async fn leave(
    auth: JwtAuth,
    path: web::Path<i64>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = positive_id(path.into_inner())?;
    with_deadline(campaigns::leave(db.get_ref(), auth.caller(), id)).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/campaigns/{id}/invite-code
#[get("/campaigns/{id}/invite-code")]
pub async fn invite_code(
    auth: JwtAuth,
    path: web::Path<i64>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = positive_id(path.into_inner())?;
    let code = with_deadline(campaigns::invite_code(db.get_ref(), auth.caller(), id)).await?;
    Ok(HttpResponse::Ok().json(InviteCodeResponse {
        invite_code: code,
        message: "Share this code with your players",
    }))
}

/// POST /api/campaigns/{id}/regenerate-code
#[post("/campaigns/{id}/regenerate-code")]
pub async fn regenerate_code(
    auth: JwtAuth,
    path: web::Path<i64>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let id = positive_id(path.into_inner())?;
    let code = with_deadline(campaigns::rotate_invite(db.get_ref(), auth.caller(), id)).await?;
    Ok(HttpResponse::Ok().json(InviteCodeResponse {
        invite_code: code,
        message: "Invite code regenerated; the previous code no longer works",
    }))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list)
        .service(create)
        .service(join)
        .service(detail)
        .service(update)
        .service(remove)
        .service(leave)
        .service(invite_code)
        .service(regenerate_code);
}
