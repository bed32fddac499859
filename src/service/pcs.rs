//! The caller's own player characters.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::BTreeMap;
use validator::Validate;

use super::{refuse, Caller, Page, Pagination};
use crate::db::models::{CharacterSheet, Pc, PcAvailability, PcCampaign};
use crate::db::{character_repo, pc_repo};
use crate::error::AppError;
use crate::game::sheet;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct PcRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub sheet: CharacterSheet,
    /// Absent on update means "keep".
    pub is_homebrew: Option<bool>,
    pub is_unique: Option<bool>,
}

/// A PC plus its derived ability modifiers.
#[derive(Debug, Clone, Serialize)]
pub struct PcView {
    #[serde(flatten)]
    pub pc: Pc,
    pub attribute_modifiers: BTreeMap<String, i32>,
}

impl From<Pc> for PcView {
    fn from(pc: Pc) -> Self {
        let attribute_modifiers = sheet::attribute_modifiers(&pc.sheet.attributes);
        PcView {
            pc,
            attribute_modifiers,
        }
    }
}

fn not_found() -> AppError {
    AppError::not_found("PC not found")
}

pub async fn list(
    db: &PgPool,
    caller: Caller,
    page: Pagination,
) -> Result<Page<PcView>, AppError> {
    let items = pc_repo::list(db, caller.user_id, page.limit, page.offset)
        .await?
        .into_iter()
        .map(PcView::from)
        .collect();
    let total = pc_repo::count(db, caller.user_id).await?;
    Ok(Page {
        items,
        page,
        total: Some(total),
    })
}

pub async fn get(db: &PgPool, caller: Caller, id: i64) -> Result<PcView, AppError> {
    pc_repo::find_owned(db, id, caller.user_id)
        .await?
        .map(PcView::from)
        .ok_or_else(not_found)
}

pub async fn create(db: &PgPool, caller: Caller, mut req: PcRequest) -> Result<PcView, AppError> {
    req.sheet.apply_defaults();
    req.validate()?;

    let pc = pc_repo::insert(
        db,
        caller.user_id,
        &req.sheet,
        req.is_homebrew.unwrap_or(false),
        req.is_unique.unwrap_or(false),
    )
    .await?;
    log::info!("PC {} created by user {}", pc.id, caller.user_id);
    Ok(pc.into())
}

pub async fn update(
    db: &PgPool,
    caller: Caller,
    id: i64,
    mut req: PcRequest,
) -> Result<PcView, AppError> {
    req.sheet.apply_defaults();
    req.validate()?;

    let mut tx = db.begin().await?;
    let current = pc_repo::lock_owned(&mut *tx, id, caller.user_id)
        .await?
        .ok_or_else(not_found)?;

    let is_homebrew = req.is_homebrew.unwrap_or(current.is_homebrew);
    let is_unique = req.is_unique.unwrap_or(current.is_unique);
    if is_unique && !current.is_unique && character_repo::in_play_count(&mut *tx, id).await? > 1 {
        return Err(refuse(
            format_args!("marking PC {id} unique"),
            "PC is active in several campaigns and cannot be made unique",
        ));
    }

    let pc = pc_repo::update(&mut *tx, id, caller.user_id, &req.sheet, is_homebrew, is_unique)
        .await?
        .ok_or_else(not_found)?;
    tx.commit().await?;
    Ok(pc.into())
}

/// Refused while any snapshot of the PC is still in play.
pub async fn delete(db: &PgPool, caller: Caller, id: i64) -> Result<(), AppError> {
    let mut tx = db.begin().await?;
    pc_repo::lock_owned(&mut *tx, id, caller.user_id)
        .await?
        .ok_or_else(not_found)?;

    if character_repo::in_play_count(&mut *tx, id).await? > 0 {
        return Err(refuse(format_args!("deleting PC {id}"), "PC is in active campaigns"));
    }
    pc_repo::delete(&mut *tx, id, caller.user_id).await?;
    tx.commit().await?;

    log::info!("PC {id} deleted by user {}", caller.user_id);
    Ok(())
}

pub async fn campaigns(
    db: &PgPool,
    caller: Caller,
    id: i64,
    page: Pagination,
) -> Result<Page<PcCampaign>, AppError> {
    pc_repo::find_owned(db, id, caller.user_id)
        .await?
        .ok_or_else(not_found)?;

    let items = pc_repo::campaigns(db, id, page.limit, page.offset).await?;
    Ok(Page {
        items,
        page,
        total: None,
    })
}

pub async fn availability(db: &PgPool, caller: Caller, id: i64) -> Result<PcAvailability, AppError> {
    let pc = pc_repo::find_owned(db, id, caller.user_id)
        .await?
        .ok_or_else(not_found)?;

    let campaign_id = character_repo::in_play_campaign(db, id).await?;
    let in_campaign = campaign_id.is_some();
    Ok(PcAvailability {
        in_campaign,
        campaign_id,
        blocking: pc.is_unique && in_campaign,
    })
}
