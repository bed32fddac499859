//! Attaching PCs to campaigns and playing the resulting snapshots.

use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use super::{load_campaign, refuse, require_member, Caller, Page, Pagination};
use crate::db::models::{CampaignCharacter, CharacterSheet, CharacterStatus, Pc};
use crate::db::{character_repo, pc_repo, DbError, IN_PLAY_CONSTRAINT};
use crate::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct AttachRequest {
    pub source_pc_id: i64,
}

/// Play-state patch; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateCharacterRequest {
    #[validate(range(min = 0, message = "current_hp cannot be negative"))]
    pub current_hp: Option<i32>,
    pub status: Option<String>,
    pub campaign_notes: Option<String>,
}

/// Whole-sheet replacement of a snapshot.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct FullCharacterRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub sheet: CharacterSheet,
    pub status: Option<String>,
    pub campaign_notes: Option<String>,
}

fn parse_status(raw: Option<&str>) -> Result<Option<CharacterStatus>, AppError> {
    raw.map(|s| {
        s.trim().parse::<CharacterStatus>().map_err(|_| {
            AppError::invalid_field(
                "status",
                "status must be one of active, inactive, dead, retired",
            )
        })
    })
    .transpose()
}

pub async fn list(
    db: &PgPool,
    caller: Caller,
    campaign_id: i64,
    page: Pagination,
) -> Result<Page<CampaignCharacter>, AppError> {
    let campaign = load_campaign(db, campaign_id).await?;
    require_member(db, caller, &campaign).await?;

    let items = character_repo::list(db, campaign_id, page.limit, page.offset).await?;
    let total = character_repo::count(db, campaign_id).await?;
    Ok(Page {
        items,
        page,
        total: Some(total),
    })
}

/// The caller's PCs that may still be attached here.
pub async fn available(
    db: &PgPool,
    caller: Caller,
    campaign_id: i64,
    page: Pagination,
) -> Result<Page<Pc>, AppError> {
    let campaign = load_campaign(db, campaign_id).await?;
    require_member(db, caller, &campaign).await?;

    let items =
        character_repo::available_pcs(db, campaign_id, caller.user_id, page.limit, page.offset)
            .await?;
    Ok(Page {
        items,
        page,
        total: None,
    })
}

/// Snapshots one of the caller's PCs into the campaign.
pub async fn attach(
    db: &PgPool,
    caller: Caller,
    campaign_id: i64,
    pc_id: i64,
) -> Result<CampaignCharacter, AppError> {
    if pc_id <= 0 {
        return Err(AppError::invalid_field("source_pc_id", "source_pc_id must be positive"));
    }
    let campaign = load_campaign(db, campaign_id).await?;
    require_member(db, caller, &campaign).await?;

    let mut tx = db.begin().await?;
    // Locking the PC serializes attaches, deletes and uniqueness changes on it.
    let pc = pc_repo::lock_owned(&mut *tx, pc_id, caller.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("PC not found"))?;

    if character_repo::is_in_campaign(&mut *tx, campaign_id, pc_id).await? {
        return Err(refuse(
            format_args!("attaching PC {pc_id} to campaign {campaign_id}"),
            "character already in campaign",
        ));
    }
    if pc.is_unique {
        if let Some(elsewhere) = character_repo::in_play_campaign(&mut *tx, pc_id).await? {
            return Err(refuse(
                format_args!("attaching PC {pc_id} to campaign {campaign_id}"),
                format!("unique character is already active in campaign {elsewhere}"),
            ));
        }
    }

    let character = character_repo::insert_snapshot(&mut *tx, campaign_id, caller.user_id, &pc)
        .await
        .map_err(in_play_conflict)?;
    tx.commit().await?;

    log::info!(
        "PC {pc_id} attached to campaign {campaign_id} as character {}",
        character.id
    );
    Ok(character)
}

async fn visible(
    db: &PgPool,
    caller: Caller,
    campaign_id: i64,
    character_id: i64,
) -> Result<CampaignCharacter, AppError> {
    character_repo::find_visible(db, campaign_id, character_id, caller.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("character not found or access denied"))
}

pub async fn get(
    db: &PgPool,
    caller: Caller,
    campaign_id: i64,
    character_id: i64,
) -> Result<CampaignCharacter, AppError> {
    visible(db, caller, campaign_id, character_id).await
}

pub async fn update_play_state(
    db: &PgPool,
    caller: Caller,
    campaign_id: i64,
    character_id: i64,
    req: UpdateCharacterRequest,
) -> Result<CampaignCharacter, AppError> {
    req.validate()?;
    let status = parse_status(req.status.as_deref())?;

    let mut tx = db.begin().await?;
    let current = visible_in(&mut *tx, caller, campaign_id, character_id).await?;
    let status = status.unwrap_or(current.status);
    guard_in_play(&mut *tx, &current, status).await?;

    let current_hp = req.current_hp.or(current.sheet.current_hp);
    let notes = req.campaign_notes.unwrap_or(current.campaign_notes);

    let updated = character_repo::update_play_state(
        &mut *tx,
        campaign_id,
        character_id,
        current_hp,
        status,
        &notes,
    )
    .await
    .map_err(in_play_conflict)?
    .ok_or_else(|| AppError::not_found("character not found"))?;
    tx.commit().await?;
    Ok(updated)
}

/// Replaces the snapshot's sheet; derived fields are recomputed and
/// `last_sync` is stamped.
pub async fn update_full(
    db: &PgPool,
    caller: Caller,
    campaign_id: i64,
    character_id: i64,
    mut req: FullCharacterRequest,
) -> Result<CampaignCharacter, AppError> {
    req.sheet.apply_defaults();
    req.validate()?;
    let status = parse_status(req.status.as_deref())?;

    let mut tx = db.begin().await?;
    let current = visible_in(&mut *tx, caller, campaign_id, character_id).await?;
    let status = status.unwrap_or(current.status);
    guard_in_play(&mut *tx, &current, status).await?;

    let notes = req.campaign_notes.unwrap_or(current.campaign_notes);

    let updated =
        character_repo::update_full(&mut *tx, campaign_id, character_id, &req.sheet, status, &notes)
            .await
            .map_err(in_play_conflict)?
            .ok_or_else(|| AppError::not_found("character not found"))?;
    tx.commit().await?;
    Ok(updated)
}

async fn visible_in(
    tx: &mut PgConnection,
    caller: Caller,
    campaign_id: i64,
    character_id: i64,
) -> Result<CampaignCharacter, AppError> {
    character_repo::find_visible(&mut *tx, campaign_id, character_id, caller.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("character not found or access denied"))
}

/// Holds the source PC's lock for the rest of the transaction. A unique PC
/// may only have one snapshot in play, so bringing one back from dead or
/// retired is refused while another is active elsewhere.
async fn guard_in_play(
    tx: &mut PgConnection,
    current: &CampaignCharacter,
    next: CharacterStatus,
) -> Result<(), AppError> {
    let Some(pc_id) = current.source_pc_id else {
        return Ok(());
    };
    let Some(pc) = pc_repo::lock(&mut *tx, pc_id).await? else {
        return Ok(());
    };
    if !(pc.is_unique && next.in_play()) {
        return Ok(());
    }
    if let Some(elsewhere) = character_repo::in_play_elsewhere(&mut *tx, pc_id, current.id).await? {
        return Err(refuse(
            format_args!("returning character {} to play", current.id),
            format!("unique character is already active in campaign {elsewhere}"),
        ));
    }
    Ok(())
}

fn in_play_conflict(e: DbError) -> AppError {
    if e.is_unique_violation_of(IN_PLAY_CONSTRAINT) {
        refuse("snapshot write", "character already in campaign")
    } else {
        e.into()
    }
}

/// Removes the snapshot; the source PC is untouched.
pub async fn detach(
    db: &PgPool,
    caller: Caller,
    campaign_id: i64,
    character_id: i64,
) -> Result<(), AppError> {
    visible(db, caller, campaign_id, character_id).await?;
    if !character_repo::delete(db, campaign_id, character_id).await? {
        return Err(AppError::not_found("character not found"));
    }
    log::info!("character {character_id} removed from campaign {campaign_id}");
    Ok(())
}
