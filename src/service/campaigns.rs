//! Campaign lifecycle: create, edit, roster, invite codes.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use sqlx::PgPool;
use std::future::Future;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;
use validator::Validate;

use super::{load_campaign, refuse, require_dm, require_member, Caller, Page, Pagination};
use crate::db::campaign_repo::{self, CampaignDraft};
use crate::db::models::{
    Campaign, CampaignCharacter, CampaignPlayer, CampaignStatus, CampaignSummary,
};
use crate::db::{character_repo, DbError, DbResult, INVITE_CODE_CONSTRAINT, MEMBERSHIP_CONSTRAINT};
use crate::error::AppError;
use crate::game::invite::{self, InviteCode, MAX_GENERATION_ATTEMPTS};

pub const DEFAULT_MAX_PLAYERS: i32 = 6;

//////////////////////////////////////////////////
// Requests / views
//////////////////////////////////////////////////

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateCampaignRequest {
    #[validate(length(min = 1, max = 255, message = "name must be between 1 and 255 characters"))]
    pub name: String,
    pub description: String,
    /// 0 means "use the default".
    #[validate(range(min = 0, max = 10, message = "max_players must be between 1 and 10"))]
    pub max_players: i32,
    pub allow_homebrew: bool,
}

/// Partial update: absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateCampaignRequest {
    #[validate(length(min = 1, max = 255, message = "name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 10, message = "max_players must be between 1 and 10"))]
    pub max_players: Option<i32>,
    #[validate(range(min = 0, message = "current_session cannot be negative"))]
    pub current_session: Option<i32>,
    pub status: Option<String>,
    pub allow_homebrew: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinRequest {
    pub invite_code: String,
}

/// A campaign as returned to one caller; the invite code is DM-only.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct CampaignView {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub invite_code: Option<String>,
    pub players: Option<Vec<CampaignPlayer>>,
    pub characters: Option<Vec<CampaignCharacter>>,
}

impl CampaignView {
    fn for_caller(campaign: Campaign, caller: Caller) -> Self {
        let invite_code =
            (campaign.dm_id == caller.user_id).then(|| invite::display(&campaign.invite_code));
        CampaignView {
            campaign,
            invite_code,
            players: None,
            characters: None,
        }
    }
}

//////////////////////////////////////////////////
// Operations
//////////////////////////////////////////////////

pub async fn list_for_user(
    db: &PgPool,
    caller: Caller,
    page: Pagination,
) -> Result<Page<CampaignSummary>, AppError> {
    let mut items =
        campaign_repo::list_for_user(db, caller.user_id, page.limit, page.offset).await?;
    for summary in &mut items {
        summary.invite_code = summary.invite_code.as_deref().map(invite::display);
    }
    let total = campaign_repo::count_for_user(db, caller.user_id).await?;
    Ok(Page {
        items,
        page,
        total: Some(total),
    })
}

/// Full detail with roster and characters; DM or active players only.
pub async fn get(db: &PgPool, caller: Caller, id: i64) -> Result<CampaignView, AppError> {
    let campaign = load_campaign(db, id).await?;
    require_member(db, caller, &campaign).await?;

    let players = campaign_repo::players(db, id).await?;
    let characters = character_repo::list(db, id, i64::MAX, 0).await?;

    let mut view = CampaignView::for_caller(campaign, caller);
    view.players = Some(players);
    view.characters = Some(characters);
    Ok(view)
}

pub async fn create(
    db: &PgPool,
    caller: Caller,
    mut req: CreateCampaignRequest,
) -> Result<CampaignView, AppError> {
    req.name = req.name.trim().to_owned();
    req.validate()?;

    let draft = CampaignDraft {
        name: req.name,
        description: req.description.trim().to_owned(),
        max_players: if req.max_players == 0 {
            DEFAULT_MAX_PLAYERS
        } else {
            req.max_players
        },
        current_session: 0,
        status: CampaignStatus::Planning,
        allow_homebrew: req.allow_homebrew,
    };

    let campaign =
        with_fresh_invite_code(|code| campaign_repo::insert(db, caller.user_id, &draft, code))
            .await?;

    log::info!(
        "campaign {} created by user {} (max_players={})",
        campaign.id,
        caller.user_id,
        campaign.max_players
    );
    Ok(CampaignView::for_caller(campaign, caller))
}

pub async fn update(
    db: &PgPool,
    caller: Caller,
    id: i64,
    mut req: UpdateCampaignRequest,
) -> Result<CampaignView, AppError> {
    req.name = req.name.map(|n| n.trim().to_owned());
    req.validate()?;
    let next_status = req
        .status
        .as_deref()
        .map(|s| {
            s.trim().parse::<CampaignStatus>().map_err(|_| {
                AppError::invalid_field(
                    "status",
                    "status must be one of planning, active, paused, completed",
                )
            })
        })
        .transpose()?;

    let mut tx = db.begin().await?;
    let current = campaign_repo::lock(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::not_found("campaign not found"))?;
    require_dm(caller, &current)?;

    let mut draft = CampaignDraft::from(&current);
    if let Some(name) = req.name {
        draft.name = name;
    }
    if let Some(description) = req.description {
        draft.description = description;
    }
    if let Some(current_session) = req.current_session {
        draft.current_session = current_session;
    }
    if let Some(allow_homebrew) = req.allow_homebrew {
        draft.allow_homebrew = allow_homebrew;
    }
    if let Some(status) = next_status {
        if !current.status.can_transition_to(status) {
            return Err(refuse(
                format_args!("status change on campaign {id}"),
                format!("campaign cannot move from {} to {}", current.status, status),
            ));
        }
        draft.status = status;
    }
    if let Some(max_players) = req.max_players {
        let active = campaign_repo::active_player_count(&mut *tx, id).await?;
        if i64::from(max_players) < active {
            return Err(refuse(
                format_args!("resizing campaign {id} to {max_players}"),
                format!("campaign already has {active} active players"),
            ));
        }
        draft.max_players = max_players;
    }

    let updated = campaign_repo::update(&mut *tx, id, caller.user_id, &draft)
        .await?
        .ok_or_else(|| AppError::not_found("campaign not found"))?;
    tx.commit().await?;

    Ok(CampaignView::for_caller(updated, caller))
}

pub async fn delete(db: &PgPool, caller: Caller, id: i64) -> Result<(), AppError> {
    let campaign = load_campaign(db, id).await?;
    require_dm(caller, &campaign)?;

    if !campaign_repo::delete(db, id, caller.user_id).await? {
        return Err(AppError::not_found("campaign not found"));
    }
    log::info!("campaign {id} deleted by user {}", caller.user_id);
    Ok(())
}

/// Adds the caller as an active player of the campaign behind `raw_code`.
pub async fn join_by_code(
    db: &PgPool,
    caller: Caller,
    raw_code: &str,
) -> Result<Campaign, AppError> {
    let code = InviteCode::parse(raw_code)
        .ok_or_else(|| AppError::bad_request("invalid invite code format, expected XXXX-XXXX"))?;

    let mut tx = db.begin().await?;
    // Row lock serializes concurrent joins through the capacity check.
    let campaign = campaign_repo::find_by_invite_code(&mut *tx, &code)
        .await?
        .ok_or_else(|| AppError::not_found("invalid invite code"))?;

    let refused = |message: &'static str| {
        refuse(format_args!("user {} joining campaign {}", caller.user_id, campaign.id), message)
    };
    if campaign.dm_id == caller.user_id {
        return Err(refused("DM cannot join their own campaign as a player"));
    }
    if campaign.status == CampaignStatus::Completed {
        return Err(refused("campaign is completed"));
    }
    if campaign_repo::has_membership(&mut *tx, campaign.id, caller.user_id).await? {
        return Err(refused("player already in campaign"));
    }
    let active = campaign_repo::active_player_count(&mut *tx, campaign.id).await?;
    if active >= i64::from(campaign.max_players) {
        return Err(refused("campaign is full"));
    }

    campaign_repo::add_player(&mut *tx, campaign.id, caller.user_id)
        .await
        .map_err(|e| {
            if e.is_unique_violation_of(MEMBERSHIP_CONSTRAINT) {
                refused("player already in campaign")
            } else {
                e.into()
            }
        })?;
    tx.commit().await?;

    log::info!("user {} joined campaign {}", caller.user_id, campaign.id);
    Ok(campaign)
}

/// Hard-deletes the caller's membership and their snapshots; the DM cannot leave.
pub async fn leave(db: &PgPool, caller: Caller, id: i64) -> Result<(), AppError> {
    let campaign = load_campaign(db, id).await?;
    if campaign.dm_id == caller.user_id {
        return Err(refuse(
            format_args!("DM {} leaving campaign {id}", caller.user_id),
            "the DM cannot leave their own campaign; delete it instead",
        ));
    }
    if !campaign_repo::remove_player(db, id, caller.user_id).await? {
        return Err(AppError::not_found("you are not a player in this campaign"));
    }
    log::info!("user {} left campaign {id}", caller.user_id);
    Ok(())
}

/// Current code in display form; DM only.
pub async fn invite_code(db: &PgPool, caller: Caller, id: i64) -> Result<String, AppError> {
    let campaign = load_campaign(db, id).await?;
    require_dm(caller, &campaign)?;
    Ok(invite::display(&campaign.invite_code))
}

/// Replaces the code in one statement; the old code stops working immediately.
pub async fn rotate_invite(db: &PgPool, caller: Caller, id: i64) -> Result<String, AppError> {
    let campaign = load_campaign(db, id).await?;
    require_dm(caller, &campaign)?;

    let stored =
        with_fresh_invite_code(|code| campaign_repo::set_invite_code(db, id, caller.user_id, code))
            .await?
            .ok_or_else(|| AppError::not_found("campaign not found"))?;

    log::info!("invite code rotated for campaign {id}");
    Ok(invite::display(&stored))
}

/// Retries `op` with a new code while it trips the invite-code unique constraint.
async fn with_fresh_invite_code<T, F, Fut>(mut op: F) -> Result<T, AppError>
where
    F: FnMut(InviteCode) -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    let retries = FixedInterval::from_millis(5).take(MAX_GENERATION_ATTEMPTS - 1);
    RetryIf::start(
        retries,
        || op(InviteCode::generate()),
        |e: &DbError| e.is_unique_violation_of(INVITE_CODE_CONSTRAINT),
    )
    .await
    .map_err(|e| {
        if e.is_unique_violation_of(INVITE_CODE_CONSTRAINT) {
            log::error!("invite code space exhausted after {MAX_GENERATION_ATTEMPTS} attempts");
            AppError::Transient("could not allocate a unique invite code".into())
        } else {
            e.into()
        }
    })
}
