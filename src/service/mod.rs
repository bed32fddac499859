//! Authorization and business rules on top of the repositories.
//!
//! Every operation takes the authenticated [`Caller`] explicitly; nothing
//! in here reads request state.

pub mod campaigns;
pub mod characters;
pub mod pcs;

use serde::Serialize;
use sqlx::PgPool;
use std::fmt;
use std::future::Future;

use crate::config::settings;
use crate::db::campaign_repo;
use crate::db::models::Campaign;
use crate::error::AppError;

/// The authenticated user an operation runs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
}

impl Caller {
    pub fn new(user_id: i64) -> Self {
        Caller { user_id }
    }
}

/// How the caller relates to a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignRole {
    Dm,
    Player,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    /// Non-positive limits fall back to the default; negative offsets to 0.
    pub fn new(limit: i64, offset: i64) -> Self {
        let limit = if limit <= 0 {
            Self::DEFAULT_LIMIT
        } else {
            limit.min(Self::MAX_LIMIT)
        };
        Pagination {
            limit,
            offset: offset.max(0),
        }
    }

    /// Raw query-string values; anything unparsable is ignored.
    pub fn from_query(limit: Option<&str>, offset: Option<&str>) -> Self {
        let parse = |v: Option<&str>| v.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(0);
        Self::new(parse(limit), parse(offset))
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// A page of results plus the unpaginated total, when known.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: Pagination,
    pub total: Option<i64>,
}

/// Runs service work under the configured request deadline.
pub async fn with_deadline<T, F>(fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(settings().request_timeout, fut).await {
        Ok(res) => res,
        Err(_) => Err(AppError::Transient("request timed out".into())),
    }
}

/// A refused precondition: logged at `warn`, answered with 409.
pub(crate) fn refuse(action: impl fmt::Display, message: impl Into<String>) -> AppError {
    let message = message.into();
    log::warn!("{action} refused: {message}");
    AppError::Conflict(message)
}

pub(crate) async fn load_campaign(db: &PgPool, id: i64) -> Result<Campaign, AppError> {
    campaign_repo::find(db, id)
        .await?
        .ok_or_else(|| AppError::not_found("campaign not found"))
}

/// DM or active player, otherwise `Forbidden`.
pub(crate) async fn require_member(
    db: &PgPool,
    caller: Caller,
    campaign: &Campaign,
) -> Result<CampaignRole, AppError> {
    if campaign.dm_id == caller.user_id {
        return Ok(CampaignRole::Dm);
    }
    if campaign_repo::is_active_player(db, campaign.id, caller.user_id).await? {
        return Ok(CampaignRole::Player);
    }
    Err(AppError::forbidden("you are not a member of this campaign"))
}

pub(crate) fn require_dm(caller: Caller, campaign: &Campaign) -> Result<(), AppError> {
    if campaign.dm_id == caller.user_id {
        Ok(())
    } else {
        Err(AppError::forbidden("only the DM can do this"))
    }
}
