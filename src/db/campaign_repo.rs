//! Campaigns and their player rosters.

use sqlx::{PgExecutor, PgPool};

use super::models::{Campaign, CampaignPlayer, CampaignStatus, CampaignSummary};
use super::DbResult;
use crate::game::invite::InviteCode;

/// Fields of a campaign the DM controls.
#[derive(Debug, Clone)]
pub struct CampaignDraft {
    pub name: String,
    pub description: String,
    pub max_players: i32,
    pub current_session: i32,
    pub status: CampaignStatus,
    pub allow_homebrew: bool,
}

impl From<&Campaign> for CampaignDraft {
    fn from(c: &Campaign) -> Self {
        CampaignDraft {
            name: c.name.clone(),
            description: c.description.clone(),
            max_players: c.max_players,
            current_session: c.current_session,
            status: c.status,
            allow_homebrew: c.allow_homebrew,
        }
    }
}

/// Campaigns where `user_id` is the DM or an active player, newest activity first.
pub async fn list_for_user(
    db: &PgPool,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> DbResult<Vec<CampaignSummary>> {
    let rows = sqlx::query_as::<_, CampaignSummary>(
        r#"
        SELECT c.id, c.name, c.description, c.dm_id, u.username AS dm_name,
               c.status, c.allow_homebrew, c.max_players, c.current_session,
               (SELECT COUNT(*) FROM campaign_players cp
                 WHERE cp.campaign_id = c.id AND cp.status = 'active') AS player_count,
               CASE WHEN c.dm_id = $1 THEN c.invite_code::TEXT END AS invite_code,
               c.created_at, c.updated_at
          FROM campaigns c
          LEFT JOIN users u ON u.id = c.dm_id
         WHERE c.dm_id = $1
            OR EXISTS (SELECT 1 FROM campaign_players cp
                        WHERE cp.campaign_id = c.id
                          AND cp.user_id = $1
                          AND cp.status = 'active')
         ORDER BY c.updated_at DESC, c.id DESC
         LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn count_for_user(db: &PgPool, user_id: i64) -> DbResult<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
          FROM campaigns c
         WHERE c.dm_id = $1
            OR EXISTS (SELECT 1 FROM campaign_players cp
                        WHERE cp.campaign_id = c.id
                          AND cp.user_id = $1
                          AND cp.status = 'active')
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(total)
}

pub async fn find<'c, E: PgExecutor<'c>>(db: E, id: i64) -> DbResult<Option<Campaign>> {
    let row = sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

/// Same as [`find`] but row-locks the campaign for the rest of the transaction.
pub async fn lock<'c, E: PgExecutor<'c>>(db: E, id: i64) -> DbResult<Option<Campaign>> {
    let row = sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn find_by_invite_code<'c, E: PgExecutor<'c>>(
    db: E,
    code: &InviteCode,
) -> DbResult<Option<Campaign>> {
    let row = sqlx::query_as::<_, Campaign>(
        "SELECT * FROM campaigns WHERE invite_code = $1 FOR UPDATE",
    )
    .bind(code.as_str())
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn insert(
    db: &PgPool,
    dm_id: i64,
    draft: &CampaignDraft,
    code: InviteCode,
) -> DbResult<Campaign> {
    let row = sqlx::query_as::<_, Campaign>(
        r#"
        INSERT INTO campaigns
               (name, description, dm_id, max_players, current_session,
                status, allow_homebrew, invite_code)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(&draft.name)
    .bind(&draft.description)
    .bind(dm_id)
    .bind(draft.max_players)
    .bind(draft.current_session)
    .bind(draft.status.as_str())
    .bind(draft.allow_homebrew)
    .bind(code.as_str())
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// DM-scoped update; `None` when the campaign is gone or not theirs.
pub async fn update<'c, E: PgExecutor<'c>>(
    db: E,
    id: i64,
    dm_id: i64,
    draft: &CampaignDraft,
) -> DbResult<Option<Campaign>> {
    let row = sqlx::query_as::<_, Campaign>(
        r#"
        UPDATE campaigns
           SET name = $3, description = $4, max_players = $5, current_session = $6,
               status = $7, allow_homebrew = $8, updated_at = NOW()
         WHERE id = $1 AND dm_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(dm_id)
    .bind(&draft.name)
    .bind(&draft.description)
    .bind(draft.max_players)
    .bind(draft.current_session)
    .bind(draft.status.as_str())
    .bind(draft.allow_homebrew)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Removes a campaign with its snapshots and roster; returns false if nothing matched.
pub async fn delete(db: &PgPool, id: i64, dm_id: i64) -> DbResult<bool> {
    let mut tx = db.begin().await?;

    let owned = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM campaigns WHERE id = $1 AND dm_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(dm_id)
    .fetch_optional(&mut *tx)
    .await?;
    if owned.is_none() {
        return Ok(false);
    }

    sqlx::query("DELETE FROM campaign_characters WHERE campaign_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM campaign_players WHERE campaign_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM campaigns WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

/// Stores a new code; `None` when the campaign is gone or not the DM's.
pub async fn set_invite_code(
    db: &PgPool,
    id: i64,
    dm_id: i64,
    code: InviteCode,
) -> DbResult<Option<String>> {
    let stored = sqlx::query_scalar::<_, String>(
        r#"
        UPDATE campaigns
           SET invite_code = $3, updated_at = NOW()
         WHERE id = $1 AND dm_id = $2
        RETURNING invite_code::TEXT
        "#,
    )
    .bind(id)
    .bind(dm_id)
    .bind(code.as_str())
    .fetch_optional(db)
    .await?;
    Ok(stored)
}

//////////////////////////////////////////////////
// Roster
//////////////////////////////////////////////////

pub async fn players(db: &PgPool, campaign_id: i64) -> DbResult<Vec<CampaignPlayer>> {
    let rows = sqlx::query_as::<_, CampaignPlayer>(
        r#"
        SELECT cp.id, cp.campaign_id, cp.user_id, u.username, cp.joined_at, cp.status
          FROM campaign_players cp
          LEFT JOIN users u ON u.id = cp.user_id
         WHERE cp.campaign_id = $1 AND cp.status = 'active'
         ORDER BY cp.joined_at, cp.id
        "#,
    )
    .bind(campaign_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn is_active_player<'c, E: PgExecutor<'c>>(
    db: E,
    campaign_id: i64,
    user_id: i64,
) -> DbResult<bool> {
    let found = sqlx::query_scalar::<_, bool>(
        r#"SELECT EXISTS(
               SELECT 1 FROM campaign_players
                WHERE campaign_id = $1 AND user_id = $2 AND status = 'active'
           )"#,
    )
    .bind(campaign_id)
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(found)
}

/// Any membership row, whatever its status.
pub async fn has_membership<'c, E: PgExecutor<'c>>(
    db: E,
    campaign_id: i64,
    user_id: i64,
) -> DbResult<bool> {
    let found = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM campaign_players WHERE campaign_id = $1 AND user_id = $2)",
    )
    .bind(campaign_id)
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(found)
}

pub async fn active_player_count<'c, E: PgExecutor<'c>>(db: E, campaign_id: i64) -> DbResult<i64> {
    let n = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM campaign_players WHERE campaign_id = $1 AND status = 'active'",
    )
    .bind(campaign_id)
    .fetch_one(db)
    .await?;
    Ok(n)
}

pub async fn add_player<'c, E: PgExecutor<'c>>(
    db: E,
    campaign_id: i64,
    user_id: i64,
) -> DbResult<CampaignPlayer> {
    let row = sqlx::query_as::<_, CampaignPlayer>(
        r#"
        INSERT INTO campaign_players (campaign_id, user_id, status)
        VALUES ($1, $2, 'active')
        RETURNING id, campaign_id, user_id, joined_at, status
        "#,
    )
    .bind(campaign_id)
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Drops the membership row and the leaver's snapshots; false if not a member.
pub async fn remove_player(db: &PgPool, campaign_id: i64, user_id: i64) -> DbResult<bool> {
    let mut tx = db.begin().await?;

    sqlx::query("DELETE FROM campaign_characters WHERE campaign_id = $1 AND player_id = $2")
        .bind(campaign_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let removed = sqlx::query("DELETE FROM campaign_players WHERE campaign_id = $1 AND user_id = $2")
        .bind(campaign_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if removed == 0 {
        // rolled back on drop
        return Ok(false);
    }

    sqlx::query("UPDATE campaigns SET updated_at = NOW() WHERE id = $1")
        .bind(campaign_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}
