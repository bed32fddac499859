//! Campaign characters: per-campaign snapshots of a player's PC.

use sqlx::{PgExecutor, PgPool};

use super::models::{CampaignCharacter, CharacterSheet, CharacterStatus, Pc};
use super::{bind_sheet, sheet_assignments, sheet_placeholders, DbResult, SHEET_COLUMNS};

const SELECT_WITH_PLAYER: &str = r#"
    SELECT cc.*, u.username AS player_username
      FROM campaign_characters cc
      LEFT JOIN users u ON u.id = cc.player_id
"#;

pub async fn list(
    db: &PgPool,
    campaign_id: i64,
    limit: i64,
    offset: i64,
) -> DbResult<Vec<CampaignCharacter>> {
    let sql = format!(
        "{SELECT_WITH_PLAYER} WHERE cc.campaign_id = $1 ORDER BY cc.joined_at, cc.id LIMIT $2 OFFSET $3"
    );
    let rows = sqlx::query_as::<_, CampaignCharacter>(&sql)
        .bind(campaign_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(neutralize).collect())
}

pub async fn count(db: &PgPool, campaign_id: i64) -> DbResult<i64> {
    let n = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM campaign_characters WHERE campaign_id = $1",
    )
    .bind(campaign_id)
    .fetch_one(db)
    .await?;
    Ok(n)
}

/// A snapshot visible to `user_id`: their own, or any if they DM the campaign.
pub async fn find_visible<'c, E: PgExecutor<'c>>(
    db: E,
    campaign_id: i64,
    character_id: i64,
    user_id: i64,
) -> DbResult<Option<CampaignCharacter>> {
    let sql = format!(
        r#"{SELECT_WITH_PLAYER}
          JOIN campaigns c ON c.id = cc.campaign_id
         WHERE cc.id = $1 AND cc.campaign_id = $2
           AND (cc.player_id = $3 OR c.dm_id = $3)"#
    );
    let row = sqlx::query_as::<_, CampaignCharacter>(&sql)
        .bind(character_id)
        .bind(campaign_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(row.map(neutralize))
}

/// Whether `pc_id` is already in play in this campaign.
pub async fn is_in_campaign<'c, E: PgExecutor<'c>>(
    db: E,
    campaign_id: i64,
    pc_id: i64,
) -> DbResult<bool> {
    let found = sqlx::query_scalar::<_, bool>(
        r#"SELECT EXISTS(
               SELECT 1 FROM campaign_characters
                WHERE campaign_id = $1 AND source_pc_id = $2
                  AND status IN ('active', 'inactive')
           )"#,
    )
    .bind(campaign_id)
    .bind(pc_id)
    .fetch_one(db)
    .await?;
    Ok(found)
}

/// First campaign where `pc_id` is still in play, if any.
pub async fn in_play_campaign<'c, E: PgExecutor<'c>>(db: E, pc_id: i64) -> DbResult<Option<i64>> {
    let campaign = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT campaign_id FROM campaign_characters
         WHERE source_pc_id = $1 AND status IN ('active', 'inactive')
         ORDER BY joined_at, id
         LIMIT 1
        "#,
    )
    .bind(pc_id)
    .fetch_optional(db)
    .await?;
    Ok(campaign)
}

/// Like [`in_play_campaign`], ignoring the snapshot `character_id`.
pub async fn in_play_elsewhere<'c, E: PgExecutor<'c>>(
    db: E,
    pc_id: i64,
    character_id: i64,
) -> DbResult<Option<i64>> {
    let campaign = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT campaign_id FROM campaign_characters
         WHERE source_pc_id = $1 AND id <> $2 AND status IN ('active', 'inactive')
         ORDER BY joined_at, id
         LIMIT 1
        "#,
    )
    .bind(pc_id)
    .bind(character_id)
    .fetch_optional(db)
    .await?;
    Ok(campaign)
}

pub async fn in_play_count<'c, E: PgExecutor<'c>>(db: E, pc_id: i64) -> DbResult<i64> {
    let n = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM campaign_characters
         WHERE source_pc_id = $1 AND status IN ('active', 'inactive')
        "#,
    )
    .bind(pc_id)
    .fetch_one(db)
    .await?;
    Ok(n)
}

/// Copies the PC into a fresh, active snapshot at full health.
pub async fn insert_snapshot<'c, E: PgExecutor<'c>>(
    db: E,
    campaign_id: i64,
    player_id: i64,
    pc: &Pc,
) -> DbResult<CampaignCharacter> {
    let mut sheet = pc.sheet.clone();
    sheet.current_hp = Some(sheet.hp);

    let sql = format!(
        r#"
        INSERT INTO campaign_characters
               (campaign_id, player_id, source_pc_id, status, {SHEET_COLUMNS})
        VALUES ($1, $2, $3, 'active', {})
        RETURNING *
        "#,
        sheet_placeholders(4)
    );
    let query = sqlx::query_as::<_, CampaignCharacter>(&sql)
        .bind(campaign_id)
        .bind(player_id)
        .bind(pc.id);
    let row = bind_sheet!(query, &sheet).fetch_one(db).await?;
    Ok(neutralize(row))
}

pub async fn update_play_state<'c, E: PgExecutor<'c>>(
    db: E,
    campaign_id: i64,
    character_id: i64,
    current_hp: Option<i32>,
    status: CharacterStatus,
    campaign_notes: &str,
) -> DbResult<Option<CampaignCharacter>> {
    let row = sqlx::query_as::<_, CampaignCharacter>(
        r#"
        UPDATE campaign_characters
           SET current_hp = $3, status = $4, campaign_notes = $5
         WHERE id = $1 AND campaign_id = $2
        RETURNING *
        "#,
    )
    .bind(character_id)
    .bind(campaign_id)
    .bind(current_hp)
    .bind(status.as_str())
    .bind(campaign_notes)
    .fetch_optional(db)
    .await?;
    Ok(row.map(neutralize))
}

/// Rewrites the whole sheet and stamps `last_sync`.
pub async fn update_full<'c, E: PgExecutor<'c>>(
    db: E,
    campaign_id: i64,
    character_id: i64,
    sheet: &CharacterSheet,
    status: CharacterStatus,
    campaign_notes: &str,
) -> DbResult<Option<CampaignCharacter>> {
    let sql = format!(
        r#"
        UPDATE campaign_characters
           SET status = $3, campaign_notes = $4, last_sync = NOW(), {}
         WHERE id = $1 AND campaign_id = $2
        RETURNING *
        "#,
        sheet_assignments(5)
    );
    let query = sqlx::query_as::<_, CampaignCharacter>(&sql)
        .bind(character_id)
        .bind(campaign_id)
        .bind(status.as_str())
        .bind(campaign_notes);
    let row = bind_sheet!(query, sheet).fetch_optional(db).await?;
    Ok(row.map(neutralize))
}

pub async fn delete(db: &PgPool, campaign_id: i64, character_id: i64) -> DbResult<bool> {
    let removed = sqlx::query("DELETE FROM campaign_characters WHERE id = $1 AND campaign_id = $2")
        .bind(character_id)
        .bind(campaign_id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(removed > 0)
}

/// The caller's PCs that could still be attached to this campaign.
pub async fn available_pcs(
    db: &PgPool,
    campaign_id: i64,
    user_id: i64,
    limit: i64,
    offset: i64,
) -> DbResult<Vec<Pc>> {
    let rows = sqlx::query_as::<_, Pc>(
        r#"
        SELECT p.*
          FROM pcs p
         WHERE p.player_id = $2
           AND NOT EXISTS (SELECT 1 FROM campaign_characters cc
                            WHERE cc.source_pc_id = p.id
                              AND cc.campaign_id = $1
                              AND cc.status IN ('active', 'inactive'))
           AND NOT (p.is_unique AND EXISTS (SELECT 1 FROM campaign_characters cc
                                             WHERE cc.source_pc_id = p.id
                                               AND cc.status IN ('active', 'inactive')))
         ORDER BY p.updated_at DESC, p.id DESC
         LIMIT $3 OFFSET $4
        "#,
    )
    .bind(campaign_id)
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(super::pc_repo::neutralize).collect())
}

fn neutralize(mut cc: CampaignCharacter) -> CampaignCharacter {
    cc.sheet = cc.sheet.neutralize();
    cc
}
