//! Player characters, always scoped to their owner.

use sqlx::{PgExecutor, PgPool};

use super::models::{CharacterSheet, Pc, PcCampaign};
use super::{bind_sheet, sheet_assignments, sheet_placeholders, DbResult, SHEET_COLUMNS};

pub async fn list(db: &PgPool, player_id: i64, limit: i64, offset: i64) -> DbResult<Vec<Pc>> {
    let rows = sqlx::query_as::<_, Pc>(
        r#"
        SELECT * FROM pcs
         WHERE player_id = $1
         ORDER BY updated_at DESC, id DESC
         LIMIT $2 OFFSET $3
        "#,
    )
    .bind(player_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(neutralize).collect())
}

pub async fn count(db: &PgPool, player_id: i64) -> DbResult<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pcs WHERE player_id = $1")
        .bind(player_id)
        .fetch_one(db)
        .await?;
    Ok(n)
}

pub async fn find_owned<'c, E: PgExecutor<'c>>(
    db: E,
    id: i64,
    player_id: i64,
) -> DbResult<Option<Pc>> {
    let row = sqlx::query_as::<_, Pc>("SELECT * FROM pcs WHERE id = $1 AND player_id = $2")
        .bind(id)
        .bind(player_id)
        .fetch_optional(db)
        .await?;
    Ok(row.map(neutralize))
}

/// Locks a PC whoever owns it; a DM playing a snapshot needs this.
pub async fn lock<'c, E: PgExecutor<'c>>(db: E, id: i64) -> DbResult<Option<Pc>> {
    let row = sqlx::query_as::<_, Pc>("SELECT * FROM pcs WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row.map(neutralize))
}

/// Row-locks the PC so attach / delete / uniqueness changes serialize on it.
pub async fn lock_owned<'c, E: PgExecutor<'c>>(
    db: E,
    id: i64,
    player_id: i64,
) -> DbResult<Option<Pc>> {
    let row = sqlx::query_as::<_, Pc>(
        "SELECT * FROM pcs WHERE id = $1 AND player_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(player_id)
    .fetch_optional(db)
    .await?;
    Ok(row.map(neutralize))
}

pub async fn insert(
    db: &PgPool,
    player_id: i64,
    sheet: &CharacterSheet,
    is_homebrew: bool,
    is_unique: bool,
) -> DbResult<Pc> {
    let sql = format!(
        r#"
        INSERT INTO pcs (player_id, is_homebrew, is_unique, {SHEET_COLUMNS})
        VALUES ($1, $2, $3, {})
        RETURNING *
        "#,
        sheet_placeholders(4)
    );
    let query = sqlx::query_as::<_, Pc>(&sql)
        .bind(player_id)
        .bind(is_homebrew)
        .bind(is_unique);
    let row = bind_sheet!(query, sheet).fetch_one(db).await?;
    Ok(neutralize(row))
}

pub async fn update<'c, E: PgExecutor<'c>>(
    db: E,
    id: i64,
    player_id: i64,
    sheet: &CharacterSheet,
    is_homebrew: bool,
    is_unique: bool,
) -> DbResult<Option<Pc>> {
    let sql = format!(
        r#"
        UPDATE pcs
           SET is_homebrew = $3, is_unique = $4, updated_at = NOW(), {}
         WHERE id = $1 AND player_id = $2
        RETURNING *
        "#,
        sheet_assignments(5)
    );
    let query = sqlx::query_as::<_, Pc>(&sql)
        .bind(id)
        .bind(player_id)
        .bind(is_homebrew)
        .bind(is_unique);
    let row = bind_sheet!(query, sheet).fetch_optional(db).await?;
    Ok(row.map(neutralize))
}

pub async fn delete<'c, E: PgExecutor<'c>>(db: E, id: i64, player_id: i64) -> DbResult<bool> {
    let removed = sqlx::query("DELETE FROM pcs WHERE id = $1 AND player_id = $2")
        .bind(id)
        .bind(player_id)
        .execute(db)
        .await?
        .rows_affected();
    Ok(removed > 0)
}

/// Campaigns the PC has a snapshot in, with the snapshot's play state.
pub async fn campaigns(
    db: &PgPool,
    pc_id: i64,
    limit: i64,
    offset: i64,
) -> DbResult<Vec<PcCampaign>> {
    let rows = sqlx::query_as::<_, PcCampaign>(
        r#"
        SELECT c.id, c.name, c.description, c.dm_id, u.username AS dm_name,
               c.status, c.max_players, c.current_session,
               (SELECT COUNT(*) FROM campaign_players cp
                 WHERE cp.campaign_id = c.id AND cp.status = 'active') AS player_count,
               cc.id AS character_id, cc.status AS character_status, cc.current_hp,
               c.created_at, c.updated_at
          FROM campaign_characters cc
          JOIN campaigns c ON c.id = cc.campaign_id
          LEFT JOIN users u ON u.id = c.dm_id
         WHERE cc.source_pc_id = $1
         ORDER BY cc.joined_at DESC, cc.id DESC
         LIMIT $2 OFFSET $3
        "#,
    )
    .bind(pc_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub(crate) fn neutralize(mut pc: Pc) -> Pc {
    pc.sheet = pc.sheet.neutralize();
    pc
}
