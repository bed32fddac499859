//! Postgres persistence: pool setup, row models and repositories.

pub mod campaign_repo;
pub mod character_repo;
pub mod flex_json;
pub mod models;
pub mod pc_repo;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

use crate::config::Settings;

pub use flex_json::FlexJson;

pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Unique constraint guarding campaign invite codes.
pub const INVITE_CODE_CONSTRAINT: &str = "campaigns_invite_code_key";
/// Unique constraint guarding one membership row per (campaign, user).
pub const MEMBERSHIP_CONSTRAINT: &str = "campaign_players_campaign_user_key";
/// Partial unique index: a PC is in play at most once per campaign.
pub const IN_PLAY_CONSTRAINT: &str = "campaign_characters_in_play_key";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("row not found")]
    NotFound,
    #[error("unique constraint violated: {constraint}")]
    Conflict { constraint: String },
    #[error("foreign key violated: {constraint}")]
    ForeignKey { constraint: String },
    #[error("database unavailable: {0}")]
    Transient(sqlx::Error),
    #[error(transparent)]
    Other(sqlx::Error),
}

impl DbError {
    pub fn is_unique_violation_of(&self, name: &str) -> bool {
        matches!(self, DbError::Conflict { constraint } if constraint == name)
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or_default().to_owned();
            match db_err.code().as_deref() {
                Some("23505") => return DbError::Conflict { constraint },
                Some("23503") => return DbError::ForeignKey { constraint },
                _ => {}
            }
        }

        match err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            e @ (sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::WorkerCrashed) => DbError::Transient(e),
            e => DbError::Other(e),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

pub async fn connect(settings: &Settings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .acquire_timeout(settings.db_acquire_timeout)
        .connect(&settings.database_url)
        .await
}

/// Binds every `CharacterSheet` column in `SHEET_COLUMNS` order.
macro_rules! bind_sheet {
    ($query:expr, $sheet:expr) => {{
        let sheet = $sheet;
        $query
            .bind(&sheet.name)
            .bind(&sheet.description)
            .bind(sheet.level)
            .bind(&sheet.race)
            .bind(&sheet.class)
            .bind(&sheet.background)
            .bind(&sheet.alignment)
            .bind(&sheet.attributes)
            .bind(&sheet.abilities)
            .bind(&sheet.equipment)
            .bind(sheet.hp)
            .bind(sheet.current_hp)
            .bind(sheet.ca)
            .bind(sheet.proficiency_bonus)
            .bind(sheet.inspiration)
            .bind(&sheet.skills)
            .bind(&sheet.attacks)
            .bind(&sheet.spells)
            .bind(&sheet.personality_traits)
            .bind(&sheet.ideals)
            .bind(&sheet.bonds)
            .bind(&sheet.flaws)
            .bind(&sheet.features)
            .bind(&sheet.player_name)
    }};
}
pub(crate) use bind_sheet;

/// Column order expected by [`bind_sheet!`].
pub(crate) const SHEET_COLUMNS: &str = "name, description, level, race, class, background, \
     alignment, attributes, abilities, equipment, hp, current_hp, ca, proficiency_bonus, \
     inspiration, skills, attacks, spells, personality_traits, ideals, bonds, flaws, \
     features, player_name";

/// `$first..$first+23` placeholders matching [`SHEET_COLUMNS`].
pub(crate) fn sheet_placeholders(first: usize) -> String {
    (first..first + 24)
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `col = $n` assignments matching [`SHEET_COLUMNS`], for UPDATEs.
pub(crate) fn sheet_assignments(first: usize) -> String {
    SHEET_COLUMNS
        .split(',')
        .map(str::trim)
        .enumerate()
        .map(|(i, col)| format!("{col} = ${}", first + i))
        .collect::<Vec<_>>()
        .join(", ")
}
