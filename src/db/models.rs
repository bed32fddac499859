use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

use super::FlexJson;

#[derive(Debug, Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

macro_rules! status_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownStatus(other.to_owned())),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownStatus;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }
    };
}

status_enum!(CampaignStatus {
    Planning => "planning",
    Active => "active",
    Paused => "paused",
    Completed => "completed",
});

status_enum!(PlayerStatus {
    Active => "active",
    Inactive => "inactive",
    Removed => "removed",
});

status_enum!(CharacterStatus {
    Active => "active",
    Inactive => "inactive",
    Dead => "dead",
    Retired => "retired",
});

impl CampaignStatus {
    /// planning <-> active <-> paused, anything -> completed; completed is final.
    pub fn can_transition_to(self, next: CampaignStatus) -> bool {
        use CampaignStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Completed, _) => false,
            (_, Completed) => true,
            (Planning, Active) | (Active, Planning) => true,
            (Active, Paused) | (Paused, Active) => true,
            _ => false,
        }
    }
}

impl CharacterStatus {
    /// Active and inactive snapshots still occupy their PC.
    pub fn in_play(self) -> bool {
        matches!(self, CharacterStatus::Active | CharacterStatus::Inactive)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Campaign {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub dm_id: i64,
    pub max_players: i32,
    pub current_session: i32,
    #[sqlx(try_from = "String")]
    pub status: CampaignStatus,
    pub allow_homebrew: bool,
    /// Canonical form; rendered separately and only to the DM.
    #[serde(skip)]
    pub invite_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the "my campaigns" listing.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CampaignSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub dm_id: i64,
    pub dm_name: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: CampaignStatus,
    pub allow_homebrew: bool,
    pub max_players: i32,
    pub current_session: i32,
    pub player_count: i64,
    /// Only selected when the caller is the DM.
    pub invite_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CampaignPlayer {
    pub id: i64,
    pub campaign_id: i64,
    pub user_id: i64,
    #[sqlx(default)]
    pub username: Option<String>,
    pub joined_at: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub status: PlayerStatus,
}

/// Every column shared by a PC and its campaign snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, Validate)]
#[serde(default)]
pub struct CharacterSheet {
    #[validate(length(min = 1, max = 255, message = "name must be between 1 and 255 characters"))]
    pub name: String,
    pub description: String,
    #[validate(range(min = 1, max = 20, message = "level must be between 1 and 20"))]
    pub level: i32,
    #[validate(length(min = 1, max = 255, message = "race is required"))]
    pub race: String,
    #[validate(length(min = 1, max = 255, message = "class is required"))]
    pub class: String,
    #[validate(length(max = 255))]
    pub background: String,
    #[validate(length(max = 64))]
    pub alignment: String,
    pub attributes: FlexJson,
    pub abilities: FlexJson,
    pub equipment: FlexJson,
    #[validate(range(min = 0, message = "hp cannot be negative"))]
    pub hp: i32,
    #[validate(range(min = 0, message = "current_hp cannot be negative"))]
    pub current_hp: Option<i32>,
    #[validate(range(min = 0, max = 50, message = "ca must be between 0 and 50"))]
    pub ca: i32,
    pub proficiency_bonus: i32,
    pub inspiration: bool,
    pub skills: FlexJson,
    pub attacks: FlexJson,
    pub spells: FlexJson,
    pub personality_traits: String,
    pub ideals: String,
    pub bonds: String,
    pub flaws: String,
    pub features: Vec<String>,
    #[validate(length(max = 255))]
    pub player_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Pc {
    pub id: i64,
    pub player_id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub sheet: CharacterSheet,
    pub is_homebrew: bool,
    pub is_unique: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-campaign copy of a PC, diverging from it as play goes on.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CampaignCharacter {
    pub id: i64,
    pub campaign_id: i64,
    pub player_id: i64,
    #[sqlx(default)]
    pub player_username: Option<String>,
    /// `None` once the source PC has been deleted.
    pub source_pc_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub status: CharacterStatus,
    pub joined_at: DateTime<Utc>,
    pub last_sync: Option<DateTime<Utc>>,
    pub campaign_notes: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub sheet: CharacterSheet,
}

/// A campaign a PC is placed in, as seen from the PC.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PcCampaign {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub dm_id: i64,
    pub dm_name: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: CampaignStatus,
    pub max_players: i32,
    pub current_session: i32,
    pub player_count: i64,
    pub character_id: i64,
    #[sqlx(try_from = "String")]
    pub character_status: CharacterStatus,
    pub current_hp: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PcAvailability {
    pub in_campaign: bool,
    pub campaign_id: Option<i64>,
    /// A unique PC in play cannot be attached anywhere else.
    pub blocking: bool,
}
