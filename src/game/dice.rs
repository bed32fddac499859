//! Dice notation parser and roller (`NdS[+/-M]`, advantage on d20s).

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;

pub const MAX_QUANTITY: u32 = 100;
pub const MIN_SIDES: u32 = 2;
pub const MAX_SIDES: u32 = 100;
pub const MAX_BATCH: usize = 20;

static NOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)d([0-9]+)([+-][0-9]+)?$").expect("dice notation regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotationField {
    Format,
    Quantity,
    Sides,
    Modifier,
}

impl NotationField {
    pub fn as_str(self) -> &'static str {
        match self {
            NotationField::Format => "notation",
            NotationField::Quantity => "quantity",
            NotationField::Sides => "sides",
            NotationField::Modifier => "modifier",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("invalid dice notation '{notation}': {reason}")]
    InvalidNotation {
        notation: String,
        field: NotationField,
        reason: &'static str,
    },
    #[error("advantage and disadvantage cannot both be set for '{notation}'")]
    ContradictoryModifiers { notation: String },
    #[error("a batch must contain between 1 and {MAX_BATCH} rolls, got {0}")]
    BatchSize(usize),
}

fn invalid(notation: &str, field: NotationField, reason: &'static str) -> DiceError {
    DiceError::InvalidNotation {
        notation: notation.to_owned(),
        field,
        reason,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParsedDice {
    pub quantity: u32,
    pub sides: u32,
    pub modifier: i32,
}

pub fn parse(notation: &str) -> Result<ParsedDice, DiceError> {
    let trimmed = notation.trim();
    let caps = NOTATION
        .captures(trimmed)
        .ok_or_else(|| invalid(trimmed, NotationField::Format, "expected NdS or NdS+M"))?;

    let quantity = caps[1]
        .parse::<u32>()
        .ok()
        .filter(|q| (1..=MAX_QUANTITY).contains(q))
        .ok_or_else(|| {
            invalid(trimmed, NotationField::Quantity, "quantity must be between 1 and 100")
        })?;

    let sides = caps[2]
        .parse::<u32>()
        .ok()
        .filter(|s| (MIN_SIDES..=MAX_SIDES).contains(s))
        .ok_or_else(|| invalid(trimmed, NotationField::Sides, "sides must be between 2 and 100"))?;

    let modifier = match caps.get(3) {
        Some(m) => m
            .as_str()
            .parse::<i32>()
            .map_err(|_| invalid(trimmed, NotationField::Modifier, "modifier out of range"))?,
        None => 0,
    };

    Ok(ParsedDice {
        quantity,
        sides,
        modifier,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RollRequest {
    pub notation: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub advantage: bool,
    #[serde(default)]
    pub disadvantage: bool,
}

impl RollRequest {
    pub fn plain(notation: impl Into<String>) -> Self {
        RollRequest {
            notation: notation.into(),
            ..Default::default()
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct DiceRoll {
    pub notation: String,
    pub quantity: u32,
    pub sides: u32,
    pub modifier: i32,
    pub rolls: Vec<u32>,
    /// Losing d20 when advantage or disadvantage was applied.
    pub dropped_rolls: Vec<u32>,
    pub total: i64,
    /// Reported only when the roll was actually a single d20.
    pub advantage: bool,
    pub disadvantage: bool,
    pub label: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Rolls one request with the thread-local CSPRNG.
pub fn roll(req: &RollRequest) -> Result<DiceRoll, DiceError> {
    roll_with(&mut rand::rng(), req)
}

pub fn roll_with<R: Rng + ?Sized>(rng: &mut R, req: &RollRequest) -> Result<DiceRoll, DiceError> {
    let parsed = check(req)?;
    Ok(evaluate(rng, req, parsed))
}

/// All-or-nothing: one bad entry rejects the whole batch before any dice are rolled.
pub fn roll_batch(reqs: &[RollRequest]) -> Result<Vec<DiceRoll>, DiceError> {
    roll_batch_with(&mut rand::rng(), reqs)
}

pub fn roll_batch_with<R: Rng + ?Sized>(
    rng: &mut R,
    reqs: &[RollRequest],
) -> Result<Vec<DiceRoll>, DiceError> {
    if reqs.is_empty() || reqs.len() > MAX_BATCH {
        return Err(DiceError::BatchSize(reqs.len()));
    }

    let parsed = reqs.iter().map(check).collect::<Result<Vec<_>, _>>()?;

    Ok(reqs
        .iter()
        .zip(parsed)
        .map(|(req, dice)| evaluate(rng, req, dice))
        .collect())
}

fn check(req: &RollRequest) -> Result<ParsedDice, DiceError> {
    if req.advantage && req.disadvantage {
        return Err(DiceError::ContradictoryModifiers {
            notation: req.notation.trim().to_owned(),
        });
    }
    parse(&req.notation)
}

fn evaluate<R: Rng + ?Sized>(rng: &mut R, req: &RollRequest, dice: ParsedDice) -> DiceRoll {
    let engaged = (req.advantage || req.disadvantage) && dice.quantity == 1 && dice.sides == 20;

    let (rolls, dropped_rolls) = if engaged {
        let a = rng.random_range(1..=20u32);
        let b = rng.random_range(1..=20u32);
        let (kept, dropped) = if req.advantage {
            (a.max(b), a.min(b))
        } else {
            (a.min(b), a.max(b))
        };
        (vec![kept], vec![dropped])
    } else {
        let rolls = (0..dice.quantity)
            .map(|_| rng.random_range(1..=dice.sides))
            .collect();
        (rolls, Vec::new())
    };

    let total = rolls.iter().map(|&r| i64::from(r)).sum::<i64>() + i64::from(dice.modifier);

    DiceRoll {
        notation: req.notation.trim().to_owned(),
        quantity: dice.quantity,
        sides: dice.sides,
        modifier: dice.modifier,
        rolls,
        dropped_rolls,
        total,
        advantage: engaged && req.advantage,
        disadvantage: engaged && req.disadvantage,
        label: req.label.clone().filter(|l| !l.trim().is_empty()),
        timestamp: Utc::now(),
    }
}
