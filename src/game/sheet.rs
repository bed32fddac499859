//! Character-sheet rules: proficiency, ability modifiers, default blocks.

use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::db::models::CharacterSheet;
use crate::db::FlexJson;

pub const ABILITIES: [&str; 6] = [
    "strength",
    "dexterity",
    "constitution",
    "intelligence",
    "wisdom",
    "charisma",
];

/// +2 at levels 1-4, +1 every four levels after, capped at +6.
pub fn proficiency_bonus(level: i32) -> i32 {
    (2 + (level.max(1) - 1) / 4).min(6)
}

/// `floor((score - 10) / 2)`, so a 9 is -1 and a 1 is -5.
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// Modifiers for the six abilities that carry a numeric score.
pub fn attribute_modifiers(attributes: &FlexJson) -> BTreeMap<String, i32> {
    let Some(map) = attributes.as_object() else {
        return BTreeMap::new();
    };
    ABILITIES
        .iter()
        .filter_map(|&name| {
            let score = map.get(name)?.as_i64().and_then(|s| i32::try_from(s).ok())?;
            Some((name.to_owned(), ability_modifier(score)))
        })
        .collect()
}

pub fn default_attributes() -> FlexJson {
    let map = ABILITIES
        .iter()
        .map(|a| ((*a).to_owned(), Value::from(10)))
        .collect();
    FlexJson::Object(map)
}

pub fn default_spells() -> FlexJson {
    FlexJson::from(json!({ "spell_slots": {}, "known_spells": [] }))
}

/// Starting hit points when the client sends none.
pub fn default_hp(level: i32) -> i32 {
    10 + 5 * level.max(1)
}

impl CharacterSheet {
    /// Fills blocks missing from a freshly submitted sheet and recomputes
    /// derived fields.
    pub fn apply_defaults(&mut self) {
        self.name = self.name.trim().to_owned();
        self.race = self.race.trim().to_owned();
        self.class = self.class.trim().to_owned();

        self.attributes = std::mem::take(&mut self.attributes).or(default_attributes());
        self.spells = std::mem::take(&mut self.spells).or(default_spells());
        self.abilities = std::mem::take(&mut self.abilities).or(FlexJson::empty_object());
        self.skills = std::mem::take(&mut self.skills).or(FlexJson::empty_object());
        self.equipment = std::mem::take(&mut self.equipment).or(FlexJson::empty_array());
        self.attacks = std::mem::take(&mut self.attacks).or(FlexJson::empty_array());

        if self.hp <= 0 {
            self.hp = default_hp(self.level);
        }
        if self.ca <= 0 {
            self.ca = 10;
        }
        self.proficiency_bonus = proficiency_bonus(self.level);
    }

    /// Read-side repair of legacy rows: unreadable blocks become empty.
    pub fn neutralize(mut self) -> Self {
        for block in [
            &mut self.attributes,
            &mut self.abilities,
            &mut self.skills,
            &mut self.spells,
        ] {
            if block.is_null() {
                *block = FlexJson::empty_object();
            }
        }
        for block in [&mut self.equipment, &mut self.attacks] {
            if block.is_null() {
                *block = FlexJson::empty_array();
            }
        }
        self
    }
}
