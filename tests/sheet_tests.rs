// tests/sheet_tests.rs

use serde_json::json;
use taverna_server::db::models::CharacterSheet;
use taverna_server::db::FlexJson;
use taverna_server::game::sheet::{
    ability_modifier, attribute_modifiers, default_attributes, proficiency_bonus,
};

#[test]
fn proficiency_follows_the_level_table() {
    let expected = [
        (1, 2),
        (4, 2),
        (5, 3),
        (8, 3),
        (9, 4),
        (12, 4),
        (13, 5),
        (16, 5),
        (17, 6),
        (20, 6),
    ];
    for (level, bonus) in expected {
        assert_eq!(proficiency_bonus(level), bonus, "level {level}");
    }
    assert_eq!(proficiency_bonus(0), 2);
    assert_eq!(proficiency_bonus(-3), 2);
    assert_eq!(proficiency_bonus(40), 6);
}

#[test]
fn ability_modifier_rounds_down() {
    assert_eq!(ability_modifier(10), 0);
    assert_eq!(ability_modifier(11), 0);
    assert_eq!(ability_modifier(12), 1);
    assert_eq!(ability_modifier(9), -1);
    assert_eq!(ability_modifier(8), -1);
    assert_eq!(ability_modifier(1), -5);
    assert_eq!(ability_modifier(20), 5);
}

#[test]
fn modifiers_skip_non_numeric_scores() {
    let attrs = FlexJson::from(json!({ "strength": 16, "dexterity": 7, "luck": "high" }));
    let mods = attribute_modifiers(&attrs);
    assert_eq!(mods.get("strength"), Some(&3));
    assert_eq!(mods.get("dexterity"), Some(&-2));
    assert!(!mods.contains_key("luck"));
    assert!(attribute_modifiers(&FlexJson::Null).is_empty());
}

#[test]
fn modifiers_only_cover_the_six_abilities() {
    let attrs = FlexJson::from(json!({ "wisdom": 12, "luck": 18, "sanity": 4 }));
    let mods = attribute_modifiers(&attrs);
    assert_eq!(mods.len(), 1);
    assert_eq!(mods.get("wisdom"), Some(&1));
}

#[test]
fn defaults_fill_a_bare_sheet() {
    let mut sheet = CharacterSheet {
        name: "  Thorin ".into(),
        level: 5,
        race: "Dwarf".into(),
        class: "Fighter".into(),
        ..Default::default()
    };
    sheet.apply_defaults();

    assert_eq!(sheet.name, "Thorin");
    assert_eq!(sheet.hp, 35);
    assert_eq!(sheet.ca, 10);
    assert_eq!(sheet.proficiency_bonus, 3);
    assert_eq!(sheet.attributes, default_attributes());
    assert_eq!(sheet.equipment, FlexJson::empty_array());
    assert_eq!(sheet.attacks, FlexJson::empty_array());
    assert_eq!(sheet.skills, FlexJson::empty_object());
    assert_eq!(
        sheet.spells,
        FlexJson::from(json!({ "spell_slots": {}, "known_spells": [] }))
    );
}

#[test]
fn defaults_keep_supplied_values() {
    let mut sheet = CharacterSheet {
        name: "Vex".into(),
        level: 1,
        hp: 9,
        ca: 15,
        proficiency_bonus: 9,
        attributes: FlexJson::from(json!({ "strength": 8 })),
        ..Default::default()
    };
    sheet.apply_defaults();
    assert_eq!(sheet.hp, 9);
    assert_eq!(sheet.ca, 15);
    assert_eq!(sheet.proficiency_bonus, 2);
    assert_eq!(sheet.attributes, FlexJson::from(json!({ "strength": 8 })));
}

#[test]
fn flex_json_decodes_tolerantly() {
    assert_eq!(FlexJson::from_text(""), FlexJson::Null);
    assert_eq!(FlexJson::from_text("not json"), FlexJson::Null);
    assert_eq!(FlexJson::from_text("42"), FlexJson::Null);
    assert_eq!(FlexJson::from_text("{}"), FlexJson::empty_object());
    assert_eq!(FlexJson::from_text(" [1,2] "), FlexJson::from(json!([1, 2])));
}

#[test]
fn neutralize_replaces_unreadable_blocks() {
    let sheet = CharacterSheet {
        attributes: FlexJson::from_text("garbage"),
        equipment: FlexJson::from_text(""),
        skills: FlexJson::from(json!({ "stealth": 4 })),
        ..Default::default()
    }
    .neutralize();

    assert_eq!(sheet.attributes, FlexJson::empty_object());
    assert_eq!(sheet.equipment, FlexJson::empty_array());
    assert_eq!(sheet.attacks, FlexJson::empty_array());
    assert_eq!(sheet.skills, FlexJson::from(json!({ "stealth": 4 })));
}

#[test]
fn sheet_serializes_json_blocks_inline() {
    let sheet = CharacterSheet {
        name: "Ada".into(),
        equipment: FlexJson::from(json!(["rope"])),
        ..Default::default()
    }
    .neutralize();
    let value = serde_json::to_value(&sheet).unwrap();
    assert_eq!(value["equipment"], json!(["rope"]));
    assert_eq!(value["attributes"], json!({}));
    assert_eq!(value["features"], json!([]));
}
