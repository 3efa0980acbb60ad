use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::rules::{next_unit, roll_index};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
}

impl Rarity {
    pub fn weight(self) -> f64 {
        match self {
            Rarity::Common => 0.70,
            Rarity::Uncommon => 0.15,
            Rarity::Rare => 0.10,
            Rarity::Legendary => 0.05,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Legendary => "Legendary",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnemySpec {
    pub name: String,
    pub hp: u16,
    pub attack: u16,
    #[serde(default)]
    pub sprite: String,
}

/// Decided once at catalog load; downstream code never re-derives the
/// kind from names or keywords.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissionKind {
    Combat { enemy: EnemySpec },
    Potion,
    Treasure,
    Empty,
}

impl MissionKind {
    pub fn is_combat(&self) -> bool {
        matches!(self, MissionKind::Combat { .. })
    }
}

/// A catalog entry. Identity is its position in the loaded sequence;
/// that index is what profiles and the session file reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Mission {
    pub name: String,
    pub rarity: Rarity,
    pub reward: u64,
    pub kind: MissionKind,
    #[serde(default)]
    pub sprite: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Question {
    #[serde(rename = "q")]
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    missions: Vec<MissionDef>,
}

#[derive(Debug, Deserialize)]
struct MissionDef {
    name: String,
    #[serde(rename = "type", default)]
    type_tag: Option<String>,
    #[serde(default)]
    rarity: Option<String>,
    #[serde(default)]
    reward: u64,
    #[serde(default)]
    enemy: Option<EnemySpec>,
    #[serde(default)]
    sprite: String,
}

fn parse_rarity(tag: Option<&str>) -> Rarity {
    match tag.map(str::trim).map(str::to_lowercase).as_deref() {
        Some("uncommon") => Rarity::Uncommon,
        Some("rare") => Rarity::Rare,
        Some("legendary") => Rarity::Legendary,
        _ => Rarity::Common,
    }
}

/// Keyword classification over name + optional type tag. A def without
/// an enemy is never combat no matter what its name says.
fn classify(def: &MissionDef) -> MissionKind {
    if let Some(enemy) = def.enemy.clone() {
        return MissionKind::Combat { enemy };
    }
    let mut haystack = def.name.to_lowercase();
    if let Some(tag) = &def.type_tag {
        haystack.push(' ');
        haystack.push_str(&tag.to_lowercase());
    }
    if haystack.contains("potion") || haystack.contains("heal") {
        MissionKind::Potion
    } else if haystack.contains("treasure") || haystack.contains("chest") {
        MissionKind::Treasure
    } else {
        MissionKind::Empty
    }
}

fn mission_from_def(def: MissionDef) -> Mission {
    let kind = classify(&def);
    Mission {
        rarity: parse_rarity(def.rarity.as_deref()),
        name: def.name,
        reward: def.reward,
        kind,
        sprite: def.sprite,
    }
}

pub fn parse_catalog(json: &str) -> Result<Vec<Mission>, String> {
    let file: CatalogFile =
        serde_json::from_str(json).map_err(|e| format!("Failed to parse mission catalog: {}", e))?;
    Ok(file.missions.into_iter().map(mission_from_def).collect())
}

pub fn parse_questions(json: &str) -> Result<Vec<Question>, String> {
    serde_json::from_str(json).map_err(|e| format!("Failed to parse question bank: {}", e))
}

pub async fn load_catalog(data_dir: &Path) -> Result<Vec<Mission>, String> {
    let path = data_dir.join("missions.json");
    let json = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    parse_catalog(&json)
}

pub async fn load_questions(data_dir: &Path) -> Result<Vec<Question>, String> {
    let path = data_dir.join("questions.json");
    let json = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    parse_questions(&json)
}

/// Weighted pick over the catalog by rarity weight: draw r in [0, total),
/// walk entries subtracting weights, first entry that drives the remainder
/// to or below zero wins. Falls back to the last entry if float error
/// leaves the remainder positive after the walk.
pub fn pick_weighted(catalog: &[Mission], seed: &mut u64) -> Option<usize> {
    if catalog.is_empty() {
        return None;
    }
    let total: f64 = catalog.iter().map(|m| m.rarity.weight()).sum();
    let mut remainder = next_unit(seed) * total;
    for (index, mission) in catalog.iter().enumerate() {
        remainder -= mission.rarity.weight();
        if remainder <= 0.0 {
            return Some(index);
        }
    }
    Some(catalog.len() - 1)
}

/// Uniform pick, used when the battle screen is entered without a
/// session handoff.
pub fn pick_uniform(catalog: &[Mission], seed: &mut u64) -> Option<usize> {
    if catalog.is_empty() {
        return None;
    }
    Some(roll_index(seed, catalog.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mission(name: &str, rarity: Rarity, enemy: Option<EnemySpec>) -> Mission {
        mission_from_def(MissionDef {
            name: name.to_string(),
            type_tag: None,
            rarity: Some(rarity.label().to_string()),
            reward: 10,
            enemy,
            sprite: String::new(),
        })
    }

    fn octomurk() -> EnemySpec {
        EnemySpec {
            name: "Octomurk".to_string(),
            hp: 100,
            attack: 15,
            sprite: "octomurk".to_string(),
        }
    }

    #[test]
    fn enemy_always_wins_classification() {
        let m = mission("Treasure Chest", Rarity::Common, Some(octomurk()));
        assert!(m.kind.is_combat());
    }

    #[test]
    fn keyword_classification_is_case_insensitive() {
        assert_eq!(
            mission("Sunken TREASURE", Rarity::Common, None).kind,
            MissionKind::Treasure
        );
        assert_eq!(
            mission("Kelp Potion", Rarity::Common, None).kind,
            MissionKind::Potion
        );
        assert_eq!(
            mission("Quiet Grotto", Rarity::Common, None).kind,
            MissionKind::Empty
        );
    }

    #[test]
    fn type_tag_participates_in_classification() {
        let m = mission_from_def(MissionDef {
            name: "Glimmer Cache".to_string(),
            type_tag: Some("Chest".to_string()),
            rarity: None,
            reward: 5,
            enemy: None,
            sprite: String::new(),
        });
        assert_eq!(m.kind, MissionKind::Treasure);
    }

    #[test]
    fn catalog_parse_round_trip() {
        let json = r#"{
            "missions": [
                {
                    "name": "Octomurk Ambush",
                    "rarity": "common",
                    "reward": 12,
                    "enemy": { "name": "Octomurk", "hp": 100, "attack": 15, "sprite": "octomurk" },
                    "sprite": "octomurk"
                },
                { "name": "Treasure", "rarity": "legendary", "reward": 50, "sprite": "treasure" }
            ]
        }"#;
        let catalog = parse_catalog(json).expect("catalog");
        assert_eq!(catalog.len(), 2);
        assert!(catalog[0].kind.is_combat());
        assert_eq!(catalog[1].kind, MissionKind::Treasure);
        assert_eq!(catalog[1].rarity, Rarity::Legendary);
    }

    #[test]
    fn question_parse_uses_short_prompt_key() {
        let json = r#"[
            { "q": "Largest ocean?", "options": ["Pacific", "Atlantic"], "answer": "Pacific" }
        ]"#;
        let bank = parse_questions(json).expect("questions");
        assert_eq!(bank[0].prompt, "Largest ocean?");
        assert_eq!(bank[0].options.len(), 2);
    }

    #[test]
    fn weighted_pick_matches_configured_weights() {
        let catalog = vec![
            mission("Reef Patrol", Rarity::Common, Some(octomurk())),
            mission("Kelp Run", Rarity::Uncommon, Some(octomurk())),
            mission("Deep Dive", Rarity::Rare, Some(octomurk())),
            mission("Abyss Call", Rarity::Legendary, Some(octomurk())),
        ];
        let mut seed = 0xDEADBEEF;
        let mut counts = [0u32; 4];
        let draws = 10_000;
        for _ in 0..draws {
            let index = pick_weighted(&catalog, &mut seed).expect("pick");
            counts[index] += 1;
        }
        let expected = [0.70, 0.15, 0.10, 0.05];
        for (count, want) in counts.iter().zip(expected) {
            let got = f64::from(*count) / f64::from(draws);
            assert!(
                (got - want).abs() < 0.02,
                "frequency {} out of tolerance for weight {}",
                got,
                want
            );
        }
    }

    #[test]
    fn picks_handle_empty_and_singleton_catalogs() {
        let mut seed = 1;
        assert_eq!(pick_weighted(&[], &mut seed), None);
        assert_eq!(pick_uniform(&[], &mut seed), None);
        let one = vec![mission("Treasure", Rarity::Common, None)];
        assert_eq!(pick_weighted(&one, &mut seed), Some(0));
        assert_eq!(pick_uniform(&one, &mut seed), Some(0));
    }
}
