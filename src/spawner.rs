use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::missions::{pick_weighted, Mission};
use crate::rules::next_u32;

/// Virtual field the tokens live on. Fixed so a restored session places
/// tokens exactly where they were regardless of terminal size; the UI
/// scales when drawing.
pub const FIELD_WIDTH: u16 = 72;
pub const FIELD_HEIGHT: u16 = 18;

/// Footprint a token occupies on the field, used for overlap checks.
pub const TOKEN_WIDTH: u16 = 14;
pub const TOKEN_HEIGHT: u16 = 3;

pub const MAX_ACTIVE: usize = 3;
const PLACEMENT_ATTEMPTS: u32 = 8;

/// One pickable on-screen mission instance. Ephemeral, but persisted in
/// the session file so a reload restores the same set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActiveToken {
    pub id: u64,
    pub catalog_index: usize,
    pub x: u16,
    pub y: u16,
}

fn overlaps(tokens: &[ActiveToken], x: u16, y: u16) -> bool {
    tokens
        .iter()
        .any(|t| t.x.abs_diff(x) < TOKEN_WIDTH && t.y.abs_diff(y) < TOKEN_HEIGHT)
}

/// Bounded rejection sampling: up to PLACEMENT_ATTEMPTS tries to avoid
/// overlapping a live token, then the last candidate is accepted so
/// spawning never stalls.
fn place(tokens: &[ActiveToken], seed: &mut u64) -> (u16, u16) {
    let max_x = FIELD_WIDTH - TOKEN_WIDTH;
    let max_y = FIELD_HEIGHT - TOKEN_HEIGHT;
    let mut candidate = (0, 0);
    for _ in 0..PLACEMENT_ATTEMPTS {
        candidate = (
            (next_u32(seed) % u32::from(max_x + 1)) as u16,
            (next_u32(seed) % u32::from(max_y + 1)) as u16,
        );
        if !overlaps(tokens, candidate.0, candidate.1) {
            return candidate;
        }
    }
    candidate
}

/// Spawns one token: weighted mission pick, non-overlapping placement,
/// oldest evicted when the cap would be exceeded. `now` salts the id so
/// tokens created on the same tick stay distinct.
pub fn spawn(
    tokens: &mut Vec<ActiveToken>,
    catalog: &[Mission],
    seed: &mut u64,
    now: u64,
) -> Option<u64> {
    let catalog_index = pick_weighted(catalog, seed)?;
    if tokens.len() >= MAX_ACTIVE {
        tokens.remove(0);
    }
    let (x, y) = place(tokens, seed);
    let id = (now << 20) ^ u64::from(next_u32(seed));
    tokens.push(ActiveToken {
        id,
        catalog_index,
        x,
        y,
    });
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missions::{parse_catalog, MissionKind};

    fn catalog() -> Vec<Mission> {
        parse_catalog(
            r#"{
            "missions": [
                { "name": "Octomurk Ambush", "reward": 12,
                  "enemy": { "name": "Octomurk", "hp": 100, "attack": 15 } },
                { "name": "Treasure", "rarity": "rare", "reward": 50 }
            ]
        }"#,
        )
        .expect("catalog")
    }

    #[test]
    fn spawn_respects_cap_and_evicts_oldest() {
        let catalog = catalog();
        let mut tokens = Vec::new();
        let mut seed = 7;
        for tick in 0..5 {
            spawn(&mut tokens, &catalog, &mut seed, tick).expect("spawn");
        }
        assert_eq!(tokens.len(), MAX_ACTIVE);
        // Ids are unique even after eviction churn.
        let mut ids: Vec<u64> = tokens.iter().map(|t| t.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), MAX_ACTIVE);
    }

    #[test]
    fn spawn_on_empty_catalog_is_none() {
        let mut tokens = Vec::new();
        let mut seed = 7;
        assert_eq!(spawn(&mut tokens, &[], &mut seed, 0), None);
        assert!(tokens.is_empty());
    }

    #[test]
    fn placement_stays_inside_field() {
        let catalog = catalog();
        let mut tokens = Vec::new();
        let mut seed = 99;
        for tick in 0..50 {
            spawn(&mut tokens, &catalog, &mut seed, tick);
        }
        for token in &tokens {
            assert!(token.x <= FIELD_WIDTH - TOKEN_WIDTH);
            assert!(token.y <= FIELD_HEIGHT - TOKEN_HEIGHT);
        }
    }

    #[test]
    fn placement_avoids_overlap_when_space_remains() {
        let catalog = catalog();
        let mut seed = 3;
        // Single fixed token in a corner; the next spawn has plenty of
        // room and should not land on top of it.
        for attempt in 0..20 {
            let mut tokens = vec![ActiveToken {
                id: 1,
                catalog_index: 0,
                x: 0,
                y: 0,
            }];
            spawn(&mut tokens, &catalog, &mut seed, attempt).expect("spawn");
            let fresh = &tokens[1];
            assert!(
                fresh.x >= TOKEN_WIDTH || fresh.y >= TOKEN_HEIGHT,
                "token overlapped an existing one"
            );
        }
    }

    #[test]
    fn spawned_kind_comes_from_catalog() {
        let catalog = catalog();
        let mut tokens = Vec::new();
        let mut seed = 11;
        spawn(&mut tokens, &catalog, &mut seed, 0).expect("spawn");
        let kind = &catalog[tokens[0].catalog_index].kind;
        assert!(matches!(
            kind,
            MissionKind::Combat { .. } | MissionKind::Treasure
        ));
    }
}
