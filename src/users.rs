use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SECS_PER_DAY: u64 = 86_400;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Creature {
    pub name: String,
    pub level: u8,
    pub max_hp: u16,
    pub attack: u16,
    pub current_hp: u16,
    pub sprite: String,
}

impl Creature {
    /// Stand-in battler for profiles that have not caught anything yet.
    /// Never persisted until the profile is first written with it.
    pub fn shellfin() -> Self {
        Self {
            name: "Shellfin".to_string(),
            level: 1,
            max_hp: 100,
            attack: 10,
            current_hp: 100,
            sprite: "shellfin".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MissionRecord {
    pub index: usize,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub creatures: Vec<Creature>,
    #[serde(default)]
    pub seashells: u64,
    #[serde(default)]
    pub sign_in_streak: u32,
    #[serde(default)]
    pub missions_completed: Vec<MissionRecord>,
    #[serde(default)]
    pub last_sign_in: u64,
}

impl UserProfile {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            creatures: Vec::new(),
            seashells: 0,
            sign_in_streak: 0,
            missions_completed: Vec::new(),
            last_sign_in: 0,
        }
    }

    /// The active battler: first creature, or a synthesized Shellfin.
    pub fn lead_creature(&self) -> Creature {
        self.creatures.first().cloned().unwrap_or_else(Creature::shellfin)
    }

    /// Writes the lead creature's current hp, materializing the default
    /// creature if the profile had none.
    pub fn set_lead_hp(&mut self, hp: u16) {
        if self.creatures.is_empty() {
            self.creatures.push(Creature::shellfin());
        }
        let lead = &mut self.creatures[0];
        lead.current_hp = hp.min(lead.max_hp);
    }

    pub fn heal_lead_full(&mut self) {
        if self.creatures.is_empty() {
            self.creatures.push(Creature::shellfin());
        }
        let lead = &mut self.creatures[0];
        lead.current_hp = lead.max_hp;
    }

    pub fn mark_mission_completed(&mut self, index: usize) {
        if let Some(record) = self
            .missions_completed
            .iter_mut()
            .find(|r| r.index == index)
        {
            record.completed = true;
        } else {
            self.missions_completed.push(MissionRecord {
                index,
                completed: true,
            });
        }
    }

    pub fn mission_completed(&self, index: usize) -> bool {
        self.missions_completed
            .iter()
            .any(|r| r.index == index && r.completed)
    }

    pub fn apply_patch(&mut self, patch: ProfilePatch) {
        if let Some(creatures) = patch.creatures {
            self.creatures = creatures;
        }
        if let Some(seashells) = patch.seashells {
            self.seashells = seashells;
        }
        if let Some(streak) = patch.sign_in_streak {
            self.sign_in_streak = streak;
        }
        if let Some(completed) = patch.missions_completed {
            self.missions_completed = completed;
        }
        if let Some(last) = patch.last_sign_in {
            self.last_sign_in = last;
        }
    }
}

/// Shallow patch: fields present overwrite, fields absent stay untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProfilePatch {
    pub creatures: Option<Vec<Creature>>,
    pub seashells: Option<u64>,
    pub sign_in_streak: Option<u32>,
    pub missions_completed: Option<Vec<MissionRecord>>,
    pub last_sign_in: Option<u64>,
}

/// The whole persisted user table, including the signed-in pointer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UserTable {
    #[serde(default)]
    pub users: BTreeMap<String, UserProfile>,
    #[serde(default)]
    pub current: Option<String>,
}

fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

impl UserTable {
    pub fn get(&self, username: &str) -> Option<&UserProfile> {
        self.users.get(&normalize(username))
    }

    /// False when a normalized-equal username already exists.
    pub fn create(&mut self, username: &str) -> bool {
        let key = normalize(username);
        if key.is_empty() || self.users.contains_key(&key) {
            return false;
        }
        self.users.insert(key, UserProfile::new(username.trim()));
        true
    }

    /// Signs in an existing user and rolls the daily streak forward:
    /// consecutive day increments, same day is a no-op, any gap resets to 1.
    pub fn login(&mut self, username: &str, now_secs: u64) -> bool {
        let key = normalize(username);
        let Some(profile) = self.users.get_mut(&key) else {
            return false;
        };
        let today = now_secs / SECS_PER_DAY;
        let last_day = profile.last_sign_in / SECS_PER_DAY;
        if profile.last_sign_in == 0 || today > last_day + 1 {
            profile.sign_in_streak = 1;
        } else if today == last_day + 1 {
            profile.sign_in_streak += 1;
        }
        profile.last_sign_in = now_secs;
        self.set_current(&key);
        true
    }

    /// Points the signed-in marker at a user without touching streaks.
    pub fn set_current(&mut self, username: &str) {
        self.current = Some(normalize(username));
    }

    pub fn sign_out(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&UserProfile> {
        self.current.as_deref().and_then(|key| self.users.get(key))
    }

    pub fn current_mut(&mut self) -> Option<&mut UserProfile> {
        match self.current.as_deref() {
            Some(key) => self.users.get_mut(key),
            None => None,
        }
    }

    /// Shallow-merges the patch into the signed-in profile. No-op when
    /// nobody is signed in.
    pub fn update(&mut self, patch: ProfilePatch) {
        if let Some(profile) = self.current_mut() {
            profile.apply_patch(patch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn create_then_get_is_case_insensitive() {
        let mut table = UserTable::default();
        assert!(table.create("Finn"));
        assert!(table.get("finn").is_some());
        assert!(table.get("FINN").is_some());
        assert_eq!(table.get("finn").unwrap().username, "Finn");
    }

    #[test]
    fn duplicate_create_fails_across_case_variants() {
        let mut table = UserTable::default();
        assert!(table.create("Finn"));
        assert!(!table.create("Finn"));
        assert!(!table.create("fInN"));
        assert_eq!(table.users.len(), 1);
    }

    #[test]
    fn create_rejects_blank_names() {
        let mut table = UserTable::default();
        assert!(!table.create("   "));
    }

    #[test]
    fn update_merges_patch_and_leaves_other_fields() {
        let mut table = UserTable::default();
        table.create("Finn");
        table.login("finn", 10 * SECS_PER_DAY);
        let before = table.current().unwrap().clone();

        table.update(ProfilePatch {
            seashells: Some(42),
            ..ProfilePatch::default()
        });

        let after = table.get("Finn").unwrap();
        assert_eq!(after.seashells, 42);
        assert_eq!(after.creatures, before.creatures);
        assert_eq!(after.sign_in_streak, before.sign_in_streak);
        assert_eq!(after.missions_completed, before.missions_completed);
        assert_eq!(after.last_sign_in, before.last_sign_in);
    }

    #[test]
    fn update_without_current_user_is_noop() {
        let mut table = UserTable::default();
        table.create("Finn");
        table.update(ProfilePatch {
            seashells: Some(99),
            ..ProfilePatch::default()
        });
        assert_eq!(table.get("Finn").unwrap().seashells, 0);
    }

    #[test]
    fn login_unknown_user_fails() {
        let mut table = UserTable::default();
        assert!(!table.login("ghost", 0));
        assert!(table.current().is_none());
    }

    #[test]
    fn streak_counts_consecutive_days() {
        let mut table = UserTable::default();
        table.create("Finn");

        assert!(table.login("finn", 100 * SECS_PER_DAY + 5));
        assert_eq!(table.current().unwrap().sign_in_streak, 1);

        // Same day again: unchanged.
        assert!(table.login("finn", 100 * SECS_PER_DAY + 900));
        assert_eq!(table.current().unwrap().sign_in_streak, 1);

        // Next day: increments.
        assert!(table.login("finn", 101 * SECS_PER_DAY + 5));
        assert_eq!(table.current().unwrap().sign_in_streak, 2);

        // Two-day gap: resets.
        assert!(table.login("finn", 103 * SECS_PER_DAY + 5));
        assert_eq!(table.current().unwrap().sign_in_streak, 1);
    }

    #[test]
    fn set_current_normalizes_and_skips_streak_bookkeeping() {
        let mut table = UserTable::default();
        table.create("Finn");
        table.set_current("  FINN ");
        let profile = table.current().expect("current");
        assert_eq!(profile.username, "Finn");
        assert_eq!(profile.sign_in_streak, 0);
    }

    #[test]
    fn sign_out_clears_only_the_pointer() {
        let mut table = UserTable::default();
        table.create("Finn");
        table.login("finn", 0);
        table.sign_out();
        assert!(table.current().is_none());
        assert!(table.get("finn").is_some());
    }

    #[test]
    fn lead_creature_synthesizes_default_without_persisting() {
        let profile = UserProfile::new("Finn");
        let lead = profile.lead_creature();
        assert_eq!(lead.name, "Shellfin");
        assert!(profile.creatures.is_empty());
    }

    #[test]
    fn set_lead_hp_clamps_and_materializes() {
        let mut profile = UserProfile::new("Finn");
        profile.set_lead_hp(40);
        assert_eq!(profile.creatures[0].current_hp, 40);
        profile.set_lead_hp(9999);
        assert_eq!(profile.creatures[0].current_hp, profile.creatures[0].max_hp);
    }

    #[test]
    fn mark_mission_completed_inserts_or_flips() {
        let mut profile = UserProfile::new("Finn");
        profile.missions_completed.push(MissionRecord {
            index: 2,
            completed: false,
        });
        profile.mark_mission_completed(2);
        profile.mark_mission_completed(5);
        assert!(profile.mission_completed(2));
        assert!(profile.mission_completed(5));
        assert!(!profile.mission_completed(0));
        assert_eq!(profile.missions_completed.len(), 2);
    }
}
