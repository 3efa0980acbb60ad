use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tui_dispatch_debug::debug::{ron_string, DebugSection, DebugState};

use crate::missions::{Mission, MissionKind, Question};
use crate::rules::{seed_from_time, INTRO_TICKS, QUESTION_TICKS};
use crate::spawner::ActiveToken;
use crate::users::UserTable;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Screen {
    SignIn,
    Home,
    Missions,
    Battle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum LogKind {
    System,
    Battle,
    Reward,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LogEntry {
    pub kind: LogKind,
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SignInState {
    pub input: String,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Combatant {
    pub name: String,
    pub hp: u16,
    pub max_hp: u16,
    pub attack: u16,
    #[serde(default)]
    pub sprite: String,
}

impl Combatant {
    /// Damage is clamped at zero; hp can never exceed max by construction.
    pub fn apply_damage(&mut self, power: u16) {
        self.hp = self.hp.saturating_sub(power);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BattleStage {
    /// Waiting on data; stays here (with an error surfaced) if the
    /// question bank is unavailable for a combat mission.
    Loading,
    Intro,
    AwaitingAnswer,
    /// Feedback pause while the question is still shown, then the attack
    /// lands, then a short breather before the next question.
    Resolving,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BattleOutcome {
    PlayerWon,
    PlayerLost,
    Collected,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActiveQuestion {
    pub question: Question,
    /// First resolution wins; anything after it is ignored.
    pub selected: Option<usize>,
    pub time_left: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BattleState {
    pub stage: BattleStage,
    pub mission_index: Option<usize>,
    pub mission_name: String,
    pub kind: MissionKind,
    pub reward: u64,
    pub player: Combatant,
    pub enemy: Option<Combatant>,
    pub question: Option<ActiveQuestion>,
    /// Whether the latest question resolved correct; drives Resolving.
    pub answer_correct: Option<bool>,
    pub stage_ticks: u32,
    pub outcome: Option<BattleOutcome>,
}

impl BattleState {
    pub fn new(
        mission_index: Option<usize>,
        mission: &Mission,
        player: Combatant,
    ) -> Self {
        let enemy = match &mission.kind {
            MissionKind::Combat { enemy } => Some(Combatant {
                name: enemy.name.clone(),
                hp: enemy.hp,
                max_hp: enemy.hp,
                attack: enemy.attack,
                sprite: enemy.sprite.clone(),
            }),
            _ => None,
        };
        Self {
            stage: BattleStage::Intro,
            mission_index,
            mission_name: mission.name.clone(),
            kind: mission.kind.clone(),
            reward: mission.reward,
            player,
            enemy,
            question: None,
            answer_correct: None,
            stage_ticks: INTRO_TICKS,
            outcome: None,
        }
    }

    pub fn present_question(&mut self, question: Question) {
        self.answer_correct = None;
        self.question = Some(ActiveQuestion {
            question,
            selected: None,
            time_left: QUESTION_TICKS,
        });
        self.stage = BattleStage::AwaitingAnswer;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AppState {
    pub terminal_size: (u16, u16),
    pub screen: Screen,
    pub users: UserTable,
    pub sign_in: SignInState,
    #[serde(default)]
    pub catalog: Vec<Mission>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub tokens: Vec<ActiveToken>,
    /// Session handoff: catalog index of the token that was picked.
    pub selected_mission: Option<usize>,
    /// Countdown to the next token spawn while on the mission screen.
    pub spawn_ticks: u32,
    pub battle: Option<BattleState>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
    /// Fatal-for-the-screen data failure (catalog or question bank).
    pub data_error: Option<String>,
    pub rng_seed: u64,
    pub tick: u64,
    pub data_dir: String,
    pub save_dir: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new("assets/data".to_string(), ".".to_string())
    }
}

impl AppState {
    pub fn new(data_dir: String, save_dir: String) -> Self {
        Self {
            terminal_size: (80, 24),
            screen: Screen::SignIn,
            users: UserTable::default(),
            sign_in: SignInState::default(),
            catalog: Vec::new(),
            questions: Vec::new(),
            tokens: Vec::new(),
            selected_mission: None,
            spawn_ticks: 0,
            battle: None,
            log: Vec::new(),
            data_error: None,
            rng_seed: seed_from_time(),
            tick: 0,
            data_dir,
            save_dir,
        }
    }

    pub fn push_log(&mut self, kind: LogKind, text: impl Into<String>) {
        self.log.push(LogEntry {
            kind,
            text: text.into(),
        });
    }
}

impl DebugState for AppState {
    fn debug_sections(&self) -> Vec<DebugSection> {
        let mut sections = vec![
            DebugSection::new("Screen")
                .entry("screen", ron_string(&self.screen))
                .entry("data_error", ron_string(&self.data_error)),
            DebugSection::new("Users")
                .entry("count", self.users.users.len().to_string())
                .entry("current", ron_string(&self.users.current)),
            DebugSection::new("Missions")
                .entry("catalog", self.catalog.len().to_string())
                .entry("tokens", self.tokens.len().to_string())
                .entry("selected", ron_string(&self.selected_mission))
                .entry("spawn_ticks", self.spawn_ticks.to_string()),
        ];
        if let Some(battle) = &self.battle {
            sections.push(
                DebugSection::new("Battle")
                    .entry("stage", ron_string(&battle.stage))
                    .entry("mission", battle.mission_name.clone())
                    .entry("player_hp", format!("{}/{}", battle.player.hp, battle.player.max_hp))
                    .entry(
                        "enemy_hp",
                        battle
                            .enemy
                            .as_ref()
                            .map(|e| format!("{}/{}", e.hp, e.max_hp))
                            .unwrap_or_else(|| "-".to_string()),
                    )
                    .entry("outcome", ron_string(&battle.outcome)),
            );
        }
        sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::missions::{EnemySpec, Rarity};

    fn combat_mission() -> Mission {
        Mission {
            name: "Octomurk Ambush".to_string(),
            rarity: Rarity::Common,
            reward: 12,
            kind: MissionKind::Combat {
                enemy: EnemySpec {
                    name: "Octomurk".to_string(),
                    hp: 100,
                    attack: 15,
                    sprite: String::new(),
                },
            },
            sprite: String::new(),
        }
    }

    fn player() -> Combatant {
        Combatant {
            name: "Shellfin".to_string(),
            hp: 100,
            max_hp: 100,
            attack: 10,
            sprite: String::new(),
        }
    }

    #[test]
    fn damage_saturates_at_zero() {
        let mut c = player();
        c.apply_damage(30);
        assert_eq!(c.hp, 70);
        c.apply_damage(500);
        assert_eq!(c.hp, 0);
        c.apply_damage(10);
        assert_eq!(c.hp, 0);
    }

    #[test]
    fn new_battle_builds_enemy_from_combat_kind() {
        let battle = BattleState::new(Some(0), &combat_mission(), player());
        assert_eq!(battle.stage, BattleStage::Intro);
        assert_eq!(battle.stage_ticks, INTRO_TICKS);
        let enemy = battle.enemy.expect("enemy");
        assert_eq!(enemy.hp, 100);
        assert_eq!(enemy.max_hp, 100);
        assert_eq!(enemy.attack, 15);
    }

    #[test]
    fn presenting_a_question_resets_selection_and_timer() {
        let mut battle = BattleState::new(Some(0), &combat_mission(), player());
        battle.answer_correct = Some(false);
        battle.present_question(Question {
            prompt: "Largest ocean?".to_string(),
            options: vec!["Pacific".to_string(), "Atlantic".to_string()],
            answer: "Pacific".to_string(),
        });
        assert_eq!(battle.stage, BattleStage::AwaitingAnswer);
        assert_eq!(battle.answer_correct, None);
        let active = battle.question.expect("question");
        assert_eq!(active.selected, None);
        assert_eq!(active.time_left, QUESTION_TICKS);
    }
}
