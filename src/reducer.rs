use tui_dispatch::DispatchResult;

use crate::action::Action;
use crate::effect::Effect;
use crate::missions::{pick_uniform, MissionKind};
use crate::persist::SessionData;
use crate::rules::{
    now_secs, roll_index, FEEDBACK_TICKS, FIRST_SPAWN_TICKS, PACING_TICKS, SPAWN_INTERVAL_TICKS,
};
use crate::spawner;
use crate::state::{
    AppState, BattleOutcome, BattleStage, BattleState, Combatant, LogKind, Screen,
};

pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        Action::Init => DispatchResult::changed_with_many(vec![
            Effect::LoadUsers {
                save_dir: state.save_dir.clone(),
                data_dir: state.data_dir.clone(),
            },
            Effect::LoadSession {
                save_dir: state.save_dir.clone(),
            },
            Effect::LoadCatalog {
                data_dir: state.data_dir.clone(),
            },
            Effect::LoadQuestions {
                data_dir: state.data_dir.clone(),
            },
        ]),
        Action::UiTerminalResize(width, height) => {
            if state.terminal_size != (width, height) {
                state.terminal_size = (width, height);
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }
        Action::Tick => {
            state.tick = state.tick.wrapping_add(1);
            match state.screen {
                Screen::Missions => mission_tick(state),
                Screen::Battle => battle_tick(state),
                _ => DispatchResult::unchanged(),
            }
        }

        Action::SignInInputChanged(input) => {
            state.sign_in.input = input;
            state.sign_in.error = None;
            DispatchResult::changed()
        }
        Action::SignInSubmit => sign_in_submit(state),
        Action::SignInCreate => sign_in_create(state),
        Action::SignOut => {
            state.users.sign_out();
            state.sign_in = Default::default();
            state.screen = Screen::SignIn;
            DispatchResult::changed_with(save_users_effect(state))
        }

        Action::GoHome => {
            if state.users.current().is_none() {
                state.screen = Screen::SignIn;
            } else {
                state.screen = Screen::Home;
            }
            DispatchResult::changed()
        }
        Action::GoMissions => go_missions(state),
        Action::TokenSelect(index) => token_select(state, index),

        Action::AnswerSelect(index) => answer_select(state, index),
        Action::BattleContinue => battle_continue(state),

        Action::UsersLoaded { table, seeded } => {
            // Rangers created at the sign-in screen while the load task
            // was still in flight win over the stored table.
            let local = std::mem::take(&mut state.users);
            let had_local = !local.users.is_empty() || local.current.is_some();
            state.users = table;
            for (key, profile) in local.users {
                state.users.users.insert(key, profile);
            }
            if local.current.is_some() {
                state.users.current = local.current;
            }
            if seeded {
                state.push_log(LogKind::System, "Seeded starter ranger profiles.");
            }
            if had_local {
                return DispatchResult::changed_with(save_users_effect(state));
            }
            if let Some(profile) = state.users.current() {
                let name = profile.username.clone();
                if state.screen == Screen::SignIn {
                    state.screen = Screen::Home;
                }
                state.push_log(LogKind::System, format!("Welcome back, {}.", name));
            }
            DispatchResult::changed()
        }
        Action::UsersLoadError(error) => {
            state.push_log(LogKind::System, format!("User data unavailable: {}", error));
            DispatchResult::changed()
        }
        Action::SessionLoaded { session } => {
            state.tokens = session.tokens;
            state.selected_mission = session.selected_mission;
            if let Some(ticks) = session.spawn_ticks {
                state.spawn_ticks = ticks;
            }
            DispatchResult::changed()
        }
        Action::CatalogLoaded { missions } => {
            state.catalog = missions;
            // A restored session can reference indices the catalog no
            // longer has.
            let len = state.catalog.len();
            state.tokens.retain(|t| t.catalog_index < len);
            if state.selected_mission.is_some_and(|i| i >= len) {
                state.selected_mission = None;
            }
            DispatchResult::changed()
        }
        Action::CatalogLoadError(error) => {
            state.data_error = Some(error.clone());
            state.push_log(LogKind::System, format!("Mission catalog failed: {}", error));
            DispatchResult::changed()
        }
        Action::QuestionsLoaded { questions } => {
            state.questions = questions;
            DispatchResult::changed()
        }
        Action::QuestionsLoadError(error) => {
            state.data_error = Some(error.clone());
            state.push_log(LogKind::System, format!("Question bank failed: {}", error));
            DispatchResult::changed()
        }
        Action::SaveComplete => DispatchResult::unchanged(),
        Action::SaveError(error) => {
            state.push_log(LogKind::System, format!("Save failed: {}", error));
            DispatchResult::changed()
        }

        Action::Quit => DispatchResult::unchanged(),
    }
}

fn sign_in_submit(state: &mut AppState) -> DispatchResult<Effect> {
    let name = state.sign_in.input.trim().to_string();
    if name.is_empty() {
        state.sign_in.error = Some("Enter a ranger name.".to_string());
        return DispatchResult::changed();
    }
    if state.users.login(&name, now_secs()) {
        state.sign_in.error = None;
        state.screen = Screen::Home;
        let streak = state.users.current().map(|p| p.sign_in_streak).unwrap_or(0);
        state.push_log(
            LogKind::System,
            format!("Signed in as {} (streak {}).", name, streak),
        );
        DispatchResult::changed_with(save_users_effect(state))
    } else {
        state.sign_in.error = Some(format!("No ranger named \"{}\".", name));
        DispatchResult::changed()
    }
}

fn sign_in_create(state: &mut AppState) -> DispatchResult<Effect> {
    let name = state.sign_in.input.trim().to_string();
    if !state.users.create(&name) {
        state.sign_in.error = Some(if name.is_empty() {
            "Enter a ranger name.".to_string()
        } else {
            format!("\"{}\" is already taken.", name)
        });
        return DispatchResult::changed();
    }
    state.users.login(&name, now_secs());
    state.sign_in.error = None;
    state.screen = Screen::Home;
    state.push_log(LogKind::System, format!("Created ranger {}.", name));
    DispatchResult::changed_with(save_users_effect(state))
}

fn go_missions(state: &mut AppState) -> DispatchResult<Effect> {
    if state.users.current().is_none() {
        state.screen = Screen::SignIn;
        return DispatchResult::changed();
    }
    state.screen = Screen::Missions;
    if state.spawn_ticks == 0 {
        state.spawn_ticks = FIRST_SPAWN_TICKS;
    }
    DispatchResult::changed()
}

fn mission_tick(state: &mut AppState) -> DispatchResult<Effect> {
    if state.catalog.is_empty() || state.users.current().is_none() {
        return DispatchResult::unchanged();
    }
    state.spawn_ticks = state.spawn_ticks.saturating_sub(1);
    if state.spawn_ticks > 0 {
        return DispatchResult::changed();
    }
    state.spawn_ticks = SPAWN_INTERVAL_TICKS;
    let spawned = spawner::spawn(
        &mut state.tokens,
        &state.catalog,
        &mut state.rng_seed,
        state.tick,
    );
    match spawned {
        Some(_) => DispatchResult::changed_with(save_session_effect(state)),
        None => DispatchResult::changed(),
    }
}

fn token_select(state: &mut AppState, index: usize) -> DispatchResult<Effect> {
    if state.screen != Screen::Missions {
        return DispatchResult::unchanged();
    }
    if state.users.current().is_none() {
        state.screen = Screen::SignIn;
        return DispatchResult::changed();
    }
    if index >= state.tokens.len() {
        return DispatchResult::unchanged();
    }
    let token = state.tokens.remove(index);
    state.selected_mission = Some(token.catalog_index);
    start_battle(state)
}

/// Builds the battle session from the signed-in profile plus the selected
/// mission (or a fresh uniform pick when no handoff exists). Non-combat
/// missions skip the quiz entirely and end immediately with the player
/// as winner.
fn start_battle(state: &mut AppState) -> DispatchResult<Effect> {
    let Some(profile) = state.users.current() else {
        state.screen = Screen::SignIn;
        return DispatchResult::changed();
    };
    let lead = profile.lead_creature();
    let player = Combatant {
        name: lead.name.clone(),
        // Hand-edited profiles can carry hp past the maximum.
        hp: lead.current_hp.min(lead.max_hp),
        max_hp: lead.max_hp,
        attack: lead.attack,
        sprite: lead.sprite.clone(),
    };

    state.screen = Screen::Battle;
    // A stale handoff index (catalog shrank between runs) falls back to
    // a fresh pick instead of reaching past the catalog.
    let mission_index = state
        .selected_mission
        .filter(|&index| index < state.catalog.len())
        .or_else(|| pick_uniform(&state.catalog, &mut state.rng_seed));
    let Some(index) = mission_index else {
        // Catalog never loaded; the battle screen shows the error state.
        state.selected_mission = None;
        state.battle = None;
        return DispatchResult::changed();
    };
    let mission = state.catalog[index].clone();
    let battle = BattleState::new(Some(index), &mission, player);

    if !mission.kind.is_combat() {
        state.battle = Some(battle);
        return end_battle(state, BattleOutcome::Collected);
    }
    if state.questions.is_empty() {
        let mut battle = battle;
        battle.stage = BattleStage::Loading;
        state.battle = Some(battle);
        state.push_log(
            LogKind::System,
            "No questions loaded; the battle cannot start.",
        );
        return DispatchResult::changed_with(save_session_effect(state));
    }
    state.battle = Some(battle);
    state.push_log(LogKind::Battle, format!("{} approaches!", mission.name));
    DispatchResult::changed_with(save_session_effect(state))
}

fn answer_select(state: &mut AppState, index: usize) -> DispatchResult<Effect> {
    let valid = state
        .battle
        .as_ref()
        .filter(|b| b.stage == BattleStage::AwaitingAnswer)
        .and_then(|b| b.question.as_ref())
        .is_some_and(|q| index < q.question.options.len());
    if !valid {
        // Late or repeated selections land here once the stage moved on.
        return DispatchResult::unchanged();
    }
    resolve_answer(state, Some(index))
}

/// The single resolution point for a question: either a selected option
/// or `None` for countdown expiry (treated as wrong). The stage guard
/// makes a second resolution a no-op.
fn resolve_answer(state: &mut AppState, selected: Option<usize>) -> DispatchResult<Effect> {
    let Some(battle) = state.battle.as_mut() else {
        return DispatchResult::unchanged();
    };
    if battle.stage != BattleStage::AwaitingAnswer {
        return DispatchResult::unchanged();
    }
    let Some(active) = battle.question.as_mut() else {
        return DispatchResult::unchanged();
    };
    let correct = selected
        .and_then(|i| active.question.options.get(i))
        .is_some_and(|option| *option == active.question.answer);
    active.selected = selected;
    battle.answer_correct = Some(correct);
    battle.stage = BattleStage::Resolving;
    battle.stage_ticks = FEEDBACK_TICKS;
    DispatchResult::changed()
}

fn battle_tick(state: &mut AppState) -> DispatchResult<Effect> {
    let Some(battle) = state.battle.as_mut() else {
        return DispatchResult::unchanged();
    };
    match battle.stage {
        BattleStage::Loading | BattleStage::Ended => DispatchResult::unchanged(),
        BattleStage::Intro => {
            battle.stage_ticks = battle.stage_ticks.saturating_sub(1);
            let done = battle.stage_ticks == 0;
            if done {
                present_next_question(state);
            }
            DispatchResult::changed()
        }
        BattleStage::AwaitingAnswer => {
            let expired = match battle.question.as_mut() {
                Some(active) => {
                    active.time_left = active.time_left.saturating_sub(1);
                    active.time_left == 0
                }
                None => false,
            };
            if expired {
                resolve_answer(state, None)
            } else {
                DispatchResult::changed()
            }
        }
        BattleStage::Resolving => {
            battle.stage_ticks = battle.stage_ticks.saturating_sub(1);
            if battle.stage_ticks > 0 {
                return DispatchResult::changed();
            }
            if battle.question.is_some() {
                // Feedback over, the attack lands now.
                apply_attack(state)
            } else {
                // Pacing over, next question.
                present_next_question(state);
                DispatchResult::changed()
            }
        }
    }
}

/// Lands the sub-turn decided by the last answer: correct means the
/// player strikes the enemy, wrong or timeout means the enemy strikes
/// the player (and the player's hp is persisted immediately).
fn apply_attack(state: &mut AppState) -> DispatchResult<Effect> {
    let Some(battle) = state.battle.as_mut() else {
        return DispatchResult::unchanged();
    };
    battle.question = None;
    let correct = battle.answer_correct == Some(true);
    let player_attack = battle.player.attack;
    let enemy_attack = battle.enemy.as_ref().map(|e| e.attack).unwrap_or(0);

    if correct {
        if let Some(enemy) = battle.enemy.as_mut() {
            enemy.apply_damage(player_attack);
        }
        if battle.enemy.as_ref().is_some_and(|e| e.hp == 0) {
            return end_battle(state, BattleOutcome::PlayerWon);
        }
        battle.stage_ticks = PACING_TICKS;
        DispatchResult::changed()
    } else {
        battle.player.apply_damage(enemy_attack);
        let player_hp = battle.player.hp;
        if player_hp == 0 {
            return end_battle(state, BattleOutcome::PlayerLost);
        }
        battle.stage_ticks = PACING_TICKS;
        // Persist damage taken right away so an interrupted battle does
        // not lose it.
        if let Some(profile) = state.users.current_mut() {
            profile.set_lead_hp(player_hp);
        }
        DispatchResult::changed_with(save_users_effect(state))
    }
}

fn present_next_question(state: &mut AppState) {
    if state.questions.is_empty() {
        return;
    }
    let index = roll_index(&mut state.rng_seed, state.questions.len());
    let question = state.questions[index].clone();
    if let Some(battle) = state.battle.as_mut() {
        battle.present_question(question);
    }
}

/// Terminal transition, entered at most once per battle session. Applies
/// the outcome to the signed-in profile and clears the session handoff.
fn end_battle(state: &mut AppState, outcome: BattleOutcome) -> DispatchResult<Effect> {
    let (already_ended, reward, mission_index, kind, player_hp, mission_name) =
        match state.battle.as_ref() {
            Some(b) => (
                b.stage == BattleStage::Ended,
                b.reward,
                b.mission_index,
                b.kind.clone(),
                b.player.hp,
                b.mission_name.clone(),
            ),
            None => return DispatchResult::unchanged(),
        };
    if already_ended {
        return DispatchResult::unchanged();
    }
    if let Some(battle) = state.battle.as_mut() {
        battle.stage = BattleStage::Ended;
        battle.outcome = Some(outcome);
        battle.question = None;
        battle.answer_correct = None;
    }

    match outcome {
        BattleOutcome::PlayerWon => {
            if let Some(profile) = state.users.current_mut() {
                profile.seashells += reward;
                if let Some(index) = mission_index {
                    profile.mark_mission_completed(index);
                }
                profile.set_lead_hp(player_hp);
            }
            state.push_log(
                LogKind::Reward,
                format!("Victory! Claimed {} seashells from {}.", reward, mission_name),
            );
        }
        BattleOutcome::PlayerLost => {
            if let Some(profile) = state.users.current_mut() {
                profile.heal_lead_full();
                profile.seashells = 0;
            }
            state.push_log(
                LogKind::Battle,
                format!("Defeated by {}. Seashells lost, creature revived.", mission_name),
            );
        }
        BattleOutcome::Collected => match kind {
            MissionKind::Potion => {
                if let Some(profile) = state.users.current_mut() {
                    profile.heal_lead_full();
                }
                state.push_log(LogKind::Reward, "The potion restores your creature fully.");
            }
            _ => {
                if let Some(profile) = state.users.current_mut() {
                    profile.seashells += reward;
                    if let Some(index) = mission_index {
                        profile.mark_mission_completed(index);
                    }
                }
                state.push_log(
                    LogKind::Reward,
                    format!("Collected {} seashells from {}.", reward, mission_name),
                );
            }
        },
    }

    state.selected_mission = None;
    DispatchResult::changed_with_many(vec![save_users_effect(state), save_session_effect(state)])
}

fn battle_continue(state: &mut AppState) -> DispatchResult<Effect> {
    if state.screen != Screen::Battle {
        return DispatchResult::unchanged();
    }
    let leave = match state.battle.as_ref() {
        None => true,
        Some(b) => matches!(b.stage, BattleStage::Ended | BattleStage::Loading),
    };
    if !leave {
        return DispatchResult::unchanged();
    }
    state.battle = None;
    state.screen = Screen::Missions;
    if state.spawn_ticks == 0 {
        state.spawn_ticks = FIRST_SPAWN_TICKS;
    }
    DispatchResult::changed()
}

fn save_users_effect(state: &AppState) -> Effect {
    Effect::SaveUsers {
        table: state.users.clone(),
        save_dir: state.save_dir.clone(),
    }
}

fn save_session_effect(state: &AppState) -> Effect {
    Effect::SaveSession {
        session: SessionData {
            tokens: state.tokens.clone(),
            selected_mission: state.selected_mission,
            spawn_ticks: Some(state.spawn_ticks),
        },
        save_dir: state.save_dir.clone(),
    }
}
