use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{block::Title, Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};
use tui_dispatch::{EventKind, EventOutcome, RenderContext};

use crate::action::Action;
use crate::missions::Rarity;
use crate::rules::ticks_to_secs;
use crate::spawner::{FIELD_HEIGHT, FIELD_WIDTH, TOKEN_WIDTH};
use crate::state::{AppState, BattleOutcome, BattleStage, BattleState, LogKind, Screen};

const BG_BASE: Color = Color::Rgb(12, 28, 44);
const BG_PANEL: Color = Color::Rgb(18, 42, 62);
const BG_PANEL_ALT: Color = Color::Rgb(14, 34, 52);
const BG_HEADER: Color = Color::Rgb(16, 38, 58);
const TEXT_MAIN: Color = Color::Rgb(214, 232, 240);
const TEXT_DIM: Color = Color::Rgb(140, 168, 184);
const ACCENT_TEAL: Color = Color::Rgb(88, 196, 188);
const ACCENT_GOLD: Color = Color::Rgb(228, 202, 118);
const ACCENT_CORAL: Color = Color::Rgb(232, 112, 100);
const HIGHLIGHT_BG: Color = ACCENT_TEAL;
const HIGHLIGHT_TEXT: Color = Color::Rgb(10, 24, 22);
const BORDER_ACCENT: Color = Color::Rgb(52, 88, 108);

fn rarity_color(rarity: Rarity) -> Color {
    match rarity {
        Rarity::Common => TEXT_MAIN,
        Rarity::Uncommon => ACCENT_TEAL,
        Rarity::Rare => Color::Rgb(140, 160, 236),
        Rarity::Legendary => ACCENT_GOLD,
    }
}

pub fn render(frame: &mut Frame, area: Rect, state: &AppState, _ctx: RenderContext) {
    frame.render_widget(Block::default().style(Style::default().bg(BG_BASE)), area);
    match state.screen {
        Screen::SignIn => render_sign_in(frame, area, state),
        Screen::Home => render_home(frame, area, state),
        Screen::Missions => render_missions(frame, area, state),
        Screen::Battle => render_battle(frame, area, state),
    }
}

pub fn handle_event(event: &EventKind, state: &AppState) -> EventOutcome<Action> {
    match event {
        EventKind::Resize(width, height) => {
            EventOutcome::action(Action::UiTerminalResize(*width, *height)).with_render()
        }
        EventKind::Key(key) => handle_key(*key, state),
        _ => EventOutcome::ignored(),
    }
}

fn handle_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    match state.screen {
        Screen::SignIn => handle_sign_in_key(key, state),
        Screen::Home => handle_home_key(key),
        Screen::Missions => handle_missions_key(key, state),
        Screen::Battle => handle_battle_key(key, state),
    }
}

fn handle_sign_in_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('n') | KeyCode::Char('N') => EventOutcome::action(Action::SignInCreate),
            KeyCode::Char('c') => EventOutcome::action(Action::Quit),
            _ => EventOutcome::ignored(),
        };
    }
    match key.code {
        KeyCode::Enter => EventOutcome::action(Action::SignInSubmit),
        KeyCode::Esc => EventOutcome::action(Action::Quit),
        KeyCode::Backspace => {
            let mut input = state.sign_in.input.clone();
            input.pop();
            EventOutcome::action(Action::SignInInputChanged(input))
        }
        KeyCode::Char(c) if !c.is_control() && state.sign_in.input.len() < 24 => {
            let mut input = state.sign_in.input.clone();
            input.push(c);
            EventOutcome::action(Action::SignInInputChanged(input))
        }
        _ => EventOutcome::ignored(),
    }
}

fn handle_home_key(key: KeyEvent) -> EventOutcome<Action> {
    let action = match key.code {
        KeyCode::Char('m') | KeyCode::Char('M') => Some(Action::GoMissions),
        KeyCode::Char('o') | KeyCode::Char('O') => Some(Action::SignOut),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    };
    EventOutcome::from(action)
}

fn handle_missions_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    let action = match key.code {
        KeyCode::Char(c @ '1'..='9') => {
            let index = (c as usize) - ('1' as usize);
            if index < state.tokens.len() {
                Some(Action::TokenSelect(index))
            } else {
                None
            }
        }
        KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Esc => Some(Action::GoHome),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(Action::Quit),
        _ => None,
    };
    EventOutcome::from(action)
}

fn handle_battle_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    let Some(battle) = state.battle.as_ref() else {
        return match key.code {
            KeyCode::Enter | KeyCode::Esc => EventOutcome::action(Action::BattleContinue),
            _ => EventOutcome::ignored(),
        };
    };
    match battle.stage {
        BattleStage::AwaitingAnswer => {
            let action = match key.code {
                KeyCode::Char(c @ '1'..='4') => {
                    Some(Action::AnswerSelect((c as usize) - ('1' as usize)))
                }
                _ => None,
            };
            EventOutcome::from(action)
        }
        BattleStage::Ended | BattleStage::Loading => match key.code {
            KeyCode::Enter | KeyCode::Char('z') | KeyCode::Char('Z') | KeyCode::Esc => {
                EventOutcome::action(Action::BattleContinue)
            }
            _ => EventOutcome::ignored(),
        },
        _ => EventOutcome::ignored(),
    }
}

fn render_sign_in(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block(" REEF RANGERS ", BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let content_height = 12;
    let content_width = 44;
    let x = inner.x + (inner.width.saturating_sub(content_width)) / 2;
    let y = inner.y + (inner.height.saturating_sub(content_height)) / 2;
    let content_area = Rect::new(
        x,
        y,
        content_width.min(inner.width),
        content_height.min(inner.height),
    );

    let mut lines = vec![
        Line::from(Span::styled(
            "REEF RANGERS",
            Style::default()
                .fg(ACCENT_TEAL)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Answer ocean trivia. Defend the reef.",
            Style::default().fg(TEXT_DIM),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Ranger name: ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                format!("{}_", state.sign_in.input),
                Style::default().fg(TEXT_MAIN).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
    ];
    if let Some(error) = state.sign_in.error.as_deref() {
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(ACCENT_CORAL),
        )));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        "Enter: Sign in  |  Ctrl+N: New ranger  |  Esc: Quit",
        Style::default().fg(TEXT_DIM),
    )));

    let paragraph = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, content_area);
}

fn render_home(frame: &mut Frame, area: Rect, state: &AppState) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(8),
            Constraint::Min(5),
        ])
        .split(area);

    render_header(frame, layout[0], state, " RANGER STATION ");
    render_profile_panel(frame, layout[1], state);
    render_log_panel(frame, layout[2], state);
}

fn render_header(frame: &mut Frame, area: Rect, state: &AppState, title: &str) {
    let block = panel_block(title, BG_HEADER);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(profile) = state.users.current() else {
        return;
    };
    let line = Line::from(vec![
        Span::styled(
            profile.username.to_ascii_uppercase(),
            Style::default()
                .fg(ACCENT_TEAL)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Seashells {}", profile.seashells),
            Style::default().fg(ACCENT_GOLD),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Streak {}", profile.sign_in_streak),
            Style::default().fg(TEXT_DIM),
        ),
    ]);
    let paragraph = Paragraph::new(Text::from(vec![line])).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn render_profile_panel(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block("CREATURE", BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(profile) = state.users.current() else {
        return;
    };
    let lead = profile.lead_creature();
    let lines = vec![
        Line::from(Span::styled(
            lead.name.clone(),
            Style::default()
                .fg(ACCENT_TEAL)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("Lv {}", lead.level),
            Style::default().fg(TEXT_DIM),
        )),
        hp_line(lead.current_hp, lead.max_hp),
        Line::from(Span::styled(
            format!("ATK {}", lead.attack),
            Style::default().fg(TEXT_DIM),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "M: Missions  |  O: Sign out  |  Q: Quit",
            Style::default().fg(TEXT_DIM),
        )),
    ];
    let paragraph = Paragraph::new(Text::from(lines))
        .style(Style::default().fg(TEXT_MAIN))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn render_log_panel(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block("LOG", BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let visible = inner.height as usize;
    let start = state.log.len().saturating_sub(visible);
    let lines: Vec<Line> = state.log[start..]
        .iter()
        .map(|entry| {
            let color = match entry.kind {
                LogKind::System => TEXT_DIM,
                LogKind::Battle => TEXT_MAIN,
                LogKind::Reward => ACCENT_GOLD,
            };
            Line::from(Span::styled(
                entry.text.clone(),
                Style::default().fg(color),
            ))
        })
        .collect();
    let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn render_missions(frame: &mut Frame, area: Rect, state: &AppState) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
        ])
        .split(area);

    render_header(frame, layout[0], state, " REEF PATROL ");
    render_field(frame, layout[1], state);
    render_missions_status(frame, layout[2], state);
}

fn render_field(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block("THE REEF", BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width < 20 || inner.height < 6 {
        let warning = Paragraph::new("Resize for the reef view.")
            .style(Style::default().fg(TEXT_DIM))
            .alignment(Alignment::Center);
        frame.render_widget(warning, inner);
        return;
    }

    if let Some(error) = state.data_error.as_deref() {
        let paragraph = Paragraph::new(error)
            .style(Style::default().fg(ACCENT_CORAL))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
        return;
    }

    // Token coordinates live on the fixed spawn field; scale them into
    // whatever space the terminal gives us.
    for (index, token) in state.tokens.iter().enumerate() {
        let Some(mission) = state.catalog.get(token.catalog_index) else {
            continue;
        };
        let x = inner.x
            + ((u32::from(token.x) * u32::from(inner.width.saturating_sub(TOKEN_WIDTH)))
                / u32::from(FIELD_WIDTH)) as u16;
        let y = inner.y
            + ((u32::from(token.y) * u32::from(inner.height.saturating_sub(2)))
                / u32::from(FIELD_HEIGHT)) as u16;
        let label = format!("[{}] {}", index + 1, mission.name);
        let tag = format!("    {}", mission.rarity.label());
        let token_area = Rect::new(
            x,
            y,
            (label.len().max(tag.len()) as u16 + 1).min(inner.width),
            2.min(inner.height),
        );
        let lines = vec![
            Line::from(Span::styled(
                label,
                Style::default()
                    .fg(rarity_color(mission.rarity))
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(tag, Style::default().fg(TEXT_DIM))),
        ];
        frame.render_widget(Paragraph::new(Text::from(lines)), token_area);
    }

    if state.tokens.is_empty() {
        let paragraph = Paragraph::new("The water is calm. Something will surface soon.")
            .style(Style::default().fg(TEXT_DIM))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, inner);
    }
}

fn render_missions_status(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block("STATUS", BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        Line::from(Span::styled(
            format!("Next mission surfaces in {}s", ticks_to_secs(state.spawn_ticks)),
            Style::default().fg(TEXT_MAIN),
        )),
        Line::from(Span::styled(
            "1-3: Take mission  |  H: Home  |  Q: Quit",
            Style::default().fg(TEXT_DIM),
        )),
    ];
    let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn render_battle(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(battle) = state.battle.as_ref() else {
        let message = state
            .data_error
            .as_deref()
            .unwrap_or("Mission data unavailable.");
        let paragraph = Paragraph::new(format!("{}\n\nEnter: Back to patrol", message))
            .style(Style::default().fg(ACCENT_CORAL))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),
            Constraint::Length(10),
        ])
        .split(area);

    let combatants = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(layout[0]);

    render_enemy_panel(frame, combatants[0], battle);
    render_player_panel(frame, combatants[1], battle);
    render_battle_text(frame, layout[1], battle);
}

fn render_enemy_panel(frame: &mut Frame, area: Rect, battle: &BattleState) {
    let title = match &battle.enemy {
        Some(enemy) => format!(" {} ", enemy.name.to_ascii_uppercase()),
        None => format!(" {} ", battle.mission_name.to_ascii_uppercase()),
    };
    let block = panel_block(title.as_str(), BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = match &battle.enemy {
        Some(enemy) => vec![
            hp_line(enemy.hp, enemy.max_hp),
            Line::from(Span::styled(
                format!("ATK {}", enemy.attack),
                Style::default().fg(TEXT_DIM),
            )),
        ],
        None => vec![Line::from(Span::styled(
            "No enemy here.",
            Style::default().fg(TEXT_DIM),
        ))],
    };
    let paragraph = Paragraph::new(Text::from(lines)).style(Style::default().fg(TEXT_MAIN));
    frame.render_widget(paragraph, inner);
}

fn render_player_panel(frame: &mut Frame, area: Rect, battle: &BattleState) {
    let title = format!(" {} ", battle.player.name.to_ascii_uppercase());
    let block = panel_block(title.as_str(), BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        hp_line(battle.player.hp, battle.player.max_hp),
        Line::from(Span::styled(
            format!("ATK {}", battle.player.attack),
            Style::default().fg(TEXT_DIM),
        )),
    ];
    let paragraph = Paragraph::new(Text::from(lines)).style(Style::default().fg(TEXT_MAIN));
    frame.render_widget(paragraph, inner);
}

fn render_battle_text(frame: &mut Frame, area: Rect, battle: &BattleState) {
    let block = panel_block("MISSION", BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();

    match battle.stage {
        BattleStage::Loading => {
            lines.push(Line::from(Span::styled(
                "Question bank unavailable.",
                Style::default().fg(ACCENT_CORAL),
            )));
            lines.push(continue_hint());
        }
        BattleStage::Intro => {
            lines.push(Line::from(Span::styled(
                format!("{} blocks your path!", battle.mission_name),
                Style::default().fg(TEXT_MAIN).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                "Get ready...",
                Style::default().fg(TEXT_DIM),
            )));
        }
        BattleStage::AwaitingAnswer => {
            if let Some(active) = battle.question.as_ref() {
                lines.push(Line::from(vec![
                    Span::styled(
                        active.question.prompt.clone(),
                        Style::default().fg(TEXT_MAIN).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("   {}s", ticks_to_secs(active.time_left)),
                        Style::default().fg(ACCENT_GOLD),
                    ),
                ]));
                lines.push(Line::from(""));
                for (idx, option) in active.question.options.iter().enumerate() {
                    lines.push(option_line(idx, option, active.selected == Some(idx)));
                }
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "1-4: Answer",
                    Style::default().fg(TEXT_DIM),
                )));
            }
        }
        BattleStage::Resolving => match battle.question.as_ref() {
            Some(active) => {
                lines.push(Line::from(active.question.prompt.clone()));
                lines.push(Line::from(""));
                let (text, color) = match battle.answer_correct {
                    Some(true) => ("Correct! Your creature strikes.", ACCENT_TEAL),
                    _ => match active.selected {
                        Some(_) => ("Wrong! The enemy strikes back.", ACCENT_CORAL),
                        None => ("Time's up! The enemy strikes back.", ACCENT_CORAL),
                    },
                };
                lines.push(Line::from(Span::styled(
                    text,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )));
            }
            None => {
                lines.push(Line::from(Span::styled(
                    "The battle rages on...",
                    Style::default().fg(TEXT_DIM),
                )));
            }
        },
        BattleStage::Ended => {
            let (banner, color) = match battle.outcome {
                Some(BattleOutcome::PlayerWon) => ("VICTORY!", ACCENT_TEAL),
                Some(BattleOutcome::PlayerLost) => ("DEFEAT", ACCENT_CORAL),
                Some(BattleOutcome::Collected) => ("COLLECTED", ACCENT_GOLD),
                None => ("OVER", TEXT_DIM),
            };
            lines.push(Line::from(Span::styled(
                banner,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
            match battle.outcome {
                Some(BattleOutcome::PlayerWon) | Some(BattleOutcome::Collected) => {
                    lines.push(Line::from(Span::styled(
                        format!("Reward: {} seashells", battle.reward),
                        Style::default().fg(ACCENT_GOLD),
                    )));
                }
                Some(BattleOutcome::PlayerLost) => {
                    lines.push(Line::from(Span::styled(
                        "Your seashells scatter. Your creature recovers.",
                        Style::default().fg(TEXT_DIM),
                    )));
                }
                None => {}
            }
            lines.push(Line::from(""));
            lines.push(continue_hint());
        }
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .style(Style::default().fg(TEXT_MAIN))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn continue_hint() -> Line<'static> {
    Line::from(Span::styled(
        "Enter: Continue",
        Style::default().fg(TEXT_DIM),
    ))
}

fn option_line(index: usize, label: &str, selected: bool) -> Line<'static> {
    let text = format!(" {}. {} ", index + 1, label);
    let style = if selected {
        Style::default()
            .fg(HIGHLIGHT_TEXT)
            .bg(HIGHLIGHT_BG)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(TEXT_MAIN)
    };
    Line::from(Span::styled(text, style))
}

fn hp_line(current: u16, max: u16) -> Line<'static> {
    let width: usize = 14;
    let ratio = if max == 0 {
        0.0
    } else {
        current as f32 / max as f32
    };
    let filled = ((ratio * width as f32).round() as usize).min(width);
    let empty = width.saturating_sub(filled);
    let color = if ratio > 0.5 {
        ACCENT_TEAL
    } else if ratio > 0.2 {
        ACCENT_GOLD
    } else {
        ACCENT_CORAL
    };
    Line::from(vec![
        Span::raw("HP "),
        Span::styled(
            "█".repeat(filled),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled("░".repeat(empty), Style::default().fg(TEXT_DIM)),
        Span::raw(format!(" {}/{}", current, max)),
    ])
}

fn panel_block<'a, T>(title: T, bg: Color) -> Block<'a>
where
    T: Into<Title<'a>>,
{
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .style(Style::default().bg(bg).fg(TEXT_MAIN))
        .border_style(Style::default().fg(BORDER_ACCENT))
}
