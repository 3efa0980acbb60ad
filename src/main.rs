mod action;
mod effect;
mod missions;
mod persist;
mod reducer;
mod rules;
mod spawner;
mod state;
mod ui;
mod users;

use std::io;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::Terminal;
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventOutcome, RenderContext, TaskKey,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{DebugCliArgs, DebugRunOutput, DebugSession, DebugSessionError, ReplayItem};

use crate::action::Action;
use crate::effect::Effect;
use crate::reducer::reducer;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "reeftui")]
#[command(about = "Ocean trivia battles in the terminal")]
struct Args {
    #[command(flatten)]
    debug: DebugCliArgs,
    #[arg(long, default_value = "assets/data")]
    data_dir: String,
    #[arg(long)]
    save_dir: Option<String>,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    let debug = DebugSession::new(args.debug);
    debug.save_state_schema::<AppState>().map_err(debug_error)?;
    debug.save_actions_schema::<Action>().map_err(debug_error)?;

    let data_dir = args.data_dir.clone();
    let save_dir = save_dir_path(args.save_dir.as_deref());

    let mut state = debug
        .load_state_or_else_async(|| {
            let data_dir = data_dir.clone();
            let save_dir = save_dir.clone();
            async move { Ok::<AppState, io::Error>(AppState::new(data_dir, save_dir)) }
        })
        .await
        .map_err(debug_error)?;

    state.data_dir = data_dir;
    state.save_dir = save_dir;

    let replay_actions = debug.load_replay_items().map_err(debug_error)?;
    let (middleware, recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &debug, store, replay_actions).await;

    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug.save_actions(recorder.as_ref()).map_err(debug_error)?;
    Ok(())
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
) -> io::Result<DebugRunOutput<AppState>> {
    debug
        .run_effect_app(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::Init),
            Some(Action::Quit),
            |runtime| {
                if debug.render_once() {
                    return;
                }
                runtime
                    .subscriptions()
                    .interval("tick", Duration::from_millis(200), || Action::Tick);
            },
            |frame, area, state, render_ctx: RenderContext| {
                ui::render(frame, area, state, render_ctx);
            },
            |event, state| -> EventOutcome<Action> { ui::handle_event(event, state) },
            |action| matches!(action, Action::Quit),
            handle_effect,
        )
        .await
}

fn handle_effect(effect: Effect, ctx: &mut EffectContext<Action>) {
    match effect {
        Effect::LoadUsers { save_dir, data_dir } => {
            ctx.tasks().spawn(TaskKey::new("load_users"), async move {
                match persist::load_users(&save_dir, &data_dir).await {
                    Ok((table, seeded)) => Action::UsersLoaded { table, seeded },
                    Err(e) => Action::UsersLoadError(e),
                }
            });
        }
        Effect::LoadSession { save_dir } => {
            ctx.tasks().spawn(TaskKey::new("load_session"), async move {
                let session = persist::load_session(&save_dir).await;
                Action::SessionLoaded { session }
            });
        }
        Effect::LoadCatalog { data_dir } => {
            ctx.tasks().spawn(TaskKey::new("load_catalog"), async move {
                match missions::load_catalog(std::path::Path::new(&data_dir)).await {
                    Ok(missions) => Action::CatalogLoaded { missions },
                    Err(e) => Action::CatalogLoadError(e),
                }
            });
        }
        Effect::LoadQuestions { data_dir } => {
            ctx.tasks().spawn(TaskKey::new("load_questions"), async move {
                match missions::load_questions(std::path::Path::new(&data_dir)).await {
                    Ok(questions) => Action::QuestionsLoaded { questions },
                    Err(e) => Action::QuestionsLoadError(e),
                }
            });
        }
        Effect::SaveUsers { table, save_dir } => {
            ctx.tasks().spawn(TaskKey::new("save_users"), async move {
                match persist::save_users(&table, &save_dir).await {
                    Ok(()) => Action::SaveComplete,
                    Err(e) => Action::SaveError(e),
                }
            });
        }
        Effect::SaveSession { session, save_dir } => {
            ctx.tasks().spawn(TaskKey::new("save_session"), async move {
                match persist::save_session(&session, &save_dir).await {
                    Ok(()) => Action::SaveComplete,
                    Err(e) => Action::SaveError(e),
                }
            });
        }
    }
}

fn save_dir_path(save_dir: Option<&str>) -> String {
    save_dir
        .map(std::path::PathBuf::from)
        .or_else(|| dirs_next::data_local_dir().map(|dir| dir.join("reeftui")))
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .to_string_lossy()
        .to_string()
}
