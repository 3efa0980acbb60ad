use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::missions::{Mission, Question};
use crate::persist::SessionData;
use crate::users::UserTable;

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[action(infer_categories)]
pub enum Action {
    Init,
    UiTerminalResize(u16, u16),
    Tick,

    SignInInputChanged(String),
    SignInSubmit,
    SignInCreate,
    SignOut,

    GoHome,
    GoMissions,
    TokenSelect(usize),

    AnswerSelect(usize),
    BattleContinue,

    UsersLoaded { table: UserTable, seeded: bool },
    UsersLoadError(String),
    SessionLoaded { session: SessionData },
    CatalogLoaded { missions: Vec<Mission> },
    CatalogLoadError(String),
    QuestionsLoaded { questions: Vec<Question> },
    QuestionsLoadError(String),
    SaveComplete,
    SaveError(String),

    Quit,
}
