use crate::persist::SessionData;
use crate::users::UserTable;

#[derive(Clone, Debug)]
pub enum Effect {
    LoadUsers { save_dir: String, data_dir: String },
    LoadSession { save_dir: String },
    LoadCatalog { data_dir: String },
    LoadQuestions { data_dir: String },
    SaveUsers { table: UserTable, save_dir: String },
    SaveSession { session: SessionData, save_dir: String },
}
