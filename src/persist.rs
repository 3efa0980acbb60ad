use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::spawner::ActiveToken;
use crate::users::UserTable;

/// Session-scoped persistence: the visible tokens, the selected-mission
/// handoff, and the remaining spawn countdown. Restored verbatim on the
/// next run so the mission screen picks up where it left off.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SessionData {
    #[serde(default)]
    pub tokens: Vec<ActiveToken>,
    #[serde(default)]
    pub selected_mission: Option<usize>,
    #[serde(default)]
    pub spawn_ticks: Option<u32>,
}

fn users_path(save_dir: &str) -> PathBuf {
    Path::new(save_dir).join("users.json")
}

fn session_path(save_dir: &str) -> PathBuf {
    Path::new(save_dir).join("session.json")
}

/// Loads the user table. On the first-ever run (no users file) the
/// bundled seed is imported once and written out; after that only the
/// local file is ever read, so local users are never clobbered by the
/// seed. A corrupt local file still counts as "stored": it degrades to
/// an empty table without re-seeding.
pub async fn load_users(save_dir: &str, data_dir: &str) -> Result<(UserTable, bool), String> {
    let path = users_path(save_dir);
    match tokio::fs::read_to_string(&path).await {
        Ok(json) => match serde_json::from_str(&json) {
            Ok(table) => Ok((table, false)),
            Err(_) => Ok((UserTable::default(), false)),
        },
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let table = load_seed(data_dir).await;
            save_users(&table, save_dir).await?;
            Ok((table, true))
        }
        Err(e) => Err(format!("Failed to read {}: {}", path.display(), e)),
    }
}

/// Bundled starter profiles. Missing or malformed seed just means an
/// empty table.
async fn load_seed(data_dir: &str) -> UserTable {
    let path = Path::new(data_dir).join("users.json");
    let Ok(json) = tokio::fs::read_to_string(&path).await else {
        return UserTable::default();
    };
    match serde_json::from_str::<UserTable>(&json) {
        Ok(mut table) => {
            // The seed never decides who is signed in.
            table.current = None;
            table
        }
        Err(_) => UserTable::default(),
    }
}

pub async fn save_users(table: &UserTable, save_dir: &str) -> Result<(), String> {
    let path = users_path(save_dir);
    write_json(&path, table).await
}

/// Missing or corrupt session data is treated as an empty session rather
/// than an error; there is nothing worth surfacing to the player.
pub async fn load_session(save_dir: &str) -> SessionData {
    let path = session_path(save_dir);
    match tokio::fs::read_to_string(&path).await {
        Ok(json) => serde_json::from_str(&json).unwrap_or_default(),
        Err(_) => SessionData::default(),
    }
}

pub async fn save_session(session: &SessionData, save_dir: &str) -> Result<(), String> {
    let path = session_path(save_dir);
    write_json(&path, session).await
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("Failed to create save directory: {}", e))?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize {}: {}", path.display(), e))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> String {
        let dir = std::env::temp_dir().join(format!("reeftui-test-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        dir.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn first_run_seeds_then_diverges() {
        let save_dir = temp_dir("seed");
        let _ = std::fs::remove_file(Path::new(&save_dir).join("users.json"));
        let data_dir = temp_dir("seed-data");
        std::fs::write(
            Path::new(&data_dir).join("users.json"),
            r#"{ "users": { "finn": { "username": "Finn" } }, "current": "finn" }"#,
        )
        .expect("seed file");

        let (mut table, seeded) = load_users(&save_dir, &data_dir).await.expect("load");
        assert!(seeded);
        assert!(table.get("Finn").is_some());
        assert!(table.current.is_none(), "seed must not decide the session");

        // Local change, then a second load: seed must not reappear over it.
        table.create("Marina");
        save_users(&table, &save_dir).await.expect("save");
        let (reloaded, seeded_again) = load_users(&save_dir, &data_dir).await.expect("reload");
        assert!(!seeded_again);
        assert!(reloaded.get("marina").is_some());
    }

    #[tokio::test]
    async fn corrupt_users_file_degrades_to_empty_without_reseeding() {
        let save_dir = temp_dir("corrupt");
        std::fs::write(Path::new(&save_dir).join("users.json"), "{ not json").expect("write");
        let data_dir = temp_dir("corrupt-data");
        std::fs::write(
            Path::new(&data_dir).join("users.json"),
            r#"{ "users": { "finn": { "username": "Finn" } } }"#,
        )
        .expect("seed file");

        let (table, seeded) = load_users(&save_dir, &data_dir).await.expect("load");
        assert!(!seeded);
        assert!(table.users.is_empty());
    }

    #[tokio::test]
    async fn session_round_trip_and_corrupt_tolerance() {
        let save_dir = temp_dir("session");
        let session = SessionData {
            tokens: vec![crate::spawner::ActiveToken {
                id: 7,
                catalog_index: 1,
                x: 4,
                y: 2,
            }],
            selected_mission: Some(1),
            spawn_ticks: Some(25),
        };
        save_session(&session, &save_dir).await.expect("save");
        assert_eq!(load_session(&save_dir).await, session);

        std::fs::write(Path::new(&save_dir).join("session.json"), "garbage").expect("write");
        assert_eq!(load_session(&save_dir).await, SessionData::default());
    }
}
