use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Fixed filename for the signed-in company.
const SESSION_FILE: &str = "session.json";

/// What `login` persists and staff commands read back to scope their
/// queries. Not part of the workflow core; just the local handoff
/// between commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub company_name: String,
    pub email: String,
    pub password: String,
}

fn session_path() -> PathBuf {
    // XDG data directory, or the current directory as a fallback.
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "sift") {
        proj_dirs.data_dir().join(SESSION_FILE)
    } else {
        PathBuf::from(SESSION_FILE)
    }
}

pub fn save(session: &Session) -> Result<()> {
    save_to(&session_path(), session)
}

/// A missing or corrupt session file reads as signed-out.
pub fn load() -> Option<Session> {
    load_from(&session_path())
}

/// Removing an absent session is not an error.
pub fn clear() -> Result<()> {
    clear_at(&session_path())
}

fn save_to(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let body = serde_json::to_string(session)?;
    fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))
}

fn load_from(path: &Path) -> Option<Session> {
    let body = fs::read_to_string(path).ok()?;
    serde_json::from_str(&body).ok()
}

fn clear_at(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}
