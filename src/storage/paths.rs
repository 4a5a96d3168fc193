use std::env;
use std::fs;
use std::path::PathBuf;

const STATE_DIR_NAME: &str = "gurl";
const LOCAL_STORE_FILE_NAME: &str = "local_storage.json";
const LOG_FILE_NAME: &str = "gurl.log";

fn state_root() -> Option<PathBuf> {
    if let Ok(dir) = env::var("XDG_STATE_HOME") {
        if !dir.trim().is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".local").join("state"))
}

pub fn state_dir() -> Option<PathBuf> {
    state_root().map(|dir| dir.join(STATE_DIR_NAME))
}

pub fn ensure_state_dir() -> Result<PathBuf, String> {
    let dir = state_dir().ok_or("Could not resolve state directory (set XDG_STATE_HOME or HOME)")?;
    fs::create_dir_all(&dir).map_err(|e| format!("Failed to create state directory: {}", e))?;
    Ok(dir)
}

pub fn local_store_path() -> Option<PathBuf> {
    state_dir().map(|dir| dir.join(LOCAL_STORE_FILE_NAME))
}

pub fn log_file_path() -> Option<PathBuf> {
    state_dir().map(|dir| dir.join(LOG_FILE_NAME))
}
