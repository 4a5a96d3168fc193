use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::storage::paths::{ensure_state_dir, local_store_path};

const STORE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    entries: BTreeMap<String, String>,
}

/// String key-value store persisted to a single JSON file.
///
/// Reads and writes only touch memory; `flush` persists the whole map.
#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl LocalStore {
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the store in the user state directory.
    pub fn open_default() -> Result<Self, String> {
        let _ = ensure_state_dir()?;
        let path = local_store_path().ok_or("Could not resolve local store path")?;
        Self::open_or_recover(path)
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, String> {
        let path = path.into();
        let entries = if path.exists() {
            parse_entries(&read_contents(&path)?)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// Like `open`, but an unparseable file is moved to `<name>.bak` and the
    /// store starts empty. Read errors still fail.
    pub fn open_or_recover(path: impl Into<PathBuf>) -> Result<Self, String> {
        let path = path.into();
        if !path.exists() {
            return Self::open(path);
        }
        let entries = match parse_entries(&read_contents(&path)?) {
            Ok(entries) => entries,
            Err(e) => {
                let backup = sibling(&path, ".bak");
                error!(error = %e, path = ?path, backup = ?backup, "local store unreadable, starting empty");
                fs::rename(&path, &backup)
                    .map_err(|e| format!("Failed to move aside local store: {}", e))?;
                BTreeMap::new()
            }
        };
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn flush(&self) -> Result<(), String> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create local store directory: {}", e))?;
        }
        let file = StoreFile {
            version: STORE_VERSION,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| format!("Failed to serialize local store: {}", e))?;
        // Replaced by rename; the store file is never partially written.
        let tmp = sibling(path, ".tmp");
        fs::write(&tmp, json).map_err(|e| format!("Failed to write local store: {}", e))?;
        fs::rename(&tmp, path).map_err(|e| format!("Failed to replace local store: {}", e))
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn read_contents(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read local store: {}", e))
}

fn parse_entries(contents: &str) -> Result<BTreeMap<String, String>, String> {
    let file: StoreFile =
        serde_json::from_str(contents).map_err(|e| format!("Failed to parse local store: {}", e))?;
    if file.version != STORE_VERSION {
        return Err(format!("Unsupported local store version: {}", file.version));
    }
    Ok(file.entries)
}
