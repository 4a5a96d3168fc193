use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Top-level Config. Every field has a default and unknown keys are ignored.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub ui: UiConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Root URL of the gURL server, e.g. `http://127.0.0.1:9000`.
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout in seconds. 0 = no timeout.
    pub timeout: u64,
    pub follow_redirects: bool,
    pub max_redirects: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub shortcuts_width: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            http: HttpConfig::default(),
            ui: UiConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9000".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            follow_redirects: true,
            max_redirects: 10,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { shortcuts_width: 36 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Overlay config: partial deserialization for field-level merging.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct OverlayConfig {
    server: OverlayServerConfig,
    http: OverlayHttpConfig,
    ui: OverlayUiConfig,
    log: OverlayLogConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct OverlayServerConfig {
    base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct OverlayHttpConfig {
    timeout: Option<u64>,
    follow_redirects: Option<bool>,
    max_redirects: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct OverlayUiConfig {
    shortcuts_width: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct OverlayLogConfig {
    level: Option<String>,
}

impl Config {
    /// Apply overlay values over self. Only `Some` fields are overridden.
    fn merge(mut self, overlay: OverlayConfig) -> Self {
        if let Some(v) = overlay.server.base_url {
            self.server.base_url = v;
        }
        if let Some(v) = overlay.http.timeout {
            self.http.timeout = v;
        }
        if let Some(v) = overlay.http.follow_redirects {
            self.http.follow_redirects = v;
        }
        if let Some(v) = overlay.http.max_redirects {
            self.http.max_redirects = v;
        }
        if let Some(v) = overlay.ui.shortcuts_width {
            self.ui.shortcuts_width = v;
        }
        if let Some(v) = overlay.log.level {
            self.log.level = v;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Path resolution
// ---------------------------------------------------------------------------

const CONFIG_DIR_NAME: &str = "gurl";
const LOCAL_CONFIG_DIR_NAME: &str = ".gurl";
const CONFIG_FILE_NAME: &str = "config.toml";

fn global_config_path() -> Option<PathBuf> {
    if let Ok(dir) = env::var("XDG_CONFIG_HOME") {
        if !dir.trim().is_empty() {
            return Some(PathBuf::from(dir).join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME),
    )
}

fn local_config_path() -> Option<PathBuf> {
    let path = env::current_dir()
        .ok()?
        .join(LOCAL_CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME);
    if path.exists() {
        Some(path)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ConfigError {
    pub messages: Vec<String>,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for msg in &self.messages {
            writeln!(f, "{}", msg)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        match reqwest::Url::parse(&self.server.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "config error: server.base_url = \"{}\" must use http or https, not {}",
                self.server.base_url,
                url.scheme()
            )),
            Err(_) => errors.push(format!(
                "config error: server.base_url = \"{}\" is not a valid URL",
                self.server.base_url
            )),
        }

        if self.http.timeout > 600 {
            errors.push(format!(
                "config error: http.timeout = {} is out of range (0..=600)",
                self.http.timeout
            ));
        }
        if self.http.max_redirects > 100 {
            errors.push(format!(
                "config error: http.max_redirects = {} is out of range (0..=100)",
                self.http.max_redirects
            ));
        }
        if !(24..=60).contains(&self.ui.shortcuts_width) {
            errors.push(format!(
                "config error: ui.shortcuts_width = {} is out of range (24..=60)",
                self.ui.shortcuts_width
            ));
        }
        if !LOG_LEVELS.contains(&self.log.level.to_ascii_lowercase().as_str()) {
            errors.push(format!(
                "config error: log.level = \"{}\" must be one of {}",
                self.log.level,
                LOG_LEVELS.join(", ")
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError { messages: errors })
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn load_overlay(path: &Path) -> Result<OverlayConfig, String> {
    let content = fs::read_to_string(path).map_err(|e| {
        format!(
            "config error: could not read \"{}\": {}",
            path.display(),
            e
        )
    })?;
    toml::from_str(&content).map_err(|e| {
        format!(
            "config error: failed to parse \"{}\": {}",
            path.display(),
            e
        )
    })
}

/// Load configuration from the global and working-directory config files.
/// Missing files are silently skipped (all defaults apply).
/// Parse or validation errors are returned as `Err`.
pub fn load_config() -> Result<Config, String> {
    let mut config = Config::default();

    if let Some(path) = global_config_path() {
        if path.exists() {
            let overlay = load_overlay(&path)?;
            config = config.merge(overlay);
        }
    }

    if let Some(path) = local_config_path() {
        let overlay = load_overlay(&path)?;
        config = config.merge(overlay);
    }

    config.server.base_url = config.server.base_url.trim_end_matches('/').to_string();
    config.validate().map_err(|e| e.to_string())?;

    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
