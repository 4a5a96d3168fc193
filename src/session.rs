use crate::profile::Profile;
use crate::storage::LocalStore;
use crate::token::{decode_token, MalformedTokenError};

pub const AUTH_KEY: &str = "auth";
pub const SHORTCUTS_KEY: &str = "shortcuts";

const ANON_EMAIL: &str = "anon";
const NO_TOKEN: &str = "null";

/// Client session: the single token slot plus the shortcuts panel preference.
///
/// Loaded from and saved to a [`LocalStore`]; handlers only ever see this
/// value, never the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    shortcuts: Option<bool>,
    shortcuts_changed: bool,
}

impl Session {
    pub fn load(store: &LocalStore) -> Self {
        let token = store
            .get(AUTH_KEY)
            .filter(|token| !token.trim().is_empty())
            .map(str::to_string);
        let shortcuts = store.get(SHORTCUTS_KEY).map(|value| value != "false");
        Self {
            token,
            shortcuts,
            shortcuts_changed: false,
        }
    }

    /// Mirrors the session into the store and flushes it.
    ///
    /// The shortcuts key is only written once the preference has been toggled.
    pub fn save(&self, store: &mut LocalStore) -> Result<(), String> {
        match &self.token {
            Some(token) => store.set(AUTH_KEY, token.as_str()),
            None => {
                store.remove(AUTH_KEY);
            }
        }
        if self.shortcuts_changed {
            if let Some(visible) = self.shortcuts {
                store.set(SHORTCUTS_KEY, if visible { "true" } else { "false" });
            }
        }
        store.flush()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Presence of a token is what counts as logged in; it is not validated.
    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn store_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn profile(&self) -> Result<Option<Profile>, MalformedTokenError> {
        self.token.as_deref().map(decode_token).transpose()
    }

    /// Token as a URL path segment; `null` when anonymous.
    pub fn token_segment(&self) -> &str {
        self.token.as_deref().unwrap_or(NO_TOKEN)
    }

    /// Email as a URL path segment; `anon` when anonymous.
    pub fn email_segment(&self) -> Result<String, MalformedTokenError> {
        Ok(self
            .profile()?
            .map(|profile| profile.email)
            .unwrap_or_else(|| ANON_EMAIL.to_string()))
    }

    pub fn shortcuts_visible(&self) -> bool {
        self.shortcuts.unwrap_or(true)
    }

    pub fn toggle_shortcuts(&mut self) {
        self.shortcuts = Some(!self.shortcuts_visible());
        self.shortcuts_changed = true;
    }
}
