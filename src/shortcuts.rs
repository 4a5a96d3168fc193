use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageContext {
    #[default]
    Home,
    Login,
    Signup,
    Profile,
}

impl PageContext {
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/" => Some(PageContext::Home),
            "/login" => Some(PageContext::Login),
            "/signup" => Some(PageContext::Signup),
            "/profile" => Some(PageContext::Profile),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            PageContext::Home => "/",
            PageContext::Login => "/login",
            PageContext::Signup => "/signup",
            PageContext::Profile => "/profile",
        }
    }

    /// Segment used by the navbar fragment endpoint.
    pub fn navbar_name(&self) -> &'static str {
        match self {
            PageContext::Home => "home",
            PageContext::Login => "login",
            PageContext::Signup => "signup",
            PageContext::Profile => "profile",
        }
    }

    /// Actions bound on this page, in resolution order.
    pub fn actions(&self) -> &'static [Action] {
        match self {
            PageContext::Home => HOME_ACTIONS,
            PageContext::Login => LOGIN_ACTIONS,
            PageContext::Signup => SIGNUP_ACTIONS,
            PageContext::Profile => PROFILE_ACTIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SelectRequest,
    Empty,
    History,
    ToggleFavorite,
    ViewFavorites,
    HideRequest,
    CloseModal,
    Home,
    Login,
    Signup,
    Profile,
    Delete,
    Logout,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::SelectRequest => "selectRequest",
            Action::Empty => "empty",
            Action::History => "history",
            Action::ToggleFavorite => "toggleFavorite",
            Action::ViewFavorites => "viewFavorites",
            Action::HideRequest => "hideRequest",
            Action::CloseModal => "closeModal",
            Action::Home => "home",
            Action::Login => "login",
            Action::Signup => "signup",
            Action::Profile => "profile",
            Action::Delete => "delete",
            Action::Logout => "logout",
        }
    }

    /// Physical key the action is bound to.
    pub fn key(&self) -> &'static str {
        match self {
            Action::SelectRequest => "Enter",
            Action::Empty => "KeyJ",
            Action::History => "KeyH",
            Action::ToggleFavorite => "KeyF",
            Action::ViewFavorites => "KeyV",
            Action::HideRequest => "KeyD",
            Action::CloseModal => "KeyQ",
            Action::Home => "KeyH",
            Action::Login => "KeyL",
            Action::Signup => "KeyS",
            Action::Profile => "KeyP",
            Action::Delete => "KeyD",
            Action::Logout => "KeyL",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::SelectRequest => "select request",
            Action::Empty => "empty form",
            Action::History => "history",
            Action::ToggleFavorite => "toggle favorite",
            Action::ViewFavorites => "view favorites",
            Action::HideRequest => "delete request",
            Action::CloseModal => "close modal",
            Action::Home => "home",
            Action::Login => "login",
            Action::Signup => "signup",
            Action::Profile => "profile",
            Action::Delete => "delete account",
            Action::Logout => "logout",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const HOME_ACTIONS: &[Action] = &[
    Action::SelectRequest,
    Action::Empty,
    Action::History,
    Action::ToggleFavorite,
    Action::ViewFavorites,
    Action::HideRequest,
    Action::CloseModal,
    Action::Login,
    Action::Signup,
    Action::Profile,
    Action::Logout,
];

const LOGIN_ACTIONS: &[Action] = &[Action::Home, Action::Signup];

const SIGNUP_ACTIONS: &[Action] = &[Action::Home, Action::Login];

const PROFILE_ACTIONS: &[Action] = &[Action::Delete, Action::Home, Action::Logout];

/// A key-down reduced to its physical key name and modifier flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub code: String,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
}

impl KeyPress {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ctrl: false,
            meta: false,
            alt: false,
        }
    }

    #[cfg(test)]
    pub fn with_ctrl_alt(mut self) -> Self {
        self.ctrl = true;
        self.alt = true;
        self
    }

    #[cfg(test)]
    pub fn with_meta_alt(mut self) -> Self {
        self.meta = true;
        self.alt = true;
        self
    }

    pub fn from_event(event: &KeyEvent) -> Option<Self> {
        let code = match event.code {
            KeyCode::Char(c) if c.is_ascii_alphabetic() => format!("Key{}", c.to_ascii_uppercase()),
            KeyCode::Char(c) if c.is_ascii_digit() => format!("Digit{}", c),
            KeyCode::Char(' ') => "Space".to_string(),
            KeyCode::Enter => "Enter".to_string(),
            KeyCode::Esc => "Escape".to_string(),
            KeyCode::Tab | KeyCode::BackTab => "Tab".to_string(),
            KeyCode::Backspace => "Backspace".to_string(),
            _ => return None,
        };
        let modifiers = event.modifiers;
        let mut press = Self::new(code);
        press.ctrl = modifiers.contains(KeyModifiers::CONTROL);
        press.meta = modifiers.intersects(KeyModifiers::SUPER | KeyModifiers::META);
        press.alt = modifiers.contains(KeyModifiers::ALT);
        Some(press)
    }

    fn is_chord(&self) -> bool {
        (self.meta || self.ctrl) && self.alt
    }
}

// On the home page the login/signup and profile/logout pairs are gated by
// whether a token is held; KeyL is shared by login and logout.
fn permitted(context: PageContext, action: Action, logged_in: bool) -> bool {
    match (context, action) {
        (PageContext::Home, Action::Login | Action::Signup) => !logged_in,
        (PageContext::Home, Action::Profile | Action::Logout) => logged_in,
        _ => true,
    }
}

/// Resolves a key-down to at most one action for the current page.
pub fn dispatch(context: PageContext, key: &KeyPress, logged_in: bool) -> Option<Action> {
    if context == PageContext::Home && key.code == Action::SelectRequest.key() {
        return Some(Action::SelectRequest);
    }

    if !key.is_chord() {
        return None;
    }

    context
        .actions()
        .iter()
        .copied()
        .find(|action| action.key() == key.code && permitted(context, *action, logged_in))
}

/// Actions a chord can currently reach on this page, in binding order.
pub fn available(context: PageContext, logged_in: bool) -> impl Iterator<Item = Action> {
    context
        .actions()
        .iter()
        .copied()
        .filter(move |action| permitted(context, *action, logged_in))
}
