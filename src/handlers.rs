//! Page actions, submit flows and the application of async results.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{error, info, warn};

use crate::api::{ApiError, AuthOutcome, CurlRequest};
use crate::app::{App, AppEvent, AuthFlow, Modal, ResponseStatus, Slot, Tick};
use crate::forms;
use crate::fragment;
use crate::shortcuts::{Action, PageContext};
use crate::timers::{
    countdown_message, redirect_countdown, Countdown, ANON_FAVORITES_NOTICE, FAILURE_CLEAR, ITEM_NOTICE,
};

const NOTICE_ADDED: &str = "$  added to favorites";
const NOTICE_REMOVED: &str = "$  removed from favorites";
const NOTICE_NOT_LOGGED_IN: &str = "$  log in to save favorites";
const NOTICE_DELETED: &str = "$  deleted";
pub const SIGN_IN_NOTICE: &str = "$  sign in to save favorites";

impl App {
    pub fn execute(&mut self, action: Action) {
        match action {
            Action::SelectRequest => self.select_request(),
            Action::Empty => self.request_form.reset(),
            Action::History => self.toggle_history(),
            Action::ViewFavorites => self.toggle_favorites(),
            Action::ToggleFavorite => self.toggle_favorite(),
            Action::HideRequest => self.hide_request(),
            Action::CloseModal => self.modal = None,
            Action::Home => self.navigate(PageContext::Home),
            Action::Login => self.navigate(PageContext::Login),
            Action::Signup => self.navigate(PageContext::Signup),
            Action::Profile => self.navigate(PageContext::Profile),
            Action::Delete => self.delete_account(),
            Action::Logout => self.logout(),
        }
    }

    fn select_request(&mut self) {
        if let Some(record) = self.selected_record().cloned() {
            forms::fill_request_form(&mut self.request_form, &record);
            self.modal = None;
            return;
        }
        if self.modal.is_some() {
            return;
        }
        let multiline = self.request_form.focused().is_some_and(|field| field.multiline);
        if !multiline {
            self.submit_request();
        } else if let Some(field) = self.request_form.focused_mut() {
            field.insert_newline();
        }
    }

    fn toggle_history(&mut self) {
        if matches!(self.modal, Some(Modal::Favorites) | Some(Modal::SignInNotice)) {
            self.modal = None;
        }
        if self.modal == Some(Modal::History) {
            self.modal = None;
            return;
        }
        if let Some(email) = self.current_email() {
            self.open_list(Modal::History, email);
        }
    }

    fn toggle_favorites(&mut self) {
        if self.modal == Some(Modal::History) {
            self.modal = None;
        }
        if matches!(self.modal, Some(Modal::Favorites) | Some(Modal::SignInNotice)) {
            self.modal = None;
            return;
        }
        if !self.session.is_logged_in() {
            self.modal = Some(Modal::SignInNotice);
            self.timers
                .schedule(ANON_FAVORITES_NOTICE, |view| AppEvent::Timer { view, tick: Tick::CloseNotice });
            return;
        }
        if let Some(email) = self.current_email() {
            self.open_list(Modal::Favorites, email);
        }
    }

    fn open_list(&mut self, modal: Modal, email: String) {
        self.modal = Some(modal);
        self.records.clear();
        self.records_loading = true;
        self.selected = 0;
        self.item_notice = None;

        let api = self.api.clone();
        let view = self.timers.view();
        self.spawn(async move {
            let result = match modal {
                Modal::Favorites => api.favorites(&email).await,
                _ => api.history(&email).await,
            };
            AppEvent::Records { view, modal, result }
        });
    }

    fn toggle_favorite(&mut self) {
        let Some(request_id) = self.selected_record().map(|record| record.id) else {
            return;
        };
        if !self.session.is_logged_in() {
            self.show_item_notice(request_id, NOTICE_NOT_LOGGED_IN);
            return;
        }
        let Some(profile) = self.current_profile() else {
            return;
        };

        let favorites = profile.toggled_favorites(request_id);
        let added = favorites.len() > profile.favorites.len();
        let token = self.session.token().map(str::to_string);
        let api = self.api.clone();
        let view = self.timers.view();
        self.spawn(async move {
            let result = api.update_favorites(token.as_deref(), &profile, &favorites).await;
            AppEvent::FavoritesUpdated {
                view,
                request_id,
                added,
                result,
            }
        });
    }

    fn hide_request(&mut self) {
        let Some(request_id) = self.selected_record().map(|record| record.id) else {
            return;
        };
        let Some(email) = self.current_email() else {
            return;
        };

        let api = self.api.clone();
        tokio::spawn(async move {
            if let Err(e) = api.hide_request(&email, request_id).await {
                warn!(request_id, error = %e, "hide request failed");
            }
        });
        self.item_notice = Some((request_id, NOTICE_DELETED.to_string()));
    }

    fn show_item_notice(&mut self, request_id: i32, notice: &str) {
        self.item_notice = Some((request_id, notice.to_string()));
        self.timers
            .schedule(ITEM_NOTICE, |view| AppEvent::Timer { view, tick: Tick::ClearItemNotice });
    }

    fn logout(&mut self) {
        info!("logout");
        self.session.clear_token();
        self.persist();
        self.navigate(PageContext::Home);
    }

    pub(crate) fn submit_request(&mut self) {
        let url = self.request_form.value(forms::URL);
        if url.trim().is_empty() {
            self.response = ResponseStatus::Error("URL is required".to_string());
            return;
        }
        if matches!(self.response, ResponseStatus::Loading) {
            return;
        }
        let Some(user_email) = self.current_email() else {
            return;
        };

        let request = CurlRequest {
            method: self.request_form.value(forms::METHOD),
            url: url.trim().to_string(),
            headers: self.request_form.value(forms::HEADERS),
            origin: self.request_form.value(forms::ORIGIN),
            body: self.request_form.value(forms::BODY),
            user_email,
        };
        info!(method = %request.method, url = %request.url, "curling");
        self.response = ResponseStatus::Loading;
        self.response_scroll = 0;

        let api = self.api.clone();
        self.spawn(async move {
            let result = api.send_request(&request).await;
            AppEvent::Curl { result }
        });
    }

    pub(crate) fn submit_page_form(&mut self) {
        match self.page {
            PageContext::Login => self.submit_login(),
            PageContext::Signup => self.submit_signup(),
            PageContext::Profile => self.submit_update(),
            PageContext::Home => self.submit_request(),
        }
    }

    fn submit_login(&mut self) {
        let email = self.page_form.value(forms::EMAIL);
        let password = self.page_form.value(forms::PASSWORD);
        let api = self.api.clone();
        let view = self.timers.view();
        self.spawn(async move {
            let result = api.authenticate(&email, &password).await;
            AppEvent::Auth {
                view,
                flow: AuthFlow::Login,
                result,
            }
        });
    }

    fn submit_signup(&mut self) {
        let username = self.page_form.value(forms::USERNAME);
        let email = self.page_form.value(forms::EMAIL);
        let password = self.page_form.value(forms::PASSWORD);
        let date = epoch_millis().to_string();
        let api = self.api.clone();
        let view = self.timers.view();
        self.spawn(async move {
            let result = api.create_user(&username, &email, &password, &date).await;
            AppEvent::Auth {
                view,
                flow: AuthFlow::Signup,
                result,
            }
        });
    }

    fn submit_update(&mut self) {
        let Some(profile) = self.current_profile() else {
            return;
        };
        let username = self.page_form.value(forms::USERNAME);
        let password = self.page_form.value(forms::PASSWORD);
        let token = self.session.token().map(str::to_string);
        let api = self.api.clone();
        let view = self.timers.view();
        self.spawn(async move {
            let result = api
                .update_user(token.as_deref(), &profile, &username, &password)
                .await;
            AppEvent::Auth {
                view,
                flow: AuthFlow::Update,
                result,
            }
        });
    }

    fn delete_account(&mut self) {
        let Some(profile) = self.current_profile() else {
            return;
        };
        let token = self.session.token().map(str::to_string);
        let api = self.api.clone();
        let view = self.timers.view();
        self.spawn(async move {
            let result = api.delete_user(token.as_deref(), &profile).await;
            AppEvent::AccountDeleted { view, result }
        });
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Fragment { view, slot, result } => {
                if self.timers.is_current(view) {
                    self.apply_fragment(slot, result);
                }
            }
            AppEvent::Curl { result } => self.apply_curl(result),
            AppEvent::Records { view, modal, result } => {
                if self.timers.is_current(view) && self.modal == Some(modal) {
                    self.records_loading = false;
                    match result {
                        Ok(records) => {
                            self.selected = 0;
                            self.records = records;
                        }
                        Err(e) => {
                            error!(?modal, error = %e, "failed to load requests");
                            self.status = Some(e.to_string());
                        }
                    }
                }
            }
            AppEvent::Auth { view, flow, result } => self.apply_auth(view, flow, result),
            AppEvent::AccountDeleted { view, result } => self.apply_delete(view, result),
            AppEvent::FavoritesUpdated {
                view,
                request_id,
                added,
                result,
            } => self.apply_favorites(view, request_id, added, result),
            AppEvent::Timer { view, tick } => {
                if self.timers.is_current(view) {
                    self.apply_tick(tick);
                }
            }
        }
    }

    fn apply_fragment(&mut self, slot: Slot, result: Result<String, ApiError>) {
        let html = match result {
            Ok(html) => html,
            Err(e) => {
                warn!(?slot, error = %e, "fragment failed");
                if slot == Slot::Message {
                    self.message = format!("$  error: {}", e);
                }
                return;
            }
        };
        let text = fragment::to_text(&html);
        match slot {
            Slot::Navbar => self.navbar = text,
            Slot::Console => self.console.extend(text.lines().map(str::to_string)),
            Slot::Info => self.info = text,
            Slot::Message => self.message = text,
        }
    }

    fn apply_curl(&mut self, result: Result<String, ApiError>) {
        self.response_scroll = 0;
        self.response = match result {
            Ok(html) => {
                let summary = fragment::response_summary(&html);
                let body = fragment::response_body(&html)
                    .map(|body| fragment::format_response(&body))
                    .unwrap_or_default();
                ResponseStatus::Done { summary, body }
            }
            Err(e) => {
                error!(error = %e, "curl request failed");
                ResponseStatus::Error(e.to_string())
            }
        };
    }

    fn apply_auth(&mut self, view: u64, flow: AuthFlow, result: Result<AuthOutcome, ApiError>) {
        let token = match result {
            Ok(AuthOutcome::Token(token)) => {
                info!(?flow, "token received");
                self.session.store_token(token.clone());
                self.persist();
                Some(token)
            }
            Ok(AuthOutcome::Rejected(status)) => {
                warn!(?flow, status, "rejected");
                None
            }
            Err(e) => {
                error!(?flow, error = %e, "request failed");
                if self.timers.is_current(view) {
                    self.show_failure(format!("$  error: {}", e));
                }
                return;
            }
        };
        if !self.timers.is_current(view) {
            return;
        }

        let mut segments: Vec<String> = flow.fragment_prefix().iter().map(|s| s.to_string()).collect();
        match token {
            Some(token) => {
                segments.push(token);
                self.fetch_fragment(Slot::Message, segments);
                self.start_countdown();
            }
            None => {
                segments.push("null".to_string());
                self.fetch_fragment(Slot::Message, segments);
                self.schedule_message_clear();
            }
        }
    }

    fn apply_delete(&mut self, view: u64, result: Result<bool, ApiError>) {
        let deleted = match result {
            Ok(deleted) => deleted,
            Err(e) => {
                error!(error = %e, "delete account failed");
                if self.timers.is_current(view) {
                    self.show_failure(format!("$  error: {}", e));
                }
                return;
            }
        };
        if deleted {
            info!("account deleted");
            self.session.clear_token();
            self.persist();
        } else {
            warn!("account deletion refused");
        }
        if !self.timers.is_current(view) {
            return;
        }

        let outcome = if deleted { "true" } else { "null" };
        self.fetch_fragment(Slot::Message, vec!["profile".into(), "delete".into(), outcome.into()]);
        if deleted {
            self.start_countdown();
        } else {
            self.schedule_message_clear();
        }
    }

    fn apply_favorites(
        &mut self,
        view: u64,
        request_id: i32,
        added: bool,
        result: Result<AuthOutcome, ApiError>,
    ) {
        match result {
            Ok(AuthOutcome::Token(token)) => {
                info!(request_id, added, "favorites updated");
                self.session.store_token(token);
                self.persist();
            }
            Ok(AuthOutcome::Rejected(status)) => {
                warn!(request_id, status, "favorites update rejected");
                self.status = Some(format!("$  favorites update failed ({})", status));
                return;
            }
            Err(e) => {
                error!(request_id, error = %e, "favorites update failed");
                self.status = Some(e.to_string());
                return;
            }
        }
        if !self.timers.is_current(view) {
            return;
        }

        if self.modal == Some(Modal::Favorites) {
            if let Some(email) = self.current_email() {
                self.open_list(Modal::Favorites, email);
            }
        } else {
            let notice = if added { NOTICE_ADDED } else { NOTICE_REMOVED };
            self.show_item_notice(request_id, notice);
        }
    }

    fn apply_tick(&mut self, tick: Tick) {
        match tick {
            Tick::Countdown(Countdown::Remaining(remaining)) => {
                self.countdown = Some(countdown_message(remaining));
            }
            Tick::Countdown(Countdown::Redirect) => self.navigate(PageContext::Home),
            Tick::ClearMessage => self.message.clear(),
            Tick::CloseNotice => {
                if self.modal == Some(Modal::SignInNotice) {
                    self.modal = None;
                }
            }
            Tick::ClearItemNotice => self.item_notice = None,
            Tick::Greeting => {
                let token = self.session.token_segment().to_string();
                self.fetch_fragment(Slot::Console, vec!["username".into(), token]);
            }
            Tick::Prompt => {
                if let Some(email) = self.current_email() {
                    self.fetch_fragment(Slot::Console, vec!["request".into(), "new".into(), email]);
                }
            }
        }
    }

    fn start_countdown(&mut self) {
        for (delay, step) in redirect_countdown() {
            self.timers.schedule(delay, |view| AppEvent::Timer {
                view,
                tick: Tick::Countdown(step),
            });
        }
    }

    fn schedule_message_clear(&mut self) {
        self.timers
            .schedule(FAILURE_CLEAR, |view| AppEvent::Timer { view, tick: Tick::ClearMessage });
    }

    fn show_failure(&mut self, message: String) {
        self.message = message;
        self.schedule_message_clear();
    }
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use reqwest::Client;
    use tempfile::TempDir;
    use tokio::time::timeout;

    use super::*;
    use crate::api::tests::{spawn_stub, ServerStub};
    use crate::api::{ApiClient, RequestRecord};
    use crate::session::{AUTH_KEY, SHORTCUTS_KEY};
    use crate::storage::LocalStore;
    use crate::token::decode_token;
    use crate::token::tests::{sample_profile, token_for};

    fn app_for(stub: &ServerStub, store: LocalStore) -> App {
        let api = ApiClient::with_client(&stub.base_url, Client::new());
        App::with_api(api, store, 36)
    }

    fn logged_in_store() -> LocalStore {
        let mut store = LocalStore::in_memory();
        store.set(AUTH_KEY, token_for(&sample_profile()));
        store
    }

    fn ctrl_alt(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL | KeyModifiers::ALT)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    /// Applies incoming events until one matches `done`.
    async fn settle(app: &mut App, done: impl Fn(&AppEvent) -> bool) {
        loop {
            let event = timeout(Duration::from_secs(5), app.rx.recv())
                .await
                .expect("event in time")
                .expect("channel open");
            let finished = done(&event);
            app.handle_event(event);
            if finished {
                return;
            }
        }
    }

    fn is_message(event: &AppEvent) -> bool {
        matches!(event, AppEvent::Fragment { slot: Slot::Message, .. })
    }

    fn type_into(app: &mut App, label: &str, value: &str) {
        if let Some(field) = app.page_form.field_mut(label) {
            field.set_value(value);
        }
    }

    #[tokio::test]
    async fn test_home_load_fetches_navbar() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, LocalStore::in_memory());
        app.navigate(PageContext::Home);
        settle(&mut app, |e| matches!(e, AppEvent::Fragment { slot: Slot::Navbar, .. })).await;
        assert_eq!(app.navbar, "$  fragment navbar/home/null");
        assert_eq!(app.timers.pending(), 2);
    }

    #[tokio::test]
    async fn test_login_success_stores_token_and_counts_down() {
        let stub = spawn_stub(true).await;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local_storage.json");
        let mut app = app_for(&stub, LocalStore::open(&path).unwrap());
        app.navigate(PageContext::Login);
        type_into(&mut app, forms::EMAIL, "ada@example.com");
        type_into(&mut app, forms::PASSWORD, "pw");

        app.handle_key(press(KeyCode::Enter));
        settle(&mut app, |e| matches!(e, AppEvent::Auth { .. })).await;

        assert!(app.session.is_logged_in());
        assert_eq!(app.timers.pending(), 4);
        let stored = LocalStore::open(&path).unwrap();
        let token = stored.get(AUTH_KEY).unwrap();
        assert_eq!(decode_token(token).unwrap().email, "ada@example.com");

        settle(&mut app, is_message).await;
        assert!(app.message.starts_with("$  fragment login/"));
        assert!(!app.message.ends_with("/null"));
    }

    #[tokio::test]
    async fn test_login_failure_shows_null_fragment_then_clears() {
        let stub = spawn_stub(false).await;
        let mut app = app_for(&stub, LocalStore::in_memory());
        app.navigate(PageContext::Login);
        type_into(&mut app, forms::EMAIL, "ada@example.com");
        app.handle_key(press(KeyCode::Enter));

        settle(&mut app, |e| matches!(e, AppEvent::Auth { .. })).await;
        assert!(!app.session.is_logged_in());
        settle(&mut app, is_message).await;
        assert_eq!(app.message, "$  fragment login/null");

        settle(&mut app, |e| matches!(e, AppEvent::Timer { tick: Tick::ClearMessage, .. })).await;
        assert!(app.message.is_empty());
    }

    #[tokio::test]
    async fn test_signup_sends_epoch_date() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, LocalStore::in_memory());
        app.navigate(PageContext::Signup);
        type_into(&mut app, forms::USERNAME, "grace");
        type_into(&mut app, forms::EMAIL, "grace@example.com");
        type_into(&mut app, forms::PASSWORD, "pw");
        app.handle_key(press(KeyCode::Enter));
        settle(&mut app, |e| matches!(e, AppEvent::Auth { .. })).await;

        let calls = stub.calls.lock().await;
        let (name, _, body) = calls.iter().find(|call| call.0 == "new").unwrap();
        assert_eq!(name, "new");
        let date: u128 = body["date"].as_str().unwrap().parse().unwrap();
        assert!(date > 1_600_000_000_000);
    }

    #[tokio::test]
    async fn test_navigation_cancels_countdown() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, LocalStore::in_memory());
        app.navigate(PageContext::Login);
        app.handle_key(press(KeyCode::Enter));
        settle(&mut app, |e| matches!(e, AppEvent::Auth { .. })).await;
        let login_view = app.timers.view();
        assert_eq!(app.timers.pending(), 4);

        app.handle_key(ctrl_alt('h'));
        assert_eq!(app.page, PageContext::Home);
        assert_eq!(app.timers.pending(), 2);

        app.handle_event(AppEvent::Timer {
            view: login_view,
            tick: Tick::Countdown(Countdown::Remaining(3)),
        });
        assert!(app.countdown.is_none());
    }

    #[tokio::test]
    async fn test_countdown_step_sets_message() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, LocalStore::in_memory());
        app.navigate(PageContext::Signup);
        let view = app.timers.view();
        app.handle_event(AppEvent::Timer {
            view,
            tick: Tick::Countdown(Countdown::Remaining(2)),
        });
        assert_eq!(app.countdown.as_deref(), Some("$  redirecting in 2 secs.."));

        app.handle_event(AppEvent::Timer {
            view,
            tick: Tick::Countdown(Countdown::Redirect),
        });
        assert_eq!(app.page, PageContext::Home);
        assert!(app.countdown.is_none());
    }

    #[tokio::test]
    async fn test_delete_success_clears_token_keeps_shortcuts() {
        let stub = spawn_stub(true).await;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local_storage.json");
        let mut store = LocalStore::open(&path).unwrap();
        store.set(AUTH_KEY, token_for(&sample_profile()));
        store.set(SHORTCUTS_KEY, "false");
        store.flush().unwrap();

        let mut app = app_for(&stub, LocalStore::open(&path).unwrap());
        app.navigate(PageContext::Profile);
        assert_eq!(app.page_form.value(forms::USERNAME), "ada");

        app.handle_key(ctrl_alt('d'));
        settle(&mut app, |e| matches!(e, AppEvent::AccountDeleted { .. })).await;

        assert!(app.session.token().is_none());
        assert!(!app.session.shortcuts_visible());
        let stored = LocalStore::open(&path).unwrap();
        assert!(stored.get(AUTH_KEY).is_none());
        assert_eq!(stored.get(SHORTCUTS_KEY), Some("false"));
        assert_eq!(app.timers.pending(), 4);

        settle(&mut app, is_message).await;
        assert_eq!(app.message, "$  fragment profile/delete/true");
    }

    #[tokio::test]
    async fn test_delete_refused_keeps_token() {
        let stub = spawn_stub(false).await;
        let mut app = app_for(&stub, logged_in_store());
        app.navigate(PageContext::Profile);
        app.handle_key(ctrl_alt('d'));
        settle(&mut app, |e| matches!(e, AppEvent::AccountDeleted { .. })).await;

        assert!(app.session.is_logged_in());
        settle(&mut app, is_message).await;
        assert_eq!(app.message, "$  fragment profile/delete/null");
    }

    #[tokio::test]
    async fn test_profile_update_sends_bearer() {
        let stub = spawn_stub(true).await;
        let token = token_for(&sample_profile());
        let mut store = LocalStore::in_memory();
        store.set(AUTH_KEY, token.clone());
        let mut app = app_for(&stub, store);
        app.navigate(PageContext::Profile);
        type_into(&mut app, forms::USERNAME, "ada2");
        type_into(&mut app, forms::PASSWORD, "newpw");
        app.handle_key(press(KeyCode::Enter));
        settle(&mut app, |e| matches!(e, AppEvent::Auth { .. })).await;

        assert_eq!(app.session.profile().unwrap().unwrap().username, "ada2");
        let calls = stub.calls.lock().await;
        let update = calls.iter().find(|call| call.0 == "update").unwrap();
        assert_eq!(update.1.as_deref(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn test_malformed_token_on_profile_is_reported() {
        let stub = spawn_stub(true).await;
        let mut store = LocalStore::in_memory();
        store.set(AUTH_KEY, "not-a-token");
        let mut app = app_for(&stub, store);
        app.navigate(PageContext::Profile);

        assert!(app.status.as_deref().unwrap().starts_with("malformed token"));
        assert!(app.session.is_logged_in());
        assert_eq!(app.page, PageContext::Profile);
    }

    #[tokio::test]
    async fn test_history_enter_fills_form_and_closes() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, logged_in_store());
        app.navigate(PageContext::Home);
        app.handle_key(ctrl_alt('h'));
        assert_eq!(app.modal, Some(Modal::History));
        settle(&mut app, |e| matches!(e, AppEvent::Records { .. })).await;
        assert_eq!(app.records.len(), 2);

        app.handle_key(press(KeyCode::Down));
        app.handle_key(press(KeyCode::Enter));
        assert!(app.modal.is_none());
        assert_eq!(app.request_form.value(forms::URL), "https://example.com/a");
        assert_eq!(app.request_form.value(forms::METHOD), "GET");
    }

    #[tokio::test]
    async fn test_history_and_favorites_are_exclusive() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, logged_in_store());
        app.navigate(PageContext::Home);
        app.execute(Action::History);
        app.execute(Action::ViewFavorites);
        assert_eq!(app.modal, Some(Modal::Favorites));
        app.execute(Action::History);
        assert_eq!(app.modal, Some(Modal::History));
        app.execute(Action::History);
        assert!(app.modal.is_none());
    }

    #[tokio::test]
    async fn test_anonymous_favorites_shows_notice() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, LocalStore::in_memory());
        app.navigate(PageContext::Home);
        app.execute(Action::ViewFavorites);
        assert_eq!(app.modal, Some(Modal::SignInNotice));

        let view = app.timers.view();
        app.handle_event(AppEvent::Timer {
            view,
            tick: Tick::CloseNotice,
        });
        assert!(app.modal.is_none());
    }

    #[tokio::test]
    async fn test_toggle_favorite_removes_and_flashes() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, logged_in_store());
        app.navigate(PageContext::Home);
        app.execute(Action::History);
        settle(&mut app, |e| matches!(e, AppEvent::Records { .. })).await;

        app.execute(Action::ToggleFavorite);
        settle(&mut app, |e| matches!(e, AppEvent::FavoritesUpdated { .. })).await;

        assert_eq!(app.session.profile().unwrap().unwrap().favorites, vec![3]);
        assert_eq!(app.item_notice, Some((9, NOTICE_REMOVED.to_string())));
        let calls = stub.calls.lock().await;
        let patch = calls.iter().find(|call| call.0 == "favorites").unwrap();
        assert_eq!(patch.2["favorites"], serde_json::json!([3]));
    }

    #[tokio::test]
    async fn test_toggle_favorite_in_favorites_modal_refetches_list() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, logged_in_store());
        app.navigate(PageContext::Home);
        app.execute(Action::ViewFavorites);
        settle(&mut app, |e| matches!(e, AppEvent::Records { modal: Modal::Favorites, .. })).await;
        assert_eq!(app.records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3]);

        app.execute(Action::ToggleFavorite);
        settle(&mut app, |e| matches!(e, AppEvent::FavoritesUpdated { .. })).await;
        assert_eq!(app.session.profile().unwrap().unwrap().favorites, vec![9]);
        assert!(app.records_loading);
        assert!(app.item_notice.is_none());

        settle(&mut app, |e| matches!(e, AppEvent::Records { modal: Modal::Favorites, .. })).await;
        assert_eq!(app.modal, Some(Modal::Favorites));
        assert!(!app.records_loading);
        assert_eq!(app.records.len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_favorite_anonymous_notice() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, LocalStore::in_memory());
        app.navigate(PageContext::Home);
        app.modal = Some(Modal::History);
        app.records = vec![RequestRecord {
            id: 4,
            url: "https://example.com".into(),
            method: "GET".into(),
            origin: None,
            headers: None,
            body: None,
            status: "200".into(),
            date: "1".into(),
        }];
        app.execute(Action::ToggleFavorite);
        assert_eq!(app.item_notice, Some((4, NOTICE_NOT_LOGGED_IN.to_string())));
        assert!(stub.calls.lock().await.iter().all(|call| call.0 != "favorites"));
    }

    #[tokio::test]
    async fn test_hide_request_marks_item() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, logged_in_store());
        app.navigate(PageContext::Home);
        app.execute(Action::History);
        settle(&mut app, |e| matches!(e, AppEvent::Records { .. })).await;
        app.execute(Action::HideRequest);
        assert_eq!(app.item_notice, Some((9, NOTICE_DELETED.to_string())));
    }

    #[tokio::test]
    async fn test_enter_without_modal_submits_request() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, LocalStore::in_memory());
        app.navigate(PageContext::Home);
        if let Some(field) = app.request_form.field_mut(forms::URL) {
            field.set_value("https://example.com");
        }
        app.request_form.focus_label(forms::URL);
        app.handle_key(press(KeyCode::Enter));
        assert_eq!(app.response, ResponseStatus::Loading);

        settle(&mut app, |e| matches!(e, AppEvent::Curl { .. })).await;
        assert_eq!(
            app.response,
            ResponseStatus::Done {
                summary: "$  status: 200".into(),
                body: "{\n    \"ok\": true\n}\n".into(),
            }
        );
        let calls = stub.calls.lock().await;
        let curl = calls.iter().find(|call| call.0 == "curl").unwrap();
        assert_eq!(curl.2["user_email"], "anon");
    }

    #[tokio::test]
    async fn test_empty_url_is_rejected_locally() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, LocalStore::in_memory());
        app.navigate(PageContext::Home);
        app.request_form.focus_label(forms::URL);
        app.execute(Action::SelectRequest);
        assert_eq!(app.response, ResponseStatus::Error("URL is required".into()));
    }

    #[tokio::test]
    async fn test_logout_clears_token_and_goes_home() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, logged_in_store());
        app.navigate(PageContext::Profile);
        app.handle_key(ctrl_alt('l'));
        assert_eq!(app.page, PageContext::Home);
        assert!(!app.session.is_logged_in());
        assert!(app.store.get(AUTH_KEY).is_none());
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_and_f1_toggles_shortcuts() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, LocalStore::in_memory());
        app.handle_key(press(KeyCode::F(1)));
        assert_eq!(app.store.get(SHORTCUTS_KEY), Some("false"));
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!app.is_running());
    }

    #[tokio::test]
    async fn test_key_p_on_login_types_instead_of_navigating() {
        let stub = spawn_stub(true).await;
        let mut app = app_for(&stub, LocalStore::in_memory());
        app.navigate(PageContext::Login);
        app.handle_key(ctrl_alt('p'));
        assert_eq!(app.page, PageContext::Login);
    }

    #[test]
    fn test_epoch_millis_is_recent() {
        assert!(epoch_millis() > 1_600_000_000_000);
        assert!(crate::timers::PROMPT_DELAY > crate::timers::GREETING_DELAY);
    }
}
