use std::future::Future;
use std::io::stdout;
use std::panic;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::api::{ApiClient, ApiError, AuthOutcome, RequestRecord};
use crate::config::Config;
use crate::forms::{self, Form};
use crate::profile::Profile;
use crate::session::Session;
use crate::shortcuts::{self, KeyPress, PageContext};
use crate::storage::LocalStore;
use crate::timers::{Countdown, ViewTimers};
use crate::ui;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResponseStatus {
    #[default]
    Empty,
    Loading,
    Done {
        summary: String,
        body: String,
    },
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modal {
    History,
    Favorites,
    SignInNotice,
}

/// Where a fetched fragment lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Navbar,
    Console,
    Info,
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    Login,
    Signup,
    Update,
}

impl AuthFlow {
    /// Fragment path shown after the flow, minus the trailing token.
    pub fn fragment_prefix(&self) -> &'static [&'static str] {
        match self {
            AuthFlow::Login => &["login"],
            AuthFlow::Signup => &["signup"],
            AuthFlow::Update => &["profile", "update"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Countdown(Countdown),
    ClearMessage,
    CloseNotice,
    ClearItemNotice,
    Greeting,
    Prompt,
}

/// Everything that reaches the event loop from spawned tasks and timers.
#[derive(Debug)]
pub enum AppEvent {
    Fragment {
        view: u64,
        slot: Slot,
        result: Result<String, ApiError>,
    },
    Curl {
        result: Result<String, ApiError>,
    },
    Records {
        view: u64,
        modal: Modal,
        result: Result<Vec<RequestRecord>, ApiError>,
    },
    Auth {
        view: u64,
        flow: AuthFlow,
        result: Result<AuthOutcome, ApiError>,
    },
    AccountDeleted {
        view: u64,
        result: Result<bool, ApiError>,
    },
    FavoritesUpdated {
        view: u64,
        request_id: i32,
        added: bool,
        result: Result<AuthOutcome, ApiError>,
    },
    Timer {
        view: u64,
        tick: Tick,
    },
}

pub struct App {
    running: bool,
    pub page: PageContext,
    pub session: Session,
    pub(crate) store: LocalStore,
    pub(crate) api: ApiClient,
    pub(crate) tx: mpsc::Sender<AppEvent>,
    pub(crate) rx: mpsc::Receiver<AppEvent>,
    pub(crate) timers: ViewTimers<AppEvent>,
    pub navbar: String,
    pub console: Vec<String>,
    pub info: String,
    pub request_form: Form,
    pub page_form: Form,
    pub response: ResponseStatus,
    pub response_scroll: u16,
    pub loading_tick: u8,
    pub modal: Option<Modal>,
    pub records: Vec<RequestRecord>,
    pub records_loading: bool,
    pub selected: usize,
    pub item_notice: Option<(i32, String)>,
    pub message: String,
    pub countdown: Option<String>,
    pub status: Option<String>,
    pub shortcuts_width: u16,
}

impl App {
    pub fn new(config: &Config, store: LocalStore) -> Result<Self> {
        let api = ApiClient::new(config)?;
        Ok(Self::with_api(api, store, config.ui.shortcuts_width))
    }

    pub fn with_api(api: ApiClient, store: LocalStore, shortcuts_width: u16) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        let session = Session::load(&store);

        Self {
            running: true,
            page: PageContext::Home,
            session,
            store,
            api,
            timers: ViewTimers::new(tx.clone()),
            tx,
            rx,
            navbar: String::new(),
            console: Vec::new(),
            info: String::new(),
            request_form: forms::request_form(),
            page_form: page_form(PageContext::Home),
            response: ResponseStatus::Empty,
            response_scroll: 0,
            loading_tick: 0,
            modal: None,
            records: Vec::new(),
            records_loading: false,
            selected: 0,
            item_notice: None,
            message: String::new(),
            countdown: None,
            status: None,
            shortcuts_width,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.install_panic_hook();
        self.setup_terminal()?;

        let start = self.page;
        self.navigate(start);
        let result = self.event_loop().await;

        self.restore_terminal()?;
        result
    }

    fn install_panic_hook(&self) {
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = stdout().execute(LeaveAlternateScreen);
            original_hook(panic_info);
        }));
    }

    fn setup_terminal(&self) -> Result<()> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        Ok(())
    }

    fn restore_terminal(&self) -> Result<()> {
        disable_raw_mode()?;
        stdout().execute(LeaveAlternateScreen)?;
        Ok(())
    }

    async fn event_loop(&mut self) -> Result<()> {
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

        while self.is_running() {
            terminal.draw(|frame| {
                ui::render(frame, self);
            })?;

            while let Ok(event) = self.rx.try_recv() {
                self.handle_event(event);
            }

            if matches!(self.response, ResponseStatus::Loading) {
                self.loading_tick = self.loading_tick.wrapping_add(1);
            }

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
        }

        info!("shutting down");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.running = false;
            return;
        }

        if key.code == KeyCode::F(1) {
            self.session.toggle_shortcuts();
            self.persist();
            return;
        }

        if let Some(press) = KeyPress::from_event(&key) {
            if let Some(action) = shortcuts::dispatch(self.page, &press, self.session.is_logged_in()) {
                debug!(page = ?self.page, %action, "shortcut");
                self.execute(action);
                return;
            }
        }

        if key.code == KeyCode::Esc {
            self.modal = None;
            return;
        }

        if self.modal.is_some() {
            self.handle_modal_key(key);
            return;
        }

        match key.code {
            KeyCode::Tab => self.active_form_mut().next_field(),
            KeyCode::BackTab => self.active_form_mut().prev_field(),
            KeyCode::PageUp => self.response_scroll = self.response_scroll.saturating_sub(5),
            KeyCode::PageDown => self.response_scroll = self.response_scroll.saturating_add(5),
            KeyCode::Enter if self.page != PageContext::Home => self.submit_page_form(),
            _ => self.active_form_mut().handle_key(key),
        }
    }

    fn handle_modal_key(&mut self, key: KeyEvent) {
        let len = self.records.len();
        if len == 0 {
            return;
        }
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.selected = (self.selected + 1) % len,
            KeyCode::Up | KeyCode::Char('k') => self.selected = (self.selected + len - 1) % len,
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = len - 1,
            _ => {}
        }
    }

    fn active_form_mut(&mut self) -> &mut Form {
        match self.page {
            PageContext::Home => &mut self.request_form,
            _ => &mut self.page_form,
        }
    }

    /// Item highlighted in the open history or favorites modal.
    pub fn selected_record(&self) -> Option<&RequestRecord> {
        match self.modal {
            Some(Modal::History) | Some(Modal::Favorites) => self.records.get(self.selected),
            _ => None,
        }
    }

    /// Switches page: cancels the old view's timers, resets its state and loads the new one.
    pub fn navigate(&mut self, page: PageContext) {
        info!(from = self.page.path(), to = page.path(), "navigate");
        debug!(pending = self.timers.pending(), "cancelling view timers");
        self.timers.cancel_all();
        self.page = page;
        self.modal = None;
        self.records.clear();
        self.records_loading = false;
        self.selected = 0;
        self.item_notice = None;
        self.navbar.clear();
        self.info.clear();
        self.message.clear();
        self.countdown = None;
        self.status = None;
        self.page_form = page_form(page);
        if page == PageContext::Home {
            self.console.clear();
        }
        self.on_load();
    }

    fn on_load(&mut self) {
        let token = self.session.token_segment().to_string();
        self.fetch_fragment(Slot::Navbar, vec!["navbar".into(), self.page.navbar_name().into(), token.clone()]);

        match self.page {
            PageContext::Home => {
                self.timers
                    .schedule(crate::timers::GREETING_DELAY, |view| AppEvent::Timer { view, tick: Tick::Greeting });
                self.timers
                    .schedule(crate::timers::PROMPT_DELAY, |view| AppEvent::Timer { view, tick: Tick::Prompt });
            }
            PageContext::Profile => {
                self.fetch_fragment(Slot::Info, vec!["profile".into(), "info".into(), token]);
                match self.current_profile() {
                    Some(profile) => {
                        if let Some(field) = self.page_form.field_mut(forms::USERNAME) {
                            field.set_value(&profile.username);
                        }
                        self.page_form.set_focus(0);
                    }
                    None if self.status.is_none() => {
                        self.status = Some("$  not logged in".to_string());
                    }
                    None => {}
                }
            }
            PageContext::Login | PageContext::Signup => {}
        }
    }

    /// Decoded profile of the held token. A malformed token is reported, not treated as anonymous.
    pub(crate) fn current_profile(&mut self) -> Option<Profile> {
        match self.session.profile() {
            Ok(profile) => profile,
            Err(e) => {
                error!(error = %e, "malformed token");
                self.status = Some(format!("malformed token: {}", e));
                None
            }
        }
    }

    /// Email path segment, or `None` when the held token cannot be decoded.
    pub(crate) fn current_email(&mut self) -> Option<String> {
        match self.session.email_segment() {
            Ok(email) => Some(email),
            Err(e) => {
                error!(error = %e, "malformed token");
                self.status = Some(format!("malformed token: {}", e));
                None
            }
        }
    }

    pub(crate) fn persist(&mut self) {
        if let Err(e) = self.session.save(&mut self.store) {
            error!(error = %e, "failed to save session");
            self.status = Some(e);
        }
    }

    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(task.await).await;
        });
    }

    pub(crate) fn fetch_fragment(&self, slot: Slot, segments: Vec<String>) {
        let api = self.api.clone();
        let view = self.timers.view();
        self.spawn(async move {
            let parts: Vec<&str> = segments.iter().map(String::as_str).collect();
            let result = api.fragment(&parts).await;
            AppEvent::Fragment { view, slot, result }
        });
    }
}

fn page_form(page: PageContext) -> Form {
    match page {
        PageContext::Home => Form::new(Vec::new()),
        PageContext::Login => forms::login_form(),
        PageContext::Signup => forms::signup_form(),
        PageContext::Profile => forms::profile_form(),
    }
}
