//! Application state management for the E-Inventory console.
//!
//! This module contains the core `App` struct: the session it drives, the
//! router the access gate guards, the login form, and the inactivity monitor
//! whose notifications are drained on every tick of the main loop.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Local};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use einventory_core::api::Site;
use einventory_core::auth::{
    open_store, ActivityKind, InactivityGuard, InactivityMonitor, LoginFlow, LoginForm,
    SessionEvent, StoredTokenCheck,
};
use einventory_core::config::USERNAME_ENV;
use einventory_core::{ApiClient, Config, IdentityService, Location, Router, SessionContext, SessionState};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the session event channel.
/// The monitor sends at most one event per arming.
const CHANNEL_BUFFER_SIZE: usize = 8;

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Shown on the login view after the monitor closed a live session.
pub const IDLE_NOTICE: &str = "Session closed due to inactivity";

// ============================================================================
// UI State
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Username,
    Password,
    Site,
    Button,
}

impl LoginFocus {
    pub fn next(&self) -> Self {
        match self {
            LoginFocus::Username => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Site,
            LoginFocus::Site => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Username,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            LoginFocus::Username => LoginFocus::Button,
            LoginFocus::Password => LoginFocus::Username,
            LoginFocus::Site => LoginFocus::Password,
            LoginFocus::Button => LoginFocus::Site,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// One-line message in the status bar or under the login form.
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub kind: NoticeKind,
    pub at: DateTime<Local>,
}

impl Notice {
    fn new(text: impl Into<String>, kind: NoticeKind) -> Self {
        Self {
            text: text.into(),
            kind,
            at: Local::now(),
        }
    }
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    pub session: SessionContext,
    pub login: LoginFlow,
    pub router: Router,

    session_rx: watch::Receiver<SessionState>,
    monitor: InactivityMonitor,
    activity: Option<InactivityGuard>,
    event_tx: mpsc::Sender<SessionEvent>,
    event_rx: mpsc::Receiver<SessionEvent>,

    /// Off for apps assembled in tests.
    persist_config: bool,

    // UI State
    pub state: AppState,
    pub sidebar_selection: usize,
    pub notice: Option<Notice>,

    // Login form
    pub login_form: LoginForm,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,
    pub sites: Vec<Site>,
    pub site_selection: Option<usize>,
}

impl App {
    /// Create a new application instance
    pub async fn new() -> Result<Self> {
        debug!("App::new() starting");
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        debug!(api = %config.api_base_url(), "Config loaded");

        let store = open_store(&config)?;
        let identity: Arc<dyn IdentityService> = Arc::new(ApiClient::new(&config)?);
        let mut app = Self::with_parts(config, SessionContext::new(store, identity.clone()), identity);
        app.persist_config = true;
        Ok(app)
    }

    /// Assemble the app around an existing session and identity service.
    pub fn with_parts(config: Config, session: SessionContext, identity: Arc<dyn IdentityService>) -> Self {
        let login = LoginFlow::new(session.clone(), identity, config.min_password_length);
        let monitor = InactivityMonitor::new(session.clone(), config.inactivity_window());
        let session_rx = session.subscribe();
        let router = Router::new(&session.snapshot());
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        // Prefill from env vars or config
        let identifier = std::env::var(USERNAME_ENV)
            .ok()
            .or_else(|| config.last_identifier.clone())
            .unwrap_or_default();

        Self {
            config,
            session,
            login,
            router,

            session_rx,
            monitor,
            activity: None,
            event_tx,
            event_rx,
            persist_config: false,

            state: AppState::Normal,
            sidebar_selection: 0,
            notice: None,

            login_form: LoginForm {
                identifier,
                ..LoginForm::default()
            },
            login_focus: LoginFocus::Username,
            login_error: None,
            sites: Vec::new(),
            site_selection: None,
        }
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Load the site selector and check any token left from the last run,
    /// then settle the router and arm the inactivity monitor.
    pub async fn mount(&mut self) {
        let report = self.login.mount().await;
        debug!(sites = report.sites.len(), stored = ?report.stored_token, "Login view mounted");

        self.sites = report.sites;
        self.site_selection = None;
        self.login_form.site_id = None;
        if let Some(text) = report.notice {
            self.notice = Some(Notice::new(text, NoticeKind::Error));
        }
        if report.stored_token == StoredTokenCheck::Valid {
            info!("Resuming stored session");
        }

        self.sync_session();
        self.start_login();
        self.arm_monitor();
    }

    /// Arm a fresh inactivity monitor, replacing any previous guard.
    pub fn arm_monitor(&mut self) {
        self.activity = None;
        match self.monitor.activate(self.event_tx.clone()) {
            Ok(guard) => self.activity = Some(guard),
            Err(e) => warn!(error = %e, "Inactivity monitor not armed"),
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Reset the login form focus for a fresh sign-in
    pub fn start_login(&mut self) {
        self.login_focus = if self.login_form.identifier.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Attempt login with the values in the login form
    pub async fn attempt_login(&mut self) {
        self.login_error = None;

        match self.login.submit(&self.login_form).await {
            Ok(outcome) => {
                self.remember_identifier(self.login_form.identifier.trim().to_string());

                self.login_form.secret.clear();
                self.notice = Some(Notice::new(outcome.welcome(), NoticeKind::Info));

                let state = self.session_rx.borrow_and_update().clone();
                let landed = self.router.complete_login(&state);
                self.select_sidebar(landed);
            }
            Err(e) => {
                self.login_error = Some(e.user_message());
            }
        }
    }

    /// Explicit logout from the navigation chrome.
    pub fn logout(&mut self) {
        self.session.logout();
        self.login_form.secret.clear();
        self.sync_session();
        self.start_login();
    }

    /// Interactive login (used for CLI mode)
    pub async fn login_interactive(&mut self) -> Result<()> {
        println!("\n=== E-Inventory Login ===\n");

        let sites = self.login.load_sites().await?;
        if sites.is_empty() {
            anyhow::bail!("The server returned no sites to sign in to");
        }

        let identifier = match self.login_form.identifier.clone() {
            last if !last.is_empty() => {
                let input = Self::prompt(&format!("Username [{}]: ", last))?;
                if input.is_empty() {
                    last
                } else {
                    input
                }
            }
            _ => Self::prompt("Username: ")?,
        };

        let secret = rpassword::prompt_password("Password: ")?;

        println!();
        for (i, site) in sites.iter().enumerate() {
            println!("  {}) {}", i + 1, site.label());
        }
        let choice = Self::prompt("Site: ")?;
        let site_id = choice
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| sites.get(i))
            .map(|s| s.id);

        println!("\nAuthenticating...");

        self.login_form = LoginForm {
            identifier,
            secret,
            site_id,
        };
        let result = self.login.submit(&self.login_form).await;
        self.login_form.secret.clear();

        match result {
            Ok(outcome) => {
                self.remember_identifier(outcome.identifier.clone());
                println!("{}\n", outcome.welcome());
                Ok(())
            }
            Err(e) => anyhow::bail!(e.user_message()),
        }
    }

    fn remember_identifier(&mut self, identifier: String) {
        self.config.last_identifier = Some(identifier);
        if !self.persist_config {
            return;
        }
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    fn prompt(label: &str) -> Result<String> {
        print!("{}", label);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    // =========================================================================
    // Login Form
    // =========================================================================

    /// Move the site selector by `delta`, wrapping around.
    pub fn cycle_site(&mut self, delta: isize) {
        if self.sites.is_empty() {
            return;
        }
        let len = self.sites.len() as isize;
        let next: isize = match self.site_selection {
            Some(i) => (i as isize + delta).rem_euclid(len),
            None if delta < 0 => len - 1,
            None => 0,
        };
        let next = next as usize;
        self.site_selection = Some(next);
        self.login_form.site_id = self.sites.get(next).map(|s| s.id);
    }

    pub fn selected_site(&self) -> Option<&Site> {
        self.site_selection.and_then(|i| self.sites.get(i))
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn current_location(&self) -> Location {
        self.router.current()
    }

    /// Navigate through the gate.
    pub fn navigate(&mut self, to: Location) {
        let state = self.session.snapshot();
        let landed = self.router.navigate(to, &state);
        self.select_sidebar(landed);
    }

    pub fn go_back(&mut self) {
        let state = self.session.snapshot();
        let landed = self.router.back(&state);
        self.select_sidebar(landed);
    }

    fn select_sidebar(&mut self, location: Location) {
        if let Some(i) = Location::PROTECTED.iter().position(|l| *l == location) {
            self.sidebar_selection = i;
        }
    }

    pub fn sidebar_next(&mut self) {
        self.sidebar_selection = (self.sidebar_selection + 1) % Location::PROTECTED.len();
    }

    pub fn sidebar_prev(&mut self) {
        let len = Location::PROTECTED.len();
        self.sidebar_selection = (self.sidebar_selection + len - 1) % len;
    }

    pub fn open_sidebar_selection(&mut self) {
        if let Some(location) = Location::PROTECTED.get(self.sidebar_selection).copied() {
            self.navigate(location);
        }
    }

    /// Display name for the title bar, once the profile arrived.
    pub fn operator_name(&self) -> Option<String> {
        self.session
            .profile()
            .and_then(|p| p.display_name().map(str::to_string))
    }

    // =========================================================================
    // Background Events
    // =========================================================================

    /// Report operator input to the inactivity monitor.
    pub fn record_activity(&self, kind: ActivityKind) {
        if let Some(ref guard) = self.activity {
            guard.record(kind);
        }
    }

    /// Re-run the gate when the session changed since the last tick.
    fn sync_session(&mut self) {
        let state = self.session_rx.borrow_and_update().clone();
        let before = self.router.current();
        let after = self.router.revalidate(&state);
        if before != after {
            debug!(from = before.path(), to = after.path(), "Session change moved the view");
            self.select_sidebar(after);
        }
    }

    /// Check for monitor notifications and session changes
    pub async fn check_background_tasks(&mut self) {
        // Collect all pending events first to avoid borrow conflicts
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }

        for event in events {
            self.process_session_event(event);
        }

        if self.session_rx.has_changed().unwrap_or(false) {
            self.sync_session();
        }
    }

    fn process_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::InactivityLogout {
                navigate_to,
                was_authenticated,
            } => {
                self.activity = None;
                // Nothing was closed, so the operator stays where they are.
                if was_authenticated {
                    self.navigate(navigate_to);
                    self.login_form.secret.clear();
                    self.start_login();
                    self.notice = Some(Notice::new(IDLE_NOTICE, NoticeKind::Info));
                }
                self.arm_monitor();
            }
        }
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a username character should be accepted
pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================
