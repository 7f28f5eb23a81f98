//! Application state management for MedDash.
//!
//! The `App` owns the session controller, the view models for each admin
//! page and all overlay state. Navigation is driven by the session's event
//! channel: the controller decides when to go to the login form or the
//! dashboard, and `check_background_tasks` applies those redirects.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

use meddash_core::api::{ApiError, ResourceApi};
use meddash_core::auth::{
    resolve, Access, AdminPage, LogoutReason, Route, SessionController, SessionEvent,
};
use meddash_core::config::Config;
use meddash_core::views::{PharmaciesView, Resource, StatisticsView, UsersView, ViewOutcome};

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for email input.
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// A stored session is being validated
    Initializing,
    Normal,
    ShowingHelp,
    LoggingIn,
    ConfirmingDelete,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

/// Row awaiting a y/n confirmation before it is deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    pub page: AdminPage,
    pub id: String,
    pub name: String,
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    pub config: Config,
    pub session: SessionController,
    resources: Arc<dyn ResourceApi>,
    events: broadcast::Receiver<SessionEvent>,

    pub state: AppState,
    pub current_page: AdminPage,

    pub statistics: StatisticsView,
    pub users: UsersView,
    pub pharmacies: PharmaciesView,

    // Login form state
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    pub pending_delete: Option<PendingDelete>,
    pub status_message: Option<String>,

    /// Write `last_email` back to the config file after login
    pub persist_config: bool,
}

impl App {
    pub fn new(config: Config, session: SessionController, resources: Arc<dyn ResourceApi>) -> Self {
        let events = session.subscribe();
        let login_email = config.last_email.clone().unwrap_or_default();
        let login_password = config.env_password.clone().unwrap_or_default();

        Self {
            config,
            session,
            resources,
            events,

            state: AppState::Initializing,
            current_page: AdminPage::Statistics,

            statistics: StatisticsView::new(),
            users: UsersView::new(),
            pharmacies: PharmaciesView::new(),

            login_email,
            login_password,
            login_focus: LoginFocus::Email,
            login_error: None,

            pending_delete: None,
            status_message: None,

            persist_config: true,
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Validate any stored session, then land on the page the guards allow.
    pub async fn start(&mut self) {
        self.state = AppState::Initializing;
        let state = self.session.initialize().await;
        debug!(?state, "Session initialized");

        // Redirects emitted during validation are handled here; a session
        // that never existed emits nothing, so consult the guard as well.
        self.check_background_tasks().await;
        if self.state == AppState::Initializing {
            match resolve(Route::HOME, &self.session) {
                Access::Allow => self.navigate(AdminPage::Statistics).await,
                Access::Redirect(_) | Access::Wait => self.start_login(),
            }
        }
    }

    /// Show the login overlay
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) {
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();

        if email.is_empty() || password.is_empty() {
            self.login_error = Some("Email and password required".to_string());
            return;
        }

        self.login_error = None;

        match self.session.sign_in(&email, &password).await {
            Ok(()) => {
                self.login_password.clear();
                self.config.last_email = Some(email);
                if self.persist_config {
                    if let Err(e) = self.config.save() {
                        warn!(error = %e, "Failed to save config");
                    }
                }
                // The controller's redirect moves us to the dashboard
                self.check_background_tasks().await;
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.login_error = Some(login_error_message(&e));
            }
        }
    }

    pub fn logout(&mut self) {
        self.session.logout(LogoutReason::UserRequested);
    }

    // =========================================================================
    // Session Events
    // =========================================================================

    /// Drain the session event channel and apply redirects.
    pub async fn check_background_tasks(&mut self) {
        let mut events = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session events lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        for event in events {
            self.handle_session_event(event).await;
        }
    }

    async fn handle_session_event(&mut self, event: SessionEvent) {
        debug!(?event, "Session event");
        match event {
            SessionEvent::StateChanged(state) => {
                debug!(?state, "Session state changed");
            }
            SessionEvent::Redirect(Route::Login) => self.return_to_login(),
            SessionEvent::Redirect(Route::Admin(page)) => {
                self.login_error = None;
                self.navigate(page).await;
            }
            SessionEvent::Refreshed => {
                debug!("Token refreshed");
            }
        }
    }

    /// Drop everything fetched under the old session and show the login form.
    fn return_to_login(&mut self) {
        if self.state != AppState::LoggingIn {
            info!("Redirecting to login");
        }
        self.statistics.reset();
        self.users.reset();
        self.pharmacies.reset();
        self.pending_delete = None;
        self.status_message = None;
        self.start_login();
    }

    // =========================================================================
    // Navigation and Data
    // =========================================================================

    /// Switch to an admin page if the guard allows it, and load its data.
    pub async fn navigate(&mut self, page: AdminPage) {
        match resolve(Route::Admin(page), &self.session) {
            Access::Allow => {
                self.current_page = page;
                if matches!(self.state, AppState::Initializing | AppState::LoggingIn) {
                    self.state = AppState::Normal;
                }
                self.refresh_current_page().await;
            }
            Access::Redirect(route) => {
                debug!(path = route.path(), "Navigation redirected");
                self.start_login();
            }
            Access::Wait => {}
        }
    }

    pub async fn refresh_current_page(&mut self) {
        let resources = Arc::clone(&self.resources);
        let outcome = match self.current_page {
            AdminPage::Statistics => self.statistics.load(&self.session, resources.as_ref()).await,
            AdminPage::Users => self.users.load(&self.session, resources.as_ref()).await,
            AdminPage::Pharmacies => self.pharmacies.load(&self.session, resources.as_ref()).await,
        };
        self.after_request(outcome);
    }

    fn after_request(&mut self, outcome: ViewOutcome) {
        match outcome {
            ViewOutcome::Updated => self.status_message = None,
            ViewOutcome::LoggedOut => self.return_to_login(),
            ViewOutcome::Failed | ViewOutcome::Discarded => {}
        }
    }

    /// Ask for confirmation before deleting the selected row.
    pub fn request_delete(&mut self) {
        let pending = match self.current_page {
            AdminPage::Statistics => None,
            AdminPage::Users => self.users.selected().map(|u| PendingDelete {
                page: AdminPage::Users,
                id: u.id().to_string(),
                name: u.display_name(),
            }),
            AdminPage::Pharmacies => self.pharmacies.selected().map(|p| PendingDelete {
                page: AdminPage::Pharmacies,
                id: p.id().to_string(),
                name: p.display_name(),
            }),
        };

        if let Some(pending) = pending {
            self.pending_delete = Some(pending);
            self.state = AppState::ConfirmingDelete;
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
        if self.state == AppState::ConfirmingDelete {
            self.state = AppState::Normal;
        }
    }

    pub async fn confirm_delete(&mut self) {
        let Some(pending) = self.pending_delete.take() else {
            return;
        };
        self.state = AppState::Normal;

        let resources = Arc::clone(&self.resources);
        let outcome = match pending.page {
            AdminPage::Users => {
                self.users
                    .delete(&pending.id, &self.session, resources.as_ref())
                    .await
            }
            AdminPage::Pharmacies => {
                self.pharmacies
                    .delete(&pending.id, &self.session, resources.as_ref())
                    .await
            }
            AdminPage::Statistics => return,
        };

        if outcome == ViewOutcome::Updated {
            info!(id = %pending.id, "Deleted {}", pending.name);
            self.status_message = Some(format!("Deleted {}", pending.name));
        } else {
            self.after_request(outcome);
        }
    }

    /// Error of the current page, if any
    pub fn current_error(&self) -> Option<&str> {
        match self.current_page {
            AdminPage::Statistics => self.statistics.error(),
            AdminPage::Users => self.users.error(),
            AdminPage::Pharmacies => self.pharmacies.error(),
        }
    }

    pub fn dismiss_error(&mut self) {
        match self.current_page {
            AdminPage::Statistics => self.statistics.dismiss_error(),
            AdminPage::Users => self.users.dismiss_error(),
            AdminPage::Pharmacies => self.pharmacies.dismiss_error(),
        }
    }

    /// Display name and initials of the signed-in admin
    pub fn user_label(&self) -> Option<(String, String)> {
        self.session.user().map(|u| (u.initials(), u.full_name()))
    }
}

fn login_error_message(err: &ApiError) -> String {
    match err {
        ApiError::Unauthorized => "Invalid email or password".to_string(),
        ApiError::NetworkError(e) if e.is_timeout() => {
            "Connection timed out. Please try again.".to_string()
        }
        ApiError::NetworkError(_) => {
            "Unable to connect to server. Check your connection.".to_string()
        }
        other => format!("Login failed: {}", other.status_text()),
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c)
}

pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================
