//! Session lifecycle: rehydration, validation, login, logout and silent refresh.
//!
//! `SessionController` is the single owner of the in-memory session and the
//! only writer of the `CredentialStore`. Observers follow transitions through
//! `subscribe()`. Clone is cheap and every clone drives the same session.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{ApiError, AuthApi};
use crate::models::UserProfile;

use super::credentials::{CredentialStore, SESSION_TTL_DAYS};
use super::guard::Route;

/// Period of the silent refresh while authenticated (14 minutes).
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(14 * 60);

/// Capacity of the session event channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// Why a session ended. Used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    UserRequested,
    MissingToken,
    Unauthorized,
    RefreshFailed,
    ValidationFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    /// Navigation the front end should perform
    Redirect(Route),
    /// A silent refresh replaced the token (and possibly the profile)
    Refreshed,
}

/// Token and profile always travel together, so one cannot exist without the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub access_token: String,
    pub user: UserProfile,
}

struct Shared {
    state: SessionState,
    data: Option<SessionData>,
    /// Bumped on every login and logout so late responses can be recognized
    epoch: u64,
    refresh_task: Option<JoinHandle<()>>,
}

struct Inner {
    store: CredentialStore,
    api: Arc<dyn AuthApi>,
    shared: Mutex<Shared>,
    events: broadcast::Sender<SessionEvent>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self.shared.get_mut().refresh_task.take() {
            task.abort();
        }
    }
}

#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Rehydrate from the store. No network activity happens here; call
    /// `initialize` to validate a rehydrated token.
    pub fn new(store: CredentialStore, api: Arc<dyn AuthApi>) -> Self {
        let stored = store.load();
        let (state, data) = match (stored.token, stored.profile) {
            (Some(access_token), Some(user)) => {
                debug!("Stored session found, awaiting validation");
                if let Some(cookie) = store.load_refresh_cookie() {
                    api.restore_refresh_cookie(&cookie);
                }
                (SessionState::Initializing, Some(SessionData { access_token, user }))
            }
            (None, None) => (SessionState::Unauthenticated, None),
            (token, _) => {
                warn!(
                    has_token = token.is_some(),
                    "Stored session is incomplete, discarding it"
                );
                if let Err(e) = store.clear() {
                    warn!(error = %e, "Failed to clear incomplete session");
                }
                (SessionState::Unauthenticated, None)
            }
        };

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                store,
                api,
                shared: Mutex::new(Shared {
                    state,
                    data,
                    epoch: 0,
                    refresh_task: None,
                }),
                events,
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn state(&self) -> SessionState {
        self.inner.shared.lock().state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Current bearer token. Never touches the network.
    pub fn token(&self) -> Option<String> {
        self.inner
            .shared
            .lock()
            .data
            .as_ref()
            .map(|d| d.access_token.clone())
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.shared.lock().data.as_ref().map(|d| d.user.clone())
    }

    /// Changes on every login and logout, never on a silent refresh. A
    /// request started under one generation belongs to a session that has
    /// ended once the generation moves on.
    pub fn generation(&self) -> u64 {
        self.inner.shared.lock().epoch
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Validate a rehydrated token against `GET /auth/validate`.
    ///
    /// Only acts while `Initializing`; always leaves that state. Returns the
    /// state reached.
    pub async fn initialize(&self) -> SessionState {
        let (token, epoch) = {
            let shared = self.inner.shared.lock();
            match (&shared.state, &shared.data) {
                (SessionState::Initializing, Some(data)) => (data.access_token.clone(), shared.epoch),
                _ => return shared.state,
            }
        };

        match self.inner.api.validate(&token).await {
            Ok(()) => {
                let mut shared = self.inner.shared.lock();
                if shared.epoch != epoch || shared.state != SessionState::Initializing {
                    debug!("Session changed during validation, keeping newer state");
                    return shared.state;
                }
                shared.state = SessionState::Authenticated;
                self.arm_refresh(&mut shared);
                drop(shared);

                info!("Stored session validated");
                self.emit(SessionEvent::StateChanged(SessionState::Authenticated));
                self.emit(SessionEvent::Redirect(Route::HOME));
            }
            Err(e) => {
                warn!(error = %e, "Stored session failed validation");
                self.end_session(LogoutReason::ValidationFailed, Some(epoch));
            }
        }

        self.state()
    }

    /// Sign in with credentials through `POST /auth/login`, then `login`.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let response = self.inner.api.login(email, password).await?;
        self.login(response.access_token, response.user);
        Ok(())
    }

    /// Start a session from a token and profile issued by the server.
    ///
    /// Must be called from within a Tokio runtime, which runs the refresh timer.
    pub fn login(&self, access_token: String, user: UserProfile) {
        // Store I/O happens under the lock so a save can never land after a
        // clear. Backends block briefly (one file write or keychain call).
        let mut shared = self.inner.shared.lock();
        if let Err(e) = self.inner.store.save(&access_token, &user, SESSION_TTL_DAYS) {
            warn!(error = %e, "Failed to persist session");
        }
        self.persist_refresh_cookie();

        let previous = shared.state;
        shared.epoch += 1;
        shared.data = Some(SessionData { access_token, user });
        shared.state = SessionState::Authenticated;
        self.arm_refresh(&mut shared);
        drop(shared);

        info!("Login successful");
        if previous != SessionState::Authenticated {
            self.emit(SessionEvent::StateChanged(SessionState::Authenticated));
        }
        self.emit(SessionEvent::Redirect(Route::HOME));
    }

    /// End the session. Safe to call in any state, any number of times.
    pub fn logout(&self, reason: LogoutReason) {
        self.end_session(reason, None);
    }

    /// Clear the session, but only if it is still the one from `expected`
    /// (when given). The check and the transition share one lock so a login
    /// in between is never wiped out. Returns whether the session ended.
    fn end_session(&self, reason: LogoutReason, expected: Option<u64>) -> bool {
        let mut shared = self.inner.shared.lock();
        if expected.is_some_and(|epoch| epoch != shared.epoch) {
            debug!(?reason, "Session changed meanwhile, not logging out");
            return false;
        }
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }

        let previous = shared.state;
        shared.epoch += 1;
        shared.data = None;
        shared.state = SessionState::Unauthenticated;
        let task = shared.refresh_task.take();
        drop(shared);

        if let Some(task) = task {
            task.abort();
        }

        if previous != SessionState::Unauthenticated {
            info!(?reason, "Logged out");
            self.emit(SessionEvent::StateChanged(SessionState::Unauthenticated));
        } else {
            debug!(?reason, "Logout while already signed out");
        }
        self.emit(SessionEvent::Redirect(Route::Login));
        true
    }

    /// Renew the token through `POST /auth/refresh`. Returns true when the
    /// session was renewed. A failed refresh logs the session out; a result
    /// that arrives after the session changed is discarded.
    pub async fn refresh_now(&self) -> bool {
        let epoch = {
            let shared = self.inner.shared.lock();
            if shared.state != SessionState::Authenticated {
                return false;
            }
            shared.epoch
        };

        let result = self.inner.api.refresh().await;

        let mut shared = self.inner.shared.lock();
        if shared.epoch != epoch || shared.state != SessionState::Authenticated {
            debug!("Session changed during refresh, discarding result");
            return false;
        }

        match result {
            Ok(response) => {
                if let Err(e) =
                    self.inner
                        .store
                        .save(&response.access_token, &response.user, SESSION_TTL_DAYS)
                {
                    warn!(error = %e, "Failed to persist refreshed session");
                }
                self.persist_refresh_cookie();
                shared.data = Some(SessionData {
                    access_token: response.access_token,
                    user: response.user,
                });
                drop(shared);

                debug!("Session refreshed");
                self.emit(SessionEvent::Refreshed);
                true
            }
            Err(e) => {
                drop(shared);
                warn!(error = %e, "Token refresh failed");
                self.end_session(LogoutReason::RefreshFailed, Some(epoch));
                false
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// (Re)start the periodic refresh. The first tick fires one full period
    /// from now. The task holds only a weak reference, so dropping the last
    /// controller also ends it.
    fn arm_refresh(&self, shared: &mut Shared) {
        if let Some(old) = shared.refresh_task.take() {
            old.abort();
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        shared.refresh_task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + REFRESH_INTERVAL, REFRESH_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let controller = SessionController { inner };
                if !controller.refresh_now().await && !controller.is_authenticated() {
                    break;
                }
            }
        }));
        debug!(interval_secs = REFRESH_INTERVAL.as_secs(), "Refresh timer armed");
    }

    /// Keep the refresh cookie next to the token so a restarted process can
    /// still renew a rehydrated session. Called with the state lock held.
    fn persist_refresh_cookie(&self) {
        let Some(cookie) = self.inner.api.refresh_cookie() else {
            return;
        };
        if let Err(e) = self.inner.store.save_refresh_cookie(&cookie, SESSION_TTL_DAYS) {
            warn!(error = %e, "Failed to persist refresh cookie");
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error
        let _ = self.inner.events.send(event);
    }
}

// ============================================================================
// Tests
// ============================================================================
