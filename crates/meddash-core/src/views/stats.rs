//! View model for the Statistics page.

use tracing::{debug, error, warn};

use crate::api::{ApiError, ResourceApi};
use crate::auth::{LogoutReason, SessionController};
use crate::models::{AdminUser, DashboardStats, Pharmacy};

use super::list::{decode_rows, Resource, ViewOutcome};

pub struct StatisticsView {
    stats: Option<DashboardStats>,
    loading: bool,
    error: Option<String>,
}

impl Default for StatisticsView {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticsView {
    pub fn new() -> Self {
        Self {
            stats: None,
            loading: true,
            error: None,
        }
    }

    /// Fetch users and pharmacies concurrently and recompute the figures.
    /// Either request failing leaves the previous figures in place.
    pub async fn load(&mut self, session: &SessionController, api: &dyn ResourceApi) -> ViewOutcome {
        let generation = session.generation();
        let Some(token) = session.token() else {
            warn!("No authentication token found");
            self.loading = false;
            session.logout(LogoutReason::MissingToken);
            return ViewOutcome::LoggedOut;
        };

        let (users, pharmacies) = futures::join!(
            api.get_collection(AdminUser::COLLECTION, &token),
            api.get_collection(Pharmacy::COLLECTION, &token),
        );
        self.loading = false;

        if session.generation() != generation {
            debug!("Session changed during statistics fetch");
            return ViewOutcome::Discarded;
        }

        let (users, pharmacies) = match (users, pharmacies) {
            (Ok(u), Ok(p)) => (u, p),
            (Err(e), _) | (_, Err(e)) => return self.handle_failure(session, e),
        };

        let users: Vec<AdminUser> = decode_rows(users);
        let pharmacies: Vec<Pharmacy> = decode_rows(pharmacies);
        let stats = DashboardStats::from_collections(&users, &pharmacies);
        debug!(?stats, "Statistics computed");
        self.stats = Some(stats);
        self.error = None;
        ViewOutcome::Updated
    }

    fn handle_failure(&mut self, session: &SessionController, err: ApiError) -> ViewOutcome {
        if err.is_unauthorized() {
            warn!("Session expired while loading statistics");
            session.logout(LogoutReason::Unauthorized);
            return ViewOutcome::LoggedOut;
        }
        error!(error = %err, "Failed to load statistics");
        self.error = Some(format!("Failed to fetch statistics: {}", err.status_text()));
        ViewOutcome::Failed
    }

    pub fn stats(&self) -> Option<&DashboardStats> {
        self.stats.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
