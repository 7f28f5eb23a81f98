//! Navigation-time access checks.
//!
//! Every `Route` is protected by one of two guards. Guards are pure
//! functions of the current `SessionState`; they never mutate the session.

use super::session::{SessionController, SessionState};

/// Pages inside the authenticated area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminPage {
    Statistics,
    Users,
    Pharmacies,
}

impl AdminPage {
    pub const ALL: [AdminPage; 3] = [AdminPage::Statistics, AdminPage::Users, AdminPage::Pharmacies];

    pub fn title(&self) -> &'static str {
        match self {
            AdminPage::Statistics => "Statistics",
            AdminPage::Users => "Users",
            AdminPage::Pharmacies => "Pharmacies",
        }
    }

    /// Next page (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            AdminPage::Statistics => AdminPage::Users,
            AdminPage::Users => AdminPage::Pharmacies,
            AdminPage::Pharmacies => AdminPage::Statistics,
        }
    }

    /// Previous page (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            AdminPage::Statistics => AdminPage::Pharmacies,
            AdminPage::Users => AdminPage::Statistics,
            AdminPage::Pharmacies => AdminPage::Users,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Admin(AdminPage),
}

impl Route {
    /// Landing page of the authenticated area.
    pub const HOME: Route = Route::Admin(AdminPage::Statistics);

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Admin(AdminPage::Statistics) => "/admin",
            Route::Admin(AdminPage::Users) => "/admin/users",
            Route::Admin(AdminPage::Pharmacies) => "/admin/pharmacies",
        }
    }

    /// Parse a location. `/` is an alias for the authenticated home.
    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" | "/admin" => Some(Route::HOME),
            "/login" => Some(Route::Login),
            "/admin/users" => Some(Route::Admin(AdminPage::Users)),
            "/admin/pharmacies" => Some(Route::Admin(AdminPage::Pharmacies)),
            _ => None,
        }
    }

    pub fn guard(&self) -> Guard {
        match self {
            Route::Login => Guard::PublicOnly,
            Route::Admin(_) => Guard::Protected,
        }
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(Route),
    /// The session is still being validated; render a loading state.
    Wait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Reachable only with an authenticated session.
    Protected,
    /// Reachable only without a session (e.g. the login page).
    PublicOnly,
}

impl Guard {
    pub fn check(&self, state: SessionState) -> Access {
        match (self, state) {
            (_, SessionState::Initializing) => Access::Wait,
            (Guard::Protected, SessionState::Authenticated) => Access::Allow,
            (Guard::Protected, SessionState::Unauthenticated) => Access::Redirect(Route::Login),
            (Guard::PublicOnly, SessionState::Unauthenticated) => Access::Allow,
            (Guard::PublicOnly, SessionState::Authenticated) => Access::Redirect(Route::HOME),
        }
    }
}

/// Decide whether `route` is reachable right now.
pub fn resolve(route: Route, session: &SessionController) -> Access {
    route.guard().check(session.state())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_guard() {
        assert_eq!(Guard::Protected.check(SessionState::Authenticated), Access::Allow);
        assert_eq!(
            Guard::Protected.check(SessionState::Unauthenticated),
            Access::Redirect(Route::Login)
        );
        assert_eq!(Guard::Protected.check(SessionState::Initializing), Access::Wait);
    }

    #[test]
    fn test_public_only_guard() {
        assert_eq!(Guard::PublicOnly.check(SessionState::Unauthenticated), Access::Allow);
        assert_eq!(
            Guard::PublicOnly.check(SessionState::Authenticated),
            Access::Redirect(Route::HOME)
        );
        assert_eq!(Guard::PublicOnly.check(SessionState::Initializing), Access::Wait);
    }

    #[test]
    fn test_route_paths() {
        for page in AdminPage::ALL {
            let route = Route::Admin(page);
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/login"), Some(Route::Login));
        assert_eq!(Route::from_path("/"), Some(Route::HOME));
        assert_eq!(Route::from_path("/admin/users/"), Some(Route::Admin(AdminPage::Users)));
        assert_eq!(Route::from_path("/admin/prescriptions"), None);
    }

    #[test]
    fn test_route_guards() {
        assert_eq!(Route::Login.guard(), Guard::PublicOnly);
        assert_eq!(Route::Admin(AdminPage::Users).guard(), Guard::Protected);
    }

    #[tokio::test]
    async fn test_resolve_follows_session() {
        use crate::auth::{CredentialStore, LogoutReason};
        use crate::testing::{profile, FakeAuthApi};
        use std::sync::Arc;

        let controller =
            SessionController::new(CredentialStore::in_memory(), Arc::new(FakeAuthApi::new()));
        let users = Route::Admin(AdminPage::Users);

        assert_eq!(resolve(users, &controller), Access::Redirect(Route::Login));
        assert_eq!(resolve(Route::Login, &controller), Access::Allow);

        controller.login("T1".to_string(), profile("Ada"));
        assert_eq!(resolve(users, &controller), Access::Allow);
        assert_eq!(resolve(Route::Login, &controller), Access::Redirect(Route::HOME));

        controller.logout(LogoutReason::UserRequested);
        assert_eq!(resolve(users, &controller), Access::Redirect(Route::Login));
    }

    #[test]
    fn test_page_cycle() {
        assert_eq!(AdminPage::Statistics.next(), AdminPage::Users);
        assert_eq!(AdminPage::Pharmacies.next(), AdminPage::Statistics);
        assert_eq!(AdminPage::Statistics.prev(), AdminPage::Pharmacies);
        assert_eq!(AdminPage::Users.prev(), AdminPage::Statistics);
    }
}
