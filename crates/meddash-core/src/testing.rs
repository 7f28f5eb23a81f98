//! Scripted fakes of the API seams shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;

use crate::api::{ApiError, AuthApi, ResourceApi};
use crate::auth::{CredentialStore, SessionController};
use crate::models::{LoginResponse, UserProfile};

pub fn profile(given: &str) -> UserProfile {
    UserProfile {
        given_name: given.to_string(),
        family_name: "Tester".to_string(),
        email: format!("{}@example.com", given.to_lowercase()),
        phone_number: "5551234567".to_string(),
        role: "admin".to_string(),
        avatar: None,
        cognito_id: None,
    }
}

fn status_result(status: StatusCode) -> Result<(), ApiError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ApiError::from_status(status, "scripted failure"))
    }
}

/// `AuthApi` whose answers are set up front.
pub struct FakeAuthApi {
    pub validate_status: Mutex<StatusCode>,
    pub refresh_status: Mutex<StatusCode>,
    pub refresh_token: Mutex<String>,
    pub refresh_user: Mutex<UserProfile>,
    pub login_status: Mutex<StatusCode>,
    /// What the cookie jar holds for the refresh endpoint
    pub cookie: Mutex<Option<String>>,
    pub restored_cookies: Mutex<Vec<String>>,
    /// Simulated network latency for validate and refresh
    pub delay: Mutex<Duration>,
    pub validate_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
}

impl FakeAuthApi {
    pub fn new() -> Self {
        Self {
            validate_status: Mutex::new(StatusCode::OK),
            refresh_status: Mutex::new(StatusCode::OK),
            refresh_token: Mutex::new("T2".to_string()),
            refresh_user: Mutex::new(profile("Refreshed")),
            login_status: Mutex::new(StatusCode::OK),
            cookie: Mutex::new(None),
            restored_cookies: Mutex::new(Vec::new()),
            delay: Mutex::new(Duration::ZERO),
            validate_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
        }
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    async fn latency(&self) {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn login(&self, email: &str, _password: &str) -> Result<LoginResponse, ApiError> {
        let status = *self.login_status.lock();
        status_result(status)?;
        let mut user = profile("Login");
        user.email = email.to_string();
        Ok(LoginResponse {
            access_token: "T1".to_string(),
            user,
        })
    }

    async fn validate(&self, _token: &str) -> Result<(), ApiError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.latency().await;
        let status = *self.validate_status.lock();
        status_result(status)
    }

    async fn refresh(&self) -> Result<LoginResponse, ApiError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.latency().await;
        let status = *self.refresh_status.lock();
        status_result(status)?;
        Ok(LoginResponse {
            access_token: self.refresh_token.lock().clone(),
            user: self.refresh_user.lock().clone(),
        })
    }

    fn refresh_cookie(&self) -> Option<String> {
        self.cookie.lock().clone()
    }

    fn restore_refresh_cookie(&self, cookie: &str) {
        self.restored_cookies.lock().push(cookie.to_string());
        *self.cookie.lock() = Some(cookie.to_string());
    }
}

/// `ResourceApi` serving in-memory collections with scripted failures.
#[derive(Default)]
pub struct FakeResourceApi {
    pub collections: Mutex<HashMap<String, Vec<serde_json::Value>>>,
    pub get_status: Mutex<Option<StatusCode>>,
    pub delete_status: Mutex<Option<StatusCode>>,
    pub deleted: Mutex<Vec<(String, String)>>,
    pub tokens_seen: Mutex<Vec<String>>,
}

impl FakeResourceApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(self, name: &str, rows: Vec<serde_json::Value>) -> Self {
        self.collections.lock().insert(name.to_string(), rows);
        self
    }

    pub fn fail_get(&self, status: StatusCode) {
        *self.get_status.lock() = Some(status);
    }

    pub fn fail_delete(&self, status: StatusCode) {
        *self.delete_status.lock() = Some(status);
    }
}

#[async_trait]
impl ResourceApi for FakeResourceApi {
    async fn get_collection(
        &self,
        collection: &str,
        token: &str,
    ) -> Result<Vec<serde_json::Value>, ApiError> {
        self.tokens_seen.lock().push(token.to_string());
        if let Some(status) = *self.get_status.lock() {
            status_result(status)?;
        }
        Ok(self
            .collections
            .lock()
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_item(&self, collection: &str, id: &str, token: &str) -> Result<(), ApiError> {
        self.tokens_seen.lock().push(token.to_string());
        if let Some(status) = *self.delete_status.lock() {
            status_result(status)?;
        }
        self.deleted
            .lock()
            .push((collection.to_string(), id.to_string()));
        Ok(())
    }
}

/// Controller that is already signed in as "Ada" with token "T1".
pub fn signed_in_controller(api: Arc<FakeAuthApi>) -> SessionController {
    let controller = SessionController::new(CredentialStore::in_memory(), api);
    controller.login("T1".to_string(), profile("Ada"));
    controller
}
