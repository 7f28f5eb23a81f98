//! API client for communicating with the MedDash REST API.
//!
//! `ApiClient` implements two seams used by the rest of the crate:
//! `AuthApi` for the session endpoints and `ResourceApi` for the
//! bearer-authenticated collections behind the list views.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{header, Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::models::{LoginRequest, LoginResponse};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Fallback API location when nothing is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

const REFRESH_PATH: &str = "auth/refresh";

// ============================================================================
// Seams
// ============================================================================

/// Session endpoints of the remote API.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;

    /// `GET /auth/validate` with a bearer token. Ok means the token is valid.
    async fn validate(&self, token: &str) -> Result<(), ApiError>;

    /// `POST /auth/refresh`, authenticated by the refresh cookie.
    async fn refresh(&self) -> Result<LoginResponse, ApiError>;

    /// Cookies the refresh endpoint would receive, as a `Cookie` header value.
    fn refresh_cookie(&self) -> Option<String> {
        None
    }

    /// Put cookies exported by `refresh_cookie` back into place.
    fn restore_refresh_cookie(&self, _cookie: &str) {}
}

/// Bearer-authenticated resource collections (`/pharmacies`, `/users`).
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// `GET /<collection>`; the body must be a JSON array.
    async fn get_collection(
        &self,
        collection: &str,
        token: &str,
    ) -> Result<Vec<serde_json::Value>, ApiError>;

    /// `DELETE /<collection>/<id>`
    async fn delete_item(&self, collection: &str, id: &str, token: &str) -> Result<(), ApiError>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// API client for the MedDash backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling
/// and the cookie jar is shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    jar: Arc<Jar>,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url`
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .cookie_provider(jar.clone())
            .build()?;

        Ok(Self {
            client,
            jar,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn refresh_url(&self) -> Option<Url> {
        match Url::parse(&self.url(REFRESH_PATH)) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(base_url = %self.base_url, error = %e, "Backend URL is not a valid URL");
                None
            }
        }
    }

    fn bearer_headers(token: &str) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::InvalidResponse("Token is not a valid header value".to_string()))?;
        headers.insert(header::AUTHORIZATION, value);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(url = url, error = %e, "Failed to parse JSON response");
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e))
        })
    }

    /// Send a request built by `build`, retrying with exponential backoff
    /// while the server answers 429.
    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<Response, ApiError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build().send().await?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Self::check_response(response).await;
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited);
            }
            warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms *= 2;
        }
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let url = self.url("auth/login");
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let response = Self::check_response(response).await?;
        debug!("Login response received");
        Self::parse_json(response, &url).await
    }

    async fn validate(&self, token: &str) -> Result<(), ApiError> {
        let url = self.url("auth/validate");
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn refresh(&self) -> Result<LoginResponse, ApiError> {
        let url = self.url(REFRESH_PATH);
        // Cookies set by the login response ride along from the client's jar
        let response = self.client.post(&url).send().await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response, &url).await
    }

    fn refresh_cookie(&self) -> Option<String> {
        let url = self.refresh_url()?;
        let value = self.jar.cookies(&url)?;
        value.to_str().ok().map(str::to_string)
    }

    fn restore_refresh_cookie(&self, cookie: &str) {
        let Some(url) = self.refresh_url() else {
            return;
        };
        let mut restored = 0;
        for pair in cookie.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            self.jar.add_cookie_str(pair, &url);
            restored += 1;
        }
        debug!(count = restored, "Refresh cookies restored");
    }
}

#[async_trait]
impl ResourceApi for ApiClient {
    async fn get_collection(
        &self,
        collection: &str,
        token: &str,
    ) -> Result<Vec<serde_json::Value>, ApiError> {
        let url = self.url(collection);
        let headers = Self::bearer_headers(token)?;
        let response = self
            .send_with_retry(&url, || self.client.get(&url).headers(headers.clone()))
            .await?;
        let rows: Vec<serde_json::Value> = Self::parse_json(response, &url).await?;
        debug!(url = %url, count = rows.len(), "Collection fetched");
        Ok(rows)
    }

    async fn delete_item(&self, collection: &str, id: &str, token: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("{}/{}", collection.trim_end_matches('/'), id));
        let headers = Self::bearer_headers(token)?;
        self.send_with_retry(&url, || self.client.delete(&url).headers(headers.clone()))
            .await?;
        debug!(url = %url, "Item deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = ApiClient::new("https://api.example.com/").unwrap();
        assert_eq!(client.base_url(), "https://api.example.com");
        assert_eq!(client.url("/auth/validate"), "https://api.example.com/auth/validate");
        assert_eq!(client.url("pharmacies"), "https://api.example.com/pharmacies");
    }

    #[test]
    fn test_bearer_headers() {
        let headers = ApiClient::bearer_headers("abc").unwrap();
        assert_eq!(headers[header::AUTHORIZATION], "Bearer abc");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_bearer_headers_reject_control_chars() {
        assert!(ApiClient::bearer_headers("bad\ntoken").is_err());
    }

    #[test]
    fn test_refresh_cookie_survives_a_new_client() {
        let first = ApiClient::new("http://localhost:3000").unwrap();
        assert_eq!(first.refresh_cookie(), None);

        first.restore_refresh_cookie("refreshToken=r1; theme=dark");
        let exported = first.refresh_cookie().unwrap();
        assert!(exported.contains("refreshToken=r1"));
        assert!(exported.contains("theme=dark"));

        let second = ApiClient::new("http://localhost:3000").unwrap();
        second.restore_refresh_cookie(&exported);
        let again = second.refresh_cookie().unwrap();
        assert!(again.contains("refreshToken=r1"));
        assert!(again.contains("theme=dark"));
    }
}
