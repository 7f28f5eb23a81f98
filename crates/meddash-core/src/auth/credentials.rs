//! Persistent storage for the access token and user profile.
//!
//! The `CredentialStore` keeps two independent entries (plus the refresh
//! cookie that lets a later process renew the token), each wrapped in an
//! envelope carrying its own expiry time, on top of a pluggable
//! `KeyValueBackend` (plain files, the OS keychain, or memory).

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use keyring::Entry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::UserProfile;

/// Keychain service name used by the keyring backend
const SERVICE_NAME: &str = "meddash";

/// Key of the access token entry
pub const TOKEN_KEY: &str = "accessToken";

/// Key of the (base64 encoded) profile entry
pub const PROFILE_KEY: &str = "user";

/// Key of the refresh cookie, as a `Cookie` header value
pub const REFRESH_COOKIE_KEY: &str = "refreshCookie";

/// Default persistence horizon for a session.
pub const SESSION_TTL_DAYS: i64 = 1;

// ============================================================================
// Backends
// ============================================================================

/// Raw string storage underneath the credential store.
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One JSON file per key inside a directory.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read credential file: {}", key))?;
        Ok(Some(contents))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context("Failed to create credential directory")?;
        let path = self.entry_path(key);
        std::fs::write(&path, value)
            .with_context(|| format!("Failed to write credential file: {}", key))?;
        restrict_permissions(&path);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove credential file: {}", key))?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        warn!(error = %e, "Failed to restrict credential file permissions");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &std::path::Path) {}

/// OS keychain via the `keyring` crate. One keychain item per key.
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueBackend for KeyringBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve credential from keychain"),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store credential in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

/// In-process storage, lost on exit.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

// ============================================================================
// Credential store
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl StoredEntry {
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// What `CredentialStore::load` found. Either field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredCredentials {
    pub token: Option<String>,
    pub profile: Option<UserProfile>,
}

pub struct CredentialStore {
    backend: Box<dyn KeyValueBackend>,
}

impl CredentialStore {
    pub fn new(backend: Box<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    /// Store backed by memory only
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Persist the token and profile, each expiring `ttl_days` from now.
    pub fn save(&self, token: &str, profile: &UserProfile, ttl_days: i64) -> Result<()> {
        let expires_at = Utc::now() + Duration::days(ttl_days);
        let profile_json = serde_json::to_string(profile).context("Failed to serialize profile")?;
        let encoded_profile = STANDARD.encode(profile_json);

        self.write_entry(TOKEN_KEY, token, expires_at)?;
        self.write_entry(PROFILE_KEY, &encoded_profile, expires_at)?;
        debug!(%expires_at, "Credentials saved");
        Ok(())
    }

    /// Read whatever is stored. Expired, unreadable or corrupted entries
    /// come back as absent; this never fails.
    pub fn load(&self) -> StoredCredentials {
        let token = self.read_entry(TOKEN_KEY);
        let profile = self.read_entry(PROFILE_KEY).and_then(|encoded| {
            match Self::decode_profile(&encoded) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!(error = %e, "Stored profile is corrupted, ignoring it");
                    None
                }
            }
        });
        StoredCredentials { token, profile }
    }

    /// Persist the cookies the refresh endpoint expects.
    pub fn save_refresh_cookie(&self, cookie: &str, ttl_days: i64) -> Result<()> {
        let expires_at = Utc::now() + Duration::days(ttl_days);
        self.write_entry(REFRESH_COOKIE_KEY, cookie, expires_at)
    }

    pub fn load_refresh_cookie(&self) -> Option<String> {
        self.read_entry(REFRESH_COOKIE_KEY)
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<()> {
        let token_result = self.backend.remove(TOKEN_KEY);
        let profile_result = self.backend.remove(PROFILE_KEY);
        let cookie_result = self.backend.remove(REFRESH_COOKIE_KEY);
        token_result?;
        profile_result?;
        cookie_result?;
        debug!("Credentials cleared");
        Ok(())
    }

    fn write_entry(&self, key: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let entry = StoredEntry {
            value: value.to_string(),
            expires_at,
        };
        let contents = serde_json::to_string(&entry)?;
        self.backend.set(key, &contents)
    }

    fn read_entry(&self, key: &str) -> Option<String> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read stored credential");
                return None;
            }
        };

        let entry: StoredEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = key, error = %e, "Stored credential is corrupted, ignoring it");
                return None;
            }
        };

        if entry.is_expired() {
            debug!(key = key, "Stored credential expired");
            if let Err(e) = self.backend.remove(key) {
                warn!(key = key, error = %e, "Failed to remove expired credential");
            }
            return None;
        }

        Some(entry.value)
    }

    fn decode_profile(encoded: &str) -> Result<UserProfile> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .context("Profile is not valid base64")?;
        serde_json::from_slice(&bytes).context("Profile is not a valid user record")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            given_name: "Ada".to_string(),
            family_name: "Douglas".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: "5551234567".to_string(),
            role: "admin".to_string(),
            avatar: Some("https://example.com/a.png".to_string()),
            cognito_id: None,
        }
    }

    #[test]
    fn test_save_then_load() {
        let store = CredentialStore::in_memory();
        store.save("T1", &profile(), SESSION_TTL_DAYS).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.token.as_deref(), Some("T1"));
        assert_eq!(loaded.profile, Some(profile()));
    }

    #[test]
    fn test_load_empty_store() {
        let store = CredentialStore::in_memory();
        assert_eq!(store.load(), StoredCredentials::default());
    }

    #[test]
    fn test_clear_removes_both_entries() {
        let store = CredentialStore::in_memory();
        store.save("T1", &profile(), SESSION_TTL_DAYS).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load(), StoredCredentials::default());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_refresh_cookie_saved_and_cleared() {
        let store = CredentialStore::in_memory();
        assert_eq!(store.load_refresh_cookie(), None);

        store.save("T1", &profile(), SESSION_TTL_DAYS).unwrap();
        store.save_refresh_cookie("refreshToken=r1", SESSION_TTL_DAYS).unwrap();
        assert_eq!(store.load_refresh_cookie().as_deref(), Some("refreshToken=r1"));

        store.clear().unwrap();
        assert_eq!(store.load_refresh_cookie(), None);
        assert!(store.backend.get(REFRESH_COOKIE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_expired_refresh_cookie_is_absent() {
        let store = CredentialStore::in_memory();
        store.save_refresh_cookie("refreshToken=r1", -1).unwrap();
        assert_eq!(store.load_refresh_cookie(), None);
    }

    #[test]
    fn test_profile_is_encoded_not_plain() {
        let store = CredentialStore::in_memory();
        store.save("T1", &profile(), 1).unwrap();

        let raw = store.backend.get(PROFILE_KEY).unwrap().unwrap();
        let entry: StoredEntry = serde_json::from_str(&raw).unwrap();
        assert!(!entry.value.contains("Ada"));
        assert_eq!(CredentialStore::decode_profile(&entry.value).unwrap(), profile());
    }

    #[test]
    fn test_corrupted_profile_yields_absent_profile() {
        let store = CredentialStore::in_memory();
        store.save("T1", &profile(), SESSION_TTL_DAYS).unwrap();
        store
            .write_entry(PROFILE_KEY, "%%%not-base64%%%", Utc::now() + Duration::days(1))
            .unwrap();

        let loaded = store.load();
        assert_eq!(loaded.token.as_deref(), Some("T1"));
        assert_eq!(loaded.profile, None);
    }

    #[test]
    fn test_base64_of_garbage_json_yields_absent_profile() {
        let store = CredentialStore::in_memory();
        let garbage = STANDARD.encode("{\"givenName\": 3");
        store
            .write_entry(PROFILE_KEY, &garbage, Utc::now() + Duration::days(1))
            .unwrap();
        assert_eq!(store.load().profile, None);
    }

    #[test]
    fn test_corrupted_envelope_yields_absent_token() {
        let store = CredentialStore::in_memory();
        store.backend.set(TOKEN_KEY, "not json at all").unwrap();
        assert_eq!(store.load().token, None);
    }

    #[test]
    fn test_expired_entries_are_absent_and_removed() {
        let store = CredentialStore::in_memory();
        store.save("T1", &profile(), -1).unwrap();

        assert_eq!(store.load(), StoredCredentials::default());
        assert!(store.backend.get(TOKEN_KEY).unwrap().is_none());
        assert!(store.backend.get(PROFILE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_entries_expire_independently() {
        let store = CredentialStore::in_memory();
        store.save("T1", &profile(), 1).unwrap();
        store
            .write_entry(TOKEN_KEY, "T1", Utc::now() - Duration::minutes(1))
            .unwrap();

        let loaded = store.load();
        assert_eq!(loaded.token, None);
        assert_eq!(loaded.profile, Some(profile()));
    }

    #[test]
    fn test_file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(Box::new(FileBackend::new(dir.path().join("creds"))));
        store.save("T1", &profile(), 1).unwrap();

        let reopened = CredentialStore::new(Box::new(FileBackend::new(dir.path().join("creds"))));
        let loaded = reopened.load();
        assert_eq!(loaded.token.as_deref(), Some("T1"));
        assert_eq!(loaded.profile, Some(profile()));

        reopened.clear().unwrap();
        assert!(!dir.path().join("creds").join("accessToken.json").exists());
    }

    #[test]
    fn test_file_backend_missing_dir_reads_absent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("nope"));
        assert!(backend.get(TOKEN_KEY).unwrap().is_none());
        backend.remove(TOKEN_KEY).unwrap();
    }
}
