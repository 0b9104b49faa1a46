// Persistence of the auth token, cached user info, remembered email and
// the pending post-login path.
// Storage problems never reach callers: writes become no-ops and reads
// come back empty.

use std::sync::Arc;

use tracing::warn;

use crate::domain::{KeyValueStorage, NormalizedUser};

pub const TOKEN_KEY: &str = "authToken";
pub const USER_KEY: &str = "userInfo";
pub const EMAIL_KEY: &str = "userEmail";
pub const REDIRECT_KEY: &str = "redirectAfterLogin";

#[derive(Clone)]
pub struct SessionStore {
    // None when no persistent area exists in this execution context.
    storage: Option<Arc<dyn KeyValueStorage>>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage: Some(storage),
        }
    }

    pub fn unavailable() -> Self {
        Self { storage: None }
    }

    pub fn is_available(&self) -> bool {
        self.storage.is_some()
    }

    pub fn save(&self, token: &str) {
        self.write(TOKEN_KEY, token);
    }

    pub fn load(&self) -> Option<String> {
        self.read(TOKEN_KEY).filter(|token| !token.is_empty())
    }

    pub fn clear(&self) {
        self.delete(TOKEN_KEY);
    }

    pub fn save_user(&self, user: &NormalizedUser) {
        match serde_json::to_string(user) {
            Ok(serialized) => self.write(USER_KEY, &serialized),
            Err(err) => warn!(error = %err, "failed to serialize user info"),
        }
    }

    pub fn load_user(&self) -> Option<NormalizedUser> {
        let raw = self.read(USER_KEY)?;
        serde_json::from_str(&raw)
            .inspect_err(|err| warn!(error = %err, "discarding unreadable user info"))
            .ok()
    }

    pub fn clear_user(&self) {
        self.delete(USER_KEY);
    }

    // Token and cached user go together; the remembered email stays.
    pub fn clear_session(&self) {
        self.clear();
        self.clear_user();
    }

    pub fn remember_email(&self, email: &str) {
        self.write(EMAIL_KEY, email);
    }

    pub fn recall_email(&self) -> Option<String> {
        self.read(EMAIL_KEY)
    }

    pub fn forget_email(&self) {
        self.delete(EMAIL_KEY);
    }

    pub fn remember_redirect(&self, path: &str) {
        self.write(REDIRECT_KEY, path);
    }

    // One-shot: the stored path is removed on read.
    pub fn take_redirect(&self) -> Option<String> {
        let path = self.read(REDIRECT_KEY)?;
        self.delete(REDIRECT_KEY);
        Some(path).filter(|path| !path.is_empty())
    }

    fn read(&self, key: &str) -> Option<String> {
        let storage = self.storage.as_ref()?;
        storage
            .get(key)
            .inspect_err(|err| warn!(key, error = %err, "storage read failed"))
            .ok()
            .flatten()
    }

    fn write(&self, key: &str, value: &str) {
        if let Some(storage) = &self.storage {
            if let Err(err) = storage.set(key, value) {
                warn!(key, error = %err, "storage write failed");
            }
        }
    }

    fn delete(&self, key: &str) {
        if let Some(storage) = &self.storage {
            if let Err(err) = storage.remove(key) {
                warn!(key, error = %err, "storage remove failed");
            }
        }
    }
}
