use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use super::backend::Backend;
use super::types::{Session, SessionOrigin};
use crate::error::AppError;

/// Durable pointer to the last session that loaded successfully.
pub trait SessionStore: Send + Sync {
    fn pointer(&self) -> Option<String>;
    fn set_pointer(&self, path: &str) -> Result<(), AppError>;
    fn clear_pointer(&self) -> Result<(), AppError>;
}

/// In-process store, used in tests and when the preference file is unavailable.
#[derive(Default)]
pub struct MemorySessionStore {
    pointer: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn with_pointer(path: &str) -> Self {
        Self {
            pointer: Mutex::new(Some(path.to_string())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn pointer(&self) -> Option<String> {
        self.pointer.lock().ok().and_then(|p| p.clone())
    }

    fn set_pointer(&self, path: &str) -> Result<(), AppError> {
        let mut guard = self
            .pointer
            .lock()
            .map_err(|e| AppError::Config(format!("Session store poisoned: {}", e)))?;
        *guard = Some(path.to_string());
        Ok(())
    }

    fn clear_pointer(&self) -> Result<(), AppError> {
        let mut guard = self
            .pointer
            .lock()
            .map_err(|e| AppError::Config(format!("Session store poisoned: {}", e)))?;
        *guard = None;
        Ok(())
    }
}

pub struct SessionManager {
    backend: Arc<dyn Backend>,
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<dyn SessionStore>) -> Self {
        Self { backend, store }
    }

    pub fn pointer(&self) -> Option<String> {
        self.store.pointer()
    }

    /// Resume the persisted session without user interaction.
    ///
    /// Every failure comes back as [`AppError::NoSavedSession`], which callers
    /// treat as a silent outcome. A pointer that no longer restores is cleared.
    pub async fn restore(&self) -> Result<Session, AppError> {
        let pointer = match self.store.pointer() {
            Some(p) if !p.is_empty() => p,
            _ => {
                info!("No previous session to restore");
                return Err(AppError::NoSavedSession);
            }
        };

        let restored = match self.backend.restore_session(Path::new(&pointer)).await {
            Ok(message) => {
                info!("Restored session: {}", message);
                self.establish(SessionOrigin::Restored, Some(pointer.clone())).await
            }
            Err(e) => Err(AppError::Session(format!("{:#}", e))),
        };

        restored.map_err(|e| {
            warn!("Could not restore session from {}: {}", pointer, e);
            self.forget();
            AppError::NoSavedSession
        })
    }

    /// Load a session from an explicit file. On success the path becomes the
    /// restore target; on failure any restore target is cleared.
    pub async fn load(&self, path: &str) -> Result<Session, AppError> {
        info!("Loading session from {}", path);
        let loaded = match self.backend.load_session(Path::new(path)).await {
            Ok(message) => {
                info!("Session loaded: {}", message);
                self.establish(SessionOrigin::Loaded, Some(path.to_string())).await
            }
            Err(e) => Err(AppError::Session(format!("{:#}", e))),
        };

        match loaded {
            Ok(session) => {
                if let Err(e) = self.store.set_pointer(path) {
                    warn!("Failed to persist session pointer: {}", e);
                }
                Ok(session)
            }
            Err(e) => {
                warn!("Session load failed for {}: {}", path, e);
                self.forget();
                Err(e)
            }
        }
    }

    fn forget(&self) {
        if let Err(e) = self.store.clear_pointer() {
            warn!("Failed to clear session pointer: {}", e);
        }
    }

    /// Resolve the identity id, then the full profile on a best-effort basis.
    async fn establish(&self, origin: SessionOrigin, path: Option<String>) -> Result<Session, AppError> {
        let identity_id = self
            .backend
            .get_logged_user_id()
            .await
            .map_err(|e| AppError::Session(format!("Failed to resolve user id: {:#}", e)))?;

        let current_identity = match self.backend.get_current_user().await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("Failed to fetch profile details: {:#}", e);
                None
            }
        };

        Ok(Session {
            origin,
            path,
            identity_id,
            current_identity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemorySessionStore::default();
        assert_eq!(store.pointer(), None);
        store.set_pointer("/tmp/cookies.json").unwrap();
        assert_eq!(store.pointer().as_deref(), Some("/tmp/cookies.json"));
        store.clear_pointer().unwrap();
        assert_eq!(store.pointer(), None);
    }
}
