//! Capability surface of the platform service.
//!
//! Everything that touches the network, the cookie jar or the risk oracle is
//! reached through [`Backend`], so the orchestration code can be driven by a
//! scripted implementation in tests.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::{IntegrityLevel, Profile, ScanStage};

/// One page of a followers/following enumeration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPage {
    pub profiles: Vec<Profile>,
    /// Total size of the edge as reported by the platform.
    pub total: u32,
    /// Cursor for the next page, `None` on the last page.
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Current risk budget. Regeneration is the backend's business.
    async fn get_integrity(&self) -> Result<IntegrityLevel>;

    /// Best-effort keep-alive. Callers ignore failures.
    async fn warmup_connection(&self) -> Result<()>;

    /// Resume the session the durable pointer refers to.
    async fn restore_session(&self, pointer: &Path) -> Result<String>;

    /// Load a session from an exported cookie file.
    async fn load_session(&self, path: &Path) -> Result<String>;

    async fn get_logged_user_id(&self) -> Result<Option<String>>;

    /// Full profile of the logged-in user. May fail while the session is fine.
    async fn get_current_user(&self) -> Result<Profile>;

    async fn get_user_id(&self, username: &str) -> Result<String>;

    async fn fetch_connections(
        &self,
        user_id: &str,
        stage: ScanStage,
        cursor: Option<&str>,
    ) -> Result<ConnectionPage>;

    async fn unfollow_user(&self, user_id: &str) -> Result<bool>;

    /// Fetch an image and return it as a `data:` URL.
    async fn proxy_pic(&self, url: &str) -> Result<String>;
}
