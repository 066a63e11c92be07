//! Production [`Backend`] over the Instagram web API.
//!
//! Authentication rides on cookies exported from a logged-in browser. Every
//! request carries those cookies plus the CSRF token, and paginated reads are
//! paced with a randomized delay.

pub mod cookies;
pub mod http_client;
pub mod image_prep;
pub mod parse;
pub mod risk;

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::engine::backend::{Backend, ConnectionPage};
use crate::engine::types::{IntegrityLevel, Profile, ScanStage};
use crate::settings::ClientSettings;
use cookies::SessionCookies;
use http_client::InstagramHttp;
use risk::RiskTracker;

/// Copy of the last loaded cookie file, kept in the app data dir so a restore
/// survives the original export being moved or deleted.
pub const SESSION_SNAPSHOT_FILE: &str = "instafollows_session.json";

const GRAPHQL_PATH: &str = "/graphql/query";
const PROFILE_INFO_PATH: &str = "/api/v1/users/web_profile_info/";
const EDIT_FORM_PATH: &str = "/api/v1/accounts/edit/web_form_data/";

pub struct GhostClient {
    http: InstagramHttp,
    page_size: u32,
    data_dir: Option<PathBuf>,
    session: RwLock<Option<Arc<SessionCookies>>>,
    risk: RiskTracker,
}

impl GhostClient {
    pub fn new(settings: &ClientSettings, data_dir: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            http: InstagramHttp::new(settings)?,
            page_size: settings.page_size,
            data_dir,
            session: RwLock::new(None),
            risk: RiskTracker::new(),
        })
    }

    fn snapshot_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|d| d.join(SESSION_SNAPSHOT_FILE))
    }

    fn current(&self) -> Option<Arc<SessionCookies>> {
        self.session
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn require_session(&self) -> Result<Arc<SessionCookies>> {
        self.current().ok_or_else(|| anyhow!("Session not loaded"))
    }

    fn set_session(&self, cookies: Option<SessionCookies>) {
        let mut slot = self.session.write().unwrap_or_else(|p| p.into_inner());
        *slot = cookies.map(Arc::new);
    }

    fn write_snapshot(&self, cookies: &SessionCookies) {
        let Some(path) = self.snapshot_path() else {
            return;
        };
        let written = cookies.to_json().and_then(|json| {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, json)?;
            Ok(())
        });
        if let Err(e) = written {
            warn!("Failed to save session snapshot to {:?}: {:#}", path, e);
        }
    }

    fn remove_snapshot(&self) {
        if let Some(path) = self.snapshot_path().filter(|p| p.exists()) {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Failed to remove session snapshot {:?}: {}", path, e);
            }
        }
    }

    fn activate(&self, cookies: SessionCookies) -> String {
        let message = format!("Session loaded. User ID: {}", cookies.user_id);
        self.set_session(Some(cookies));
        message
    }

    async fn profile_by_username(&self, username: &str, session: &SessionCookies) -> Result<Profile> {
        let json = self
            .http
            .get_json(PROFILE_INFO_PATH, &[("username", username)], session)
            .await?;
        parse::parse_web_profile(&json).with_context(|| format!("User not found: {}", username))
    }
}

#[async_trait]
impl Backend for GhostClient {
    async fn get_integrity(&self) -> Result<IntegrityLevel> {
        Ok(self.risk.integrity())
    }

    async fn warmup_connection(&self) -> Result<()> {
        self.http.warmup().await
    }

    async fn restore_session(&self, pointer: &Path) -> Result<String> {
        let snapshot = self.snapshot_path().filter(|p| p.exists());
        let source = snapshot.as_deref().unwrap_or(pointer);
        info!("Restoring session from {:?}", source);

        match SessionCookies::read(source) {
            Ok(cookies) => Ok(self.activate(cookies)),
            Err(e) => {
                self.set_session(None);
                Err(e.context("No saved session found"))
            }
        }
    }

    async fn load_session(&self, path: &Path) -> Result<String> {
        match SessionCookies::read(path) {
            Ok(cookies) => {
                self.write_snapshot(&cookies);
                Ok(self.activate(cookies))
            }
            Err(e) => {
                self.set_session(None);
                self.remove_snapshot();
                Err(e)
            }
        }
    }

    async fn get_logged_user_id(&self) -> Result<Option<String>> {
        Ok(self.current().map(|s| s.user_id.clone()))
    }

    async fn get_current_user(&self) -> Result<Profile> {
        let session = self.require_session()?;
        let username = match &session.username {
            Some(username) => username.clone(),
            None => {
                let json = self.http.get_json(EDIT_FORM_PATH, &[], &session).await?;
                parse::parse_form_username(&json)?
            }
        };
        self.profile_by_username(&username, &session).await
    }

    async fn get_user_id(&self, username: &str) -> Result<String> {
        let session = self.require_session()?;
        Ok(self.profile_by_username(username, &session).await?.id)
    }

    async fn fetch_connections(
        &self,
        user_id: &str,
        stage: ScanStage,
        cursor: Option<&str>,
    ) -> Result<ConnectionPage> {
        let session = self.require_session()?;
        let mut variables = serde_json::json!({
            "id": user_id,
            "first": self.page_size,
        });
        if let Some(cursor) = cursor {
            variables["after"] = cursor.into();
        }
        let variables = variables.to_string();

        self.http.pacer().wait().await;
        let json = self
            .http
            .get_json(
                GRAPHQL_PATH,
                &[("query_hash", parse::query_hash(stage)), ("variables", variables.as_str())],
                &session,
            )
            .await?;
        let page = parse::parse_connection_page(&json, stage)?;
        self.risk.record_fetch(page.profiles.len() as u32);
        Ok(page)
    }

    async fn unfollow_user(&self, user_id: &str) -> Result<bool> {
        let session = self.require_session()?;
        let path = format!("/api/v1/friendships/destroy/{}/", urlencoding::encode(user_id));
        let json = self
            .http
            .post_form(&path, &[("user_id", user_id)], &session)
            .await?;

        let ok = parse::parse_action_ok(&json);
        if ok {
            self.risk.record_unfollow();
            info!("Unfollowed user {}", user_id);
        } else {
            warn!("Unfollow of {} was not confirmed: {}", user_id, json);
        }
        Ok(ok)
    }

    async fn proxy_pic(&self, url: &str) -> Result<String> {
        let (content_type, bytes) = self.http.get_image(url).await?;
        Ok(image_prep::avatar_data_url(&bytes, content_type.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::default_settings;

    const COOKIES: &str = r#"[{"name":"sessionid","value":"31%3Axyz"},
        {"name":"csrftoken","value":"tok"},{"name":"ds_user","value":"ghost"}]"#;

    fn client(dir: &Path) -> GhostClient {
        GhostClient::new(&default_settings(), Some(dir.to_path_buf())).unwrap()
    }

    #[tokio::test]
    async fn test_load_session_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let export = dir.path().join("cookies.json");
        std::fs::write(&export, COOKIES).unwrap();

        let ghost = client(&dir.path().join("data"));
        let message = ghost.load_session(&export).await.unwrap();
        assert!(message.contains("31"));
        assert_eq!(ghost.get_logged_user_id().await.unwrap().as_deref(), Some("31"));
        assert!(dir.path().join("data").join(SESSION_SNAPSHOT_FILE).exists());
    }

    #[tokio::test]
    async fn test_restore_prefers_snapshot_over_moved_export() {
        let dir = tempfile::tempdir().unwrap();
        let export = dir.path().join("cookies.json");
        std::fs::write(&export, COOKIES).unwrap();
        client(dir.path()).load_session(&export).await.unwrap();
        std::fs::remove_file(&export).unwrap();

        let fresh = client(dir.path());
        fresh.restore_session(&export).await.unwrap();
        assert_eq!(fresh.get_logged_user_id().await.unwrap().as_deref(), Some("31"));
    }

    #[tokio::test]
    async fn test_failed_load_clears_session_and_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        std::fs::write(&good, COOKIES).unwrap();
        std::fs::write(&bad, r#"[{"name":"mid","value":"1"}]"#).unwrap();

        let ghost = client(dir.path());
        ghost.load_session(&good).await.unwrap();
        assert!(ghost.load_session(&bad).await.is_err());
        assert_eq!(ghost.get_logged_user_id().await.unwrap(), None);
        assert!(!dir.path().join(SESSION_SNAPSHOT_FILE).exists());
    }

    #[tokio::test]
    async fn test_restore_without_anything_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ghost = client(dir.path());
        assert!(ghost.restore_session(&dir.path().join("missing.json")).await.is_err());
    }

    #[tokio::test]
    async fn test_network_calls_require_session() {
        let dir = tempfile::tempdir().unwrap();
        let ghost = client(dir.path());
        let err = ghost
            .fetch_connections("1", ScanStage::Followers, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Session not loaded"));
        assert!(ghost.unfollow_user("1").await.is_err());
    }

    #[tokio::test]
    async fn test_fresh_client_reports_full_integrity() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(client(dir.path()).get_integrity().await.unwrap(), IntegrityLevel::FULL);
    }
}
