//! Client settings loading.
//!
//! Defaults are embedded from `src-tauri/config/client.toml`; a file of the
//! same name in the app config directory overrides individual keys.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::Deserialize;
use tracing::{info, warn};

const DEFAULT_SETTINGS: &str = include_str!("../config/client.toml");

/// File name looked up in the app config directory.
pub const SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientSettings {
    pub page_size: u32,
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    fn validate(self) -> Result<Self> {
        if self.page_size == 0 || self.page_size > 100 {
            bail!("page_size must be between 1 and 100, got {}", self.page_size);
        }
        if self.delay_min_ms > self.delay_max_ms {
            bail!(
                "delay_min_ms ({}) must not exceed delay_max_ms ({})",
                self.delay_min_ms,
                self.delay_max_ms
            );
        }
        Ok(self)
    }
}

/// Parse settings from TOML text layered over the embedded defaults.
pub fn parse_settings(overrides: &str) -> Result<ClientSettings> {
    let mut base: toml::Table = toml::from_str(DEFAULT_SETTINGS)?;
    let overrides: toml::Table = toml::from_str(overrides)?;
    for (key, value) in overrides {
        base.insert(key, value);
    }
    let settings: ClientSettings = toml::Value::Table(base).try_into()?;
    settings.validate()
}

/// The embedded defaults.
///
/// # Panics
/// Panics if the embedded TOML is invalid (a build-time bug).
pub fn default_settings() -> ClientSettings {
    parse_settings("").expect("embedded client.toml must be valid")
}

/// Load from `<config_dir>/client.toml` when present, otherwise defaults.
/// A broken override file is logged and ignored.
pub fn resolve_settings(config_dir: Option<&Path>) -> ClientSettings {
    let Some(path) = config_dir.map(|d| d.join(SETTINGS_FILE)) else {
        return default_settings();
    };
    if !path.exists() {
        return default_settings();
    }
    match std::fs::read_to_string(&path)
        .map_err(anyhow::Error::from)
        .and_then(|text| parse_settings(&text))
    {
        Ok(settings) => {
            info!("Loaded client settings from {:?}", path);
            settings
        }
        Err(e) => {
            warn!("Ignoring invalid settings file {:?}: {:#}", path, e);
            default_settings()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_load() {
        let s = default_settings();
        assert_eq!(s.page_size, 50);
        assert_eq!(s.delay_min_ms, 1000);
        assert_eq!(s.delay_max_ms, 2500);
        assert_eq!(s.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_override_single_key() {
        let s = parse_settings("page_size = 24").unwrap();
        assert_eq!(s.page_size, 24);
        assert_eq!(s.connect_timeout_secs, 10);
    }

    #[test]
    fn test_invalid_delay_range_rejected() {
        let err = parse_settings("delay_min_ms = 5000\ndelay_max_ms = 10").unwrap_err();
        assert!(err.to_string().contains("delay_min_ms"));
    }

    #[test]
    fn test_resolve_falls_back_on_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "page_size = \"lots\"").unwrap();
        assert_eq!(resolve_settings(Some(dir.path())), default_settings());
    }

    #[test]
    fn test_resolve_reads_override_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "delay_max_ms = 4000").unwrap();
        assert_eq!(resolve_settings(Some(dir.path())).delay_max_ms, 4000);
    }
}
