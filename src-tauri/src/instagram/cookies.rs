//! Browser-exported cookie files.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// One entry of a cookie export (the extension writes many more fields,
/// only these are needed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieItem {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
}

/// The authenticated cookie set plus what can be read out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCookies {
    pub cookies: Vec<CookieItem>,
    pub user_id: String,
    pub username: Option<String>,
    pub csrf_token: String,
}

impl SessionCookies {
    pub fn from_items(cookies: Vec<CookieItem>) -> Result<Self> {
        let find = |name: &str| {
            cookies
                .iter()
                .find(|c| c.name == name && !c.value.is_empty())
                .map(|c| c.value.clone())
        };

        let session_id = find("sessionid");
        let csrf_token = find("csrftoken");
        let (session_id, csrf_token) = match (session_id, csrf_token) {
            (Some(s), Some(c)) => (s, c),
            _ => return Err(anyhow!("Invalid cookies.json: Missing sessionid or csrftoken")),
        };

        let user_id = find("ds_user_id").unwrap_or_else(|| user_id_from_session(&session_id));
        if user_id.is_empty() {
            return Err(anyhow!("Invalid cookies.json: cannot determine user id"));
        }

        Ok(Self {
            username: find("ds_user"),
            cookies,
            user_id,
            csrf_token,
        })
    }

    pub fn parse(json: &str) -> Result<Self> {
        let items: Vec<CookieItem> =
            serde_json::from_str(json).context("Cookie file is not a JSON cookie array")?;
        Self::from_items(items)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file {:?}", path))?;
        Self::parse(&text)
    }

    /// Value for a `Cookie:` request header.
    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.cookies)?)
    }
}

/// `sessionid` starts with the numeric user id, followed by `%3A` (or `:`).
fn user_id_from_session(session_id: &str) -> String {
    session_id
        .split(|c| c == '%' || c == ':')
        .next()
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"[
        {"name": "csrftoken", "value": "tok123", "domain": ".instagram.com", "path": "/"},
        {"name": "sessionid", "value": "4242%3Aabc%3A7", "domain": ".instagram.com"},
        {"name": "ds_user", "value": "ghosty"},
        {"name": "mid", "value": "Zx"}
    ]"#;

    #[test]
    fn test_parse_export() {
        let s = SessionCookies::parse(EXPORT).unwrap();
        assert_eq!(s.user_id, "4242");
        assert_eq!(s.csrf_token, "tok123");
        assert_eq!(s.username.as_deref(), Some("ghosty"));
        assert_eq!(s.cookies.len(), 4);
    }

    #[test]
    fn test_ds_user_id_wins() {
        let json = r#"[{"name":"sessionid","value":"1%3Ax"},{"name":"csrftoken","value":"t"},
            {"name":"ds_user_id","value":"99"}]"#;
        assert_eq!(SessionCookies::parse(json).unwrap().user_id, "99");
    }

    #[test]
    fn test_missing_csrf_is_rejected() {
        let json = r#"[{"name":"sessionid","value":"1%3Ax"}]"#;
        let err = SessionCookies::parse(json).unwrap_err();
        assert!(err.to_string().contains("Missing sessionid or csrftoken"));
    }

    #[test]
    fn test_not_json_is_rejected() {
        assert!(SessionCookies::parse("{\"cookies\": 1}").is_err());
    }

    #[test]
    fn test_header_value() {
        let s = SessionCookies::parse(EXPORT).unwrap();
        assert_eq!(
            s.header_value(),
            "csrftoken=tok123; sessionid=4242%3Aabc%3A7; ds_user=ghosty; mid=Zx"
        );
    }
}
