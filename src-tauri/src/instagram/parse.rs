//! Response bodies of the web API.

use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::engine::backend::ConnectionPage;
use crate::engine::types::{Profile, ScanStage};

pub const FOLLOWERS_HASH: &str = "c76146de99bb02f6415203be841dd25a";
pub const FOLLOWING_HASH: &str = "d04b0a864b4b54837c0d870b0e77e076";

pub fn query_hash(stage: ScanStage) -> &'static str {
    match stage {
        ScanStage::Followers => FOLLOWERS_HASH,
        ScanStage::Following => FOLLOWING_HASH,
    }
}

pub fn edge_name(stage: ScanStage) -> &'static str {
    match stage {
        ScanStage::Followers => "edge_followed_by",
        ScanStage::Following => "edge_follow",
    }
}

/// A user node. The API omits or nulls fields freely.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserNode {
    id: Option<String>,
    username: Option<String>,
    full_name: Option<String>,
    profile_pic_url: Option<String>,
    profile_pic_url_hd: Option<String>,
    is_verified: Option<bool>,
    is_private: Option<bool>,
    is_business_account: Option<bool>,
    is_professional_account: Option<bool>,
    category_name: Option<String>,
}

impl UserNode {
    fn into_profile(self) -> Option<Profile> {
        let id = self.id.filter(|id| !id.is_empty())?;
        Some(Profile {
            id,
            username: self.username.unwrap_or_default(),
            full_name: self.full_name.unwrap_or_default(),
            avatar_url: self.profile_pic_url.unwrap_or_default(),
            avatar_url_hd: self.profile_pic_url_hd,
            is_verified: self.is_verified.unwrap_or(false),
            is_private: self.is_private.unwrap_or(false),
            is_business_account: self.is_business_account.unwrap_or(false),
            is_professional_account: self.is_professional_account.unwrap_or(false),
            category_name: self.category_name,
        })
    }
}

/// Reject `{"status": "fail", "message": ...}` bodies.
pub fn check_status(json: &Value) -> Result<()> {
    if json.get("status").and_then(Value::as_str) == Some("fail") {
        let message = json
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("request rejected");
        bail!("Instagram rejected the request: {}", message);
    }
    Ok(())
}

pub fn parse_connection_page(json: &Value, stage: ScanStage) -> Result<ConnectionPage> {
    check_status(json)?;
    let edge = json
        .pointer(&format!("/data/user/{}", edge_name(stage)))
        .filter(|v| v.is_object())
        .ok_or_else(|| anyhow!("Response has no {} data", stage.as_str()))?;

    let total = edge.get("count").and_then(Value::as_u64).unwrap_or(0);
    let profiles = edge
        .get("edges")
        .and_then(Value::as_array)
        .map(|edges| {
            edges
                .iter()
                .filter_map(|e| e.get("node"))
                .filter_map(|node| UserNode::deserialize(node).ok())
                .filter_map(UserNode::into_profile)
                .collect()
        })
        .unwrap_or_default();

    let page_info = edge.get("page_info");
    let has_next = page_info
        .and_then(|p| p.get("has_next_page"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let next_cursor = page_info
        .and_then(|p| p.get("end_cursor"))
        .and_then(Value::as_str)
        .filter(|c| has_next && !c.is_empty())
        .map(|c| c.to_string());

    Ok(ConnectionPage {
        profiles,
        total: total.min(u32::MAX as u64) as u32,
        next_cursor,
    })
}

/// `data.user` of a web profile info response.
pub fn parse_web_profile(json: &Value) -> Result<Profile> {
    check_status(json)?;
    let user = json
        .pointer("/data/user")
        .filter(|v| v.is_object())
        .ok_or_else(|| anyhow!("User not found"))?;
    UserNode::deserialize(user)?
        .into_profile()
        .ok_or_else(|| anyhow!("User not found"))
}

/// `form_data.username` of the account edit form.
pub fn parse_form_username(json: &Value) -> Result<String> {
    check_status(json)?;
    json.pointer("/form_data/username")
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
        .map(|u| u.to_string())
        .ok_or_else(|| anyhow!("Failed to fetch current username"))
}

/// Whether the body of a 2xx friendship mutation reports success. Only an
/// explicit non-"ok" status counts as a refusal; empty bodies arrive as `Null`.
pub fn parse_action_ok(json: &Value) -> bool {
    json.get("status")
        .and_then(Value::as_str)
        .map_or(true, |status| status == "ok")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_followers_page() {
        let body = json!({
            "data": {"user": {"edge_followed_by": {
                "count": 120,
                "page_info": {"has_next_page": true, "end_cursor": "QVFB"},
                "edges": [
                    {"node": {"id": "1", "username": "ana", "full_name": "Ana",
                              "profile_pic_url": "a.jpg", "is_private": true}},
                    {"node": {"id": "2", "username": "bo", "full_name": null,
                              "profile_pic_url": "b.jpg", "is_verified": true}},
                    {"node": {"username": "no_id"}}
                ]
            }}},
            "status": "ok"
        });
        let page = parse_connection_page(&body, ScanStage::Followers).unwrap();
        assert_eq!(page.total, 120);
        assert_eq!(page.next_cursor.as_deref(), Some("QVFB"));
        assert_eq!(page.profiles.len(), 2);
        assert!(page.profiles[0].is_private);
        assert_eq!(page.profiles[1].full_name, "");
        assert!(page.profiles[1].is_verified);
    }

    #[test]
    fn test_last_page_has_no_cursor() {
        let body = json!({"data": {"user": {"edge_follow": {
            "count": 1,
            "page_info": {"has_next_page": false, "end_cursor": "stale"},
            "edges": [{"node": {"id": "5", "username": "x"}}]
        }}}});
        let page = parse_connection_page(&body, ScanStage::Following).unwrap();
        assert_eq!(page.next_cursor, None);
        assert_eq!(page.profiles[0].id, "5");
    }

    #[test]
    fn test_wrong_edge_is_an_error() {
        let body = json!({"data": {"user": {"edge_follow": {"count": 0}}}});
        assert!(parse_connection_page(&body, ScanStage::Followers).is_err());
    }

    #[test]
    fn test_fail_status_surfaces_message() {
        let body = json!({"status": "fail", "message": "Please wait a few minutes"});
        let err = parse_connection_page(&body, ScanStage::Followers).unwrap_err();
        assert!(err.to_string().contains("Please wait a few minutes"));
    }

    #[test]
    fn test_parse_web_profile() {
        let body = json!({"data": {"user": {"id": "77", "username": "me",
            "full_name": "Me", "profile_pic_url": "m.jpg", "profile_pic_url_hd": "m_hd.jpg"}}});
        let p = parse_web_profile(&body).unwrap();
        assert_eq!(p.id, "77");
        assert_eq!(p.best_avatar_url(), "m_hd.jpg");

        assert!(parse_web_profile(&json!({"data": {"user": null}})).is_err());
    }

    #[test]
    fn test_parse_form_username() {
        let body = json!({"form_data": {"username": "ghost"}});
        assert_eq!(parse_form_username(&body).unwrap(), "ghost");
        assert!(parse_form_username(&json!({})).is_err());
    }

    #[test]
    fn test_parse_action_ok() {
        assert!(parse_action_ok(&json!({"status": "ok", "friendship_status": {}})));
        assert!(!parse_action_ok(&json!({"status": "fail"})));
    }

    #[test]
    fn test_empty_success_body_counts_as_done() {
        assert!(parse_action_ok(&Value::Null));
        assert!(parse_action_ok(&json!({})));
    }
}
