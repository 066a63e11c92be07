use tracing::debug;

use super::backend::Backend;

/// Deterministic initials avatar used when the real picture can't be fetched.
pub fn fallback_avatar_url(username: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=ec4899&color=fff&size=128",
        urlencoding::encode(username)
    )
}

/// Inline data URL for `url`, or the initials placeholder on any failure.
pub async fn resolve_avatar(backend: &dyn Backend, url: &str, username: &str) -> String {
    if url.trim().is_empty() {
        return fallback_avatar_url(username);
    }
    match backend.proxy_pic(url).await {
        Ok(data_url) if data_url.starts_with("data:") => data_url,
        Ok(_) => {
            debug!("Avatar proxy for {} returned a non-data URL, using placeholder", username);
            fallback_avatar_url(username)
        }
        Err(e) => {
            debug!("Avatar proxy failed for {}: {}", username, e);
            fallback_avatar_url(username)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_deterministic_and_encoded() {
        let a = fallback_avatar_url("john doe");
        assert_eq!(a, fallback_avatar_url("john doe"));
        assert!(a.contains("name=john%20doe"), "not encoded: {}", a);
    }
}
