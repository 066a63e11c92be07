use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, ORIGIN, REFERER,
    USER_AGENT,
};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use super::cookies::SessionCookies;
use crate::settings::ClientSettings;

pub const API_ORIGIN: &str = "https://www.instagram.com";
pub const WEB_APP_ID: &str = "936619743392459";
const ASBD_ID: &str = "129477";
const IMAGE_ACCEPT: &str = "image/webp,image/avif,image/*,*/*;q=0.8";

/// Spaces consecutive requests by a random delay in `[min, max]`.
pub struct RequestPacer {
    last_request: Mutex<Option<Instant>>,
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl RequestPacer {
    pub fn new(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_delay_ms: min_delay_ms.min(max_delay_ms),
            max_delay_ms,
        }
    }

    pub fn next_delay(&self) -> Duration {
        if self.min_delay_ms == self.max_delay_ms {
            return Duration::from_millis(self.min_delay_ms);
        }
        Duration::from_millis(rand::rng().random_range(self.min_delay_ms..=self.max_delay_ms))
    }

    /// Wait until a jittered interval has passed since the previous request.
    /// The first request goes out immediately.
    pub async fn wait(&self) {
        let delay = self.next_delay();
        let sleep_for = {
            let last = self.last_request.lock().unwrap_or_else(|p| p.into_inner());
            last.and_then(|t| delay.checked_sub(t.elapsed()))
        };
        if let Some(duration) = sleep_for {
            tokio::time::sleep(duration).await;
        }
        self.mark();
    }

    /// Unconditional jittered pause, used before state-changing actions.
    pub async fn pause(&self) {
        tokio::time::sleep(self.next_delay()).await;
        self.mark();
    }

    fn mark(&self) {
        let mut last = self.last_request.lock().unwrap_or_else(|p| p.into_inner());
        *last = Some(Instant::now());
    }
}

/// Headers a logged-in browser tab sends with XHR requests.
pub fn browser_headers(user_agent: &str, session: Option<&SessionCookies>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert("X-IG-App-ID", HeaderValue::from_static(WEB_APP_ID));
    headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
    headers.insert("X-ASBD-ID", HeaderValue::from_static(ASBD_ID));
    headers.insert(ORIGIN, HeaderValue::from_static(API_ORIGIN));
    headers.insert(REFERER, HeaderValue::from_str(&format!("{}/", API_ORIGIN))?);
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("empty"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("cors"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-origin"));

    if let Some(session) = session {
        headers.insert("X-CSRFToken", HeaderValue::from_str(&session.csrf_token)?);
        headers.insert(COOKIE, HeaderValue::from_str(&session.header_value())?);
    }
    Ok(headers)
}

/// Paced HTTP access to the web API.
pub struct InstagramHttp {
    client: reqwest::Client,
    pacer: RequestPacer,
    base: Url,
    user_agent: String,
}

impl InstagramHttp {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .connect_timeout(settings.connect_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            pacer: RequestPacer::new(settings.delay_min_ms, settings.delay_max_ms),
            base: Url::parse(API_ORIGIN)?,
            user_agent: settings.user_agent.clone(),
        })
    }

    pub fn pacer(&self) -> &RequestPacer {
        &self.pacer
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| anyhow!("Invalid endpoint '{}': {}", path, e))
    }

    /// Plain GET of the landing page to open the connection.
    pub async fn warmup(&self) -> Result<()> {
        let url = self.endpoint("/")?;
        let response = self
            .client
            .get(url)
            .headers(browser_headers(&self.user_agent, None)?)
            .send()
            .await?;
        debug!("Warmup returned {}", response.status());
        Ok(())
    }

    pub async fn get_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
        session: &SessionCookies,
    ) -> Result<Value> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .headers(browser_headers(&self.user_agent, Some(session))?)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", path))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("{} returned {}: {}", path, status, truncate(&body, 200));
            bail!("HTTP {} from {}", status.as_u16(), path);
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("Invalid JSON from {}", path))
    }

    /// Paced POST of a form. Returns the JSON body, `Null` when there is none.
    pub async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
        session: &SessionCookies,
    ) -> Result<Value> {
        self.pacer.pause().await;

        let url = self.endpoint(path)?;
        let mut headers = browser_headers(&self.user_agent, Some(session))?;
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        info!("POST {}", url);
        let response = self
            .client
            .post(url)
            .headers(headers)
            .form(form)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", path))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("{} returned {}: {}", path, status, truncate(&body, 200));
            bail!("HTTP {} from {}", status.as_u16(), path);
        }
        Ok(response.json::<Value>().await.unwrap_or(Value::Null))
    }

    /// Download an image from the CDN. Returns `(content_type, bytes)`.
    pub async fn get_image(&self, url: &str) -> Result<(Option<String>, Vec<u8>)> {
        let url = Url::parse(url).with_context(|| format!("Invalid image URL '{}'", url))?;
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agent.as_str())
            .header(ACCEPT, IMAGE_ACCEPT)
            .header(REFERER, format!("{}/", API_ORIGIN))
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("Failed to fetch image: {}", response.status());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response.bytes().await?.to_vec();
        Ok((content_type, bytes))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionCookies {
        SessionCookies::parse(
            r#"[{"name":"sessionid","value":"7%3Aab"},{"name":"csrftoken","value":"csrf-1"}]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_browser_headers_anonymous() {
        let headers = browser_headers("Agent/1.0", None).unwrap();
        assert_eq!(headers.get(USER_AGENT).unwrap(), "Agent/1.0");
        assert_eq!(headers.get("X-IG-App-ID").unwrap(), WEB_APP_ID);
        assert_eq!(headers.get(ORIGIN).unwrap(), API_ORIGIN);
        assert!(headers.get("X-CSRFToken").is_none());
        assert!(headers.get(COOKIE).is_none());
    }

    #[test]
    fn test_browser_headers_with_session() {
        let headers = browser_headers("Agent/1.0", Some(&session())).unwrap();
        assert_eq!(headers.get("X-CSRFToken").unwrap(), "csrf-1");
        assert_eq!(headers.get(COOKIE).unwrap(), "sessionid=7%3Aab; csrftoken=csrf-1");
    }

    #[test]
    fn test_next_delay_within_bounds() {
        let pacer = RequestPacer::new(1000, 2500);
        for _ in 0..50 {
            let d = pacer.next_delay();
            assert!(d >= Duration::from_millis(1000) && d <= Duration::from_millis(2500));
        }
        assert_eq!(RequestPacer::new(300, 300).next_delay(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_first_request_immediate() {
        let pacer = RequestPacer::new(1000, 2500);
        let start = Instant::now();
        pacer.wait().await;
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_spaces_consecutive_requests() {
        let pacer = RequestPacer::new(1000, 2500);
        pacer.wait().await;
        let start = Instant::now();
        pacer.wait().await;
        let waited = start.elapsed();
        assert!(
            waited >= Duration::from_millis(1000) && waited <= Duration::from_millis(2500),
            "waited {:?}",
            waited
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_skips_wait_after_idle() {
        let pacer = RequestPacer::new(100, 200);
        pacer.wait().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        let start = Instant::now();
        pacer.wait().await;
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
    }
}
