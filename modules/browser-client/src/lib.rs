pub mod error;

pub use error::{BrowserError, Result};

use std::time::Duration;

use tracing::info;

/// Page-load wait cap passed to the browser's goto options.
const GOTO_TIMEOUT_MS: u64 = 30_000;

/// A fully rendered page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub title: String,
}

pub struct BrowserClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(45))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Open a session with a cookie set. Every fetch made through the
    /// session carries the same cookies, so an authenticated walk reuses
    /// one logical browser identity.
    ///
    /// Cookie records use the standard browser shape:
    /// `{domain, path, name, value, secure, httpOnly, sameSite?, expirationDate?}`.
    pub fn session(&self, cookies: Vec<serde_json::Value>) -> BrowserSession {
        BrowserSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: self.token.clone(),
            cookies,
        }
    }
}

pub struct BrowserSession {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    cookies: Vec<serde_json::Value>,
}

impl BrowserSession {
    /// Fetch fully-rendered HTML + title via the `/content` endpoint.
    /// Waits for network idle, capped at 30 s.
    pub async fn fetch(&self, url: &str) -> Result<RenderedPage> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = serde_json::json!({
            "url": url,
            "cookies": self.cookies,
            "gotoOptions": {
                "waitUntil": "networkidle2",
                "timeout": GOTO_TIMEOUT_MS,
            },
        });

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let html = resp.text().await?;
        let title = extract_title(&html).unwrap_or_default();

        info!(url, bytes = html.len(), "page: fetched successfully");

        Ok(RenderedPage { html, title })
    }
}

/// Simple title extraction from the HTML `<title>` tag.
fn extract_title(html: &str) -> Option<String> {
    let start = html.find("<title")?.checked_add(6)?;
    let rest = &html[start..];
    let tag_end = rest.find('>')?;
    let after_tag = &rest[tag_end + 1..];
    let end = after_tag.find("</title>")?;
    let title = after_tag[..end].trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_extracted() {
        let html = "<html><head><title>CS 4113 — Distributed Systems</title></head></html>";
        assert_eq!(
            extract_title(html).as_deref(),
            Some("CS 4113 — Distributed Systems")
        );
    }

    #[test]
    fn title_with_attributes() {
        let html = r#"<title data-rh="true"> Homework </title>"#;
        assert_eq!(extract_title(html).as_deref(), Some("Homework"));
    }

    #[test]
    fn missing_or_empty_title_is_none() {
        assert!(extract_title("<html><body>no title</body></html>").is_none());
        assert!(extract_title("<title>   </title>").is_none());
    }

    #[test]
    fn session_carries_cookies() {
        let client = BrowserClient::new("http://localhost:3000/", None);
        let session = client.session(vec![serde_json::json!({"name": "sid", "value": "x"})]);
        assert_eq!(session.cookies.len(), 1);
        assert_eq!(session.base_url, "http://localhost:3000");
    }
}
