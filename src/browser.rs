use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::Config;

/// Cookie and user agent captured while loading a listing page. Download
/// requests for candidates of that page must present the same values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub cookies: String,
    pub user_agent: String,
}

/// A page-oriented browsing session.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Whether the session is able to load pages at all.
    async fn status(&self) -> bool;

    /// Navigates to `url`; false when the page could not be loaded.
    async fn visit(&self, url: &str) -> bool;

    /// Markup of the page loaded by the last successful `visit`.
    async fn current_html(&self) -> String;

    /// `name=value; ...` cookie header for the current page.
    async fn current_cookies(&self) -> String;
}

#[derive(Debug, Default)]
struct CurrentPage {
    url: Option<Url>,
    html: String,
}

/// Browser session backed by a cookie-keeping HTTP client.
pub struct HttpBrowser {
    client: Option<reqwest::Client>,
    jar: Arc<Jar>,
    page: Mutex<CurrentPage>,
}

impl HttpBrowser {
    pub fn new(config: &Config) -> Self {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .cookie_provider(jar.clone())
            .build();

        let client = match client {
            Ok(client) => Some(client),
            Err(e) => {
                error!("Failed to create HTTP client: {}", e);
                None
            }
        };

        Self {
            client,
            jar,
            page: Mutex::new(CurrentPage::default()),
        }
    }
}

#[async_trait]
impl BrowserSession for HttpBrowser {
    async fn status(&self) -> bool {
        self.client.is_some()
    }

    async fn visit(&self, url: &str) -> bool {
        let Some(client) = &self.client else {
            return false;
        };
        info!("Visiting: {}", url);

        let response = match client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Request to {} failed: {}", url, e);
                return false;
            }
        };
        if !response.status().is_success() {
            error!("HTTP error for {}: {}", url, response.status());
            return false;
        }

        let final_url = response.url().clone();
        match response.text().await {
            Ok(html) => {
                let mut page = self.page.lock().await;
                page.url = Some(final_url);
                page.html = html;
                true
            }
            Err(e) => {
                error!("Failed to read page {}: {}", url, e);
                false
            }
        }
    }

    async fn current_html(&self) -> String {
        self.page.lock().await.html.clone()
    }

    async fn current_cookies(&self) -> String {
        let page = self.page.lock().await;
        page.url
            .as_ref()
            .and_then(|url| self.jar.cookies(url))
            .and_then(|header| header.to_str().ok().map(str::to_string))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fresh_browser_has_no_page() {
        let browser = HttpBrowser::new(&Config::default());
        assert!(browser.status().await);
        assert_eq!(browser.current_html().await, "");
        assert_eq!(browser.current_cookies().await, "");
    }

    #[tokio::test]
    async fn test_visit_unreachable_host_fails() {
        let config = Config {
            request_timeout_secs: 2,
            ..Config::default()
        };
        let browser = HttpBrowser::new(&config);
        assert!(!browser.visit("http://127.0.0.1:9/listing").await);
        assert_eq!(browser.current_html().await, "");
    }
}
