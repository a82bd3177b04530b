use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, COOKIE, USER_AGENT};
use std::time::Duration;

use crate::browser::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub content_disposition: Option<String>,
    pub body: Vec<u8>,
}

/// GET requests carrying a listing session.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(&self, url: &str, session: &Session) -> Result<FetchResponse>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for HttpFetcher {
    async fn get(&self, url: &str, session: &Session) -> Result<FetchResponse> {
        let mut request = self.client.get(url);
        if !session.cookies.is_empty() {
            request = request.header(COOKIE, session.cookies.as_str());
        }
        if !session.user_agent.is_empty() {
            request = request.header(USER_AGENT, session.user_agent.as_str());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        // Servers send UTF-8 filenames as raw header bytes
        let content_disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
        let body = response.bytes().await?.to_vec();

        Ok(FetchResponse {
            status,
            content_disposition,
            body,
        })
    }
}
