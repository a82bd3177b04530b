use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::browser::Session;
use crate::models::SubtitleCandidate;

/// Number of listing pages kept by default.
pub const LISTING_CACHE_CAPACITY: usize = 128;

/// A parsed listing together with the session it was loaded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub candidates: Vec<SubtitleCandidate>,
    pub session: Session,
}

/// Least-recently-used cache of parsed listing pages keyed by URL.
///
/// The lock is held while a missing page is loaded, so concurrent requests
/// for the same URL load it only once. A capacity of zero disables caching.
pub struct ListingCache {
    capacity: usize,
    entries: Mutex<VecDeque<(String, Arc<ListingPage>)>>,
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::new(LISTING_CACHE_CAPACITY)
    }
}

impl ListingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::new(0)
    }

    /// Returns the cached page for `url`, loading it with `populate` on a
    /// miss. Failed loads are not cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(
        &self,
        url: &str,
        populate: F,
    ) -> Result<Arc<ListingPage>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ListingPage, E>>,
    {
        let mut entries = self.entries.lock().await;

        if let Some(position) = entries.iter().position(|(cached, _)| cached == url) {
            if let Some(entry) = entries.remove(position) {
                debug!("Listing cache hit: {}", url);
                let page = entry.1.clone();
                entries.push_back(entry);
                return Ok(page);
            }
        }

        let page = Arc::new(populate().await?);
        if self.capacity > 0 {
            if entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back((url.to_string(), page.clone()));
        }
        Ok(page)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    #[cfg(test)]
    pub async fn contains(&self, url: &str) -> bool {
        self.entries
            .lock()
            .await
            .iter()
            .any(|(cached, _)| cached == url)
    }
}
