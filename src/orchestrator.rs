use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::browser::{BrowserSession, Session};
use crate::config::Config;
use crate::downloader::SubtitleDownloader;
use crate::error::SubtitleError;
use crate::fetch::HttpFetch;
use crate::filter::filter_candidates;
use crate::listing_cache::{ListingCache, ListingPage};
use crate::listing_parser::ListingParser;
use crate::models::{MediaQuery, SubtitleRequest};
use crate::query::listing_url;
use crate::transfer::{destination_for, transfer_subtitle};

/// Maximum number of candidates installed per request.
pub const SUCCESS_CAP: usize = 3;

/// Runs search, filtering, download and installation for subtitle requests.
pub struct SubtitleOrchestrator {
    config: Config,
    browser: Box<dyn BrowserSession>,
    fetcher: Box<dyn HttpFetch>,
    parser: ListingParser,
    cache: ListingCache,
}

impl SubtitleOrchestrator {
    pub fn new(
        config: Config,
        browser: Box<dyn BrowserSession>,
        fetcher: Box<dyn HttpFetch>,
        cache: ListingCache,
    ) -> Result<Self> {
        let parser = ListingParser::new(&config.base_url)?;
        Ok(Self {
            config,
            browser,
            fetcher,
            parser,
            cache,
        })
    }

    /// Entry point for a "subtitle requested" event. Failures are logged and
    /// never returned to the caller; the result is the number of installed
    /// candidates.
    pub async fn handle(&self, request: &SubtitleRequest) -> usize {
        if !self.config.enable {
            debug!("Subtitle download disabled, ignoring request for {:?}", request.file);
            return 0;
        }

        match self.download(request).await {
            Ok(count) => count,
            Err(e @ SubtitleError::Configuration(_)) => {
                warn!("{}", e);
                0
            }
            Err(e) => {
                error!("{}", e);
                0
            }
        }
    }

    pub async fn download(&self, request: &SubtitleRequest) -> Result<usize, SubtitleError> {
        let query = request.media_query();
        if !query.has_identifier() {
            if !request.is_movie() {
                return Err(SubtitleError::Configuration(
                    "TV shows need an IMDb id to search subtitles".to_string(),
                ));
            }
            if query.display_name.is_empty() {
                return Err(SubtitleError::Configuration(
                    "request has neither an IMDb id nor a name".to_string(),
                ));
            }
        }

        info!(
            "Searching subtitles for {}, imdb_id={}",
            query.display_name,
            query.identifier.as_deref().unwrap_or("-")
        );
        let page = self.search(&query).await?;
        if page.candidates.is_empty() {
            info!("No subtitles found for {}", query.display_name);
            return Ok(0);
        }
        info!("Listing returned {} entries", page.candidates.len());

        let target = request.target();
        let downloader = SubtitleDownloader::new(self.fetcher.as_ref(), &self.config);
        let mut successes = 0;

        for candidate in filter_candidates(&page.candidates, &query) {
            info!(
                "Downloading subtitle {} to {}",
                candidate.description,
                destination_for(&target, "*").display()
            );

            let archive = match downloader.retrieve(candidate, &page.session).await {
                Ok(archive) => archive,
                Err(e) => {
                    error!("{}", e);
                    continue;
                }
            };

            let subtitles = downloader.subtitle_files(&archive);
            for subtitle in &subtitles {
                transfer_subtitle(subtitle, &target).await;
            }
            drop(archive);

            if subtitles.is_empty() {
                warn!("No subtitle files in archive from {}", candidate.download_link);
                continue;
            }

            successes += 1;
            if successes >= SUCCESS_CAP {
                break;
            }
        }

        if successes == 0 {
            match (query.season, query.episode) {
                (season, Some(episode)) => info!(
                    "{} season {} episode {}: no matching subtitles",
                    query.display_name,
                    season.map(|s| s.to_string()).unwrap_or_default(),
                    episode
                ),
                _ => info!("{}: no matching subtitles", query.display_name),
            }
        } else {
            info!("{}: downloaded {} subtitle(s)", query.display_name, successes);
        }

        Ok(successes)
    }

    /// Parsed listing for `query`, served from the cache when possible.
    pub async fn search(&self, query: &MediaQuery) -> Result<Arc<ListingPage>, SubtitleError> {
        let url = listing_url(&self.config.base_url, query);
        self.cache
            .get_or_try_insert_with(&url, || self.load_listing(&url))
            .await
    }

    async fn load_listing(&self, url: &str) -> Result<ListingPage, SubtitleError> {
        if !self.browser.status().await {
            return Err(SubtitleError::CollaboratorUnavailable(
                "no browser session available to load subtitle listings".to_string(),
            ));
        }

        info!("Searching: {}", url);
        if !self.browser.visit(url).await {
            return Err(SubtitleError::Network {
                url: url.to_string(),
                reason: "listing page could not be loaded".to_string(),
            });
        }

        let html = self.browser.current_html().await;
        let session = Session {
            cookies: self.browser.current_cookies().await,
            user_agent: self.config.user_agent.clone(),
        };

        Ok(ListingPage {
            candidates: self.parser.parse(&html),
            session,
        })
    }
}
