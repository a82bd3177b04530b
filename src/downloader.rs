use chrono::Local;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::archive::{extract_dir_for, list_files_with_extensions, unpack_zip, RetrievedArchive, ScratchGuard};
use crate::browser::Session;
use crate::config::Config;
use crate::error::SubtitleError;
use crate::fetch::HttpFetch;
use crate::models::SubtitleCandidate;

lazy_static! {
    static ref FILENAME_PARAM: Regex = Regex::new(r#"filename="?(.+)"?"#).unwrap();
}

/// Downloads candidate archives into the scratch directory and unpacks them.
pub struct SubtitleDownloader<'a> {
    fetcher: &'a dyn HttpFetch,
    config: &'a Config,
}

impl<'a> SubtitleDownloader<'a> {
    pub fn new(fetcher: &'a dyn HttpFetch, config: &'a Config) -> Self {
        Self { fetcher, config }
    }

    /// Fetches and unpacks the archive behind `candidate`. Anything already
    /// written to the scratch directory is removed again when this fails.
    pub async fn retrieve(
        &self,
        candidate: &SubtitleCandidate,
        session: &Session,
    ) -> Result<RetrievedArchive, SubtitleError> {
        let url = candidate.download_link.as_str();
        info!("Downloading subtitle archive: {}", url);

        let response = self
            .fetcher
            .get(url, session)
            .await
            .map_err(|e| SubtitleError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        if response.status != 200 {
            return Err(SubtitleError::Network {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status),
            });
        }

        let file_name = subtitle_file_name(response.content_disposition.as_deref(), url, |ext| {
            self.config.is_subtitle_extension(ext)
        });
        let archive_path = self.config.scratch_dir.join(&file_name);
        let archive = ScratchGuard::File(archive_path.clone());

        tokio::fs::write(&archive_path, &response.body)
            .await
            .map_err(|e| SubtitleError::Extraction {
                path: archive_path.clone(),
                reason: e.to_string(),
            })?;
        debug!("Saved {} bytes to {}", response.body.len(), archive_path.display());

        let extract_path = extract_dir_for(&archive_path);
        let extract_dir = ScratchGuard::Directory(extract_path.clone());

        let (zip_path, dest) = (archive_path.clone(), extract_path.clone());
        tokio::task::spawn_blocking(move || unpack_zip(&zip_path, &dest))
            .await
            .map_err(|e| SubtitleError::Extraction {
                path: archive_path.clone(),
                reason: e.to_string(),
            })??;

        Ok(RetrievedArchive {
            extract_dir,
            archive,
        })
    }

    /// Subtitle files found anywhere inside the unpacked archive.
    pub fn subtitle_files(&self, archive: &RetrievedArchive) -> Vec<PathBuf> {
        list_files_with_extensions(archive.extract_dir.path(), |ext| {
            self.config.is_subtitle_extension(ext)
        })
    }
}

/// Name under which a downloaded archive is stored.
///
/// Prefers the `filename` parameter of the `Content-Disposition` header,
/// then the last URL segment when it already looks like a subtitle or zip
/// file, and finally a timestamp.
pub fn subtitle_file_name<F>(disposition: Option<&str>, url: &str, is_subtitle_ext: F) -> String
where
    F: Fn(&str) -> bool,
{
    if let Some(name) = disposition.and_then(disposition_file_name) {
        return name;
    }

    if let Some(segment) = last_url_segment(url) {
        let known = Path::new(&segment)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip") || is_subtitle_ext(ext));
        if known {
            return segment;
        }
    }

    format!("{}.zip", Local::now().format("%Y%m%d%H%M%S%6f"))
}

fn disposition_file_name(disposition: &str) -> Option<String> {
    let captured = FILENAME_PARAM.captures(disposition)?.get(1)?.as_str();
    let name = captured.split(';').next().unwrap_or_default().trim();
    let name = name.strip_suffix('"').unwrap_or(name);

    // Never let a header pick a path outside the scratch directory
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

fn last_url_segment(url: &str) -> Option<String> {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed.path_segments()?.last()?.to_string(),
        Err(_) => url.rsplit('/').next()?.to_string(),
    };
    (!segment.is_empty()).then_some(segment)
}
