use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Movie,
    #[serde(rename = "tv")]
    TvShow,
    #[serde(other)]
    Other,
}

/// What the caller wants subtitles for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaQuery {
    /// External catalog id, e.g. an IMDb id like `tt1234567`
    pub identifier: Option<String>,
    pub display_name: String,
    pub year: Option<u32>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl MediaQuery {
    pub fn has_identifier(&self) -> bool {
        self.identifier.as_deref().is_some_and(|id| !id.trim().is_empty())
    }
}

/// One entry of the listing page, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleCandidate {
    /// Empty when the listing is not grouped by season
    pub season_label: String,
    pub episode_number: String,
    pub title: String,
    /// Display filename of the subtitle entry
    pub description: String,
    pub download_link: String,
}

/// The media file a subtitle gets named after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMediaFile {
    /// Media path without its extension
    pub path: PathBuf,
    /// Extension as supplied by the caller, including the dot
    pub extension: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Copied,
    AlreadyPresent,
    Failed,
}

/// Payload of a "subtitle requested" event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleRequest {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub en_name: Option<String>,
    #[serde(default)]
    pub cn_name: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub episode: Option<u32>,
    pub file: PathBuf,
    #[serde(default)]
    pub file_ext: String,
}

impl SubtitleRequest {
    pub fn is_movie(&self) -> bool {
        self.media_type == MediaType::Movie
    }

    /// English name first, Chinese name as fallback.
    pub fn display_name(&self) -> Option<&str> {
        [self.en_name.as_deref(), self.cn_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty())
    }

    pub fn media_query(&self) -> MediaQuery {
        MediaQuery {
            identifier: self
                .imdb_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            display_name: self.display_name().unwrap_or_default().to_string(),
            year: self.year,
            season: self.season,
            episode: self.episode,
        }
    }

    pub fn target(&self) -> TargetMediaFile {
        TargetMediaFile {
            path: self.file.clone(),
            extension: self.file_ext.clone(),
        }
    }
}
