use std::path::PathBuf;
use thiserror::Error;

/// Failures of the subtitle pipeline.
///
/// Only `Configuration` and `CollaboratorUnavailable` end processing of a
/// request; every other variant is logged and the pipeline moves on to the
/// next unit of work.
#[derive(Debug, Error)]
pub enum SubtitleError {
    #[error("Cannot search subtitles: {0}")]
    Configuration(String),

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Network failure for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Unexpected listing row: {0}")]
    ParseAnomaly(String),

    #[error("Extraction failed for {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    #[error("Failed to copy subtitle to {destination}: {source}")]
    Transfer {
        destination: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Failed to prepare scratch directory {path}: {source}")]
    ScratchDir {
        path: PathBuf,
        source: std::io::Error,
    },
}
