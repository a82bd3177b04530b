use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// When false every request is ignored
    pub enable: bool,
    /// Where archives are downloaded and unpacked
    pub scratch_dir: PathBuf,
    /// Extensions (with leading dot) treated as subtitle files
    pub subtitle_extensions: Vec<String>,
    pub user_agent: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable: true,
            scratch_dir: std::env::temp_dir().join("subfetch"),
            subtitle_extensions: vec![".srt".into(), ".ass".into(), ".ssa".into()],
            user_agent: DEFAULT_USER_AGENT.to_string(),
            base_url: "https://www.opensubtitles.org".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Case-insensitive check against the configured subtitle extensions.
    pub fn is_subtitle_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.subtitle_extensions
            .iter()
            .any(|known| known.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    pub fn ensure_scratch_dir(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.scratch_dir).map_err(|source| ConfigError::ScratchDir {
            path: self.scratch_dir.clone(),
            source,
        })
    }
}

/// Defaults, then the optional TOML file, then `SUBFETCH_*` variables.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(Env::prefixed("SUBFETCH_"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::string(toml_str))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}
