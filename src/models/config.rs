//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Site;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Document store and media locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Text recognition settings
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Tag classification settings
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Which site adapters to run
    #[serde(default)]
    pub sites: SitesConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.storage.media_root.as_os_str().is_empty() {
            return Err(AppError::validation("storage.media_root is empty"));
        }
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(AppError::validation("storage.data_dir is empty"));
        }
        if self.ocr.enabled && self.ocr.binary.trim().is_empty() {
            return Err(AppError::validation("ocr.binary is empty"));
        }
        if self.enrichment.enabled {
            if self.enrichment.model.trim().is_empty() {
                return Err(AppError::validation("enrichment.model is empty"));
            }
            if self.enrichment.max_chars == 0 {
                return Err(AppError::validation("enrichment.max_chars must be > 0"));
            }
        }
        if self.sites.enabled.is_empty() {
            return Err(AppError::validation("No sites enabled"));
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Fallback User-Agent header; adapters may send their own
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Where records and media files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the JSON document store
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,

    /// Root directory for downloaded media
    #[serde(default = "defaults::media_root")]
    pub media_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            media_root: defaults::media_root(),
        }
    }
}

/// Tesseract settings, fixed for the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Tesseract executable
    #[serde(default = "defaults::ocr_binary")]
    pub binary: String,

    #[serde(default = "defaults::ocr_language")]
    pub language: String,

    /// OCR engine mode
    #[serde(default = "defaults::ocr_oem")]
    pub oem: u8,

    /// Page segmentation mode
    #[serde(default = "defaults::ocr_psm")]
    pub psm: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            binary: defaults::ocr_binary(),
            language: defaults::ocr_language(),
            oem: defaults::ocr_oem(),
            psm: defaults::ocr_psm(),
        }
    }
}

/// Chat-completion tagger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// When false, every post gets the placeholder tag
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    #[serde(default = "defaults::model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "defaults::api_key_env")]
    pub api_key_env: String,

    /// Maximum characters of post text sent for classification
    #[serde(default = "defaults::max_chars")]
    pub max_chars: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: defaults::api_base(),
            model: defaults::model(),
            api_key_env: defaults::api_key_env(),
            max_chars: defaults::max_chars(),
        }
    }
}

/// Adapters to run, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitesConfig {
    #[serde(default = "defaults::sites")]
    pub enabled: Vec<Site>,
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::sites(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use crate::models::Site;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Storage defaults
    pub fn data_dir() -> PathBuf {
        PathBuf::from("storage/db")
    }
    pub fn media_root() -> PathBuf {
        PathBuf::from("storage/media")
    }

    // OCR defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn ocr_binary() -> String {
        "tesseract".into()
    }
    pub fn ocr_language() -> String {
        "kor".into()
    }
    pub fn ocr_oem() -> u8 {
        3
    }
    pub fn ocr_psm() -> u8 {
        6
    }

    // Enrichment defaults
    pub fn api_base() -> String {
        "https://api.openai.com/v1".into()
    }
    pub fn model() -> String {
        "gpt-4o".into()
    }
    pub fn api_key_env() -> String {
        "OPENAI_API_KEY".into()
    }
    pub fn max_chars() -> usize {
        2000
    }

    pub fn sites() -> Vec<Site> {
        Site::ALL.to_vec()
    }
}
