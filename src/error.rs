// src/error.rs

//! Unified error handling for the crawler application.
//!
//! The ingestion variants mirror the containment scopes of a run:
//! segment < post < adapter < run. Each is caught at its own scope,
//! logged with context and turned into a report entry.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Image decoding or encoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Whole listing could not be fetched or parsed
    #[error("Listing fetch failed for {site}: {message}")]
    ListingFetch { site: String, message: String },

    /// A single listing row was malformed
    #[error("Row parse error: {0}")]
    RowParse(String),

    /// A single post body was unavailable
    #[error("Body fetch failed for {context}: {message}")]
    BodyFetch { context: String, message: String },

    /// A download answered with a non-success status
    #[error("Fetch of {url} failed with status {status}")]
    Fetch { url: String, status: u16 },

    /// A media file could not be written
    #[error("Media save failed for {url}: {message}")]
    MediaSave { url: String, message: String },

    /// Text recognition failed
    #[error("OCR error: {0}")]
    Ocr(String),

    /// Enrichment service failed
    #[error("Enrichment error: {0}")]
    Enrichment(String),

    /// Document store operation failed
    #[error("Store error: {0}")]
    Store(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a listing error for a site.
    pub fn listing(site: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::ListingFetch {
            site: site.into(),
            message: message.to_string(),
        }
    }

    /// Create a row parse error.
    pub fn row(message: impl Into<String>) -> Self {
        Self::RowParse(message.into())
    }

    /// Create a body fetch error with context.
    pub fn body(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::BodyFetch {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a media save error.
    pub fn media(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::MediaSave {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an OCR error.
    pub fn ocr(message: impl fmt::Display) -> Self {
        Self::Ocr(message.to_string())
    }

    /// Create an enrichment error.
    pub fn enrichment(message: impl fmt::Display) -> Self {
        Self::Enrichment(message.to_string())
    }

    /// Create a store error.
    pub fn store(message: impl fmt::Display) -> Self {
        Self::Store(message.to_string())
    }
}
