// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod post;
mod site;

// Re-export all public types
pub use config::{Config, CrawlerConfig, EnrichmentConfig, OcrConfig, SitesConfig, StorageConfig};
pub use post::{BoardId, ContentSegment, EnrichmentRecord, PostKey, PostRecord, PostSummary};
pub use site::{ListingKind, Site};
