// src/pipeline/ingest.rs

//! Ingestion controller: listing, dedup, per-post processing and persistence.
//!
//! Each adapter goes through `Fetching -> Filtering -> Processing -> Done`.
//! Adapters run one after another and posts are processed one at a time.
//! Nothing carries over between runs; the next run retries whatever failed.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Config, ContentSegment, ListingKind, PostKey, PostRecord, PostSummary, Site};
use crate::pipeline::report::{AdapterOutcome, AdapterReport, RunReport};
use crate::services::{
    ChatTagger, ContentNormalizer, Enricher, EnrichmentResolver, MediaStore, Ocr,
    PlaceholderEnricher, TesseractOcr,
};
use crate::sites::{SiteAdapter, build_adapters};
use crate::storage::DocumentStore;
use crate::utils::http::create_async_client;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fetching,
    Filtering,
    Processing,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Fetching => "fetching",
            Phase::Filtering => "filtering",
            Phase::Processing => "processing",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Collaborators shared by every adapter of a run.
pub struct IngestionContext {
    pub store: Arc<dyn DocumentStore>,
    pub media: MediaStore,
    pub ocr: Arc<dyn Ocr>,
    pub enricher: Arc<dyn Enricher>,
    /// Grapheme limit of the text sent for enrichment
    pub enrichment_max_chars: usize,
}

/// Runs site adapters through the ingestion phases.
pub struct IngestionController {
    context: IngestionContext,
    adapters: Vec<Box<dyn SiteAdapter>>,
}

impl IngestionController {
    pub fn new(context: IngestionContext, adapters: Vec<Box<dyn SiteAdapter>>) -> Self {
        Self { context, adapters }
    }

    /// Wire up the controller from configuration.
    ///
    /// The enricher falls back to the placeholder when enrichment is
    /// disabled or its API key is missing.
    pub fn from_config(config: &Config, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let client = create_async_client(&config.crawler)?;
        let media = MediaStore::new(client.clone(), &config.storage.media_root);
        let ocr: Arc<dyn Ocr> = Arc::new(TesseractOcr::new(config.ocr.clone()));

        let enricher: Arc<dyn Enricher> = if config.enrichment.enabled {
            match ChatTagger::from_config(client.clone(), &config.enrichment) {
                Ok(tagger) => Arc::new(tagger),
                Err(e) => {
                    log::warn!("Enrichment disabled: {}", e);
                    Arc::new(PlaceholderEnricher)
                }
            }
        } else {
            Arc::new(PlaceholderEnricher)
        };

        let adapters = build_adapters(&config.sites, &client);
        let context = IngestionContext {
            store,
            media,
            ocr,
            enricher,
            enrichment_max_chars: config.enrichment.max_chars,
        };
        Ok(Self::new(context, adapters))
    }

    pub fn sites(&self) -> Vec<Site> {
        self.adapters.iter().map(|adapter| adapter.site()).collect()
    }

    /// Real-time best ingestion; success flag per adapter.
    pub async fn get_real_time_best(&self) -> BTreeMap<Site, bool> {
        self.run_logged(ListingKind::RealTime).await
    }

    /// Daily best ingestion for adapters that publish one.
    pub async fn get_daily_best(&self) -> BTreeMap<Site, bool> {
        self.run_logged(ListingKind::Daily).await
    }

    async fn run_logged(&self, kind: ListingKind) -> BTreeMap<Site, bool> {
        let report = self.run(kind).await;
        report.log_summary();
        report.statuses()
    }

    /// Run every adapter that publishes `kind`.
    pub async fn run(&self, kind: ListingKind) -> RunReport {
        let started_at = Utc::now();
        log::info!("Starting {} ingestion for {} adapters", kind, self.adapters.len());

        let mut adapters = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            if !adapter.supports(kind) {
                log::debug!("{} has no {} listing, skipping", adapter.site(), kind);
                continue;
            }
            adapters.push(self.run_adapter(adapter.as_ref(), kind).await);
        }

        RunReport {
            kind,
            started_at,
            finished_at: Utc::now(),
            adapters,
        }
    }

    async fn run_adapter(&self, adapter: &dyn SiteAdapter, kind: ListingKind) -> AdapterReport {
        let site = adapter.site();
        let mut report = AdapterReport::new(site);

        log::debug!("{}: {}", site, Phase::Fetching);
        let summaries = match adapter.listing(kind).await {
            Ok(summaries) if summaries.is_empty() => {
                log::warn!("{}: listing is empty", site);
                report.outcome = AdapterOutcome::EmptyListing;
                log::debug!("{}: {}", site, Phase::Done);
                return report;
            }
            Ok(summaries) => summaries,
            Err(e) => {
                log::error!("{}: {}", site, e);
                report.outcome = AdapterOutcome::ListingFailed(e.to_string());
                log::debug!("{}: {}", site, Phase::Done);
                return report;
            }
        };
        log::info!("{}: {} posts in listing", site, summaries.len());

        log::debug!("{}: {}", site, Phase::Filtering);
        let pending = self.filter_new(kind, summaries, &mut report).await;

        log::debug!("{}: {} ({} new posts)", site, Phase::Processing, pending.len());
        for summary in &pending {
            match self.process_post(adapter, kind, summary).await {
                Ok(id) => {
                    log::info!("Post {} inserted successfully ({})", summary.key, id);
                    report.inserted.push(summary.key.clone());
                }
                Err(e) => {
                    log::error!("Error processing post {} ({}): {}", summary.key, summary.url, e);
                    report.failed.push(summary.key.clone());
                }
            }
        }

        log::debug!("{}: {}", site, Phase::Done);
        report
    }

    /// Drop posts already stored or repeated within this listing.
    async fn filter_new(
        &self,
        kind: ListingKind,
        summaries: Vec<PostSummary>,
        report: &mut AdapterReport,
    ) -> Vec<PostSummary> {
        let mut seen = HashSet::new();
        let mut pending = Vec::new();

        for summary in summaries {
            if !seen.insert(summary.key.clone()) {
                log::debug!("Duplicate listing entry {}", summary.key);
                continue;
            }
            match self.exists(kind, &summary.key).await {
                Ok(true) => report.skipped_existing.push(summary.key),
                Ok(false) => pending.push(summary),
                Err(e) => {
                    log::error!("Existence check failed for {}: {}", summary.key, e);
                    report.failed.push(summary.key);
                }
            }
        }
        pending
    }

    async fn exists(&self, kind: ListingKind, key: &PostKey) -> Result<bool> {
        let filter = json!({
            "site": key.site,
            "board_id": key.board_id(),
        });
        let found = self.context.store.find(kind.collection(), &filter).await?;
        Ok(!found.is_empty())
    }

    /// Fetch, normalize, enrich and insert one post; returns the record id.
    async fn process_post(
        &self,
        adapter: &dyn SiteAdapter,
        kind: ListingKind,
        summary: &PostSummary,
    ) -> Result<String> {
        let markup = adapter.fetch_body(summary).await?;
        let base = Url::parse(&summary.url).map_err(|e| AppError::body(summary.key.to_string(), e))?;

        let normalizer = ContentNormalizer::new(&self.context.media, self.context.ocr.as_ref());
        let contents = normalizer
            .normalize(
                &markup,
                &adapter.body_layout(),
                &base,
                &summary.key,
                &adapter.request_headers(),
            )
            .await?;

        let resolver = EnrichmentResolver::new(
            self.context.store.as_ref(),
            self.context.enricher.as_ref(),
            self.context.enrichment_max_chars,
        );
        let enrichment_ref = resolver
            .resolve(&summary.key, &enrichment_text(summary, &contents))
            .await?;

        let record = PostRecord::compose(summary, contents, enrichment_ref);
        self.context
            .store
            .insert_one(kind.collection(), serde_json::to_value(&record)?)
            .await
    }
}

/// Title followed by every textual segment, including OCR text.
fn enrichment_text(summary: &PostSummary, contents: &[ContentSegment]) -> String {
    std::iter::once(summary.title.as_str())
        .chain(contents.iter().filter_map(ContentSegment::as_text))
        .collect::<Vec<_>>()
        .join("\n")
}
