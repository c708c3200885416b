// src/pipeline/report.rs

//! Per-run and per-adapter ingestion summaries.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::models::{ListingKind, PostKey, Site};

/// How an adapter's run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterOutcome {
    /// Listing fetched; individual posts may still have failed
    Completed,
    /// Listing fetched but contained no posts
    EmptyListing,
    /// Listing could not be fetched or parsed
    ListingFailed(String),
}

impl fmt::Display for AdapterOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterOutcome::Completed => f.write_str("completed"),
            AdapterOutcome::EmptyListing => f.write_str("empty listing"),
            AdapterOutcome::ListingFailed(reason) => write!(f, "listing failed: {reason}"),
        }
    }
}

/// Result of running one adapter.
#[derive(Debug, Clone)]
pub struct AdapterReport {
    pub site: Site,
    pub outcome: AdapterOutcome,
    pub inserted: Vec<PostKey>,
    pub skipped_existing: Vec<PostKey>,
    pub failed: Vec<PostKey>,
}

impl AdapterReport {
    pub fn new(site: Site) -> Self {
        Self {
            site,
            outcome: AdapterOutcome::Completed,
            inserted: Vec::new(),
            skipped_existing: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Success at adapter granularity: the listing was usable.
    pub fn succeeded(&self) -> bool {
        self.outcome == AdapterOutcome::Completed
    }
}

/// Result of one ingestion run across all adapters.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub kind: ListingKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub adapters: Vec<AdapterReport>,
}

impl RunReport {
    /// Success flag per adapter.
    pub fn statuses(&self) -> BTreeMap<Site, bool> {
        self.adapters
            .iter()
            .map(|report| (report.site, report.succeeded()))
            .collect()
    }

    pub fn inserted_total(&self) -> usize {
        self.adapters.iter().map(|r| r.inserted.len()).sum()
    }

    pub fn adapter(&self, site: Site) -> Option<&AdapterReport> {
        self.adapters.iter().find(|r| r.site == site)
    }

    pub fn log_summary(&self) {
        let elapsed = self.finished_at - self.started_at;
        log::info!(
            "{} run finished in {}s: {} posts inserted",
            self.kind,
            elapsed.num_seconds(),
            self.inserted_total()
        );
        for report in &self.adapters {
            log::info!(
                "  {}: {} (inserted {}, existing {}, failed {})",
                report.site,
                report.outcome,
                report.inserted.len(),
                report.skipped_existing.len(),
                report.failed.len()
            );
            if !report.skipped_existing.is_empty() {
                let keys: Vec<String> = report.skipped_existing.iter().map(|k| k.to_string()).collect();
                log::info!("    Already exists post: {}", keys.join(", "));
            }
            if !report.failed.is_empty() {
                let keys: Vec<String> = report.failed.iter().map(|k| k.to_string()).collect();
                log::warn!("    Failed: {}", keys.join(", "));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_outcomes() {
        let mut failed = AdapterReport::new(Site::Theqoo);
        failed.outcome = AdapterOutcome::ListingFailed("503".to_string());
        let mut partial = AdapterReport::new(Site::Ygosu);
        partial.failed.push(PostKey::new(Site::Ygosu, "free", 1));

        let now = Utc::now();
        let report = RunReport {
            kind: ListingKind::RealTime,
            started_at: now,
            finished_at: now,
            adapters: vec![failed, partial],
        };

        let statuses = report.statuses();
        assert_eq!(statuses.get(&Site::Theqoo), Some(&false));
        assert_eq!(statuses.get(&Site::Ygosu), Some(&true));
        assert_eq!(report.inserted_total(), 0);
    }
}
