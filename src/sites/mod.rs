//! Per-site adapters for community best-post listings.
//!
//! Every adapter knows its listing URL, how to turn listing rows into
//! [`PostSummary`] values, which rows are ads or notices, and where its post
//! bodies live. DOM walks are synchronous and return owned data, so no
//! `scraper::Html` is ever held across an await point.

mod dcinside;
mod ppomppu;
mod theqoo;
mod timestamp;
mod ygosu;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderMap;
use scraper::ElementRef;

use crate::error::{AppError, Result};
use crate::models::{ListingKind, PostSummary, Site, SitesConfig};
use crate::services::BodyLayout;
use crate::utils::http::fetch_text;
use crate::utils::normalize_whitespace;

pub use dcinside::Dcinside;
pub use ppomppu::Ppomppu;
pub use theqoo::Theqoo;
pub use timestamp::{has_date_part, parse_post_time};
pub use ygosu::Ygosu;

/// Desktop Chrome user agent; several boards refuse the default one.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Capability set shared by all site adapters.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn site(&self) -> Site;

    /// Listing kinds this site publishes.
    fn kinds(&self) -> &'static [ListingKind] {
        &[ListingKind::RealTime]
    }

    fn supports(&self, kind: ListingKind) -> bool {
        self.kinds().contains(&kind)
    }

    /// Fetch and extract the listing, newest first.
    ///
    /// A failed fetch is a `ListingFetch` error; malformed rows are logged
    /// and skipped without failing the listing.
    async fn listing(&self, kind: ListingKind) -> Result<Vec<PostSummary>>;

    /// Whether a row marker (title, number cell or time cell, per site)
    /// identifies a sponsored or notice row.
    fn is_ad(&self, marker: &str) -> bool;

    /// Fetch the raw markup of a single post page.
    async fn fetch_body(&self, summary: &PostSummary) -> Result<String>;

    /// Where the post body sits in the fetched page.
    fn body_layout(&self) -> BodyLayout;

    /// Headers for body and media requests.
    fn request_headers(&self) -> HeaderMap;

    /// Whether media can only be fetched through a real browser session.
    fn supports_browser_download(&self) -> bool {
        false
    }
}

/// Adapter for one site.
pub fn adapter_for(site: Site, client: Client) -> Box<dyn SiteAdapter> {
    match site {
        Site::Dcinside => Box::new(Dcinside::new(client)),
        Site::Ppomppu => Box::new(Ppomppu::new(client)),
        Site::Theqoo => Box::new(Theqoo::new(client)),
        Site::Ygosu => Box::new(Ygosu::new(client)),
    }
}

/// Adapters for every enabled site, in configured order, without duplicates.
pub fn build_adapters(config: &SitesConfig, client: &Client) -> Vec<Box<dyn SiteAdapter>> {
    let mut sites: Vec<Site> = Vec::with_capacity(config.enabled.len());
    for site in &config.enabled {
        if !sites.contains(site) {
            sites.push(*site);
        }
    }
    sites
        .into_iter()
        .map(|site| adapter_for(site, client.clone()))
        .collect()
}

/// What a single listing row turned out to be.
pub(crate) enum RowOutcome {
    Post(PostSummary),
    /// Ads, notices and layout rows
    Skip,
    /// First older entry on a newest-first listing
    Stop,
}

/// Walk listing rows, isolating per-row failures.
pub(crate) fn collect_rows<'a, I, F>(site: Site, rows: I, mut parse_row: F) -> Vec<PostSummary>
where
    I: IntoIterator<Item = ElementRef<'a>>,
    F: FnMut(ElementRef<'a>) -> Result<RowOutcome>,
{
    let mut posts = Vec::new();
    for (index, row) in rows.into_iter().enumerate() {
        match parse_row(row) {
            Ok(RowOutcome::Post(summary)) => posts.push(summary),
            Ok(RowOutcome::Skip) => {}
            Ok(RowOutcome::Stop) => {
                log::debug!("{}: older entry at row {}, stopping", site, index);
                break;
            }
            Err(e) => log::warn!("{}: skipping row {}: {}", site, index, e),
        }
    }
    posts
}

/// Whitespace-normalized text of an element.
pub(crate) fn element_text(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

pub(crate) async fn fetch_listing_page(
    client: &Client,
    site: Site,
    url: &str,
    headers: HeaderMap,
) -> Result<String> {
    log::info!("Fetching {} listing: {}", site, url);
    fetch_text(client, url, headers)
        .await
        .map_err(|e| AppError::listing(site.as_str(), format!("{url}: {e}")))
}

pub(crate) async fn fetch_body_page(client: &Client, url: &str, headers: HeaderMap) -> Result<String> {
    log::debug!("Fetching post body: {}", url);
    fetch_text(client, url, headers)
        .await
        .map_err(|e| AppError::body(url, e))
}

/// Today's date in local time, for time-only listing cells.
pub(crate) fn local_today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
