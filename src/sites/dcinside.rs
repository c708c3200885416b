//! dcinside "dcbest" gallery.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use reqwest::header::HeaderMap;
use scraper::Html;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ListingKind, PostKey, PostSummary, Site};
use crate::services::BodyLayout;
use crate::sites::{
    CHROME_USER_AGENT, RowOutcome, SiteAdapter, collect_rows, element_text, fetch_body_page,
    fetch_listing_page, local_today, parse_post_time,
};
use crate::utils::http::browser_headers;
use crate::utils::{parse_selector, query_param};

const BASE_URL: &str = "https://gall.dcinside.com";
const LISTING_PATH: &str = "/board/lists/?id=dcbest";
const REFERER: &str = "https://www.dcinside.com/";

/// Number-cell markers of notice, survey and sponsored rows.
const AD_MARKERS: [&str; 3] = ["공지", "설문", "AD"];

const BODY: BodyLayout = BodyLayout::uniform("div.write_div", "p");

pub struct Dcinside {
    client: Client,
    base_url: String,
}

impl Dcinside {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Extract summaries from a listing page.
    pub fn parse_listing(&self, html: &str, today: NaiveDate) -> Result<Vec<PostSummary>> {
        let document = Html::parse_document(html);
        let base = Url::parse(&self.base_url)?;

        let row_sel = parse_selector("tr.ub-content")?;
        let link_sel = parse_selector("a[href]")?;
        let number_sel = parse_selector("td.gall_num")?;
        let date_sel = parse_selector("td.gall_date")?;

        Ok(collect_rows(Site::Dcinside, document.select(&row_sel), |row| {
            let Some(link) = row.select(&link_sel).next() else {
                return Ok(RowOutcome::Skip);
            };
            let marker = row
                .select(&number_sel)
                .next()
                .map(|cell| element_text(&cell))
                .unwrap_or_default();
            if self.is_ad(&marker) {
                return Ok(RowOutcome::Skip);
            }

            let url = base.join(link.value().attr("href").unwrap_or_default())?;
            let category = query_param(&url, "id")
                .ok_or_else(|| AppError::row(format!("no gallery id in {url}")))?;
            let number = query_param(&url, "no")
                .and_then(|no| no.parse::<u64>().ok())
                .ok_or_else(|| AppError::row(format!("no post number in {url}")))?;
            let created_at = row
                .select(&date_sel)
                .next()
                .and_then(|cell| parse_post_time(&element_text(&cell), today));

            Ok(RowOutcome::Post(PostSummary {
                key: PostKey::new(Site::Dcinside, category, number),
                title: element_text(&link),
                url: url.to_string(),
                created_at,
                rank: None,
            }))
        }))
    }
}

#[async_trait]
impl SiteAdapter for Dcinside {
    fn site(&self) -> Site {
        Site::Dcinside
    }

    async fn listing(&self, _kind: ListingKind) -> Result<Vec<PostSummary>> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), LISTING_PATH);
        let html = fetch_listing_page(&self.client, self.site(), &url, self.request_headers()).await?;
        self.parse_listing(&html, local_today())
    }

    fn is_ad(&self, marker: &str) -> bool {
        AD_MARKERS.contains(&marker.trim())
    }

    async fn fetch_body(&self, summary: &PostSummary) -> Result<String> {
        fetch_body_page(&self.client, &summary.url, self.request_headers()).await
    }

    fn body_layout(&self) -> BodyLayout {
        BODY
    }

    fn request_headers(&self) -> HeaderMap {
        browser_headers(CHROME_USER_AGENT, Some(REFERER))
    }
}
