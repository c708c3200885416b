//! ygosu real-time and daily best boards.

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
use crate::utils::parse_selector;

const BASE_URL: &str = "https://ygosu.com";
const REAL_TIME_PATH: &str = "/board/real_article";
const DAILY_PATH: &str = "/board/best_article/?type=daily";

const KINDS: [ListingKind; 2] = [ListingKind::RealTime, ListingKind::Daily];

/// Text comes from paragraphs only; `div`s inside the container also hold
/// navigation and comment widgets, so they contribute media alone.
const BODY: BodyLayout = BodyLayout {
    container: "div.container",
    blocks: "p, div",
    text_blocks: "p",
};

pub struct Ygosu {
    client: Client,
    base_url: String,
}

impl Ygosu {
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

    fn listing_url(&self, kind: ListingKind) -> String {
        let path = match kind {
            ListingKind::RealTime => REAL_TIME_PATH,
            ListingKind::Daily => DAILY_PATH,
        };
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Extract summaries from either listing.
    ///
    /// Real-time rows show a time of day; rows showing a date are skipped one
    /// by one. Daily rows show a date only and carry a rank cell.
    pub fn parse_listing(
        &self,
        html: &str,
        kind: ListingKind,
        today: NaiveDate,
    ) -> Result<Vec<PostSummary>> {
        let document = Html::parse_document(html);
        let base = Url::parse(&self.base_url)?;

        let row_sel = parse_selector("tr")?;
        let title_sel = parse_selector(".tit a")?;
        let time_sel = match kind {
            ListingKind::RealTime => parse_selector(".date")?,
            ListingKind::Daily => parse_selector(".day")?,
        };
        let rank_sel = parse_selector(".num")?;

        Ok(collect_rows(Site::Ygosu, document.select(&row_sel), |row| {
            let (Some(link), Some(time_cell)) =
                (row.select(&title_sel).next(), row.select(&time_sel).next())
            else {
                return Ok(RowOutcome::Skip);
            };
            let rank = match kind {
                ListingKind::RealTime => None,
                ListingKind::Daily => match row.select(&rank_sel).next() {
                    Some(cell) => element_text(&cell).parse::<u32>().ok(),
                    None => return Ok(RowOutcome::Skip),
                },
            };

            let time = element_text(&time_cell);
            if self.is_ad(&time) {
                return Ok(RowOutcome::Skip);
            }
            if kind == ListingKind::RealTime && !time.contains(':') {
                log::debug!("ygosu: skipping dated real-time row '{}'", time);
                return Ok(RowOutcome::Skip);
            }

            let href = link
                .value()
                .attr("href")
                .ok_or_else(|| AppError::row("title link without href"))?;
            let url = base.join(href)?;
            let (category, number) = board_id_from_url(&url)
                .ok_or_else(|| AppError::row(format!("no board id in {url}")))?;

            Ok(RowOutcome::Post(PostSummary {
                key: PostKey::new(Site::Ygosu, category, number),
                title: element_text(&link),
                url: url.to_string(),
                created_at: parse_post_time(&time, today),
                rank,
            }))
        }))
    }
}

/// Category and number from `/board/{category}/{number}/...`.
fn board_id_from_url(url: &Url) -> Option<(String, u64)> {
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    let position = segments
        .iter()
        .position(|s| s.chars().all(|c| c.is_ascii_digit()))?;
    let category = segments.get(position.checked_sub(1)?)?;
    let number = segments[position].parse().ok()?;
    Some((category.to_string(), number))
}

#[async_trait]
impl SiteAdapter for Ygosu {
    fn site(&self) -> Site {
        Site::Ygosu
    }

    fn kinds(&self) -> &'static [ListingKind] {
        &KINDS
    }

    async fn listing(&self, kind: ListingKind) -> Result<Vec<PostSummary>> {
        let url = self.listing_url(kind);
        let html = fetch_listing_page(&self.client, self.site(), &url, self.request_headers()).await?;
        self.parse_listing(&html, kind, local_today())
    }

    /// Ads and notices have an empty time cell.
    fn is_ad(&self, time_cell: &str) -> bool {
        time_cell.trim().is_empty()
    }

    async fn fetch_body(&self, summary: &PostSummary) -> Result<String> {
        fetch_body_page(&self.client, &summary.url, self.request_headers()).await
    }

    fn body_layout(&self) -> BodyLayout {
        BODY
    }

    fn request_headers(&self) -> HeaderMap {
        browser_headers(CHROME_USER_AGENT, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{BodyNode, plan_body};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[test]
    fn real_time_skips_ads_and_dated_rows() {
        let html = r#"<table>
            <tr><td class="tit"><a href="https://ygosu.com/board/yeobgi/9001/?type=real">sponsored</a></td><td class="date"></td></tr>
            <tr><td class="tit"><a href="https://ygosu.com/board/yeobgi/9000/?type=real">first</a></td><td class="date">13:05</td></tr>
            <tr><td class="tit"><a href="https://ygosu.com/board/free/8999/">yesterday</a></td><td class="date">2026-02-28</td></tr>
            <tr><td class="tit"><a href="https://ygosu.com/board/free/8998/">second</a></td><td class="date">12:59</td></tr>
            <tr><td class="tit"><a href="https://ygosu.com/board/free/">no number</a></td><td class="date">12:58</td></tr>
        </table>"#;

        let posts = Ygosu::new(Client::new())
            .parse_listing(html, ListingKind::RealTime, today())
            .unwrap();

        let keys: Vec<PostKey> = posts.iter().map(|p| p.key.clone()).collect();
        assert_eq!(
            keys,
            vec![
                PostKey::new(Site::Ygosu, "yeobgi", 9000),
                PostKey::new(Site::Ygosu, "free", 8998),
            ]
        );
        assert_eq!(posts[0].created_at, today().and_hms_opt(13, 5, 0));
        assert!(posts.iter().all(|p| p.rank.is_none()));
    }

    #[test]
    fn daily_uses_date_only_cells() {
        let html = r#"<table>
            <tr><td class="num">1</td><td class="tit"><a href="/board/best_article/700/?type=daily">top</a></td><td class="day">2026-02-28</td></tr>
            <tr><td class="num"></td><td class="tit"><a href="/board/notice/5/">notice</a></td><td class="day"></td></tr>
            <tr><td class="tit"><a href="/board/free/1/">no rank</a></td><td class="day">2026-02-28</td></tr>
        </table>"#;

        let posts = Ygosu::new(Client::new())
            .parse_listing(html, ListingKind::Daily, today())
            .unwrap();

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].key, PostKey::new(Site::Ygosu, "best_article", 700));
        assert_eq!(posts[0].rank, Some(1));
        assert_eq!(posts[0].url, "https://ygosu.com/board/best_article/700/?type=daily");
        assert_eq!(
            posts[0].created_at,
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap().and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn body_text_comes_from_paragraphs_only() {
        let markup = r#"<div class="container">
            <div class="nav">Home | Login</div>
            <p>body</p>
            <div class="comment">reply spam</div>
        </div>"#;
        let base = Url::parse("https://ygosu.com/board/free/1/").unwrap();

        let nodes = plan_body(markup, &BODY, &base).unwrap();
        assert_eq!(nodes, vec![BodyNode::Text("body".to_string())]);
    }

    #[test]
    fn board_id_parsing() {
        let url = Url::parse("https://ygosu.com/board/yeobgi/123/?type=real").unwrap();
        assert_eq!(board_id_from_url(&url), Some(("yeobgi".to_string(), 123)));

        let url = Url::parse("https://ygosu.com/123/").unwrap();
        assert_eq!(board_id_from_url(&url), None);
    }
}
