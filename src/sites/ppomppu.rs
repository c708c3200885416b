//! ppomppu hot board.

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
    fetch_listing_page, has_date_part, local_today, parse_post_time,
};
use crate::utils::http::browser_headers;
use crate::utils::{parse_selector, query_param};

const BASE_URL: &str = "https://www.ppomppu.co.kr";
const LISTING_PATH: &str = "/hot.php?id=&page=1&category=999";

const BODY: BodyLayout = BodyLayout::uniform("td.board-contents", "p");

pub struct Ppomppu {
    client: Client,
    base_url: String,
}

impl Ppomppu {
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

    /// Extract summaries, stopping at the first row dated before today.
    pub fn parse_listing(&self, html: &str, today: NaiveDate) -> Result<Vec<PostSummary>> {
        let document = Html::parse_document(html);
        let base = Url::parse(&self.base_url)?;

        let row_sel = parse_selector("tr.bbs_new1")?;
        let title_sel = parse_selector("a.baseList-title")?;
        let date_sel = parse_selector("td.board_date")?;

        Ok(collect_rows(Site::Ppomppu, document.select(&row_sel), |row| {
            let (Some(link), Some(date_cell)) =
                (row.select(&title_sel).next(), row.select(&date_sel).next())
            else {
                return Ok(RowOutcome::Skip);
            };

            let title = element_text(&link);
            if self.is_ad(&title) {
                return Ok(RowOutcome::Skip);
            }

            let time = element_text(&date_cell);
            if has_date_part(&time) {
                return Ok(RowOutcome::Stop);
            }

            let href = link
                .value()
                .attr("href")
                .ok_or_else(|| AppError::row("title link without href"))?;
            let url = base.join(href)?;
            let category = query_param(&url, "id")
                .ok_or_else(|| AppError::row(format!("no board id in {url}")))?;
            let number = query_param(&url, "no")
                .and_then(|no| no.parse::<u64>().ok())
                .ok_or_else(|| AppError::row(format!("no post number in {url}")))?;

            Ok(RowOutcome::Post(PostSummary {
                key: PostKey::new(Site::Ppomppu, category, number),
                title,
                url: url.to_string(),
                created_at: parse_post_time(&time, today),
                rank: None,
            }))
        }))
    }
}

#[async_trait]
impl SiteAdapter for Ppomppu {
    fn site(&self) -> Site {
        Site::Ppomppu
    }

    async fn listing(&self, _kind: ListingKind) -> Result<Vec<PostSummary>> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), LISTING_PATH);
        let html = fetch_listing_page(&self.client, self.site(), &url, self.request_headers()).await?;
        self.parse_listing(&html, local_today())
    }

    fn is_ad(&self, title: &str) -> bool {
        title.trim_start().starts_with("AD")
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

    const LISTING: &str = r#"<table>
        <tr class="bbs_new1"><td><a class="baseList-title" href="/zboard/view.php?id=freeboard&no=501">AD 광고입니다</a></td>
            <td class="board_date">12:00:00</td></tr>
        <tr class="bbs_new1"><td><a class="baseList-title" href="/zboard/view.php?id=freeboard&no=500">첫 글</a></td>
            <td class="board_date">11:58:03</td></tr>
        <tr class="bbs_new1"><td><a class="baseList-title" href="/zboard/view.php?id=humor&no=77">둘째 글</a></td>
            <td class="board_date">11:40:00</td></tr>
        <tr class="bbs_new1"><td><a class="baseList-title" href="/zboard/view.php?id=humor&no=70">어제 글</a></td>
            <td class="board_date">26/02/28</td></tr>
        <tr class="bbs_new1"><td><a class="baseList-title" href="/zboard/view.php?id=humor&no=60">더 오래된 글</a></td>
            <td class="board_date">11:00:00</td></tr>
    </table>"#;

    #[test]
    fn listing_filters_ads_and_stops_at_dated_row() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let posts = Ppomppu::new(Client::new())
            .parse_listing(LISTING, today)
            .unwrap();

        let keys: Vec<PostKey> = posts.iter().map(|p| p.key.clone()).collect();
        assert_eq!(
            keys,
            vec![
                PostKey::new(Site::Ppomppu, "freeboard", 500),
                PostKey::new(Site::Ppomppu, "humor", 77),
            ]
        );
        assert_eq!(posts[0].created_at, today.and_hms_opt(11, 58, 3));
        assert_eq!(
            posts[1].url,
            "https://www.ppomppu.co.kr/zboard/view.php?id=humor&no=77"
        );
    }

    #[test]
    fn ad_predicate() {
        let adapter = Ppomppu::new(Client::new());
        assert!(adapter.is_ad("AD 특가"));
        assert!(!adapter.is_ad("오늘의 AD"));
    }
}
