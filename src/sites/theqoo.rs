//! theqoo "hot" board. The board has a single category.

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
use crate::utils::parse_selector;

const BASE_URL: &str = "https://theqoo.net";
const CATEGORY: &str = "hot";

const BODY: BodyLayout = BodyLayout::uniform("div.rd_body", "p, div");

pub struct Theqoo {
    client: Client,
    base_url: String,
}

impl Theqoo {
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

    fn post_url(&self, number: u64) -> String {
        format!("{}/{}/{}", self.base_url.trim_end_matches('/'), CATEGORY, number)
    }

    /// Extract summaries, stopping at the first row that shows a date
    /// instead of a time of day.
    pub fn parse_listing(&self, html: &str, today: NaiveDate) -> Result<Vec<PostSummary>> {
        let document = Html::parse_document(html);
        let base = Url::parse(&self.base_url)?;

        let row_sel = parse_selector(".hide_notice tr")?;
        let cell_sel = parse_selector("td")?;
        let link_sel = parse_selector("a[href]")?;

        Ok(collect_rows(Site::Theqoo, document.select(&row_sel), |row| {
            let cells: Vec<_> = row.select(&cell_sel).collect();
            if cells.len() <= 1 {
                return Ok(RowOutcome::Skip);
            }
            if self.is_ad(&element_text(&cells[0])) {
                return Ok(RowOutcome::Skip);
            }

            let (Some(title_cell), Some(time_cell)) = (cells.get(2), cells.get(3)) else {
                return Err(AppError::row(format!("expected 4 cells, got {}", cells.len())));
            };
            let time = element_text(time_cell);
            if has_date_part(&time) || !time.contains(':') {
                return Ok(RowOutcome::Stop);
            }

            let link = title_cell
                .select(&link_sel)
                .next()
                .ok_or_else(|| AppError::row("title cell without link"))?;
            let url = base.join(link.value().attr("href").unwrap_or_default())?;
            let number = url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .and_then(|last| last.parse::<u64>().ok())
                .ok_or_else(|| AppError::row(format!("no post number in {url}")))?;

            Ok(RowOutcome::Post(PostSummary {
                key: PostKey::new(Site::Theqoo, CATEGORY, number),
                title: element_text(&link),
                url: url.to_string(),
                created_at: parse_post_time(&time, today),
                rank: None,
            }))
        }))
    }
}

#[async_trait]
impl SiteAdapter for Theqoo {
    fn site(&self) -> Site {
        Site::Theqoo
    }

    async fn listing(&self, _kind: ListingKind) -> Result<Vec<PostSummary>> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), CATEGORY);
        let html = fetch_listing_page(&self.client, self.site(), &url, self.request_headers()).await?;
        self.parse_listing(&html, local_today())
    }

    /// Notice rows carry a label instead of a post number.
    fn is_ad(&self, number_cell: &str) -> bool {
        let marker = number_cell.trim();
        marker.is_empty() || !marker.chars().all(|c| c.is_ascii_digit())
    }

    async fn fetch_body(&self, summary: &PostSummary) -> Result<String> {
        fetch_body_page(&self.client, &self.post_url(summary.key.number), self.request_headers()).await
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
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LISTING: &str = r#"<table class="hide_notice"><tbody>
        <tr class="notice"><td>공지</td><td></td><td><a href="/hot/1">공지사항</a></td><td>2024.01.01</td></tr>
        <tr><td>3001</td><td>유머</td><td><a href="/hot/3001">새 글</a> <a class="replyNum" href="/hot/3001#comment">12</a></td><td>10:42</td></tr>
        <tr><td>3000</td><td>이슈</td><td><a href="/hot/3000">두번째</a></td><td>10:30</td></tr>
        <tr><td>2999</td><td>이슈</td><td><a href="/hot/2999">어제</a></td><td>02.28</td></tr>
        <tr><td>2998</td><td>이슈</td><td><a href="/hot/2998">그제</a></td><td>09:00</td></tr>
    </tbody></table>"#;

    #[test]
    fn listing_skips_notices_and_stops_at_dated_row() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let posts = Theqoo::new(Client::new()).parse_listing(LISTING, today).unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].key, PostKey::new(Site::Theqoo, "hot", 3001));
        assert_eq!(posts[0].title, "새 글");
        assert_eq!(posts[0].created_at, today.and_hms_opt(10, 42, 0));
        assert_eq!(posts[1].key.number, 3000);
    }

    #[tokio::test]
    async fn body_is_fetched_from_hot_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hot/3001"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<div class=\"rd_body\">x</div>"))
            .mount(&server)
            .await;

        let adapter = Theqoo::new(Client::new()).with_base_url(server.uri());
        let summary = PostSummary {
            key: PostKey::new(Site::Theqoo, "hot", 3001),
            title: "t".to_string(),
            url: "https://elsewhere.invalid/hot/3001".to_string(),
            created_at: None,
            rank: None,
        };
        let body = adapter.fetch_body(&summary).await.unwrap();
        assert!(body.contains("rd_body"));
    }

    #[tokio::test]
    async fn missing_body_is_body_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = Theqoo::new(Client::new()).with_base_url(server.uri());
        let summary = PostSummary {
            key: PostKey::new(Site::Theqoo, "hot", 1),
            title: "t".to_string(),
            url: String::new(),
            created_at: None,
            rank: None,
        };
        let err = adapter.fetch_body(&summary).await.unwrap_err();
        assert!(matches!(err, AppError::BodyFetch { .. }));
    }
}
