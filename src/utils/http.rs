// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};

use crate::error::Result;
use crate::models::CrawlerConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a page as text, failing on non-success statuses.
///
/// The body is returned unparsed; `scraper::Html` is not `Send` and must not
/// be held across an await point.
pub async fn fetch_text(client: &reqwest::Client, url: &str, headers: HeaderMap) -> Result<String> {
    let response = client
        .get(url)
        .headers(headers)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.text().await?)
}

/// Build request headers with a user agent and optional referer.
pub fn browser_headers(user_agent: &'static str, referer: Option<&'static str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(user_agent));
    if let Some(referer) = referer {
        headers.insert(REFERER, HeaderValue::from_static(referer));
    }
    headers
}
