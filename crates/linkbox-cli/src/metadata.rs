//! Page title fetching
//!
//! Used by `link add` when no title is given.

use anyhow::Result;
use reqwest::Url;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;

/// Fetch timeout in seconds
const FETCH_TIMEOUT: u64 = 10;

/// Best title for `url`
///
/// Falls back to the host name, then to the URL itself, so it never fails.
pub async fn fetch_title(url: &str) -> String {
    match fetch_title_inner(url).await {
        Ok(Some(title)) => title,
        Ok(None) => fallback_title(url),
        Err(e) => {
            debug!("Title fetch for {} failed: {}", url, e);
            fallback_title(url)
        }
    }
}

async fn fetch_title_inner(url: &str) -> Result<Option<String>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT))
        .user_agent("Mozilla/5.0 (compatible; linkbox/1.0)")
        .build()?;

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Ok(None);
    }

    let html = response.text().await?;
    Ok(extract_title(&html))
}

/// `og:title`, then `twitter:title`, then `<title>`
fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for property in ["og:title", "twitter:title"] {
        if let Some(title) = meta_content(&document, property) {
            return Some(title);
        }
    }

    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Content of a meta tag matched by `property` or `name`
fn meta_content(document: &Html, key: &str) -> Option<String> {
    for attr in ["property", "name"] {
        let Ok(selector) = Selector::parse(&format!(r#"meta[{}="{}"]"#, attr, key)) else {
            continue;
        };
        let content = document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(content) = content {
            return Some(content.to_string());
        }
    }
    None
}

fn fallback_title(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}
