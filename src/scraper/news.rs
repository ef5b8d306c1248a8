//! Per-security headline search against the Google News RSS feed.

use crate::config::ScraperConfig;
use crate::models::NewsItem;
use crate::scraper::http_client::HttpClient;
use anyhow::{Context, Result};
use tracing::{debug, warn};
use url::Url;

pub struct GoogleNewsClient {
    client: HttpClient,
    rss_url: String,
    per_security: usize,
}

impl GoogleNewsClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
            rss_url: config.news_rss_url.clone(),
            per_security: config.news_per_security,
        })
    }

    /// Top headlines for one security, searched by name.
    pub async fn fetch_for(&self, code: &str, name: &str) -> Result<Vec<NewsItem>> {
        let url = search_url(&self.rss_url, name)?;
        debug!("News search: {} → {}", name, url);

        let body = self
            .client
            .get_text(url.as_str())
            .await
            .with_context(|| format!("News feed request for '{}' failed", name))?;

        let channel = rss::Channel::read_from(body.as_bytes())
            .with_context(|| format!("Failed to parse news feed for '{}'", name))?;

        let items: Vec<NewsItem> = channel
            .items()
            .iter()
            .take(self.per_security)
            .filter_map(|item| {
                let title = item.title()?.to_string();
                let link = item.link()?.to_string();
                Some(NewsItem {
                    code: code.to_string(),
                    name: name.to_string(),
                    media: item
                        .source()
                        .map(|s| s.title().unwrap_or("Google News").to_string())
                        .unwrap_or_else(|| "Google News".to_string()),
                    title,
                    url: link,
                })
            })
            .collect();

        if items.is_empty() {
            warn!("{}: no headlines found", name);
        }
        Ok(items)
    }
}

/// Build the RSS search URL for a Korean-locale query. `Url` handles the
/// percent-encoding of Hangul query strings.
pub fn search_url(base: &str, query: &str) -> Result<Url> {
    Url::parse_with_params(
        base,
        &[("q", query), ("hl", "ko"), ("gl", "KR"), ("ceid", "KR:ko")],
    )
    .with_context(|| format!("Bad news feed URL {}", base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_query() {
        let url = search_url("https://news.google.com/rss/search", "삼성전자").unwrap();
        let s = url.as_str();
        assert!(s.starts_with("https://news.google.com/rss/search?q=%EC%82%BC%EC%84%B1%EC%A0%84%EC%9E%90"));
        assert!(s.contains("hl=ko"));
        assert!(s.contains("ceid=KR%3Ako") || s.contains("ceid=KR:ko"));
    }

    #[test]
    fn test_rss_channel_parse() {
        let feed = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0"><channel>
          <title>search</title><link>x</link><description>d</description>
          <item>
            <title>삼성전자, 신규 파운드리 수주</title>
            <link>https://example.com/a</link>
            <source url="https://media.example">머니투데이</source>
          </item>
        </channel></rss>"#;

        let channel = rss::Channel::read_from(feed.as_bytes()).unwrap();
        let item = &channel.items()[0];
        assert_eq!(item.title(), Some("삼성전자, 신규 파운드리 수주"));
        assert_eq!(item.source().unwrap().title(), Some("머니투데이"));
    }
}
