//! Google News keyword search.
//!
//! Turns a keyword into a list of [`FetchTask`]s by scraping the Google News
//! search page. Parsing is separated from the request so it can be tested
//! against saved markup.

use crate::error::FetchError;
use crate::types::{FetchTask, SearchConfig, DEFAULT_TIMEOUT};
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

const CARD_SELECTOR: &str = "div.m5k28";
const LINK_SELECTOR: &str = "a.JtKRv";

/// Client for the news search page.
#[derive(Clone)]
pub struct NewsSearch {
    http_client: reqwest::Client,
    config: SearchConfig,
}

impl NewsSearch {
    /// Create a search client with default settings.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(SearchConfig::default(), DEFAULT_TIMEOUT)
    }

    /// Create a search client with custom settings and request timeout.
    pub fn with_config(config: SearchConfig, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(format!("newsfetch/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| {
                FetchError::network_with_source(
                    config.base_url.clone(),
                    "Failed to create HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Build the search page URL for `keyword`.
    pub fn search_url(&self, keyword: &str) -> Result<Url, FetchError> {
        let edition = self.config.edition();
        Url::parse_with_params(
            &self.config.base_url,
            &[
                ("q", keyword),
                ("hl", self.config.language.as_str()),
                ("gl", self.config.region.as_str()),
                ("ceid", edition.as_str()),
            ],
        )
        .map_err(|e| FetchError::invalid_url(&self.config.base_url, e.to_string()))
    }

    /// Search for `keyword` and return one task per article found.
    ///
    /// # Errors
    ///
    /// Fails if the keyword is blank, the request fails or the page returns a
    /// non-success status. A page without recognizable cards yields an empty list.
    pub async fn search(&self, keyword: &str) -> Result<Vec<FetchTask>, FetchError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(FetchError::config("search keyword cannot be empty"));
        }

        let url = self.search_url(keyword)?;
        tracing::info!(%keyword, "searching news");

        let response = self.http_client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(url.as_str(), status.as_u16()));
        }
        let html = response.text().await?;

        let tasks = parse_search_results(&html, &url, self.config.max_articles)?;
        tracing::info!(%keyword, articles = tasks.len(), "search finished");
        Ok(tasks)
    }
}

/// Extract article tasks from a search results page.
///
/// Every `div.m5k28` card contributes its first `a.JtKRv` link, with the link
/// text as headline. Relative links are resolved against `page_url`. Cards
/// without a link or href are skipped; at most `max_articles` tasks are returned.
pub fn parse_search_results(
    html: &str,
    page_url: &Url,
    max_articles: usize,
) -> Result<Vec<FetchTask>, FetchError> {
    let card_selector = Selector::parse(CARD_SELECTOR)
        .map_err(|e| FetchError::parse(format!("invalid selector '{}': {}", CARD_SELECTOR, e)))?;
    let link_selector = Selector::parse(LINK_SELECTOR)
        .map_err(|e| FetchError::parse(format!("invalid selector '{}': {}", LINK_SELECTOR, e)))?;

    let document = Html::parse_document(html);
    let mut tasks = Vec::new();

    for card in document.select(&card_selector) {
        if tasks.len() >= max_articles {
            break;
        }

        let Some(link) = card.select(&link_selector).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };

        let url = match page_url.join(href) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(%href, error = %e, "skipping unresolvable article link");
                continue;
            }
        };

        let headline = link.text().collect::<Vec<_>>().join(" ");
        let headline = headline.split_whitespace().collect::<Vec<_>>().join(" ");

        tasks.push(FetchTask::article(headline, url.to_string()));
    }

    Ok(tasks)
}
