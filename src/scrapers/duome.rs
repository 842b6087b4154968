//! duome.eu vocabulary list scraper.
//!
//! Each list item on the skills page holds one word: its first `span.wA`,
//! with a `title` attribute of the form `[pronunciation] translation`.
//! Items without that span or with an empty title are skipped.

use super::{VocabularySource, create_http_client, dedup_words};
use crate::config::ScrapingConfig;
use crate::error::ScraperError;
use crate::model::ScrapedWord;
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

/// CSS selectors used for parsing.
struct Selectors {
    item: Selector,
    /// Word span carrying the pronunciation/translation title.
    word: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            item: Selector::parse("li").unwrap(),
            word: Selector::parse("span.wA").unwrap(),
        }
    }
}

/// Scraper for the duome.eu vocabulary pages.
pub struct DuomeScraper {
    client: reqwest::Client,
    url: String,
    selectors: Selectors,
}

impl DuomeScraper {
    /// Creates a scraper for the given vocabulary page.
    pub fn new(url: impl Into<String>, config: &ScrapingConfig) -> Result<Self, ScraperError> {
        Ok(Self {
            client: create_http_client(config)?,
            url: url.into(),
            selectors: Selectors::new(),
        })
    }

    /// Fetches the page body.
    async fn fetch_page(&self) -> Result<String, ScraperError> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(ScraperError::Status {
                status: response.status().as_u16(),
                url: self.url.clone(),
            });
        }

        Ok(response.text().await?)
    }

    /// Extracts words from a vocabulary page, in document order.
    fn extract_words(&self, html: &str) -> Vec<ScrapedWord> {
        let doc = Html::parse_document(html);

        let words = doc
            .select(&self.selectors.item)
            .filter_map(|item| {
                let elem = item.select(&self.selectors.word).next()?;
                let title = elem.value().attr("title").filter(|t| !t.is_empty())?;
                let word = elem.text().collect::<String>().trim().to_string();
                if word.is_empty() {
                    return None;
                }
                Some(ScrapedWord::new(word, title))
            })
            .collect();

        dedup_words(words)
    }
}

#[async_trait]
impl VocabularySource for DuomeScraper {
    fn name(&self) -> &'static str {
        "duome.eu"
    }

    async fn fetch(&self) -> Result<Vec<ScrapedWord>, ScraperError> {
        let html = self.fetch_page().await?;
        let words = self.extract_words(&html);
        debug!(url = %self.url, count = words.len(), "parsed vocabulary page");
        Ok(words)
    }
}
