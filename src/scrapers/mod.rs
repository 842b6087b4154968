//! Vocabulary source trait and the shared HTTP plumbing for scrapers.

mod duome;

pub use duome::DuomeScraper;

use crate::config::ScrapingConfig;
use crate::error::ScraperError;
use crate::model::ScrapedWord;
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

/// A source of scraped vocabulary.
#[async_trait]
pub trait VocabularySource: Send + Sync {
    /// Returns the human-readable name of this source.
    fn name(&self) -> &'static str;

    /// Fetches every word the source lists, in page order, without duplicates.
    async fn fetch(&self) -> Result<Vec<ScrapedWord>, ScraperError>;
}

/// Common HTTP client configuration for scrapers.
pub fn create_http_client(config: &ScrapingConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .cookie_store(true)
        .timeout(Duration::from_secs(config.request_timeout_sec))
        .build()
}

/// Drops repeated words, keeping the first occurrence of each.
pub fn dedup_words(words: Vec<ScrapedWord>) -> Vec<ScrapedWord> {
    let mut seen = HashSet::new();
    words
        .into_iter()
        .filter(|w| seen.insert(w.word.clone()))
        .collect()
}
