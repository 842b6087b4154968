//! Speech synthesis through the Google Translate text-to-speech endpoint.

use super::SpeechSynthesizer;
use crate::config::SpeechConfig;
use crate::error::SpeechError;
use crate::utils::split_text_into_word_chunks;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

/// Client identifier the public endpoint accepts without a token.
const CLIENT_ID: &str = "tw-ob";

/// Speech synthesizer returning MP3 bytes.
pub struct GoogleSpeech {
    client: Client,
    base_url: Url,
    max_chunk_chars: usize,
}

impl GoogleSpeech {
    pub fn new(config: &SpeechConfig, user_agent: &str) -> Result<Self, SpeechError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| SpeechError::InvalidEndpoint(format!("{}: {}", config.base_url, e)))?;
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url,
            max_chunk_chars: config.max_chunk_chars.max(1),
        })
    }

    fn chunk_url(&self, chunk: &str, language_code: &str, index: usize, total: usize) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("ie", "UTF-8")
            .append_pair("client", CLIENT_ID)
            .append_pair("tl", language_code)
            .append_pair("q", chunk)
            .append_pair("idx", &index.to_string())
            .append_pair("total", &total.to_string())
            .append_pair("textlen", &chunk.chars().count().to_string());
        url
    }
}

/// Maps a response status onto the speech error taxonomy.
fn status_error(status: StatusCode) -> Option<SpeechError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        Some(SpeechError::QuotaExceeded)
    } else if !status.is_success() {
        Some(SpeechError::Http(status.as_u16()))
    } else {
        None
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleSpeech {
    async fn synthesize(&self, text: &str, language_code: &str) -> Result<Vec<u8>, SpeechError> {
        let chunks = split_text_into_word_chunks(text, self.max_chunk_chars);
        let total = chunks.len();
        let mut audio = Vec::new();

        // MP3 frames concatenate cleanly, so chunks are simply appended in order.
        for (index, chunk) in chunks.iter().enumerate() {
            let url = self.chunk_url(chunk, language_code, index, total);
            let response = self.client.get(url).send().await?;
            if let Some(error) = status_error(response.status()) {
                return Err(error);
            }

            let bytes = response.bytes().await?;
            debug!(chunk = index + 1, total, bytes = bytes.len(), "received speech chunk");
            audio.extend_from_slice(&bytes);
        }

        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        Ok(audio)
    }
}
