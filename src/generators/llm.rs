//! Translation and example sentences through OpenAI-compatible chat APIs.
//!
//! Responses are streamed and accumulated, checked for refusals, and retried
//! with exponential backoff.

use super::{SentenceGenerator, Translator};
use crate::config::{ApiConfig, GenerationConfig};
use crate::error::GenerationError;
use crate::model::ExampleSentence;
use crate::utils::check_response_status;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

/// Refusal phrases that indicate the model declined to answer.
static REFUSAL_PHRASES: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    vec![
        "i'm sorry",
        "i cannot",
        "i am unable",
        "as an ai",
        "my apologies",
        "i am not programmed",
        "i do not have the ability",
    ]
});

/// Label of the English half of a sentence response.
const ENGLISH_LABEL: &str = "English";

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", or "assistant".
    pub role: String,
    /// Content of the message.
    pub content: String,
}

impl Message {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// Request body for the chat completions API.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
}

/// Delta content in a streaming response.
#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// A single choice in a streaming chunk.
#[derive(Debug, Deserialize)]
struct Choice {
    delta: Option<Delta>,
}

/// Streaming chunk from the API.
#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<Choice>,
}

/// Minimal chat completions client shared by the generators.
pub struct ChatClient {
    client: Client,
    api_config: ApiConfig,
    generation_config: GenerationConfig,
}

impl ChatClient {
    /// Create a new client with the configured request timeout.
    pub fn new(
        api_config: ApiConfig,
        generation_config: GenerationConfig,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(generation_config.timeout())
            .build()?;

        Ok(Self {
            client,
            api_config,
            generation_config,
        })
    }

    /// Sends one system + user exchange, retrying failed attempts.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let retries = self.generation_config.retries.max(1);
        let mut attempt = 0;

        loop {
            match self.complete_once(system, user).await {
                Ok(text) => {
                    if let Some(delay) = self.generation_config.request_delay() {
                        tokio::time::sleep(delay).await;
                    }
                    return Ok(text);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= retries {
                        return Err(GenerationError::RetriesExhausted {
                            attempts: attempt,
                            last: e.to_string(),
                        });
                    }

                    // Exponential backoff
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    debug!(
                        error = %e,
                        "chat request failed, retrying in {:?} (attempt {}/{})",
                        delay,
                        attempt + 1,
                        retries
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn complete_once(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.api_config.model,
            messages: vec![Message::new("system", system), Message::new("user", user)],
            stream: true,
        };

        let url = format!(
            "{}/chat/completions",
            self.api_config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_config.key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;
        let response = check_response_status(response).await?;

        let mut events = SseBuffer::default();
        let mut stream = response.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            events.feed(&chunk_result?)?;
            if events.is_done() {
                break;
            }
        }

        validate_response(&events.finish()?)
    }
}

/// Accumulates a server-sent event stream into the streamed message text.
///
/// Network chunks may end anywhere, including inside a multi-byte character,
/// so bytes are buffered and only whole lines are decoded.
#[derive(Debug, Default)]
struct SseBuffer {
    pending: Vec<u8>,
    text: String,
    done: bool,
}

impl SseBuffer {
    fn feed(&mut self, bytes: &[u8]) -> Result<(), GenerationError> {
        if self.done {
            return Ok(());
        }
        self.pending.extend_from_slice(bytes);

        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            self.consume_line(&line)?;
            if self.done {
                self.pending.clear();
                break;
            }
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.done
    }

    /// Handles a trailing unterminated line and returns the accumulated text.
    fn finish(mut self) -> Result<String, GenerationError> {
        if !self.done && !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.consume_line(&rest)?;
        }
        Ok(self.text)
    }

    fn consume_line(&mut self, line: &[u8]) -> Result<(), GenerationError> {
        let line = std::str::from_utf8(line).map_err(|e| {
            GenerationError::MalformedResponse(format!("stream line is not UTF-8: {}", e))
        })?;
        let Some(data) = line.trim().strip_prefix("data:") else {
            return Ok(());
        };
        let data = data.trim();
        if data == "[DONE]" {
            self.done = true;
        } else {
            append_delta(data, &mut self.text);
        }
        Ok(())
    }
}

fn append_delta(data: &str, out: &mut String) {
    if let Ok(chunk) = serde_json::from_str::<StreamChunk>(data) {
        for choice in chunk.choices {
            if let Some(content) = choice.delta.and_then(|d| d.content) {
                out.push_str(&content);
            }
        }
    }
}

/// Rejects empty responses and responses opening with a refusal.
fn validate_response(response: &str) -> Result<String, GenerationError> {
    let trimmed = response.trim().to_string();

    if trimmed.is_empty() {
        return Err(GenerationError::Refused("Empty response".to_string()));
    }

    let lower = trimmed.to_lowercase();
    for phrase in REFUSAL_PHRASES.iter() {
        if lower.starts_with(phrase) {
            return Err(GenerationError::Refused(format!(
                "Response starts with refusal phrase: {}",
                phrase
            )));
        }
    }

    Ok(trimmed)
}

/// Reduces a translation reply to its first line, without wrapping quotes.
fn clean_translation(reply: &str) -> Option<String> {
    let first = reply.lines().map(str::trim).find(|l| !l.is_empty())?;
    let unquoted = first
        .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”' | '«' | '»'))
        .trim();
    (!unquoted.is_empty()).then(|| unquoted.to_string())
}

/// Parses a two-line `"<language>: ..."` / `"English: ..."` reply.
///
/// Labels match case-insensitively. Both lines must be present with non-empty
/// values; anything else is a [`GenerationError::MalformedResponse`].
pub fn parse_sentence_response(
    response: &str,
    language: &str,
) -> Result<ExampleSentence, GenerationError> {
    let mut sentence: Option<&str> = None;
    let mut translation: Option<&str> = None;

    for line in response.lines() {
        let Some((label, value)) = line.trim().split_once(':') else {
            continue;
        };
        let label = label.trim();
        if label.eq_ignore_ascii_case(ENGLISH_LABEL) && translation.is_none() {
            translation = Some(value);
        } else if label.to_lowercase() == language.to_lowercase() && sentence.is_none() {
            sentence = Some(value);
        }
    }

    match (sentence, translation) {
        (Some(sentence), Some(translation)) => ExampleSentence::new(sentence, translation)
            .ok_or_else(|| {
                GenerationError::MalformedResponse("empty sentence or translation".to_string())
            }),
        (None, _) => Err(GenerationError::MalformedResponse(format!(
            "missing '{}:' line",
            language
        ))),
        (_, None) => Err(GenerationError::MalformedResponse(format!(
            "missing '{}:' line",
            ENGLISH_LABEL
        ))),
    }
}

/// Word translator backed by a chat model.
pub struct LlmTranslator {
    client: ChatClient,
    prompt: String,
}

impl LlmTranslator {
    /// `prompt` is the system prompt, with the language already substituted.
    pub fn new(client: ChatClient, prompt: String) -> Self {
        Self { client, prompt }
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate(&self, word: &str, language: &str) -> Result<String, GenerationError> {
        let reply = self
            .client
            .complete(&self.prompt, &format!("{} word: {}", language, word))
            .await?;
        clean_translation(&reply).ok_or_else(|| {
            GenerationError::MalformedResponse("translation reply was blank".to_string())
        })
    }
}

/// Example sentence generator backed by a chat model.
pub struct LlmSentenceGenerator {
    client: ChatClient,
    prompt: String,
}

impl LlmSentenceGenerator {
    pub fn new(client: ChatClient, prompt: String) -> Self {
        Self { client, prompt }
    }
}

#[async_trait]
impl SentenceGenerator for LlmSentenceGenerator {
    async fn generate_sentence(
        &self,
        word: &str,
        language: &str,
        english: &str,
    ) -> Result<ExampleSentence, GenerationError> {
        let user = format!("{} word: {}\nEnglish meaning: {}", language, word, english);
        let reply = self.client.complete(&self.prompt, &user).await?;
        parse_sentence_response(&reply, language)
    }
}
