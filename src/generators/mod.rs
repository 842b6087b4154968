//! Capability traits for the remote generators and their implementations.
//!
//! Each capability is optional: the sync engine is written against these traits
//! and treats an absent capability as a valid configuration.

mod llm;
mod speech;

pub use llm::{ChatClient, LlmSentenceGenerator, LlmTranslator, parse_sentence_response};
pub use speech::GoogleSpeech;

use crate::error::{GenerationError, SpeechError};
use crate::model::ExampleSentence;
use async_trait::async_trait;

/// Translates a single word into English.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, word: &str, language: &str) -> Result<String, GenerationError>;
}

/// Produces an example sentence pair for a word.
#[async_trait]
pub trait SentenceGenerator: Send + Sync {
    async fn generate_sentence(
        &self,
        word: &str,
        language: &str,
        english: &str,
    ) -> Result<ExampleSentence, GenerationError>;
}

/// Turns text into audio bytes.
///
/// A quota rejection is reported as [`SpeechError::QuotaExceeded`].
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language_code: &str) -> Result<Vec<u8>, SpeechError>;
}
