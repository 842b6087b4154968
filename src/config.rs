//! Configuration management for Lexideck.
//!
//! Handles loading, saving, and validating configuration from
//! platform-specific config directories.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application name used for config directory.
const APP_NAME: &str = "Lexideck";

/// Default config filename.
const CONFIG_FILENAME: &str = "config.toml";

/// Placeholder value for unconfigured API keys.
const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

/// Placeholder substituted with the target language name in prompts.
pub const LANGUAGE_PLACEHOLDER: &str = "{language}";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target language and vocabulary source.
    pub language: LanguageConfig,

    /// Chat API used for translations and example sentences.
    pub api: ApiConfig,

    /// Translation and sentence generation behavior.
    pub generation: GenerationConfig,

    /// Speech synthesis settings.
    pub speech: SpeechConfig,

    /// Web scraping settings.
    pub scraping: ScrapingConfig,

    /// LLM prompts.
    pub prompts: PromptsConfig,

    /// File paths.
    pub paths: PathsConfig,
}

/// Target language configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// English name of the language, used in prompts and labels.
    pub name: String,

    /// Language code passed to the speech service.
    pub code: String,

    /// Vocabulary page to scrape.
    pub source_url: String,

    /// Name of the generated deck.
    pub deck_name: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            name: "Russian".to_string(),
            code: "ru".to_string(),
            source_url: "https://duome.eu/vocabulary/en/ru/skills".to_string(),
            deck_name: "Duolingo Russian Vocabulary".to_string(),
        }
    }
}

/// API configuration for LLM endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API key. The placeholder disables generation.
    pub key: String,

    /// Base URL for the API.
    pub base_url: String,

    /// Model identifier.
    pub model: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: API_KEY_PLACEHOLDER.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

impl ApiConfig {
    /// Checks if the API key is configured (not placeholder).
    pub fn is_configured(&self) -> bool {
        !self.key.is_empty() && self.key != API_KEY_PLACEHOLDER
    }
}

/// Translation and sentence generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Number of attempts per generation request.
    pub retries: u32,

    /// Delay after each successful API request in seconds.
    pub delay_between_requests_sec: f64,

    /// Per-request timeout in seconds.
    pub request_timeout_sec: u64,

    /// Generate example sentences for translated words.
    pub sentences: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            delay_between_requests_sec: 0.5,
            request_timeout_sec: 30,
            sentences: true,
        }
    }
}

impl GenerationConfig {
    /// Request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }

    /// Pause after each successful request, if any.
    pub fn request_delay(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.delay_between_requests_sec)
            .ok()
            .filter(|d| !d.is_zero())
    }
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Generate word audio.
    pub enabled: bool,

    /// Generate example sentence audio.
    pub sentence_audio: bool,

    /// Text-to-speech endpoint.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_sec: u64,

    /// Longest text sent in one request; longer text is split on whitespace.
    pub max_chunk_chars: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sentence_audio: true,
            base_url: "https://translate.google.com/translate_tts".to_string(),
            request_timeout_sec: 30,
            max_chunk_chars: 100,
        }
    }
}

impl SpeechConfig {
    /// Request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }
}

/// Web scraping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// User agent sent with page requests.
    pub user_agent: String,

    /// Per-request timeout in seconds.
    pub request_timeout_sec: u64,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            request_timeout_sec: 30,
        }
    }
}

/// LLM system prompts. `{language}` is replaced with the language name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Prompt for single word translation.
    pub translation: String,

    /// Prompt for example sentence generation.
    pub sentence: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            translation: "You are a {language} to English dictionary. Translate the {language} word you are given into English. Reply with the English translation only: a word or short phrase, no explanations, no quotes.".to_string(),
            sentence: r#"You write short example sentences for {language} learners.
Given a {language} word and its English meaning, write one simple, natural {language} sentence that uses the word, and its English translation.
Reply with exactly two lines and nothing else:
{language}: <the sentence>
English: <the translation>"#.to_string(),
        }
    }
}

impl PromptsConfig {
    /// Returns the translation prompt for the given language.
    pub fn translation_for(&self, language: &str) -> String {
        self.translation.replace(LANGUAGE_PLACEHOLDER, language)
    }

    /// Returns the sentence prompt for the given language.
    pub fn sentence_for(&self, language: &str) -> String {
        self.sentence.replace(LANGUAGE_PLACEHOLDER, language)
    }
}

/// File path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Package written at the end of the run, and read back on the next one.
    pub output_file: PathBuf,

    /// Directory holding generated audio across runs.
    pub media_directory: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            output_file: PathBuf::from("duolingo_russian_vocabulary.apkg"),
            media_directory: PathBuf::from("audio"),
        }
    }
}

impl Config {
    /// Returns the platform-specific config directory path.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Returns the full path to the config file.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the configuration.
    ///
    /// An unconfigured API key is not an error: generation is simply skipped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.language.name.trim().is_empty() {
            return Err(invalid("language.name", "must not be empty"));
        }

        if self.language.code.trim().is_empty() {
            return Err(invalid("language.code", "must not be empty"));
        }

        if self.language.source_url.trim().is_empty() {
            return Err(invalid("language.source_url", "must not be empty"));
        }

        if self.generation.retries == 0 {
            return Err(invalid("generation.retries", "must be greater than 0"));
        }

        let delay = self.generation.delay_between_requests_sec;
        if !delay.is_finite() || delay < 0.0 {
            return Err(invalid(
                "generation.delay_between_requests_sec",
                "must be a finite number of seconds, zero or more",
            ));
        }

        if self.generation.request_timeout_sec == 0 {
            return Err(invalid(
                "generation.request_timeout_sec",
                "must be greater than 0",
            ));
        }

        if self.speech.request_timeout_sec == 0 {
            return Err(invalid("speech.request_timeout_sec", "must be greater than 0"));
        }

        if self.speech.max_chunk_chars == 0 {
            return Err(invalid("speech.max_chunk_chars", "must be greater than 0"));
        }

        if self.scraping.request_timeout_sec == 0 {
            return Err(invalid(
                "scraping.request_timeout_sec",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
