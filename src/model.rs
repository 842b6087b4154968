//! Vocabulary data model shared by the scraper, the sync engine and the deck writer.

use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Translation value meaning "nothing could be resolved for this word".
pub const NO_TRANSLATION: &str = "[No translation]";

/// Separator between the positional fields of a stored note.
pub const FIELD_SEPARATOR: char = '\x1f';

/// Positions of the stored note fields.
pub mod field {
    pub const WORD: usize = 0;
    pub const PRONUNCIATION: usize = 1;
    pub const ENGLISH: usize = 2;
    pub const AUDIO: usize = 3;
    pub const EXAMPLE: usize = 4;
    pub const EXAMPLE_AUDIO: usize = 5;
    pub const EXAMPLE_ENGLISH: usize = 6;

    /// Total number of fields in a note.
    pub const COUNT: usize = 7;
}

/// Matches titles of the form `[pronunciation] translation`.
static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\[(.*?)\](.*)$").expect("Invalid TITLE_REGEX"));

/// A raw word as it came off the vocabulary page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedWord {
    /// The foreign-language headword.
    pub word: String,
    /// Raw `title` attribute, normally `[pronunciation] translation`.
    pub title: String,
}

impl ScrapedWord {
    pub fn new(word: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            title: title.into(),
        }
    }
}

/// Splits a scraped title into `(pronunciation, translation)`.
///
/// A title without the bracketed prefix is treated as a bare translation.
pub fn parse_title(title: &str) -> (String, String) {
    match TITLE_REGEX.captures(title) {
        Some(caps) => (
            caps[1].trim().to_string(),
            caps[2].trim().to_string(),
        ),
        None => (String::new(), title.trim().to_string()),
    }
}

/// An example sentence and its English translation. Both halves are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleSentence {
    pub sentence: String,
    pub translation: String,
}

impl ExampleSentence {
    /// Builds a pair, or `None` if either half is blank.
    pub fn new(sentence: &str, translation: &str) -> Option<Self> {
        let sentence = sentence.trim();
        let translation = translation.trim();
        if sentence.is_empty() || translation.is_empty() {
            return None;
        }
        Some(Self {
            sentence: sentence.to_string(),
            translation: translation.to_string(),
        })
    }
}

/// Kind of generated media artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Pronunciation of the headword.
    WordAudio,
    /// Reading of the example sentence.
    SentenceAudio,
}

impl ArtifactKind {
    /// Prefix used in cache file names.
    pub fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::WordAudio => "word",
            ArtifactKind::SentenceAudio => "sentence",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::WordAudio => write!(f, "word audio"),
            ArtifactKind::SentenceAudio => write!(f, "sentence audio"),
        }
    }
}

/// One finalized vocabulary word with all of its resolved artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyEntry {
    pub target_word: String,
    pub pronunciation: String,
    pub english_translation: String,
    /// `None` means "not produced this run", never "failed forever".
    example: Option<ExampleSentence>,
    pub audio_ref: Option<PathBuf>,
    pub sentence_audio_ref: Option<PathBuf>,
}

impl VocabularyEntry {
    pub fn new(
        target_word: impl Into<String>,
        pronunciation: impl Into<String>,
        english_translation: impl Into<String>,
    ) -> Self {
        Self {
            target_word: target_word.into(),
            pronunciation: pronunciation.into(),
            english_translation: english_translation.into(),
            example: None,
            audio_ref: None,
            sentence_audio_ref: None,
        }
    }

    /// Whether the translation is a real value rather than the sentinel.
    pub fn has_translation(&self) -> bool {
        has_translation(&self.english_translation)
    }

    /// Attaches an example sentence pair.
    pub fn set_example(&mut self, example: ExampleSentence) {
        self.example = Some(example);
    }

    pub fn example(&self) -> Option<&ExampleSentence> {
        self.example.as_ref()
    }

    /// Example sentence, empty when there is none.
    pub fn example_sentence(&self) -> &str {
        self.example.as_ref().map_or("", |e| e.sentence.as_str())
    }

    /// Example sentence translation, empty when there is none.
    pub fn sentence_translation(&self) -> &str {
        self.example.as_ref().map_or("", |e| e.translation.as_str())
    }
}

/// Whether a translation value is usable (non-empty and not the sentinel).
pub fn has_translation(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != NO_TRANSLATION
}
