//! Lexideck - incremental vocabulary deck builder.
//!
//! This library provides functionality for:
//! - Scraping a learner's vocabulary list from duome.eu
//! - Filling in missing translations, example sentences and audio
//! - Reusing everything a previous package already contains
//! - Writing the result as an Anki package

pub mod artifacts;
pub mod config;
pub mod console;
pub mod deck;
pub mod error;
pub mod gate;
pub mod generators;
pub mod media_cache;
pub mod model;
pub mod scrapers;
pub mod sync;
pub mod utils;

// Re-export commonly used types
pub use artifacts::{ArtifactCache, load_artifact_cache};
pub use config::Config;
pub use console::Console;
pub use deck::{AnkiPackageWriter, PackageSummary};
pub use error::{
    ConfigError, GenerationError, PackageError, ScraperError, SpeechError, StoreError, SyncError,
};
pub use gate::RateLimitGate;
pub use generators::{SentenceGenerator, SpeechSynthesizer, Translator};
pub use media_cache::MediaCache;
pub use model::{ArtifactKind, ExampleSentence, ScrapedWord, VocabularyEntry};
pub use scrapers::{DuomeScraper, VocabularySource};
pub use sync::{Language, SyncEngine, SyncOutput, SyncStats};
