//! Incremental artifact synchronization.
//!
//! For every scraped word, in page order, the engine resolves a translation,
//! an example sentence and two audio clips. Each artifact comes from the
//! cheapest source that has it: the scrape itself, the previous package, the
//! media directory, and only then the remote generators. Speech requests go
//! through a [`RateLimitGate`], so a single quota rejection stops all further
//! requests of that kind for the rest of the run.
//!
//! Entries are resolved strictly one after another. Latch trips therefore
//! happen at a reproducible point for a given input and failure sequence.

use crate::artifacts::ArtifactCache;
use crate::error::SyncError;
use crate::gate::RateLimitGate;
use crate::generators::{SentenceGenerator, SpeechSynthesizer, Translator};
use crate::media_cache::MediaCache;
use crate::model::{
    ArtifactKind, NO_TRANSLATION, ScrapedWord, VocabularyEntry, has_translation, parse_title,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Where an entry's translation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationSource {
    Scraped,
    Cached,
    Generated,
    Missing,
}

/// Where an entry's example sentence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceSource {
    Cached,
    Generated,
    Missing,
}

/// Outcome of resolving one audio artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOutcome {
    Cached,
    Generated,
    /// Not requested: the kind is disabled, unavailable or latched.
    Skipped,
    Failed,
}

/// Counters for one kind of audio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioStats {
    pub cached: usize,
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl AudioStats {
    fn record(&mut self, outcome: AudioOutcome) {
        match outcome {
            AudioOutcome::Cached => self.cached += 1,
            AudioOutcome::Generated => self.generated += 1,
            AudioOutcome::Skipped => self.skipped += 1,
            AudioOutcome::Failed => self.failed += 1,
        }
    }

    /// Entries that ended up with this kind of audio.
    pub fn present(&self) -> usize {
        self.cached + self.generated
    }
}

/// Per-run tallies, for the final summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub entries: usize,
    pub translations_scraped: usize,
    pub translations_cached: usize,
    pub translations_generated: usize,
    pub translations_missing: usize,
    pub sentences_cached: usize,
    pub sentences_generated: usize,
    pub sentences_missing: usize,
    pub word_audio: AudioStats,
    pub sentence_audio: AudioStats,
}

impl SyncStats {
    fn record_translation(&mut self, source: TranslationSource) {
        match source {
            TranslationSource::Scraped => self.translations_scraped += 1,
            TranslationSource::Cached => self.translations_cached += 1,
            TranslationSource::Generated => self.translations_generated += 1,
            TranslationSource::Missing => self.translations_missing += 1,
        }
    }

    fn record_sentence(&mut self, source: SentenceSource) {
        match source {
            SentenceSource::Cached => self.sentences_cached += 1,
            SentenceSource::Generated => self.sentences_generated += 1,
            SentenceSource::Missing => self.sentences_missing += 1,
        }
    }

    fn audio_mut(&mut self, kind: ArtifactKind) -> &mut AudioStats {
        match kind {
            ArtifactKind::WordAudio => &mut self.word_audio,
            ArtifactKind::SentenceAudio => &mut self.sentence_audio,
        }
    }
}

/// Result of a completed run, ready for the deck writer.
#[derive(Debug)]
pub struct SyncOutput {
    /// Finalized entries in scrape order.
    pub entries: Vec<VocabularyEntry>,
    /// Media files the package must bundle.
    pub media: Vec<PathBuf>,
    pub stats: SyncStats,
    /// Latch state at the end of the run.
    pub gate: RateLimitGate,
}

/// Target language as seen by the generators.
#[derive(Debug, Clone)]
pub struct Language {
    /// English name, e.g. "Russian".
    pub name: String,
    /// Speech language code, e.g. "ru".
    pub code: String,
}

impl Language {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

/// The synchronization engine. Owns the gate and the media manifest for one run.
pub struct SyncEngine {
    language: Language,
    cache: ArtifactCache,
    media: MediaCache,
    gate: RateLimitGate,
    translator: Option<Box<dyn Translator>>,
    sentence_generator: Option<Box<dyn SentenceGenerator>>,
    speech: Option<Box<dyn SpeechSynthesizer>>,
    word_audio: bool,
    sentence_audio: bool,
    manifest: Vec<PathBuf>,
    stats: SyncStats,
}

impl SyncEngine {
    /// Creates an engine with no generator capabilities.
    pub fn new(language: Language, cache: ArtifactCache, media: MediaCache) -> Self {
        Self {
            language,
            cache,
            media,
            gate: RateLimitGate::new(),
            translator: None,
            sentence_generator: None,
            speech: None,
            word_audio: true,
            sentence_audio: true,
            manifest: Vec::new(),
            stats: SyncStats::default(),
        }
    }

    pub fn with_translator(mut self, translator: Box<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_sentence_generator(mut self, generator: Box<dyn SentenceGenerator>) -> Self {
        self.sentence_generator = Some(generator);
        self
    }

    pub fn with_speech(mut self, speech: Box<dyn SpeechSynthesizer>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Enables or disables each kind of audio. Both are enabled by default.
    pub fn with_audio(mut self, word_audio: bool, sentence_audio: bool) -> Self {
        self.word_audio = word_audio;
        self.sentence_audio = sentence_audio;
        self
    }

    /// Resolves every word, in order, and returns the finalized entries.
    ///
    /// An empty input is refused: there is nothing worth packaging.
    pub async fn run(mut self, words: Vec<ScrapedWord>) -> Result<SyncOutput, SyncError> {
        if words.is_empty() {
            return Err(SyncError::NoEntries);
        }

        let total = words.len();
        let mut entries = Vec::with_capacity(total);
        for (index, word) in words.iter().enumerate() {
            info!("[{}/{}] {}", index + 1, total, word.word);
            entries.push(self.resolve_entry(word).await);
        }
        self.stats.entries = entries.len();

        Ok(SyncOutput {
            entries,
            media: self.manifest,
            stats: self.stats,
            gate: self.gate,
        })
    }

    async fn resolve_entry(&mut self, scraped: &ScrapedWord) -> VocabularyEntry {
        let word = scraped.word.as_str();
        let (pronunciation, scraped_translation) = parse_title(&scraped.title);

        let (english, source) = self.resolve_translation(word, scraped_translation).await;
        self.stats.record_translation(source);
        let mut entry = VocabularyEntry::new(word, pronunciation, english);

        if entry.has_translation() {
            let source = self.resolve_sentence(&mut entry).await;
            self.stats.record_sentence(source);
        } else {
            self.stats.record_sentence(SentenceSource::Missing);
        }

        let (audio_ref, outcome) = self.resolve_audio(ArtifactKind::WordAudio, word, word).await;
        entry.audio_ref = audio_ref;
        self.stats.audio_mut(ArtifactKind::WordAudio).record(outcome);

        let sentence = entry.example().map(|e| e.sentence.clone());
        let (sentence_audio_ref, outcome) = match sentence {
            Some(text) => {
                self.resolve_audio(ArtifactKind::SentenceAudio, word, &text)
                    .await
            }
            None => (None, AudioOutcome::Skipped),
        };
        entry.sentence_audio_ref = sentence_audio_ref;
        self.stats
            .audio_mut(ArtifactKind::SentenceAudio)
            .record(outcome);

        entry
    }

    /// Scrape, then previous package, then the translator, then the sentinel.
    async fn resolve_translation(
        &self,
        word: &str,
        scraped: String,
    ) -> (String, TranslationSource) {
        if !scraped.is_empty() && scraped != word {
            return (scraped, TranslationSource::Scraped);
        }

        if let Some(cached) = self.cache.translation(word) {
            debug!(word, "reusing cached translation");
            return (cached.to_string(), TranslationSource::Cached);
        }

        if let Some(translator) = &self.translator {
            match translator.translate(word, &self.language.name).await {
                Ok(english) if has_translation(&english) => {
                    return (english.trim().to_string(), TranslationSource::Generated);
                }
                Ok(_) => warn!(word, "translator returned nothing usable"),
                Err(e) => warn!(word, error = %e, "translation failed"),
            }
        }

        (NO_TRANSLATION.to_string(), TranslationSource::Missing)
    }

    /// Previous package, then the generator. Only whole pairs are ever kept.
    async fn resolve_sentence(&self, entry: &mut VocabularyEntry) -> SentenceSource {
        let word = entry.target_word.as_str();

        if let Some(cached) = self.cache.sentence(word) {
            debug!(word, "reusing cached sentence");
            let cached = cached.clone();
            entry.set_example(cached);
            return SentenceSource::Cached;
        }

        let Some(generator) = &self.sentence_generator else {
            return SentenceSource::Missing;
        };

        match generator
            .generate_sentence(word, &self.language.name, &entry.english_translation)
            .await
        {
            Ok(example) => {
                entry.set_example(example);
                SentenceSource::Generated
            }
            Err(e) => {
                warn!(word, error = %e, "sentence generation failed");
                SentenceSource::Missing
            }
        }
    }

    /// Gate, then media cache, then the synthesizer.
    async fn resolve_audio(
        &mut self,
        kind: ArtifactKind,
        word: &str,
        text: &str,
    ) -> (Option<PathBuf>, AudioOutcome) {
        let enabled = match kind {
            ArtifactKind::WordAudio => self.word_audio,
            ArtifactKind::SentenceAudio => self.sentence_audio,
        };
        let Some(speech) = self.speech.as_deref().filter(|_| enabled) else {
            return (None, AudioOutcome::Skipped);
        };

        if !self.gate.attempt(kind) {
            return (None, AudioOutcome::Skipped);
        }

        let path = self.media.resolve(kind, word);
        if MediaCache::is_cached(&path).await {
            debug!(word, %kind, path = %path.display(), "using cached audio");
            self.manifest.push(path.clone());
            return (Some(path), AudioOutcome::Cached);
        }

        let bytes = match speech.synthesize(text, &self.language.code).await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => {
                warn!(word, %kind, "speech service returned no audio");
                return (None, AudioOutcome::Failed);
            }
            Err(e) => {
                if !self.gate.report(kind, &e) && !e.is_quota_exceeded() {
                    warn!(word, %kind, error = %e, "speech synthesis failed");
                }
                return (None, AudioOutcome::Failed);
            }
        };

        match self.media.put(kind, word, &bytes).await {
            Ok(path) => {
                self.manifest.push(path.clone());
                (Some(path), AudioOutcome::Generated)
            }
            Err(e) => {
                warn!(word, %kind, error = %e, "failed to store audio");
                (None, AudioOutcome::Failed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GenerationError, SpeechError};
    use crate::model::ExampleSentence;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Records every call made to any fake generator.
    #[derive(Default, Clone)]
    struct CallLog(Arc<Mutex<Vec<String>>>);

    impl CallLog {
        fn push(&self, call: String) {
            self.0.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(prefix)).count()
        }
    }

    struct FakeTranslator {
        log: CallLog,
        answers: HashMap<String, String>,
    }

    #[async_trait]
    impl Translator for FakeTranslator {
        async fn translate(&self, word: &str, _language: &str) -> Result<String, GenerationError> {
            self.log.push(format!("translate:{}", word));
            self.answers
                .get(word)
                .cloned()
                .ok_or_else(|| GenerationError::ApiError("HTTP 500".to_string()))
        }
    }

    struct FakeSentences {
        log: CallLog,
        reply: String,
    }

    #[async_trait]
    impl SentenceGenerator for FakeSentences {
        async fn generate_sentence(
            &self,
            word: &str,
            language: &str,
            english: &str,
        ) -> Result<ExampleSentence, GenerationError> {
            self.log.push(format!("sentence:{}:{}", word, english));
            crate::generators::parse_sentence_response(&self.reply, language)
        }
    }

    /// Speech fake that fails with the scripted error on the given call numbers.
    struct FakeSpeech {
        log: CallLog,
        failures: HashMap<usize, fn() -> SpeechError>,
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeSpeech {
        async fn synthesize(&self, text: &str, _code: &str) -> Result<Vec<u8>, SpeechError> {
            let call = self.log.count("speak:") + 1;
            self.log.push(format!("speak:{}", text));
            match self.failures.get(&call) {
                Some(make_error) => Err(make_error()),
                None => Ok(format!("mp3:{}", text).into_bytes()),
            }
        }
    }

    /// Sentence generator whose service is always down.
    struct UnavailableSentences {
        log: CallLog,
    }

    #[async_trait]
    impl SentenceGenerator for UnavailableSentences {
        async fn generate_sentence(
            &self,
            word: &str,
            _language: &str,
            _english: &str,
        ) -> Result<ExampleSentence, GenerationError> {
            self.log.push(format!("sentence:{}", word));
            Err(GenerationError::ApiError("HTTP 503: unavailable".to_string()))
        }
    }

    /// Speech service that answers successfully with no audio.
    struct SilentSpeech {
        log: CallLog,
    }

    #[async_trait]
    impl SpeechSynthesizer for SilentSpeech {
        async fn synthesize(&self, text: &str, _code: &str) -> Result<Vec<u8>, SpeechError> {
            self.log.push(format!("speak:{}", text));
            Ok(Vec::new())
        }
    }

    fn speech(log: &CallLog, failures: &[(usize, fn() -> SpeechError)]) -> Box<FakeSpeech> {
        Box::new(FakeSpeech {
            log: log.clone(),
            failures: failures.iter().copied().collect(),
        })
    }

    fn russian() -> Language {
        Language::new("Russian", "ru")
    }

    fn words(pairs: &[(&str, &str)]) -> Vec<ScrapedWord> {
        pairs.iter().map(|(w, t)| ScrapedWord::new(*w, *t)).collect()
    }

    fn cache_with(records: &[&str]) -> ArtifactCache {
        ArtifactCache::from_records(records.iter().map(|r| r.replace('|', "\x1f")))
    }

    fn engine(dir: &TempDir, cache: ArtifactCache) -> SyncEngine {
        SyncEngine::new(russian(), cache, MediaCache::new(dir.path()))
    }

    #[tokio::test]
    async fn test_empty_input_is_refused() {
        let dir = TempDir::new().unwrap();
        let result = engine(&dir, ArtifactCache::new()).run(Vec::new()).await;
        assert!(matches!(result, Err(SyncError::NoEntries)));
    }

    #[tokio::test]
    async fn test_scraped_translation_wins() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let translator = FakeTranslator {
            log: log.clone(),
            answers: HashMap::from([("кот".to_string(), "generated".to_string())]),
        };

        let output = engine(&dir, cache_with(&["кот|kot|cached"]))
            .with_translator(Box::new(translator))
            .run(words(&[("кот", "[kot] cat")]))
            .await
            .unwrap();

        assert_eq!(output.entries[0].english_translation, "cat");
        assert_eq!(output.entries[0].pronunciation, "kot");
        assert_eq!(output.stats.translations_scraped, 1);
        assert_eq!(log.count("translate:"), 0);
    }

    #[tokio::test]
    async fn test_scraped_translation_equal_to_word_is_ignored() {
        let dir = TempDir::new().unwrap();
        let output = engine(&dir, cache_with(&["такси|taksi|taxi"]))
            .run(words(&[("такси", "[taksi] такси")]))
            .await
            .unwrap();
        assert_eq!(output.entries[0].english_translation, "taxi");
    }

    #[tokio::test]
    async fn test_cached_translation_avoids_generators() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let translator = FakeTranslator {
            log: log.clone(),
            answers: HashMap::new(),
        };
        let sentences = FakeSentences {
            log: log.clone(),
            reply: "Russian: Новое.\nEnglish: New.".to_string(),
        };

        let output = engine(
            &dir,
            cache_with(&["привет|privyet|hello||Привет, друг!||Hello, friend!"]),
        )
        .with_translator(Box::new(translator))
        .with_sentence_generator(Box::new(sentences))
        .run(words(&[("привет", "[привет'] ")]))
        .await
        .unwrap();

        let entry = &output.entries[0];
        assert_eq!(entry.english_translation, "hello");
        assert_eq!(entry.example_sentence(), "Привет, друг!");
        assert_eq!(entry.sentence_translation(), "Hello, friend!");
        assert!(log.calls().is_empty());
        assert_eq!(output.stats.translations_cached, 1);
        assert_eq!(output.stats.sentences_cached, 1);
    }

    #[tokio::test]
    async fn test_generated_translation_and_sentence() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let translator = FakeTranslator {
            log: log.clone(),
            answers: HashMap::from([("кот".to_string(), " cat ".to_string())]),
        };
        let sentences = FakeSentences {
            log: log.clone(),
            reply: "Russian: Кот спит.\nEnglish: The cat sleeps.".to_string(),
        };

        let output = engine(&dir, ArtifactCache::new())
            .with_translator(Box::new(translator))
            .with_sentence_generator(Box::new(sentences))
            .run(words(&[("кот", "[kot]")]))
            .await
            .unwrap();

        let entry = &output.entries[0];
        assert_eq!(entry.english_translation, "cat");
        assert_eq!(entry.example_sentence(), "Кот спит.");
        assert_eq!(log.calls(), vec!["translate:кот", "sentence:кот:cat"]);
    }

    #[tokio::test]
    async fn test_failed_translation_falls_back_to_sentinel_without_sentence() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let translator = FakeTranslator {
            log: log.clone(),
            answers: HashMap::new(),
        };
        let sentences = FakeSentences {
            log: log.clone(),
            reply: "Russian: Кот.\nEnglish: Cat.".to_string(),
        };

        let output = engine(&dir, ArtifactCache::new())
            .with_translator(Box::new(translator))
            .with_sentence_generator(Box::new(sentences))
            .run(words(&[("кот", "")]))
            .await
            .unwrap();

        let entry = &output.entries[0];
        assert_eq!(entry.english_translation, NO_TRANSLATION);
        assert!(entry.example().is_none());
        assert_eq!(log.count("sentence:"), 0);
        assert_eq!(output.stats.translations_missing, 1);
    }

    #[tokio::test]
    async fn test_no_capabilities_means_sentinel() {
        let dir = TempDir::new().unwrap();
        let output = engine(&dir, ArtifactCache::new())
            .run(words(&[("кот", "[kot] ")]))
            .await
            .unwrap();

        let entry = &output.entries[0];
        assert_eq!(entry.english_translation, NO_TRANSLATION);
        assert!(entry.audio_ref.is_none());
        assert!(output.media.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_sentence_leaves_both_fields_empty() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();
        let sentences = FakeSentences {
            log: log.clone(),
            reply: "Russian: Кот спит.\nEnglish:".to_string(),
        };

        let output = engine(&dir, ArtifactCache::new())
            .with_sentence_generator(Box::new(sentences))
            .run(words(&[("кот", "[kot] cat")]))
            .await
            .unwrap();

        let entry = &output.entries[0];
        assert_eq!(entry.example_sentence(), "");
        assert_eq!(entry.sentence_translation(), "");
        assert_eq!(log.count("sentence:"), 1);
        assert_eq!(output.stats.sentences_missing, 1);
    }

    #[tokio::test]
    async fn test_failed_sentence_generation_leaves_both_fields_empty() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();

        let output = engine(&dir, ArtifactCache::new())
            .with_sentence_generator(Box::new(UnavailableSentences { log: log.clone() }))
            .run(words(&[("кот", "[kot] cat"), ("пёс", "[pyos] dog")]))
            .await
            .unwrap();

        for entry in &output.entries {
            assert!(entry.example().is_none());
            assert_eq!(entry.example_sentence(), "");
            assert_eq!(entry.sentence_translation(), "");
            assert!(entry.sentence_audio_ref.is_none());
        }
        assert_eq!(log.calls(), vec!["sentence:кот", "sentence:пёс"]);
        assert_eq!(output.stats.sentences_missing, 2);
        assert_eq!(output.stats.translations_scraped, 2);
    }

    #[tokio::test]
    async fn test_empty_audio_is_a_failure_that_does_not_latch() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();

        let output = engine(&dir, ArtifactCache::new())
            .with_speech(Box::new(SilentSpeech { log: log.clone() }))
            .run(words(&[("один", "[adin] one"), ("два", "[dva] two")]))
            .await
            .unwrap();

        assert!(output.entries.iter().all(|e| e.audio_ref.is_none()));
        assert!(output.media.is_empty());
        assert!(!output.gate.is_tripped(ArtifactKind::WordAudio));
        assert!(output.gate.attempt(ArtifactKind::WordAudio));
        assert_eq!(log.count("speak:"), 2);
        assert_eq!(output.stats.word_audio.failed, 2);
        assert!(!MediaCache::new(dir.path()).contains(ArtifactKind::WordAudio, "один").await);
    }

    #[tokio::test]
    async fn test_quota_stops_word_audio_for_rest_of_run() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();

        let output = engine(&dir, ArtifactCache::new())
            .with_speech(speech(&log, &[(3, || SpeechError::QuotaExceeded)]))
            .run(words(&[
                ("один", "[adin] one"),
                ("два", "[dva] two"),
                ("три", "[tri] three"),
                ("четыре", "[chetyre] four"),
                ("пять", "[pyat'] five"),
            ]))
            .await
            .unwrap();

        let refs: Vec<bool> = output.entries.iter().map(|e| e.audio_ref.is_some()).collect();
        assert_eq!(refs, vec![true, true, false, false, false]);
        assert_eq!(log.calls(), vec!["speak:один", "speak:два", "speak:три"]);
        assert!(output.gate.is_tripped(ArtifactKind::WordAudio));
        assert!(!output.gate.is_tripped(ArtifactKind::SentenceAudio));
        assert_eq!(output.media.len(), 2);
        assert_eq!(output.stats.word_audio.generated, 2);
        assert_eq!(output.stats.word_audio.failed, 1);
        assert_eq!(output.stats.word_audio.skipped, 2);
    }

    #[tokio::test]
    async fn test_latched_kind_skips_even_cached_files() {
        let dir = TempDir::new().unwrap();
        let media = MediaCache::new(dir.path());
        media.put(ArtifactKind::WordAudio, "два", b"old").await.unwrap();
        let log = CallLog::default();

        let output = SyncEngine::new(russian(), ArtifactCache::new(), media)
            .with_speech(speech(&log, &[(1, || SpeechError::QuotaExceeded)]))
            .run(words(&[("один", "[adin] one"), ("два", "[dva] two")]))
            .await
            .unwrap();

        assert!(output.entries.iter().all(|e| e.audio_ref.is_none()));
        assert_eq!(log.count("speak:"), 1);
    }

    #[tokio::test]
    async fn test_other_speech_errors_do_not_latch() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();

        let output = engine(&dir, ArtifactCache::new())
            .with_speech(speech(&log, &[(1, || SpeechError::Http(500))]))
            .run(words(&[("один", "[adin] one"), ("два", "[dva] two")]))
            .await
            .unwrap();

        assert!(output.entries[0].audio_ref.is_none());
        assert!(output.entries[1].audio_ref.is_some());
        assert!(!output.gate.is_tripped(ArtifactKind::WordAudio));
        assert_eq!(log.count("speak:"), 2);
    }

    #[tokio::test]
    async fn test_cached_audio_is_reused_untouched() {
        let dir = TempDir::new().unwrap();
        let media = MediaCache::new(dir.path());
        let existing = media.put(ArtifactKind::WordAudio, "кот", b"original").await.unwrap();
        let log = CallLog::default();

        let output = SyncEngine::new(russian(), ArtifactCache::new(), media)
            .with_speech(speech(&log, &[]))
            .run(words(&[("кот", "[kot] cat")]))
            .await
            .unwrap();

        assert_eq!(output.entries[0].audio_ref, Some(existing.clone()));
        assert_eq!(output.media, vec![existing.clone()]);
        assert_eq!(log.count("speak:"), 0);
        assert_eq!(std::fs::read(&existing).unwrap(), b"original");
        assert_eq!(output.stats.word_audio.cached, 1);
    }

    #[tokio::test]
    async fn test_sentence_audio_follows_sentence() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();

        let output = engine(
            &dir,
            cache_with(&["кот|kot|cat||Кот спит.||The cat sleeps."]),
        )
        .with_speech(speech(&log, &[]))
        .run(words(&[("кот", "[kot]"), ("пёс", "[pyos] dog")]))
        .await
        .unwrap();

        assert!(output.entries[0].sentence_audio_ref.is_some());
        assert!(output.entries[1].sentence_audio_ref.is_none());
        assert_eq!(log.calls(), vec!["speak:кот", "speak:Кот спит.", "speak:пёс"]);
        assert_eq!(output.media.len(), 3);
    }

    #[tokio::test]
    async fn test_sentence_audio_latch_is_independent() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();

        let output = engine(
            &dir,
            cache_with(&[
                "кот|kot|cat||Кот спит.||The cat sleeps.",
                "пёс|pyos|dog||Пёс лает.||The dog barks.",
            ]),
        )
        .with_speech(speech(&log, &[(2, || SpeechError::QuotaExceeded)]))
        .run(words(&[("кот", "[kot]"), ("пёс", "[pyos]")]))
        .await
        .unwrap();

        assert!(output.gate.is_tripped(ArtifactKind::SentenceAudio));
        assert!(!output.gate.is_tripped(ArtifactKind::WordAudio));
        assert!(output.entries[1].audio_ref.is_some());
        assert!(output.entries[1].sentence_audio_ref.is_none());
        assert_eq!(log.calls(), vec!["speak:кот", "speak:Кот спит.", "speak:пёс"]);
    }

    #[tokio::test]
    async fn test_disabled_sentence_audio() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::default();

        let output = engine(&dir, cache_with(&["кот|kot|cat||Кот спит.||The cat sleeps."]))
            .with_speech(speech(&log, &[]))
            .with_audio(true, false)
            .run(words(&[("кот", "[kot]")]))
            .await
            .unwrap();

        assert!(output.entries[0].audio_ref.is_some());
        assert!(output.entries[0].sentence_audio_ref.is_none());
        assert_eq!(log.calls(), vec!["speak:кот"]);
    }

    #[tokio::test]
    async fn test_order_is_preserved() {
        let dir = TempDir::new().unwrap();
        let input = words(&[("в", "[v] in"), ("а", "[a] and"), ("я", "[ya] I")]);

        let output = engine(&dir, ArtifactCache::new()).run(input).await.unwrap();

        let order: Vec<&str> = output.entries.iter().map(|e| e.target_word.as_str()).collect();
        assert_eq!(order, vec!["в", "а", "я"]);
        assert_eq!(output.stats.entries, 3);
    }
}
