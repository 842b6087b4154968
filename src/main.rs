//! Lexideck CLI - builds an Anki deck from a duome.eu vocabulary list.

use anyhow::{Context, Result};
use clap::Parser;
use lexideck::config::Config;
use lexideck::console::Console;
use lexideck::generators::{ChatClient, GoogleSpeech, LlmSentenceGenerator, LlmTranslator};
use lexideck::model::ArtifactKind;
use lexideck::sync::{Language, SyncOutput};
use lexideck::{
    AnkiPackageWriter, DuomeScraper, MediaCache, SyncEngine, VocabularySource,
    load_artifact_cache,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Builds or refreshes an Anki vocabulary deck, reusing a previous package.
#[derive(Parser, Debug)]
#[command(name = "lexideck")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to use instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Package to write.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Previous package to reuse artifacts from (defaults to the output path).
    #[arg(long)]
    previous: Option<PathBuf>,

    /// Directory holding generated audio.
    #[arg(long)]
    media_dir: Option<PathBuf>,

    /// Vocabulary page to scrape.
    #[arg(long)]
    url: Option<String>,

    /// Skip all audio.
    #[arg(long)]
    no_audio: bool,

    /// Skip example sentence generation.
    #[arg(long)]
    no_sentences: bool,

    /// Skip audio for example sentences.
    #[arg(long)]
    no_sentence_audio: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Folds command line overrides into the loaded config.
    fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.paths.output_file = output.clone();
        }
        if let Some(dir) = &self.media_dir {
            config.paths.media_directory = dir.clone();
        }
        if let Some(url) = &self.url {
            config.language.source_url = url.clone();
        }
        if self.no_audio {
            config.speech.enabled = false;
        }
        if self.no_sentences {
            config.generation.sentences = false;
        }
        if self.no_sentence_audio {
            config.speech.sentence_audio = false;
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "lexideck=debug" } else { "lexideck=warn" };
    let filter = if verbose {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    let console = Console::new();

    console.section("Lexideck - Vocabulary Deck Builder");

    match run(&args, &console).await {
        Ok(()) => {
            console.section("Done!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            console.error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Scrapes, synchronizes and writes the package.
async fn run(args: &Args, console: &Console) -> Result<()> {
    // Load configuration
    console.step("Loading configuration...");
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let mut config = Config::load_from(&config_path).context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    console.success(&format!("Configuration loaded from {}", config_path.display()));

    if !config.api.is_configured() {
        console.warning(&format!(
            "API key not configured; missing translations and sentences will not be generated. Edit: {}",
            config_path.display()
        ));
    }

    // Scrape the vocabulary list
    let scraper = DuomeScraper::new(&config.language.source_url, &config.scraping)?;
    console.step(&format!("Fetching vocabulary from {}...", scraper.name()));
    let words = scraper
        .fetch()
        .await
        .with_context(|| format!("Failed to fetch {}", config.language.source_url))?;
    if words.is_empty() {
        anyhow::bail!(
            "No vocabulary entries found at {}; the page structure may have changed",
            config.language.source_url
        );
    }
    console.success(&format!("Found {} words", console.count(words.len())));

    // Reuse whatever the previous package already has
    let output = config.paths.output_file.clone();
    let previous = args.previous.clone().unwrap_or_else(|| output.clone());
    console.step(&format!("Reading previous package {}...", previous.display()));
    let cache = load_artifact_cache(&previous).await;
    console.info(&format!(
        "Reusing {} translations and {} example sentences",
        console.count(cache.translation_count()),
        console.count(cache.sentence_count())
    ));

    let engine = build_engine(&config, cache)?;

    console.step("Synchronizing artifacts...");
    let sync = engine.run(words).await?;

    console.step(&format!("Writing {}...", output.display()));
    let writer = AnkiPackageWriter::new(&config.language.deck_name, &config.language.name);
    let package = writer
        .write(&sync.entries, &sync.media, &output)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    console.success(&format!(
        "Wrote {} notes, {} cards and {} media files",
        console.count(package.notes),
        console.count(package.cards),
        console.count(package.media_files)
    ));

    print_summary(console, &sync);
    Ok(())
}

/// Wires the configured capabilities into a sync engine.
fn build_engine(config: &Config, cache: lexideck::ArtifactCache) -> Result<SyncEngine> {
    let language = Language::new(&config.language.name, &config.language.code);
    let media = MediaCache::new(&config.paths.media_directory);
    let mut engine = SyncEngine::new(language, cache, media)
        .with_audio(config.speech.enabled, config.speech.sentence_audio);

    if config.api.is_configured() {
        let client = ChatClient::new(config.api.clone(), config.generation.clone())?;
        let prompt = config.prompts.translation_for(&config.language.name);
        engine = engine.with_translator(Box::new(LlmTranslator::new(client, prompt)));

        if config.generation.sentences {
            let client = ChatClient::new(config.api.clone(), config.generation.clone())?;
            let prompt = config.prompts.sentence_for(&config.language.name);
            engine =
                engine.with_sentence_generator(Box::new(LlmSentenceGenerator::new(client, prompt)));
        }
    }

    if config.speech.enabled {
        let speech = GoogleSpeech::new(&config.speech, &config.scraping.user_agent)?;
        engine = engine.with_speech(Box::new(speech));
    }

    Ok(engine)
}

fn print_summary(console: &Console, sync: &SyncOutput) {
    let stats = &sync.stats;
    let total = stats.entries;
    let with_sentence = total - stats.sentences_missing;

    console.section("Summary");
    console.summary_row(
        "Translations",
        total - stats.translations_missing,
        total,
        &format!(
            "{} scraped, {} reused, {} generated",
            stats.translations_scraped, stats.translations_cached, stats.translations_generated
        ),
    );
    console.summary_row(
        "Example sentences",
        with_sentence,
        total,
        &format!(
            "{} reused, {} generated",
            stats.sentences_cached, stats.sentences_generated
        ),
    );
    console.summary_row(
        "Word audio",
        stats.word_audio.present(),
        total,
        &format!(
            "{} cached, {} generated",
            stats.word_audio.cached, stats.word_audio.generated
        ),
    );
    console.summary_row(
        "Sentence audio",
        stats.sentence_audio.present(),
        with_sentence,
        &format!(
            "{} cached, {} generated",
            stats.sentence_audio.cached, stats.sentence_audio.generated
        ),
    );

    for kind in [ArtifactKind::WordAudio, ArtifactKind::SentenceAudio] {
        if sync.gate.is_tripped(kind) {
            console.warning(&format!(
                "Speech quota exhausted; remaining {} was skipped. Run again later to fill it in.",
                kind
            ));
        }
    }
}
