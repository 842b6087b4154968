//! Anki package writer.
//!
//! Builds a schema 11 collection database with `sqlx`, then zips it together
//! with the media files into an `.apkg`. Model, deck and note identities are
//! derived from the deck name and the words, so importing a newer package over
//! an older one updates the existing notes instead of duplicating them.

mod schema;

use crate::error::PackageError;
use crate::model::{FIELD_SEPARATOR, VocabularyEntry, field};
use schema::{NoteModel, Template};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, SqliteConnection};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempDir;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Collection file names inside a package, newest format first.
pub const COLLECTION_FILES: [&str; 2] = ["collection.anki21", "collection.anki2"];

/// Collection file name this writer produces.
const COLLECTION_FILE: &str = "collection.anki2";

/// Name of the media index inside a package.
const MEDIA_INDEX: &str = "media";

/// Writes finalized entries and their media as an Anki package.
#[derive(Debug, Clone)]
pub struct AnkiPackageWriter {
    deck_name: String,
    language: String,
}

/// Summary of a written package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSummary {
    pub notes: usize,
    pub cards: usize,
    pub media_files: usize,
}

impl AnkiPackageWriter {
    /// `language` names the word field and the card templates.
    pub fn new(deck_name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            deck_name: deck_name.into(),
            language: language.into(),
        }
    }

    fn model_id(&self) -> i64 {
        stable_id(&format!("model{}{}", FIELD_SEPARATOR, self.deck_name))
    }

    fn deck_id(&self) -> i64 {
        stable_id(&format!("deck{}{}", FIELD_SEPARATOR, self.deck_name))
    }

    /// Note type with the seven positional fields and two card directions.
    fn note_model(&self) -> NoteModel {
        let lang = &self.language;
        let example_block = "{{#Example}}<div class=\"example\">{{Example}}{{ExampleAudio}}<br><span class=\"example-english\">{{ExampleEnglish}}</span></div>{{/Example}}";

        NoteModel {
            id: self.model_id(),
            name: format!("{} Vocabulary", lang),
            fields: vec![
                lang.clone(),
                "Pronunciation".to_string(),
                "English".to_string(),
                "Audio".to_string(),
                "Example".to_string(),
                "ExampleAudio".to_string(),
                "ExampleEnglish".to_string(),
            ],
            templates: vec![
                Template {
                    name: format!("{} to English", lang),
                    front: format!("{{{{{}}}}}<br>{{{{Audio}}}}", lang),
                    back: format!(
                        "{{{{FrontSide}}}}<hr id=\"answer\">{{{{Pronunciation}}}}<br>{{{{English}}}}{}",
                        example_block
                    ),
                    required_fields: vec![field::WORD, field::AUDIO],
                },
                Template {
                    name: format!("English to {}", lang),
                    front: "{{English}}".to_string(),
                    back: format!(
                        "{{{{FrontSide}}}}<hr id=\"answer\">{{{{{}}}}}<br>{{{{Pronunciation}}}}<br>{{{{Audio}}}}{}",
                        lang, example_block
                    ),
                    required_fields: vec![field::ENGLISH],
                },
            ],
        }
    }

    /// Writes the package to `output`.
    ///
    /// The package is assembled next to `output` and renamed over it only once
    /// complete, so a failure leaves any previous package untouched.
    pub async fn write(
        &self,
        entries: &[VocabularyEntry],
        media: &[PathBuf],
        output: &Path,
    ) -> Result<PackageSummary, PackageError> {
        if entries.is_empty() {
            return Err(PackageError::EmptyDeck);
        }

        let workdir = TempDir::new()?;
        let collection = workdir.path().join(COLLECTION_FILE);
        let cards = self.build_collection(&collection, entries).await?;

        let media = unique_media(media);
        let partial = partial_path(output);
        if let Err(e) = write_archive(&collection, &media, &partial) {
            let _ = std::fs::remove_file(&partial);
            return Err(e);
        }
        std::fs::rename(&partial, output)?;

        info!(
            path = %output.display(),
            notes = entries.len(),
            media = media.len(),
            "wrote package"
        );

        Ok(PackageSummary {
            notes: entries.len(),
            cards,
            media_files: media.len(),
        })
    }

    /// Creates the collection database and returns the number of cards.
    async fn build_collection(
        &self,
        path: &Path,
        entries: &[VocabularyEntry],
    ) -> Result<usize, PackageError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let mut conn = SqliteConnection::connect_with(&options).await?;
        sqlx::raw_sql(schema::SCHEMA).execute(&mut conn).await?;

        let model = self.note_model();
        let deck_id = self.deck_id();
        let now_ms = unix_millis();
        let now = now_ms / 1000;

        let mut tx = conn.begin().await?;

        sqlx::query(
            "INSERT INTO col (id, crt, mod, scm, ver, dty, usn, ls, conf, models, decks, dconf, tags)
             VALUES (1, ?, ?, ?, ?, 0, 0, 0, ?, ?, ?, ?, '{}')",
        )
        .bind(now)
        .bind(now_ms)
        .bind(now_ms)
        .bind(schema::SCHEMA_VERSION)
        .bind(serde_json::to_string(&schema::conf_json(model.id))?)
        .bind(serde_json::to_string(&model.to_json(deck_id, now))?)
        .bind(serde_json::to_string(&schema::decks_json(deck_id, &self.deck_name, now))?)
        .bind(serde_json::to_string(&schema::dconf_json())?)
        .execute(&mut *tx)
        .await?;

        let mut cards = 0;
        for (index, entry) in entries.iter().enumerate() {
            let note_id = now_ms + index as i64;
            sqlx::query(
                "INSERT INTO notes (id, guid, mid, mod, usn, tags, flds, sfld, csum, flags, data)
                 VALUES (?, ?, ?, ?, -1, '', ?, ?, ?, 0, '')",
            )
            .bind(note_id)
            .bind(self.note_guid(&entry.target_word))
            .bind(model.id)
            .bind(now)
            .bind(note_fields(entry))
            .bind(entry.target_word.as_str())
            .bind(checksum(&entry.target_word))
            .execute(&mut *tx)
            .await?;

            for ord in 0..model.templates.len() {
                let card_id = now_ms + (index * model.templates.len() + ord) as i64;
                sqlx::query(
                    "INSERT INTO cards (id, nid, did, ord, mod, usn, type, queue, due, ivl, factor, reps, lapses, left, odue, odid, flags, data)
                     VALUES (?, ?, ?, ?, ?, -1, 0, 0, ?, 0, 0, 0, 0, 0, 0, 0, 0, '')",
                )
                .bind(card_id)
                .bind(note_id)
                .bind(deck_id)
                .bind(ord as i64)
                .bind(now)
                .bind(index as i64 + 1)
                .execute(&mut *tx)
                .await?;
                cards += 1;
            }
        }

        tx.commit().await?;
        conn.close().await?;

        debug!(path = %path.display(), notes = entries.len(), cards, "built collection");
        Ok(cards)
    }

    fn note_guid(&self, word: &str) -> String {
        let hash = blake3::hash(format!("{}{}{}", self.deck_name, FIELD_SEPARATOR, word).as_bytes());
        hash.to_hex()[..20].to_string()
    }
}

/// Joins an entry's fields in stored order.
pub fn note_fields(entry: &VocabularyEntry) -> String {
    let mut fields = vec![String::new(); field::COUNT];
    fields[field::WORD] = entry.target_word.clone();
    fields[field::PRONUNCIATION] = entry.pronunciation.clone();
    fields[field::ENGLISH] = entry.english_translation.clone();
    fields[field::AUDIO] = sound_tag(entry.audio_ref.as_deref());
    fields[field::EXAMPLE] = entry.example_sentence().to_string();
    fields[field::EXAMPLE_AUDIO] = sound_tag(entry.sentence_audio_ref.as_deref());
    fields[field::EXAMPLE_ENGLISH] = entry.sentence_translation().to_string();
    fields.join(&FIELD_SEPARATOR.to_string())
}

/// `[sound:<file>]` for a media reference, or nothing when there is none.
fn sound_tag(path: Option<&Path>) -> String {
    path.and_then(|p| p.file_name())
        .map(|name| format!("[sound:{}]", name.to_string_lossy()))
        .unwrap_or_default()
}

/// Positive id in `[2^30, 2^31)` derived from `seed`.
fn stable_id(seed: &str) -> i64 {
    let hash = blake3::hash(seed.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    let base = 1i64 << 30;
    base + (u64::from_le_bytes(bytes) % base as u64) as i64
}

/// Duplicate-detection checksum of the sort field.
fn checksum(text: &str) -> i64 {
    let hash = blake3::hash(text.as_bytes());
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&hash.as_bytes()[..4]);
    u32::from_be_bytes(bytes) as i64
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Media paths with repeated file names removed, in first-seen order.
fn unique_media(media: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    media
        .iter()
        .filter(|p| seen.insert(p.file_name().map(|n| n.to_os_string())))
        .cloned()
        .collect()
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    output.with_file_name(name)
}

/// Zips the collection and media files into `path`.
fn write_archive(collection: &Path, media: &[PathBuf], path: &Path) -> Result<(), PackageError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut archive = ZipWriter::new(File::create(path)?);

    archive.start_file(COLLECTION_FILE, options)?;
    io::copy(&mut File::open(collection)?, &mut archive)?;

    let mut index = BTreeMap::new();
    for (i, media_path) in media.iter().enumerate() {
        let name = media_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("media path has no file name: {}", media_path.display()),
                )
            })?;
        archive.start_file(i.to_string(), options)?;
        io::copy(&mut File::open(media_path)?, &mut archive)?;
        index.insert(i.to_string(), name);
    }

    archive.start_file(MEDIA_INDEX, options)?;
    archive.write_all(serde_json::to_string(&index)?.as_bytes())?;
    archive.finish()?;
    Ok(())
}
