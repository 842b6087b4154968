//! Artifact cache built from a previously written package.
//!
//! Reading the previous package lets a run reuse translations and example
//! sentences it already paid for. Loading never fails: a missing, unreadable
//! or oddly shaped package simply yields an empty cache.

use crate::deck::COLLECTION_FILES;
use crate::error::StoreError;
use crate::model::{ExampleSentence, FIELD_SEPARATOR, field, has_translation};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, SqliteConnection};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};
use zip::ZipArchive;
use zip::result::ZipError;

/// Minimum fields for a note to supply a translation.
const MIN_TRANSLATION_FIELDS: usize = field::ENGLISH + 1;

/// Minimum fields for a note to supply an example sentence.
const MIN_SENTENCE_FIELDS: usize = field::COUNT;

/// Translations and sentences recovered from a previous run.
///
/// Read-only for the duration of a run.
#[derive(Debug, Clone, Default)]
pub struct ArtifactCache {
    translations: HashMap<String, String>,
    sentences: HashMap<String, ExampleSentence>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a cache from raw note field strings.
    ///
    /// Later records for the same word overwrite earlier ones. When records
    /// come from the database, their order is whatever SQLite returns, so which
    /// duplicate wins is unspecified.
    pub fn from_records<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cache = Self::new();
        for record in records {
            cache.insert_record(record.as_ref());
        }
        cache
    }

    /// Decodes one stored note and records whatever it can supply.
    pub fn insert_record(&mut self, record: &str) {
        let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
        if fields.len() < MIN_TRANSLATION_FIELDS {
            return;
        }

        let word = fields[field::WORD];
        let english = fields[field::ENGLISH];
        if word.trim().is_empty() || !has_translation(english) {
            return;
        }
        self.translations.insert(word.to_string(), english.to_string());

        if fields.len() < MIN_SENTENCE_FIELDS {
            return;
        }
        if let Some(example) =
            ExampleSentence::new(fields[field::EXAMPLE], fields[field::EXAMPLE_ENGLISH])
        {
            self.sentences.insert(word.to_string(), example);
        }
    }

    pub fn translation(&self, word: &str) -> Option<&str> {
        self.translations.get(word).map(String::as_str)
    }

    pub fn sentence(&self, word: &str) -> Option<&ExampleSentence> {
        self.sentences.get(word)
    }

    pub fn translation_count(&self) -> usize {
        self.translations.len()
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty() && self.sentences.is_empty()
    }
}

/// Loads the artifact cache from a previous package at `path`.
///
/// Never fails; problems are logged and produce an empty cache.
pub async fn load_artifact_cache(path: &Path) -> ArtifactCache {
    if !path.exists() {
        info!(path = %path.display(), "no previous package; starting with an empty cache");
        return ArtifactCache::new();
    }

    match read_note_fields(path).await {
        Ok(records) => {
            let cache = ArtifactCache::from_records(&records);
            info!(
                path = %path.display(),
                notes = records.len(),
                translations = cache.translation_count(),
                sentences = cache.sentence_count(),
                "loaded previous package"
            );
            cache
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable previous package");
            ArtifactCache::new()
        }
    }
}

/// Extracts the collection from the package and reads every note's fields.
async fn read_note_fields(path: &Path) -> Result<Vec<String>, StoreError> {
    let workdir = TempDir::new()?;
    let collection = extract_collection(path, workdir.path())?;

    let options = SqliteConnectOptions::new()
        .filename(&collection)
        .read_only(true);
    let mut conn = SqliteConnection::connect_with(&options).await?;
    let records = sqlx::query_scalar::<_, String>("SELECT flds FROM notes")
        .fetch_all(&mut conn)
        .await;
    conn.close().await?;

    let records = records?;
    debug!(count = records.len(), "read note records");
    Ok(records)
}

/// Copies the collection database out of the package into `dir`.
fn extract_collection(package: &Path, dir: &Path) -> Result<PathBuf, StoreError> {
    let mut archive = ZipArchive::new(File::open(package)?)?;

    for name in COLLECTION_FILES {
        let mut entry = match archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => continue,
            Err(e) => return Err(e.into()),
        };

        let target = dir.join(name);
        io::copy(&mut entry, &mut File::create(&target)?)?;
        return Ok(target);
    }

    Err(StoreError::MissingCollection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn record(fields: &[&str]) -> String {
        fields.join(&FIELD_SEPARATOR.to_string())
    }

    #[test]
    fn test_translation_needs_three_fields() {
        let cache = ArtifactCache::from_records([record(&["кот", "kot"])]);
        assert!(cache.is_empty());

        let cache = ArtifactCache::from_records([record(&["кот", "kot", "cat"])]);
        assert_eq!(cache.translation("кот"), Some("cat"));
        assert!(cache.sentence("кот").is_none());
    }

    #[test]
    fn test_sentinel_and_blank_fields_are_skipped() {
        let cache = ArtifactCache::from_records([
            record(&["кот", "kot", crate::model::NO_TRANSLATION]),
            record(&["", "x", "nobody"]),
            record(&["пёс", "pyos", ""]),
        ]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sentence_needs_seven_fields_and_both_halves() {
        let cache = ArtifactCache::from_records([
            record(&["кот", "kot", "cat", "", "Кот спит.", "", "The cat sleeps."]),
            record(&["пёс", "pyos", "dog", "", "Пёс лает.", ""]),
            record(&["дом", "dom", "house", "", "Это дом.", "", ""]),
        ]);

        let example = cache.sentence("кот").unwrap();
        assert_eq!(example.sentence, "Кот спит.");
        assert_eq!(example.translation, "The cat sleeps.");
        assert!(cache.sentence("пёс").is_none());
        assert!(cache.sentence("дом").is_none());
        assert_eq!(cache.translation_count(), 3);
    }

    #[test]
    fn test_later_record_wins() {
        let cache = ArtifactCache::from_records([
            record(&["кот", "kot", "cat"]),
            record(&["кот", "kot", "tomcat"]),
        ]);
        assert_eq!(cache.translation("кот"), Some("tomcat"));
    }

    #[tokio::test]
    async fn test_missing_package_gives_empty_cache() {
        let dir = TempDir::new().unwrap();
        let cache = load_artifact_cache(&dir.path().join("nope.apkg")).await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_garbage_package_gives_empty_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.apkg");
        std::fs::write(&path, b"this is not a zip file").unwrap();

        assert!(load_artifact_cache(&path).await.is_empty());
    }

    #[tokio::test]
    async fn test_package_without_collection_gives_empty_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.apkg");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        zip.start_file("media", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"{}").unwrap();
        zip.finish().unwrap();

        assert!(matches!(
            read_note_fields(&path).await,
            Err(StoreError::MissingCollection)
        ));
        assert!(load_artifact_cache(&path).await.is_empty());
    }

    #[tokio::test]
    async fn test_collection_without_notes_table_gives_empty_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("odd.apkg");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        zip.start_file("collection.anki2", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"SQLite format 3\0 but not really").unwrap();
        zip.finish().unwrap();

        assert!(load_artifact_cache(&path).await.is_empty());
    }
}
