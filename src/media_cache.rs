//! File-backed media cache.
//!
//! Generated audio lives in a directory that persists across runs. A file that
//! exists with non-zero size at the derived path counts as cached and is never
//! regenerated. Staleness is not detected.

use crate::model::ArtifactKind;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of cached audio files.
const AUDIO_EXTENSION: &str = "mp3";

/// Number of hash bytes kept in a file name.
const KEY_HASH_BYTES: usize = 16;

/// Derives the cache file name for a word.
///
/// The name is a truncated BLAKE3 hash of the word, so any word text maps to a
/// filesystem-safe name and distinct words do not collide in practice.
pub fn cache_file_name(kind: ArtifactKind, word: &str) -> String {
    let hash = blake3::hash(word.as_bytes());
    let hex: String = hash.as_bytes()[..KEY_HASH_BYTES]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    format!("{}_{}.{}", kind.prefix(), hex, AUDIO_EXTENSION)
}

/// Cache of generated media files keyed by artifact kind and word.
#[derive(Debug, Clone)]
pub struct MediaCache {
    root: PathBuf,
}

impl MediaCache {
    /// Creates a cache rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic path for a word's artifact.
    pub fn resolve(&self, kind: ArtifactKind, word: &str) -> PathBuf {
        self.root.join(cache_file_name(kind, word))
    }

    /// True iff the path exists and is non-empty.
    pub async fn is_cached(path: &Path) -> bool {
        match tokio::fs::metadata(path).await {
            Ok(meta) => meta.is_file() && meta.len() > 0,
            Err(_) => false,
        }
    }

    pub async fn contains(&self, kind: ArtifactKind, word: &str) -> bool {
        Self::is_cached(&self.resolve(kind, word)).await
    }

    /// Returns the cached path, if present.
    pub async fn get(&self, kind: ArtifactKind, word: &str) -> Option<PathBuf> {
        let path = self.resolve(kind, word);
        Self::is_cached(&path).await.then_some(path)
    }

    /// Stores bytes for a word and returns the final path.
    ///
    /// Writes to a temporary name first and renames into place, so the key
    /// path only ever holds a complete file.
    pub async fn put(&self, kind: ArtifactKind, word: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.resolve(kind, word);
        let partial = path.with_extension(format!("{}.part", AUDIO_EXTENSION));
        tokio::fs::write(&partial, bytes).await?;
        if let Err(e) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }

        debug!(path = %path.display(), bytes = bytes.len(), "stored media");
        Ok(path)
    }
}
