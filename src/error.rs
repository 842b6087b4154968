//! Error types for the Lexideck application.
//!
//! Uses `thiserror` for structured error definitions that provide
//! clear context about what went wrong.

use thiserror::Error;

/// Error type for fetching and parsing the vocabulary page.
#[derive(Error, Debug)]
pub enum ScraperError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    /// Failed to parse HTML content
    #[error("Failed to parse HTML: {0}")]
    ParseError(String),
}

/// Error type for configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Config directory not found
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Error type for translation and sentence generation.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// HTTP request to API failed
    #[error("API request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error: {0}")]
    ApiError(String),

    /// The model declined or returned nothing
    #[error("Generation refused: {0}")]
    Refused(String),

    /// The response did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// All retry attempts exhausted
    #[error("All retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// Error type for speech synthesis.
#[derive(Error, Debug)]
pub enum SpeechError {
    /// HTTP request failed before a status was received
    #[error("Speech request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service rejected the request for exceeding its quota (HTTP 429)
    #[error("Speech quota exceeded")]
    QuotaExceeded,

    /// Any other non-success status
    #[error("Speech service returned HTTP {0}")]
    Http(u16),

    /// Success status but no audio payload
    #[error("Speech service returned no audio")]
    EmptyAudio,

    /// Invalid endpoint configuration
    #[error("Invalid speech endpoint: {0}")]
    InvalidEndpoint(String),
}

impl SpeechError {
    /// Whether this failure means the run's speech budget is used up.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, SpeechError::QuotaExceeded)
    }
}

/// Error type for reading a previously written package.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to read the package or its extracted collection
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a readable zip container
    #[error("Not a valid package container: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The container has no collection database
    #[error("Package contains no collection database")]
    MissingCollection,

    /// The collection database could not be queried
    #[error("Collection database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Error type for writing the output package.
#[derive(Error, Debug)]
pub enum PackageError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip container error
    #[error("Failed to build package container: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Collection database error
    #[error("Failed to build collection database: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON encoding of collection metadata failed
    #[error("Failed to encode collection metadata: {0}")]
    Json(#[from] serde_json::Error),

    /// Refused to write a deck with no notes
    #[error("Refusing to write an empty deck")]
    EmptyDeck,
}

/// Error type for the synchronization engine.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The scrape produced nothing to synchronize
    #[error("No vocabulary entries found; the source page structure may have changed")]
    NoEntries,
}

/// Result type alias using anyhow for application-level error handling.
pub type Result<T> = anyhow::Result<T>;
