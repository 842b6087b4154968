//! Utility functions for common operations.

use crate::error::GenerationError;

/// Splits text into chunks on whitespace, respecting a maximum chunk size.
///
/// Sizes are counted in characters, not bytes. A single word longer than
/// `max_chars` becomes its own chunk rather than being cut.
///
/// # Arguments
/// * `text` - The text to split
/// * `max_chars` - Maximum size of each chunk in characters
pub fn split_text_into_word_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current_chunk: Vec<&str> = Vec::new();
    let mut current_size: usize = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let word_size = word_len + if current_chunk.is_empty() { 0 } else { 1 };

        if current_size + word_size > max_chars && !current_chunk.is_empty() {
            chunks.push(current_chunk.join(" "));
            current_chunk = vec![word];
            current_size = word_len;
        } else {
            current_chunk.push(word);
            current_size += word_size;
        }
    }

    // Remember the last chunk
    if !current_chunk.is_empty() {
        chunks.push(current_chunk.join(" "));
    }

    chunks
}

/// Checks if an HTTP response is successful, and if not, returns a detailed error.
///
/// This helper extracts both the status code and response body for better error messages.
pub async fn check_response_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, GenerationError> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(GenerationError::ApiError(format!(
            "HTTP {}: {}",
            status, text
        )));
    }
    Ok(response)
}
