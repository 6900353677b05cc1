//! Search keyword generation.
//!
//! The digest can issue a second retrieval pass using keywords derived from
//! the reference corpus. This module defines the generator interface (an
//! LLM-backed implementation lives in [`openai`]) and the pure helper that
//! turns keywords into an arXiv query string.

pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::CorpusPaper;

/// Errors that can occur during keyword generation.
#[derive(Debug, Error)]
pub enum KeywordError {
    /// Network or API communication error
    #[error("API request failed: {0}")]
    Api(String),

    /// The model response could not be used
    #[error("Unusable model response: {0}")]
    BadResponse(String),

    /// Configuration error (e.g., missing API key)
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for keyword operations.
pub type KeywordResult<T> = Result<T, KeywordError>;

/// Trait for corpus-driven keyword generators.
#[async_trait]
pub trait KeywordGenerator: Send + Sync {
    /// Derive search keywords from the reference corpus.
    ///
    /// Returns at most `max_keywords` keywords, most relevant first.
    ///
    /// # Errors
    /// Returns `KeywordError` if generation fails
    async fn generate(
        &self,
        corpus: &[CorpusPaper],
        max_keywords: usize,
    ) -> KeywordResult<Vec<String>>;
}

/// Assemble an arXiv query string from keywords.
///
/// Each keyword becomes a quoted `all:` clause and clauses are joined with
/// `OR`. At most `max_keywords` keywords are used; embedded double quotes
/// are stripped so they cannot break the query syntax. Returns an empty
/// string for an empty keyword list.
pub fn build_query(keywords: &[String], max_keywords: usize) -> String {
    keywords
        .iter()
        .take(max_keywords)
        .map(|keyword| format!("all:\"{}\"", keyword.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_joins_with_or() {
        let keywords = vec!["vision transformers".to_string(), "diffusion".to_string()];
        assert_eq!(
            build_query(&keywords, 5),
            "all:\"vision transformers\" OR all:\"diffusion\""
        );
    }

    #[test]
    fn test_build_query_respects_max() {
        let keywords = vec![
            "one".to_string(),
            "two".to_string(),
            "three".to_string(),
        ];
        assert_eq!(build_query(&keywords, 2), "all:\"one\" OR all:\"two\"");
    }

    #[test]
    fn test_build_query_strips_embedded_quotes() {
        let keywords = vec!["so \"called\" robust".to_string()];
        assert_eq!(build_query(&keywords, 1), "all:\"so called robust\"");
    }

    #[test]
    fn test_build_query_empty() {
        assert_eq!(build_query(&[], 5), "");
    }
}
