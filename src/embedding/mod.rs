//! Embedding provider abstraction and implementations.
//!
//! This module defines the interface for text embedding generation and provides
//! implementations for various embedding backends (local fastembed models and
//! the OpenAI API).
//!
//! Corpus papers and candidate papers must be embedded with the same text
//! construction so their vectors live in one comparable space; [`embedding_text`]
//! is that single convention.

pub mod fastembed;
pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Network or API communication error
    #[error("API request failed: {0}")]
    ApiError(String),

    /// Invalid input text (e.g., empty)
    #[error("Invalid input text: {0}")]
    InvalidInput(String),

    /// Configuration error (e.g., missing API key)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Other unexpected errors
    #[error("Unexpected error: {0}")]
    Other(String),
}

/// Result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Trait for text embedding providers.
///
/// Implementors generate fixed-dimension vector embeddings from text. The
/// trait is async to support API-based backends. Batching is a performance
/// detail: `embed_batch` must yield the same vectors the per-item `embed`
/// would.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for the given text.
    ///
    /// # Errors
    /// Returns `EmbeddingError` if the embedding generation fails
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Generate embeddings for multiple texts in a single batch.
    ///
    /// Results are in the same order as the input texts.
    ///
    /// # Errors
    /// Returns `EmbeddingError` if any embedding generation fails
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Get the dimension of embeddings produced by this provider.
    fn dimension(&self) -> usize;

    /// Get the model name/identifier for this provider.
    fn model_name(&self) -> &str;
}

/// Build the text fed to the embedding provider for a paper.
///
/// Title and abstract are joined with a single newline. Both the corpus
/// encoder and the candidate encoder go through this function, which keeps
/// the two vector sets comparable.
pub fn embedding_text(title: &str, abstract_text: &str) -> String {
    format!("{}\n{}", title, abstract_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_text_joins_with_newline() {
        assert_eq!(
            embedding_text("Attention Is All You Need", "We propose the Transformer."),
            "Attention Is All You Need\nWe propose the Transformer."
        );
    }

    #[test]
    fn test_embedding_text_preserves_content() {
        // No trimming or case folding: the convention is pure concatenation.
        let text = embedding_text("  Spaced  Title ", "Abstract.");
        assert_eq!(text, "  Spaced  Title \nAbstract.");
    }
}
