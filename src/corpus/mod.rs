//! Reference corpus retrieval.
//!
//! This module defines the interface for fetching the user's reference
//! library (the corpus of established interests) and provides a Zotero Web
//! API implementation. The abstraction keeps the reranking engine
//! independent of where the library lives.
//!
//! Corpus sources validate items once at this boundary: entries without an
//! abstract never reach the engine.

pub mod zotero;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::CorpusPaper;

/// Errors that can occur while retrieving the reference corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// Network or connection error
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with a non-success status
    #[error("API error: {0}")]
    Api(String),

    /// Failed to parse the response payload
    #[error("Parse error: {0}")]
    Parse(String),

    /// Other source-specific errors
    #[error("Corpus error: {0}")]
    Other(String),
}

/// Result type for corpus operations.
pub type CorpusResult<T> = Result<T, CorpusError>;

/// Trait for reference corpus sources.
///
/// Implementations fetch a snapshot of the user's library for one digest
/// run. The snapshot is immutable; there is no cross-run persistence.
#[async_trait]
pub trait CorpusSource: Send + Sync {
    /// Fetch the reference corpus.
    ///
    /// Returned papers all have a non-empty abstract; items without one are
    /// filtered out here rather than downstream.
    ///
    /// # Errors
    /// Returns `CorpusError` if the library cannot be fetched or parsed
    async fn fetch_corpus(&self) -> CorpusResult<Vec<CorpusPaper>>;
}
