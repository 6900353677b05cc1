//! Candidate paper retrieval.
//!
//! This module defines the interface for sourcing candidate papers from a
//! search service and includes the arXiv implementation.
//!
//! The `CandidateSource` trait abstracts the search backend, so the digest
//! pipeline can issue several retrieval passes (a primary query, a
//! keyword-derived query, a domain query) without coupling to a specific
//! service.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::CandidatePaper;

pub mod arxiv;

/// Errors that can occur when fetching candidates from a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network or connection error
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with a non-success status
    #[error("API error: {0}")]
    Api(String),

    /// Failed to parse the response feed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Other provider-specific errors
    #[error("Provider error: {0}")]
    Other(String),
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Trait for candidate paper sources.
///
/// # Design Notes
///
/// - A source may be queried several times per run with different query
///   strings; merging and deduplication happen downstream
/// - Returned candidates carry the query that produced them in
///   `source_query`
/// - Results are ordered newest-first as reported by the service
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Search for candidate papers.
    ///
    /// # Arguments
    /// * `query` - Service-specific query string
    /// * `max_results` - Maximum number of candidates to return
    ///
    /// # Errors
    /// Returns `ProviderError` if candidates cannot be fetched or parsed
    async fn search(&self, query: &str, max_results: usize) -> ProviderResult<Vec<CandidatePaper>>;
}
