//! Core data models for the paper digest system.
//!
//! This module contains the fundamental data structures used across the
//! application: reference corpus entries, retrieved candidates, and the
//! scored/ranked outputs of a digest run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A paper from the user's reference library.
///
/// Corpus papers represent established interests. They are created once per
/// run from the library snapshot, are never mutated, and are discarded when
/// the run ends. The abstract is guaranteed non-empty: items without an
/// abstract are filtered out at the corpus-source boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusPaper {
    /// Opaque library identifier, unique within the corpus
    pub key: String,

    /// Paper title
    pub title: String,

    /// Abstract text (non-empty)
    pub abstract_text: String,

    /// When the paper was added to the library; drives the recency weight
    pub date_added: DateTime<Utc>,
}

/// A newly retrieved paper being evaluated for relevance.
///
/// Candidates are produced by one or more retrieval passes and merged by
/// title before scoring. The title is the deduplication key within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatePaper {
    /// Paper title (deduplication key, compared exactly)
    pub title: String,

    /// Abstract text
    pub abstract_text: String,

    /// Submission timestamp reported by the search service
    pub submitted: DateTime<Utc>,

    /// The query string of the retrieval pass that produced this candidate
    pub source_query: String,
}

/// A candidate paper together with its computed relevance score.
///
/// This is the primary output type of the reranking engine. The optional
/// label carries display text attached downstream (e.g. a relevance tier);
/// the engine itself only assigns the score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPaper {
    /// The candidate paper
    pub paper: CandidatePaper,

    /// Relevance score (maximum recency-weighted cosine similarity)
    pub score: f32,

    /// Optional display label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ScoredPaper {
    /// Create a new scored paper with no label.
    pub fn new(paper: CandidatePaper, score: f32) -> Self {
        Self {
            paper,
            score,
            label: None,
        }
    }

    /// Attach a display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// The two ranked outputs of a single digest run.
///
/// Both lists are sorted by score descending and independently truncated:
/// `recommendations` against the full query-derived candidate pool,
/// `domain_highlights` against the domain-restricted pool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Digest {
    /// Fine-grained personalized ranking
    pub recommendations: Vec<ScoredPaper>,

    /// Coarse-grained domain ranking, truncated to a small fixed count
    pub domain_highlights: Vec<ScoredPaper>,
}
