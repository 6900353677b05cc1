//! The reranking engine.
//!
//! This module scores candidate papers against the reference corpus and
//! produces the ranked outputs of a digest run. It coordinates with an
//! [`EmbeddingProvider`] to place corpus and candidates in one vector space,
//! then ranks candidates by their maximum recency-weighted cosine similarity
//! to any corpus item.
//!
//! # Usage
//!
//! ```ignore
//! use paper_digest::recommend::{Recommender, RecommenderConfig};
//!
//! let recommender = Recommender::new(embedding_provider, RecommenderConfig::default())?;
//! let digest = recommender.recommend(candidates, domain_candidates, &corpus).await?;
//!
//! // digest.recommendations is sorted by descending relevance
//! for scored in &digest.recommendations {
//!     println!("{:.3}  {}", scored.score, scored.paper.title);
//! }
//! ```
//!
//! Scoring is deterministic: identical inputs produce identical scores, and
//! an empty corpus yields a score of exactly 0.0 for every candidate.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, info};

use crate::embedding::{embedding_text, EmbeddingProvider};
use crate::models::{CandidatePaper, CorpusPaper, Digest, ScoredPaper};

/// Errors that can occur during reranking.
#[derive(Debug, Error)]
pub enum RecommendError {
    /// Embedding generation failed; the run is aborted without partial scores
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// A paper reached the encoder with an empty abstract
    #[error("Paper '{0}' has no abstract; upstream filtering must remove it")]
    MissingAbstract(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for reranking operations.
pub type RecommendResult<T> = Result<T, RecommendError>;

/// Configuration for the reranking engine.
///
/// Passed explicitly to [`Recommender::new`]; there is no process-wide
/// scoring state.
#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    /// Per-day decay applied to corpus item weights, in (0, 1).
    ///
    /// A corpus item `d` days older than the newest item carries weight
    /// `decay_rate ^ d`, so recently added papers dominate the score.
    pub decay_rate: f32,

    /// Maximum size of the fine-grained recommendation list (`None` = keep all)
    pub max_recommendations: Option<usize>,

    /// Size of the coarse-grained domain highlight list
    pub domain_limit: usize,

    /// Number of texts sent to the embedding provider per batch.
    ///
    /// Purely a performance knob; scores do not depend on it.
    pub batch_size: usize,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            decay_rate: crate::DEFAULT_DECAY_RATE,
            max_recommendations: None,
            domain_limit: crate::DEFAULT_DOMAIN_LIMIT,
            batch_size: 32,
        }
    }
}

/// A corpus embedding together with its recency weight.
///
/// The weight lies in (0, 1] and never increases as the item ages; the
/// newest corpus item always carries weight 1.0.
#[derive(Debug, Clone)]
pub struct WeightedEmbedding {
    /// Embedding vector of the corpus paper
    pub vector: Vec<f32>,

    /// Time-decay weight derived from the paper's age within the corpus
    pub weight: f32,
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude, so all-zero embeddings
/// never dominate a ranking.
///
/// # Panics
/// Panics if the vectors have different lengths; mixed dimensions mean the
/// two sides were embedded with different models, which is a bug upstream.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vectors must have the same length");

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score one candidate vector against the weighted corpus.
///
/// The score is the maximum of `weight * cosine(candidate, item)` over all
/// corpus items: a candidate that closely matches even a single strong
/// interest outranks one that is mildly similar to everything. An empty
/// corpus yields exactly 0.0.
pub fn max_weighted_similarity(candidate: &[f32], corpus: &[WeightedEmbedding]) -> f32 {
    corpus
        .iter()
        .map(|item| item.weight * cosine_similarity(candidate, &item.vector))
        .fold(0.0_f32, f32::max)
}

/// Merge candidate passes into a single deduplicated sequence.
///
/// Titles are compared exactly (case-sensitive, no normalization). The first
/// occurrence wins and the order of first appearance is preserved, so the
/// merge is a stable union and idempotent.
pub fn merge_unique<I>(passes: I) -> Vec<CandidatePaper>
where
    I: IntoIterator<Item = Vec<CandidatePaper>>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();

    for pass in passes {
        for candidate in pass {
            if seen.insert(candidate.title.clone()) {
                merged.push(candidate);
            }
        }
    }

    merged
}

/// Order scored papers by descending score and truncate.
///
/// The sort is stable: candidates with equal scores keep their input order,
/// so the result is deterministic given a deterministic dedup order. A limit
/// of `None` keeps the full list; `Some(0)` returns an empty list.
pub fn rank_papers(mut scored: Vec<ScoredPaper>, limit: Option<usize>) -> Vec<ScoredPaper> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if let Some(limit) = limit {
        scored.truncate(limit);
    }

    scored
}

/// The reranking engine.
///
/// Owns an embedding provider and an explicit configuration. One instance
/// serves both rankings of a run; it keeps no state between calls.
pub struct Recommender<E>
where
    E: EmbeddingProvider,
{
    /// Embedding provider shared by the corpus and candidate encoders
    embedding: E,

    /// Scoring and truncation configuration
    config: RecommenderConfig,
}

impl<E> Recommender<E>
where
    E: EmbeddingProvider,
{
    /// Create a new reranking engine.
    ///
    /// # Errors
    /// Returns `RecommendError::InvalidConfig` if `decay_rate` is outside
    /// (0, 1) or `batch_size` is zero
    pub fn new(embedding: E, config: RecommenderConfig) -> RecommendResult<Self> {
        if !(config.decay_rate > 0.0 && config.decay_rate < 1.0) {
            return Err(RecommendError::InvalidConfig(format!(
                "decay_rate must be in (0, 1), got {}",
                config.decay_rate
            )));
        }
        if config.batch_size == 0 {
            return Err(RecommendError::InvalidConfig(
                "batch_size must be positive".to_string(),
            ));
        }

        Ok(Self { embedding, config })
    }

    /// Encode the reference corpus into weighted embeddings.
    ///
    /// Each item's weight is `decay_rate ^ age_in_days`, with age measured
    /// against the newest item's `date_added` rather than wall-clock time,
    /// so a rerun over the same corpus reproduces the same weights.
    ///
    /// An empty corpus encodes to an empty set (not an error); downstream
    /// scoring then yields 0.0 for every candidate.
    ///
    /// # Errors
    /// Returns `RecommendError::MissingAbstract` if an item slipped through
    /// upstream filtering, or `RecommendError::Embedding` on provider failure
    pub async fn encode_corpus(
        &self,
        corpus: &[CorpusPaper],
    ) -> RecommendResult<Vec<WeightedEmbedding>> {
        let Some(newest) = corpus.iter().map(|paper| paper.date_added).max() else {
            return Ok(Vec::new());
        };

        let mut texts = Vec::with_capacity(corpus.len());
        for paper in corpus {
            if paper.abstract_text.trim().is_empty() {
                return Err(RecommendError::MissingAbstract(paper.title.clone()));
            }
            texts.push(embedding_text(&paper.title, &paper.abstract_text));
        }

        let vectors = self.embed_all(&texts).await?;

        let weighted = corpus
            .iter()
            .zip(vectors)
            .map(|(paper, vector)| {
                let age_days = (newest - paper.date_added).num_seconds() as f32 / 86_400.0;
                WeightedEmbedding {
                    vector,
                    weight: self.config.decay_rate.powf(age_days),
                }
            })
            .collect();

        Ok(weighted)
    }

    /// Score candidates against pre-encoded corpus embeddings.
    ///
    /// Candidates are embedded with the same text convention as the corpus
    /// and each receives exactly one score. Order is preserved.
    ///
    /// # Errors
    /// Returns `RecommendError::MissingAbstract` or `RecommendError::Embedding`
    pub async fn score_candidates(
        &self,
        candidates: Vec<CandidatePaper>,
        corpus_vectors: &[WeightedEmbedding],
    ) -> RecommendResult<Vec<ScoredPaper>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut texts = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            if candidate.abstract_text.trim().is_empty() {
                return Err(RecommendError::MissingAbstract(candidate.title.clone()));
            }
            texts.push(embedding_text(&candidate.title, &candidate.abstract_text));
        }

        let vectors = self.embed_all(&texts).await?;

        let scored = candidates
            .into_iter()
            .zip(vectors)
            .map(|(candidate, vector)| {
                let score = max_weighted_similarity(&vector, corpus_vectors);
                debug!(title = %candidate.title, score, "scored candidate");
                ScoredPaper::new(candidate, score)
            })
            .collect();

        Ok(scored)
    }

    /// Run both rankings of a digest.
    ///
    /// The corpus is encoded once and shared by the fine-grained ranking of
    /// `candidates` (truncated to `max_recommendations`) and the coarse
    /// ranking of `domain_candidates` (truncated to `domain_limit`).
    ///
    /// # Errors
    /// Returns `RecommendError` if encoding or scoring fails; no partial
    /// digest is produced
    pub async fn recommend(
        &self,
        candidates: Vec<CandidatePaper>,
        domain_candidates: Vec<CandidatePaper>,
        corpus: &[CorpusPaper],
    ) -> RecommendResult<Digest> {
        info!(
            corpus = corpus.len(),
            candidates = candidates.len(),
            domain_candidates = domain_candidates.len(),
            "reranking candidate papers"
        );

        let corpus_vectors = self.encode_corpus(corpus).await?;

        let scored = self.score_candidates(candidates, &corpus_vectors).await?;
        let recommendations = rank_papers(scored, self.config.max_recommendations);

        let scored_domain = self
            .score_candidates(domain_candidates, &corpus_vectors)
            .await?;
        let domain_highlights = rank_papers(scored_domain, Some(self.config.domain_limit));

        if let Some(top) = recommendations.first() {
            debug!(title = %top.paper.title, score = top.score, "top recommendation");
        }

        Ok(Digest {
            recommendations,
            domain_highlights,
        })
    }

    /// Embed texts in configured batch sizes.
    async fn embed_all(&self, texts: &[String]) -> RecommendResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.config.batch_size) {
            let refs: Vec<&str> = chunk.iter().map(|s| s.as_str()).collect();
            let batch = self
                .embedding
                .embed_batch(&refs)
                .await
                .map_err(|e| RecommendError::Embedding(e.to_string()))?;
            vectors.extend(batch);
        }

        Ok(vectors)
    }
}
