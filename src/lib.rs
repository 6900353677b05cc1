//! Paper Digest - a personalized recommender for newly published arXiv papers.
//!
//! This library compares freshly submitted papers against a reference corpus
//! (the user's Zotero library) and ranks them by semantic relevance, so the
//! most interesting new work surfaces first.
//!
//! # Architecture
//!
//! The system is organized into several key modules:
//!
//! - **models**: Core data structures (CorpusPaper, CandidatePaper, ScoredPaper, Digest)
//! - **embedding**: Text embedding generation behind a provider trait
//! - **corpus**: Reference library retrieval (Zotero Web API)
//! - **provider**: Candidate retrieval (arXiv export API)
//! - **keywords**: LLM-assisted search keyword generation
//! - **recommend**: The reranking engine (scoring, ranking, deduplication)
//!
//! # Workflow
//!
//! 1. Fetch the reference corpus from Zotero (empty abstracts filtered out)
//! 2. Fetch candidates from arXiv for the configured query, and optionally
//!    for an LLM-derived keyword query; merge the passes with stable
//!    title-based deduplication
//! 3. Encode corpus and candidates into the same embedding space
//! 4. Score each candidate by its maximum recency-weighted cosine similarity
//!    against the corpus
//! 5. Produce two independently truncated rankings: the personalized
//!    recommendation list and a small domain highlight list
//!
//! # Example
//!
//! ```ignore
//! use paper_digest::{
//!     corpus::{zotero::ZoteroClient, CorpusSource},
//!     embedding::fastembed::FastEmbedProvider,
//!     provider::{arxiv::ArxivClient, CandidateSource},
//!     recommend::{Recommender, RecommenderConfig},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let corpus = ZoteroClient::new(zotero_id, zotero_key).fetch_corpus().await?;
//!     let candidates = ArxivClient::new().search("cat:cs.CV", 30).await?;
//!
//!     let embedding = FastEmbedProvider::default()?;
//!     let recommender = Recommender::new(embedding, RecommenderConfig::default())?;
//!     let digest = recommender.recommend(candidates, Vec::new(), &corpus).await?;
//!
//!     for paper in digest.recommendations {
//!         println!("{:.4}  {}", paper.score, paper.paper.title);
//!     }
//!     Ok(())
//! }
//! ```

// Public modules
pub mod corpus;
pub mod embedding;
pub mod keywords;
pub mod models;
pub mod provider;
pub mod recommend;

// Re-export commonly used types at the crate root
pub use corpus::CorpusSource;
pub use embedding::EmbeddingProvider;
pub use models::{CandidatePaper, CorpusPaper, Digest, ScoredPaper};
pub use provider::CandidateSource;
pub use recommend::{Recommender, RecommenderConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default time-decay rate applied per day of corpus-item age
pub const DEFAULT_DECAY_RATE: f32 = 0.95;

/// Default number of coarse-grained domain highlights per digest
pub const DEFAULT_DOMAIN_LIMIT: usize = 2;
