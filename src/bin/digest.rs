//! Digest binary entry point.
//!
//! Runs one full digest: fetch the Zotero corpus, retrieve fresh arXiv
//! candidates (optionally widened by an LLM-derived keyword query), rerank
//! both candidate pools against the corpus, and print the results as a table
//! or JSON.
//!
//! # Examples
//!
//! Daily digest with local embeddings:
//! ```bash
//! ZOTERO_API_KEY=... digest --zotero-id 1234567 --arxiv-query "cat:cs.CV" --max-papers 15
//! ```
//!
//! With a keyword-derived second pass and domain highlights:
//! ```bash
//! ZOTERO_API_KEY=... OPENAI_API_KEY=sk-... digest \
//!     --zotero-id 1234567 --arxiv-query "cat:cs.CV" \
//!     --use-llm-keywords --domain "cat:cs.LG" --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use indicatif::ProgressBar;
use paper_digest::{
    corpus::{zotero::ZoteroClient, CorpusSource},
    embedding::{fastembed::FastEmbedProvider, openai::OpenAIEmbedding, EmbeddingProvider},
    keywords::{build_query, openai::OpenAIKeywordGenerator, KeywordGenerator},
    models::{CandidatePaper, Digest, ScoredPaper},
    provider::{arxiv::ArxivClient, CandidateSource},
    recommend::{merge_unique, Recommender, RecommenderConfig},
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How many candidates to request per retrieval pass when no explicit
/// recommendation cap is set.
const DEFAULT_FETCH_LIMIT: usize = 30;

/// Wrapper enum for embedding providers to allow dynamic dispatch
enum DynamicEmbeddingProvider {
    FastEmbed(FastEmbedProvider),
    OpenAI(OpenAIEmbedding),
}

#[async_trait::async_trait]
impl EmbeddingProvider for DynamicEmbeddingProvider {
    async fn embed(&self, text: &str) -> paper_digest::embedding::EmbeddingResult<Vec<f32>> {
        match self {
            DynamicEmbeddingProvider::FastEmbed(p) => p.embed(text).await,
            DynamicEmbeddingProvider::OpenAI(p) => p.embed(text).await,
        }
    }

    async fn embed_batch(
        &self,
        texts: &[&str],
    ) -> paper_digest::embedding::EmbeddingResult<Vec<Vec<f32>>> {
        match self {
            DynamicEmbeddingProvider::FastEmbed(p) => p.embed_batch(texts).await,
            DynamicEmbeddingProvider::OpenAI(p) => p.embed_batch(texts).await,
        }
    }

    fn dimension(&self) -> usize {
        match self {
            DynamicEmbeddingProvider::FastEmbed(p) => p.dimension(),
            DynamicEmbeddingProvider::OpenAI(p) => p.dimension(),
        }
    }

    fn model_name(&self) -> &str {
        match self {
            DynamicEmbeddingProvider::FastEmbed(p) => p.model_name(),
            DynamicEmbeddingProvider::OpenAI(p) => p.model_name(),
        }
    }
}

/// Embedding provider type
#[derive(Debug, Clone, ValueEnum)]
enum EmbeddingProviderType {
    /// Local fastembed model (default, no API key required)
    FastEmbed,
    /// OpenAI embedding API (requires OPENAI_API_KEY)
    OpenAI,
}

/// Output format for the digest
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-friendly tables with score-colored relevance
    Table,
    /// Machine-readable JSON
    Json,
}

/// Digest CLI: rerank new arXiv papers against a Zotero library
#[derive(Parser, Debug)]
#[command(
    name = "digest",
    version,
    about = "Recommend newly published arXiv papers based on your Zotero library",
    long_about = "Fetches your Zotero library, retrieves fresh arXiv submissions, and ranks \
                  them by semantic similarity to the papers you already collect.

EXAMPLES:
  Daily digest:
    ZOTERO_API_KEY=... digest --zotero-id 1234567 --arxiv-query \"cat:cs.CV\" --max-papers 15

  Keyword-widened retrieval plus domain highlights:
    ZOTERO_API_KEY=... OPENAI_API_KEY=sk-... digest --zotero-id 1234567 \\
        --arxiv-query \"cat:cs.CV\" --use-llm-keywords --domain \"cat:cs.LG\"

  JSON output for downstream rendering:
    digest --zotero-id 1234567 --arxiv-query \"cat:cs.CV\" --format json"
)]
struct Args {
    /// Zotero user ID (API key is read from ZOTERO_API_KEY)
    #[arg(long, value_name = "ID")]
    zotero_id: String,

    /// Collection path prefixes to exclude from the corpus
    #[arg(long, value_name = "PATH", value_delimiter = ',')]
    zotero_ignore: Vec<String>,

    /// Primary arXiv search query
    #[arg(long, value_name = "QUERY")]
    arxiv_query: String,

    /// Domain query for the coarse-grained highlight list
    #[arg(long, value_name = "QUERY")]
    domain: Option<String>,

    /// Maximum number of recommendations (0 = keep all)
    #[arg(long, value_name = "N", default_value = "10")]
    max_papers: usize,

    /// Number of domain highlights to keep
    #[arg(long, value_name = "N", default_value = "2")]
    domain_limit: usize,

    /// Derive a second retrieval pass from LLM-generated keywords
    /// (requires OPENAI_API_KEY)
    #[arg(long)]
    use_llm_keywords: bool,

    /// Maximum number of generated keywords
    #[arg(long, value_name = "N", default_value = "5")]
    max_keywords: usize,

    /// Chat model for keyword generation
    #[arg(long, value_name = "MODEL")]
    model_name: Option<String>,

    /// Embedding provider
    #[arg(long, value_enum, default_value = "fast-embed")]
    embedding_provider: EmbeddingProviderType,

    /// Embedding model name (provider-specific; optional)
    #[arg(long, value_name = "MODEL")]
    embedding_model: Option<String>,

    /// FastEmbed model cache directory
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Per-day time-decay rate for corpus weights, in (0, 1)
    #[arg(long, value_name = "RATE", default_value_t = paper_digest::DEFAULT_DECAY_RATE)]
    decay_rate: f32,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Produce (empty) output even when no candidates were found
    #[arg(long)]
    allow_empty: bool,

    /// Logging verbosity level
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    log_level: String,
}

/// Setup logging with the specified level
fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}

/// Spinner shown while a pipeline stage runs.
fn stage_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Instantiate the configured embedding provider.
fn create_embedding_provider(args: &Args) -> Result<DynamicEmbeddingProvider> {
    match args.embedding_provider {
        EmbeddingProviderType::FastEmbed => {
            let cache_dir = args
                .cache_dir
                .as_ref()
                .map(|dir| dir.to_string_lossy().to_string());
            let provider = FastEmbedProvider::new(None, cache_dir)
                .context("Failed to initialize FastEmbed provider")?;
            Ok(DynamicEmbeddingProvider::FastEmbed(provider))
        }
        EmbeddingProviderType::OpenAI => {
            let api_key = std::env::var("OPENAI_API_KEY").context(
                "OPENAI_API_KEY environment variable required for OpenAI embeddings.\n\
                 Set it with: export OPENAI_API_KEY=your-api-key",
            )?;
            Ok(DynamicEmbeddingProvider::OpenAI(OpenAIEmbedding::new(
                api_key,
                args.embedding_model.clone(),
            )))
        }
    }
}

/// Retrieve the fine-grained candidate pool (primary pass plus the optional
/// keyword-derived pass), deduplicated.
async fn fetch_candidates(
    arxiv: &ArxivClient,
    args: &Args,
    corpus: &[paper_digest::models::CorpusPaper],
    fetch_limit: usize,
) -> Result<Vec<CandidatePaper>> {
    let mut passes = Vec::new();

    let primary = arxiv
        .search(&args.arxiv_query, fetch_limit)
        .await
        .with_context(|| format!("arXiv search failed for query '{}'", args.arxiv_query))?;
    info!(count = primary.len(), query = %args.arxiv_query, "primary retrieval pass");
    passes.push(primary);

    if args.use_llm_keywords {
        let api_key = std::env::var("OPENAI_API_KEY").context(
            "OPENAI_API_KEY environment variable required for --use-llm-keywords",
        )?;
        let generator = OpenAIKeywordGenerator::new(api_key, args.model_name.clone());

        let keywords = generator
            .generate(corpus, args.max_keywords)
            .await
            .context("keyword generation failed")?;
        let keyword_query = build_query(&keywords, args.max_keywords);

        if keyword_query.is_empty() {
            warn!("keyword generation produced no usable query; skipping second pass");
        } else {
            debug!(query = %keyword_query, "keyword retrieval pass");
            let keyword_pass = arxiv
                .search(&keyword_query, fetch_limit)
                .await
                .with_context(|| format!("arXiv search failed for query '{}'", keyword_query))?;
            info!(count = keyword_pass.len(), "keyword retrieval pass");
            passes.push(keyword_pass);
        }
    }

    Ok(merge_unique(passes))
}

/// Human label for a relevance score, used in table output.
fn relevance_label(score: f32) -> (&'static str, Color) {
    if score >= 0.75 {
        ("VERY CLOSE", Color::Green)
    } else if score >= 0.5 {
        ("CLOSE", Color::Cyan)
    } else if score >= 0.3 {
        ("RELATED", Color::Yellow)
    } else {
        ("EXPLORATORY", Color::White)
    }
}

/// Format one ranked list as a table.
fn format_table(papers: &[ScoredPaper]) -> String {
    if papers.is_empty() {
        return "No papers.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Rank").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Submitted").add_attribute(Attribute::Bold),
        Cell::new("Source query").add_attribute(Attribute::Bold),
        Cell::new("Relevance").add_attribute(Attribute::Bold),
        Cell::new("Score").add_attribute(Attribute::Bold),
    ]);

    for (idx, scored) in papers.iter().enumerate() {
        let title_display = if scored.paper.title.chars().count() > 70 {
            let prefix: String = scored.paper.title.chars().take(67).collect();
            format!("{}...", prefix)
        } else {
            scored.paper.title.clone()
        };

        let (label, color) = relevance_label(scored.score);

        table.add_row(vec![
            Cell::new(format!("{}", idx + 1)),
            Cell::new(title_display),
            Cell::new(scored.paper.submitted.format("%Y-%m-%d").to_string()),
            Cell::new(&scored.paper.source_query),
            Cell::new(scored.label.as_deref().unwrap_or(label)).fg(color),
            Cell::new(format!("{:.4}", scored.score)),
        ]);
    }

    table.to_string()
}

/// Print the digest in the requested format.
fn render_digest(digest: &Digest, format: &OutputFormat, has_domain: bool) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("Recommendations");
            println!("{}", format_table(&digest.recommendations));
            if has_domain {
                println!("\nDomain highlights");
                println!("{}", format_table(&digest.domain_highlights));
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(digest)
                .context("Failed to serialize digest to JSON")?;
            println!("{}", json);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_level);

    if !(args.decay_rate > 0.0 && args.decay_rate < 1.0) {
        anyhow::bail!(
            "Invalid --decay-rate {}: must be strictly between 0 and 1",
            args.decay_rate
        );
    }

    let zotero_key = std::env::var("ZOTERO_API_KEY").context(
        "ZOTERO_API_KEY environment variable required.\n\
         Create a key at https://www.zotero.org/settings/keys",
    )?;

    // Stage 1: reference corpus
    let zotero = ZoteroClient::new(args.zotero_id.clone(), zotero_key)
        .with_ignored_collections(args.zotero_ignore.clone());

    let spinner = stage_spinner("Retrieving Zotero corpus...");
    let corpus = zotero
        .fetch_corpus()
        .await
        .context("Failed to retrieve the Zotero corpus")?;
    spinner.finish_and_clear();
    info!(papers = corpus.len(), "retrieved Zotero corpus");

    if corpus.is_empty() {
        warn!("corpus is empty; every candidate will score 0.0");
    }

    // Stage 2: candidate retrieval
    let fetch_limit = if args.max_papers == 0 {
        DEFAULT_FETCH_LIMIT
    } else {
        args.max_papers
    };

    let arxiv = ArxivClient::new();

    let spinner = stage_spinner("Retrieving arXiv candidates...");
    let candidates = fetch_candidates(&arxiv, &args, &corpus, fetch_limit).await?;

    let domain_candidates = match &args.domain {
        Some(domain_query) => arxiv
            .search(domain_query, fetch_limit)
            .await
            .with_context(|| format!("arXiv search failed for domain query '{}'", domain_query))?,
        None => Vec::new(),
    };
    spinner.finish_and_clear();

    if candidates.is_empty() && domain_candidates.is_empty() {
        // A quiet day on arXiv (or a query typo). Nothing to rank.
        warn!("no new papers found for the configured queries");
        if !args.allow_empty {
            anyhow::bail!(
                "No new papers found. Check --arxiv-query, or pass --allow-empty \
                 to emit an empty digest."
            );
        }
        return render_digest(&Digest::default(), &args.format, args.domain.is_some());
    }

    info!(
        candidates = candidates.len(),
        domain_candidates = domain_candidates.len(),
        "retrieved candidate papers"
    );

    // Stage 3: rerank
    let embedding = create_embedding_provider(&args)?;
    debug!(model = embedding.model_name(), dimension = embedding.dimension(), "embedding provider ready");

    let config = RecommenderConfig {
        decay_rate: args.decay_rate,
        max_recommendations: if args.max_papers == 0 {
            None
        } else {
            Some(args.max_papers)
        },
        domain_limit: args.domain_limit,
        ..RecommenderConfig::default()
    };
    let recommender =
        Recommender::new(embedding, config).context("Failed to configure the recommender")?;

    let spinner = stage_spinner("Scoring candidates against the corpus...");
    let mut digest = recommender
        .recommend(candidates, domain_candidates, &corpus)
        .await
        .context("Reranking failed")?;
    spinner.finish_and_clear();

    // Attach display labels for downstream consumers.
    for scored in digest
        .recommendations
        .iter_mut()
        .chain(digest.domain_highlights.iter_mut())
    {
        let (label, _) = relevance_label(scored.score);
        scored.label = Some(label.to_string());
    }

    render_digest(&digest, &args.format, args.domain.is_some())
}
