//! arXiv export API candidate source.
//!
//! Queries the arXiv Atom endpoint sorted by submission date descending and
//! parses entries into candidate papers. Atom text nodes wrap titles and
//! abstracts across lines, so both are whitespace-collapsed before use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

use super::{CandidateSource, ProviderError, ProviderResult};
use crate::models::CandidatePaper;

/// Default arXiv API endpoint.
const DEFAULT_BASE_URL: &str = "http://export.arxiv.org/api/query";

/// arXiv API client.
#[derive(Debug, Clone)]
pub struct ArxivClient {
    /// HTTP client, reused across requests
    client: reqwest::Client,

    /// Query endpoint URL (override for testing)
    base_url: String,
}

impl ArxivClient {
    /// Create a new arXiv client against the public export endpoint.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the endpoint URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandidateSource for ArxivClient {
    async fn search(&self, query: &str, max_results: usize) -> ProviderResult<Vec<CandidatePaper>> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", query),
                ("start", "0"),
                ("max_results", &max_results.to_string()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("arXiv query request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api(format!("arXiv returned {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("read arXiv response: {}", e)))?;

        let candidates = parse_feed(&body, query)?;
        debug!(query, count = candidates.len(), "fetched arXiv candidates");
        Ok(candidates)
    }
}

/// Collapse runs of whitespace (including the line wrapping Atom inserts)
/// into single spaces.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an arXiv Atom feed into candidate papers.
///
/// Entries without a parseable `published` timestamp are skipped with a
/// warning; feed order (newest-first for our queries) is preserved. Every
/// candidate is tagged with the query that produced it.
pub fn parse_feed(xml: &str, source_query: &str) -> ProviderResult<Vec<CandidatePaper>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut candidates = Vec::new();

    let mut in_entry = false;
    let mut field: Option<&'static str> = None;
    let mut title = String::new();
    let mut summary = String::new();
    let mut published = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"entry" => {
                    in_entry = true;
                    title.clear();
                    summary.clear();
                    published.clear();
                }
                b"title" if in_entry => field = Some("title"),
                b"summary" if in_entry => field = Some("summary"),
                b"published" if in_entry => field = Some("published"),
                _ => {}
            },
            Ok(Event::Text(text)) => {
                if let Some(name) = field {
                    let chunk = text
                        .unescape()
                        .map_err(|e| ProviderError::Parse(format!("feed text: {}", e)))?;
                    match name {
                        "title" => title.push_str(&chunk),
                        "summary" => summary.push_str(&chunk),
                        "published" => published.push_str(&chunk),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"entry" => {
                    in_entry = false;
                    match DateTime::parse_from_rfc3339(published.trim()) {
                        Ok(submitted) => candidates.push(CandidatePaper {
                            title: collapse_whitespace(&title),
                            abstract_text: collapse_whitespace(&summary),
                            submitted: submitted.with_timezone(&Utc),
                            source_query: source_query.to_string(),
                        }),
                        Err(e) => {
                            warn!(title = %collapse_whitespace(&title), error = %e,
                                "skipping entry with invalid published date");
                        }
                    }
                }
                b"title" | b"summary" | b"published" => field = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ProviderError::Parse(format!("feed XML: {}", e))),
            _ => {}
        }
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query Results</title>
  <entry>
    <id>http://arxiv.org/abs/2401.11111v1</id>
    <published>2024-01-20T18:59:59Z</published>
    <title>Vision Transformers
 for Dense Detection</title>
    <summary>We study vision transformers
 applied to detection tasks.</summary>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2401.22222v1</id>
    <published>2024-01-19T12:00:00Z</published>
    <title>A Second Paper</title>
    <summary>Another abstract.</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed_extracts_entries_in_order() {
        let candidates = parse_feed(FEED, "cat:cs.CV").unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].title, "Vision Transformers for Dense Detection");
        assert_eq!(
            candidates[0].abstract_text,
            "We study vision transformers applied to detection tasks."
        );
        assert_eq!(candidates[1].title, "A Second Paper");
        assert!(candidates[0].submitted > candidates[1].submitted);
    }

    #[test]
    fn test_parse_feed_tags_source_query() {
        let candidates = parse_feed(FEED, "all:\"diffusion\"").unwrap();
        assert!(candidates
            .iter()
            .all(|c| c.source_query == "all:\"diffusion\""));
    }

    #[test]
    fn test_parse_feed_ignores_feed_level_title() {
        let candidates = parse_feed(FEED, "q").unwrap();
        assert!(candidates.iter().all(|c| c.title != "ArXiv Query Results"));
    }

    #[test]
    fn test_parse_feed_skips_entry_without_published() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>No Date</title>
    <summary>Missing published element.</summary>
  </entry>
  <entry>
    <published>2024-01-19T12:00:00Z</published>
    <title>Dated</title>
    <summary>Fine.</summary>
  </entry>
</feed>"#;

        let candidates = parse_feed(xml, "q").unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Dated");
    }

    #[test]
    fn test_parse_feed_empty() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"></feed>"#;
        assert!(parse_feed(xml, "q").unwrap().is_empty());
    }

    #[test]
    fn test_parse_feed_unescapes_entities() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <published>2024-01-19T12:00:00Z</published>
    <title>Alignment &amp; Safety</title>
    <summary>On A &lt; B comparisons.</summary>
  </entry>
</feed>"#;

        let candidates = parse_feed(xml, "q").unwrap();
        assert_eq!(candidates[0].title, "Alignment & Safety");
        assert_eq!(candidates[0].abstract_text, "On A < B comparisons.");
    }
}
