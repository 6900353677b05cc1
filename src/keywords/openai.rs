//! OpenAI chat-based keyword generator.
//!
//! Asks a chat model for search keywords that summarize the user's recent
//! interests, based on the most recently added corpus titles. This is a thin
//! collaborator: prompt in, comma-separated keywords out.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{KeywordError, KeywordGenerator, KeywordResult};
use crate::models::CorpusPaper;

/// Default API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// How many of the most recently added corpus titles go into the prompt.
const PROMPT_TITLE_LIMIT: usize = 50;

/// OpenAI chat completion keyword generator.
#[derive(Debug, Clone)]
pub struct OpenAIKeywordGenerator {
    /// HTTP client, reused across requests
    client: reqwest::Client,

    /// OpenAI API key
    api_key: String,

    /// API base URL (override for compatible endpoints)
    base_url: String,

    /// Chat model identifier
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAIKeywordGenerator {
    /// Create a new keyword generator.
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `model` - Chat model name (defaults to "gpt-4o-mini" if None)
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
        }
    }

    /// Override the API base URL (for OpenAI-compatible endpoints).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl KeywordGenerator for OpenAIKeywordGenerator {
    async fn generate(
        &self,
        corpus: &[CorpusPaper],
        max_keywords: usize,
    ) -> KeywordResult<Vec<String>> {
        if corpus.is_empty() || max_keywords == 0 {
            return Ok(Vec::new());
        }

        let prompt = build_prompt(corpus, max_keywords);
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.2,
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| KeywordError::Api(format!("send chat request: {}", e)))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|e| KeywordError::Api(format!("read chat response: {}", e)))?;

        if !status.is_success() {
            return Err(KeywordError::Api(format!(
                "chat API error: {} {}",
                status, payload
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&payload)
            .map_err(|e| KeywordError::BadResponse(format!("parse chat response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| KeywordError::BadResponse("chat response has no choices".to_string()))?;

        let keywords = parse_keywords(&content, max_keywords);
        if keywords.is_empty() {
            return Err(KeywordError::BadResponse(format!(
                "no keywords in model output: {:?}",
                content
            )));
        }

        debug!(?keywords, "generated search keywords");
        Ok(keywords)
    }
}

/// Build the keyword prompt from the most recently added corpus titles.
fn build_prompt(corpus: &[CorpusPaper], max_keywords: usize) -> String {
    let mut recent: Vec<&CorpusPaper> = corpus.iter().collect();
    recent.sort_by_key(|paper| std::cmp::Reverse(paper.date_added));

    let titles = recent
        .iter()
        .take(PROMPT_TITLE_LIMIT)
        .map(|paper| format!("- {}", paper.title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "The following are titles of research papers a reader recently saved:\n\
         {titles}\n\n\
         Reply with up to {max_keywords} short search keywords capturing the \
         reader's current research interests, one per line, no numbering and \
         no extra commentary."
    )
}

/// Extract keywords from model output.
///
/// Accepts one-per-line or comma-separated output, tolerates bullet markers
/// and surrounding quotes, and deduplicates while preserving order.
fn parse_keywords(content: &str, max_keywords: usize) -> Vec<String> {
    let mut keywords = Vec::new();

    for piece in content.split(|c| c == '\n' || c == ',') {
        let keyword = piece
            .trim()
            .trim_start_matches(['-', '*', '•'])
            .trim()
            .trim_matches('"')
            .trim();
        if keyword.is_empty() {
            continue;
        }
        let keyword = keyword.to_string();
        if !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
        if keywords.len() == max_keywords {
            break;
        }
    }

    keywords
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn paper(title: &str, day: u32) -> CorpusPaper {
        CorpusPaper {
            key: title.to_string(),
            title: title.to_string(),
            abstract_text: "Abstract.".to_string(),
            date_added: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_parse_keywords_lines_and_bullets() {
        let content = "- vision transformers\n* diffusion models\n  \"3d reconstruction\"  \n";
        assert_eq!(
            parse_keywords(content, 5),
            vec!["vision transformers", "diffusion models", "3d reconstruction"]
        );
    }

    #[test]
    fn test_parse_keywords_comma_separated_and_deduped() {
        let content = "nerf, gaussian splatting, nerf, slam";
        assert_eq!(
            parse_keywords(content, 5),
            vec!["nerf", "gaussian splatting", "slam"]
        );
    }

    #[test]
    fn test_parse_keywords_respects_max() {
        let content = "a\nb\nc\nd";
        assert_eq!(parse_keywords(content, 2), vec!["a", "b"]);
    }

    #[test]
    fn test_build_prompt_prefers_recent_titles() {
        let corpus = vec![paper("Oldest", 1), paper("Newest", 20), paper("Middle", 10)];
        let prompt = build_prompt(&corpus, 3);

        let newest = prompt.find("Newest").unwrap();
        let middle = prompt.find("Middle").unwrap();
        let oldest = prompt.find("Oldest").unwrap();
        assert!(newest < middle && middle < oldest);
    }
}
