//! Zotero Web API corpus source.
//!
//! Fetches the user's library through the Zotero v3 API: paginated item
//! listing restricted to paper-like item types, plus the collection tree for
//! resolving human-readable collection paths. Items without an abstract are
//! dropped at this boundary, and collections can be excluded by path prefix.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{CorpusError, CorpusResult, CorpusSource};
use crate::models::CorpusPaper;

/// Default Zotero API base URL.
const DEFAULT_BASE_URL: &str = "https://api.zotero.org";

/// Item types that count as papers.
const PAPER_ITEM_TYPES: &str = "conferencePaper || journalArticle || preprint";

/// Page size for paginated listing requests.
const PAGE_SIZE: usize = 100;

/// Zotero Web API client.
///
/// Wraps the per-user library endpoints. The API key is sent via the
/// `Zotero-API-Key` header on every request.
#[derive(Debug, Clone)]
pub struct ZoteroClient {
    /// HTTP client, reused across requests
    client: reqwest::Client,

    /// API base URL (override for testing)
    base_url: String,

    /// Numeric Zotero user ID
    user_id: String,

    /// Zotero API key
    api_key: String,

    /// Collection path prefixes to exclude from the corpus
    ignored_collections: Vec<String>,
}

/// A collection node of the library tree.
#[derive(Debug, Clone)]
pub struct Collection {
    /// Collection display name
    pub name: String,

    /// Parent collection key, if any
    pub parent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionEnvelope {
    key: String,
    data: CollectionData,
}

#[derive(Debug, Deserialize)]
struct CollectionData {
    name: String,
    // Zotero encodes "no parent" as boolean false, so this cannot be a
    // plain Option<String>.
    #[serde(rename = "parentCollection", default)]
    parent_collection: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ItemEnvelope {
    key: String,
    data: ItemData,
}

#[derive(Debug, Deserialize)]
struct ItemData {
    #[serde(default)]
    title: String,
    #[serde(rename = "abstractNote", default)]
    abstract_note: String,
    #[serde(rename = "dateAdded", default)]
    date_added: String,
    #[serde(default)]
    collections: Vec<String>,
}

impl ZoteroClient {
    /// Create a new Zotero client for a user library.
    pub fn new(user_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_id: user_id.into(),
            api_key: api_key.into(),
            ignored_collections: Vec::new(),
        }
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Exclude items whose resolved collection path starts with any of the
    /// given prefixes (e.g. `"Reading List / Skimmed"`).
    pub fn with_ignored_collections(mut self, prefixes: Vec<String>) -> Self {
        self.ignored_collections = prefixes;
        self
    }

    /// Fetch one page of a listing endpoint.
    async fn fetch_page<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        start: usize,
    ) -> CorpusResult<Vec<T>> {
        let url = format!("{}/users/{}/{}", self.base_url, self.user_id, path);

        let response = self
            .client
            .get(url)
            .header("Zotero-API-Key", &self.api_key)
            .query(query)
            .query(&[("limit", PAGE_SIZE.to_string()), ("start", start.to_string())])
            .send()
            .await
            .map_err(|e| CorpusError::Network(format!("request to {}: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CorpusError::Api(format!("{} returned {}: {}", path, status, body)));
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| CorpusError::Parse(format!("response from {}: {}", path, e)))
    }

    /// Fetch every page of a listing endpoint.
    async fn fetch_all<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> CorpusResult<Vec<T>> {
        let mut items = Vec::new();
        loop {
            let page: Vec<T> = self.fetch_page(path, query, items.len()).await?;
            let page_len = page.len();
            items.extend(page);
            if page_len < PAGE_SIZE {
                break;
            }
        }
        Ok(items)
    }

    /// Fetch the collection tree, keyed by collection key.
    async fn fetch_collections(&self) -> CorpusResult<HashMap<String, Collection>> {
        let envelopes: Vec<CollectionEnvelope> = self.fetch_all("collections", &[]).await?;

        Ok(envelopes
            .into_iter()
            .map(|envelope| {
                let parent = envelope
                    .data
                    .parent_collection
                    .as_str()
                    .map(str::to_string);
                (
                    envelope.key,
                    Collection {
                        name: envelope.data.name,
                        parent,
                    },
                )
            })
            .collect())
    }
}

#[async_trait]
impl CorpusSource for ZoteroClient {
    async fn fetch_corpus(&self) -> CorpusResult<Vec<CorpusPaper>> {
        let collections = self.fetch_collections().await?;
        debug!(collections = collections.len(), "fetched collection tree");

        let items: Vec<ItemEnvelope> = self
            .fetch_all("items", &[("itemType", PAPER_ITEM_TYPES.to_string())])
            .await?;
        debug!(items = items.len(), "fetched library items");

        Ok(corpus_from_items(items, &collections, &self.ignored_collections))
    }
}

/// Resolve the full path of a collection ("Parent / Child / Grandchild").
///
/// The collection tree is external data and not guaranteed acyclic, so the
/// parent chain is walked iteratively with cycle detection. Returns `None`
/// for an unknown key or a cyclic chain.
pub fn collection_path(collections: &HashMap<String, Collection>, key: &str) -> Option<String> {
    let mut segments = Vec::new();
    let mut visited = HashSet::new();
    let mut current = Some(key.to_string());

    while let Some(k) = current {
        if !visited.insert(k.clone()) {
            warn!(collection = %key, "cycle in collection hierarchy");
            return None;
        }
        let node = collections.get(&k)?;
        segments.push(node.name.clone());
        current = node.parent.clone();
    }

    segments.reverse();
    Some(segments.join(" / "))
}

/// Convert raw API items into corpus papers.
///
/// Applies the boundary validation: items with an empty abstract are
/// dropped silently (the upstream contract), items with an unparseable
/// `dateAdded` are dropped with a warning, and items belonging to an
/// ignored collection are excluded.
fn corpus_from_items(
    items: Vec<ItemEnvelope>,
    collections: &HashMap<String, Collection>,
    ignored: &[String],
) -> Vec<CorpusPaper> {
    let mut corpus = Vec::new();

    for envelope in items {
        let data = envelope.data;
        if data.abstract_note.trim().is_empty() {
            continue;
        }

        if !ignored.is_empty() {
            let in_ignored = data.collections.iter().any(|key| {
                collection_path(collections, key)
                    .map(|path| ignored.iter().any(|prefix| path.starts_with(prefix.as_str())))
                    .unwrap_or(false)
            });
            if in_ignored {
                debug!(item = %envelope.key, "skipping item in ignored collection");
                continue;
            }
        }

        let date_added = match DateTime::parse_from_rfc3339(&data.date_added) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(e) => {
                warn!(item = %envelope.key, error = %e, "skipping item with invalid dateAdded");
                continue;
            }
        };

        corpus.push(CorpusPaper {
            key: envelope.key,
            title: data.title,
            abstract_text: data.abstract_note,
            date_added,
        });
    }

    corpus
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(name: &str, parent: Option<&str>) -> Collection {
        Collection {
            name: name.to_string(),
            parent: parent.map(str::to_string),
        }
    }

    fn item(key: &str, title: &str, abstract_note: &str, date_added: &str) -> ItemEnvelope {
        ItemEnvelope {
            key: key.to_string(),
            data: ItemData {
                title: title.to_string(),
                abstract_note: abstract_note.to_string(),
                date_added: date_added.to_string(),
                collections: Vec::new(),
            },
        }
    }

    #[test]
    fn test_collection_path_walks_parent_chain() {
        let mut collections = HashMap::new();
        collections.insert("root".to_string(), collection("ML", None));
        collections.insert("mid".to_string(), collection("Vision", Some("root")));
        collections.insert("leaf".to_string(), collection("Detection", Some("mid")));

        assert_eq!(
            collection_path(&collections, "leaf").as_deref(),
            Some("ML / Vision / Detection")
        );
        assert_eq!(collection_path(&collections, "root").as_deref(), Some("ML"));
    }

    #[test]
    fn test_collection_path_detects_cycles() {
        let mut collections = HashMap::new();
        collections.insert("a".to_string(), collection("A", Some("b")));
        collections.insert("b".to_string(), collection("B", Some("a")));

        assert_eq!(collection_path(&collections, "a"), None);
    }

    #[test]
    fn test_collection_path_unknown_key() {
        let collections = HashMap::new();
        assert_eq!(collection_path(&collections, "missing"), None);
    }

    #[test]
    fn test_corpus_from_items_filters_empty_abstracts() {
        let items = vec![
            item("k1", "Kept", "Has an abstract.", "2024-03-01T10:00:00Z"),
            item("k2", "Dropped", "   ", "2024-03-02T10:00:00Z"),
        ];

        let corpus = corpus_from_items(items, &HashMap::new(), &[]);

        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus[0].key, "k1");
        assert_eq!(corpus[0].title, "Kept");
    }

    #[test]
    fn test_corpus_from_items_skips_invalid_dates() {
        let items = vec![
            item("k1", "Good", "Abstract.", "2024-03-01T10:00:00Z"),
            item("k2", "Bad Date", "Abstract.", "yesterday"),
        ];

        let corpus = corpus_from_items(items, &HashMap::new(), &[]);

        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus[0].key, "k1");
    }

    #[test]
    fn test_corpus_from_items_applies_ignored_collections() {
        let mut collections = HashMap::new();
        collections.insert("root".to_string(), collection("Archive", None));
        collections.insert("sub".to_string(), collection("Old Reads", Some("root")));

        let mut ignored_item = item("k1", "Archived", "Abstract.", "2024-03-01T10:00:00Z");
        ignored_item.data.collections = vec!["sub".to_string()];
        let kept_item = item("k2", "Fresh", "Abstract.", "2024-03-01T10:00:00Z");

        let corpus = corpus_from_items(
            vec![ignored_item, kept_item],
            &collections,
            &["Archive".to_string()],
        );

        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus[0].key, "k2");
    }

    #[test]
    fn test_item_envelope_deserialization() {
        let json = r#"{
            "key": "ABCD1234",
            "data": {
                "title": "Vision Transformers",
                "abstractNote": "We study transformers.",
                "dateAdded": "2024-05-12T08:30:00Z",
                "collections": ["XYZ"]
            }
        }"#;

        let envelope: ItemEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.key, "ABCD1234");
        assert_eq!(envelope.data.abstract_note, "We study transformers.");
        assert_eq!(envelope.data.collections, vec!["XYZ".to_string()]);
    }

    #[test]
    fn test_collection_envelope_parent_false_means_root() {
        let json = r#"{
            "key": "ROOT",
            "data": { "name": "Top", "parentCollection": false }
        }"#;

        let envelope: CollectionEnvelope = serde_json::from_str(json).unwrap();
        assert!(envelope.data.parent_collection.as_str().is_none());

        let json = r#"{
            "key": "CHILD",
            "data": { "name": "Nested", "parentCollection": "ROOT" }
        }"#;

        let envelope: CollectionEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.data.parent_collection.as_str(), Some("ROOT"));
    }
}
