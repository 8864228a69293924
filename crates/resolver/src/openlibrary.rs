//! Open Library book catalog client.
//!
//! Two lookup paths: a direct ISBN cover probe (Open Library serves a 1×1
//! placeholder when it has no cover, so a real cover is detected by
//! response size), and the search API for free-text queries.

use async_trait::async_trait;
use tracing::debug;

use medialog_core::error::AuthError;
use medialog_core::types::{MediaMetadata, TitleHints};

use crate::provider::{ProviderClient, SearchCandidate, SearchOutcome};

const SEARCH_URL: &str = "https://openlibrary.org/search.json";
const COVERS_BASE: &str = "https://covers.openlibrary.org/b";

/// Anything smaller is the placeholder image, not a cover.
const MIN_COVER_BYTES: u64 = 1024;

pub struct OpenLibraryClient {
    http: reqwest::Client,
}

impl OpenLibraryClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ProviderClient for OpenLibraryClient {
    fn name(&self) -> &str {
        "openlibrary"
    }

    async fn search(
        &self,
        query: &str,
        hints: &TitleHints,
    ) -> Result<SearchOutcome, AuthError> {
        let q = match hints.author.as_deref() {
            Some(author) => format!("{query} {author}"),
            None => query.to_string(),
        };
        debug!(query = %q, "Open Library search");

        let resp = match self
            .http
            .get(SEARCH_URL)
            .query(&[("q", q.as_str()), ("limit", "5")])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return Ok(SearchOutcome::Transient(e.to_string())),
        };

        if !resp.status().is_success() {
            return Ok(SearchOutcome::Transient(format!(
                "Open Library returned {}",
                resp.status()
            )));
        }

        let payload: serde_json::Value = match resp.json().await {
            Ok(p) => p,
            Err(e) => return Ok(SearchOutcome::Transient(format!("parse JSON: {e}"))),
        };

        let candidates = parse_search_docs(&payload);
        if candidates.is_empty() {
            return Ok(SearchOutcome::NoMatch);
        }
        Ok(SearchOutcome::Found(candidates))
    }

    async fn lookup_isbn(&self, isbn: &str) -> Result<SearchOutcome, AuthError> {
        let url = format!("{COVERS_BASE}/isbn/{isbn}-L.jpg");
        debug!(url = %url, "Open Library ISBN cover probe");

        let resp = match self.http.head(&url).send().await {
            Ok(resp) => resp,
            Err(e) => return Ok(SearchOutcome::Transient(e.to_string())),
        };

        if !resp.status().is_success() {
            return Ok(SearchOutcome::NoMatch);
        }
        match resp.content_length() {
            Some(len) if len > MIN_COVER_BYTES => Ok(SearchOutcome::Found(vec![SearchCandidate {
                name: isbn.to_string(),
                cover_url: Some(url),
                metadata: None,
            }])),
            _ => Ok(SearchOutcome::NoMatch),
        }
    }
}

fn parse_search_docs(payload: &serde_json::Value) -> Vec<SearchCandidate> {
    let docs = payload["docs"].as_array().cloned().unwrap_or_default();
    docs.iter()
        .filter_map(|doc| {
            let name = doc["title"].as_str()?.to_string();
            Some(SearchCandidate {
                name,
                cover_url: doc["cover_i"]
                    .as_u64()
                    .map(|id| format!("{COVERS_BASE}/id/{id}-L.jpg")),
                metadata: Some(MediaMetadata {
                    year: doc["first_publish_year"].as_i64().map(|y| y as i32),
                    authors: doc["author_name"].as_array().map(|authors| {
                        authors
                            .iter()
                            .filter_map(|a| a.as_str().map(|s| s.to_string()))
                            .collect()
                    }),
                    ..Default::default()
                }),
            })
        })
        .collect()
}
