//! Google Books volumes catalog client.
//!
//! Free-text queries use the `intitle:`/`inauthor:` qualifiers; an ISBN
//! hint switches to the unambiguous `isbn:` form. Thumbnail URLs are
//! upgraded to the larger zoom level and forced onto https.

use async_trait::async_trait;
use tracing::debug;

use medialog_core::error::AuthError;
use medialog_core::types::{MediaMetadata, TitleHints};

use crate::provider::{ProviderClient, SearchCandidate, SearchOutcome};

const VOLUMES_URL: &str = "https://www.googleapis.com/books/v1/volumes";

pub struct GoogleBooksClient {
    api_key: Option<String>,
    http: reqwest::Client,
}

impl GoogleBooksClient {
    pub fn new(api_key: Option<String>, http: reqwest::Client) -> Self {
        Self { api_key, http }
    }

    async fn volumes(&self, q: String) -> Result<SearchOutcome, AuthError> {
        debug!(q = %q, "Google Books request");
        let mut params = vec![("q", q.as_str()), ("maxResults", "5")];
        if let Some(key) = self.api_key.as_deref() {
            params.push(("key", key));
        }

        let resp = match self.http.get(VOLUMES_URL).query(&params).send().await {
            Ok(resp) => resp,
            Err(e) => return Ok(SearchOutcome::Transient(e.to_string())),
        };

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AuthError::Rejected(format!(
                "Google Books rejected the API key ({status})"
            )));
        }
        if !status.is_success() {
            return Ok(SearchOutcome::Transient(format!(
                "Google Books returned {status}"
            )));
        }

        let payload: serde_json::Value = match resp.json().await {
            Ok(p) => p,
            Err(e) => return Ok(SearchOutcome::Transient(format!("parse JSON: {e}"))),
        };

        let candidates = parse_volumes(&payload);
        if candidates.is_empty() {
            return Ok(SearchOutcome::NoMatch);
        }
        Ok(SearchOutcome::Found(candidates))
    }
}

#[async_trait]
impl ProviderClient for GoogleBooksClient {
    fn name(&self) -> &str {
        "googlebooks"
    }

    async fn search(
        &self,
        query: &str,
        hints: &TitleHints,
    ) -> Result<SearchOutcome, AuthError> {
        let mut q = format!("intitle:{query}");
        if let Some(author) = hints.author.as_deref() {
            q.push_str(&format!(" inauthor:{author}"));
        }
        self.volumes(q).await
    }

    async fn lookup_isbn(&self, isbn: &str) -> Result<SearchOutcome, AuthError> {
        self.volumes(format!("isbn:{isbn}")).await
    }
}

fn parse_volumes(payload: &serde_json::Value) -> Vec<SearchCandidate> {
    let items = payload["items"].as_array().cloned().unwrap_or_default();
    items
        .iter()
        .filter_map(|item| {
            let info = &item["volumeInfo"];
            let name = info["title"].as_str()?.to_string();
            let thumb = info["imageLinks"]["thumbnail"]
                .as_str()
                .or_else(|| info["imageLinks"]["smallThumbnail"].as_str());
            Some(SearchCandidate {
                name,
                cover_url: thumb.map(upgrade_thumbnail),
                metadata: Some(MediaMetadata {
                    year: info["publishedDate"]
                        .as_str()
                        .and_then(|d| d.get(..4))
                        .and_then(|y| y.parse().ok()),
                    rating: info["averageRating"].as_f64(),
                    summary: info["description"].as_str().map(|s| s.to_string()),
                    genres: info["categories"].as_array().map(|cats| {
                        cats.iter()
                            .filter_map(|c| c.as_str().map(|s| s.to_string()))
                            .collect()
                    }),
                    authors: info["authors"].as_array().map(|authors| {
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

/// Bigger zoom level, https scheme.
fn upgrade_thumbnail(url: &str) -> String {
    url.replace("zoom=1", "zoom=2")
        .replace("http://", "https://")
}
