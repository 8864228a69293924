//! IGDB (Internet Game Database) provider client.
//!
//! Uses IGDB API v4: https://api-docs.igdb.com
//!
//! Apicalypse query bodies POSTed to per-entity endpoints, authenticated
//! with a Twitch client-credentials bearer token.
//!
//! Cover art is a two-step lookup: a game row carries a numeric cover id
//! which a second call against `/covers` resolves to an image id. Both
//! steps stay inside this client; callers see one aggregated candidate
//! list.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use medialog_core::error::AuthError;
use medialog_core::types::{MediaMetadata, TitleHints};

use crate::auth::TwitchTokenCache;
use crate::provider::{ProviderClient, SearchCandidate, SearchOutcome};

const GAMES_URL: &str = "https://api.igdb.com/v4/games";
const COVERS_URL: &str = "https://api.igdb.com/v4/covers";
const IMAGE_BASE: &str = "https://images.igdb.com/igdb/image/upload";

pub struct IgdbClient {
    client_id: String,
    tokens: Arc<TwitchTokenCache>,
    http: reqwest::Client,
}

enum IgdbResponse {
    Rows(serde_json::Value),
    Transient(String),
}

impl IgdbClient {
    pub fn new(client_id: String, tokens: Arc<TwitchTokenCache>, http: reqwest::Client) -> Self {
        Self {
            client_id,
            tokens,
            http,
        }
    }

    /// POST one Apicalypse query. 401/403 invalidates the cached token and
    /// escapes as an auth failure; every other problem is transient.
    async fn post_query(&self, url: &str, body: String) -> Result<IgdbResponse, AuthError> {
        let token = self.tokens.get().await?;
        debug!(url = %url, body = %body, "IGDB request");

        let resp = match self
            .http
            .post(url)
            .header("Client-ID", self.client_id.as_str())
            .bearer_auth(&token)
            .body(body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return Ok(IgdbResponse::Transient(e.to_string())),
        };

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            self.tokens.invalidate().await;
            return Err(AuthError::Rejected(format!("IGDB returned {status}")));
        }
        if !status.is_success() {
            return Ok(IgdbResponse::Transient(format!("IGDB returned {status}")));
        }

        match resp.json().await {
            Ok(rows) => Ok(IgdbResponse::Rows(rows)),
            Err(e) => Ok(IgdbResponse::Transient(format!("parse JSON: {e}"))),
        }
    }
}

#[async_trait]
impl ProviderClient for IgdbClient {
    fn name(&self) -> &str {
        "igdb"
    }

    async fn search(
        &self,
        query: &str,
        _hints: &TitleHints,
    ) -> Result<SearchOutcome, AuthError> {
        let escaped = query.replace('\\', "\\\\").replace('"', "\\\"");
        let body = format!(
            "search \"{escaped}\"; fields name,cover,first_release_date,rating,summary; limit 5;"
        );

        let games = match self.post_query(GAMES_URL, body).await? {
            IgdbResponse::Rows(rows) => rows,
            IgdbResponse::Transient(reason) => return Ok(SearchOutcome::Transient(reason)),
        };

        let mut candidates = parse_games(&games);
        if candidates.is_empty() {
            return Ok(SearchOutcome::NoMatch);
        }

        // Second step: resolve cover ids to image ids, one call for all
        // candidates. A transient failure here degrades to cover-less
        // candidates rather than failing the search.
        let cover_ids: Vec<u64> = candidates.iter().filter_map(|c| c.cover_id).collect();
        if !cover_ids.is_empty() {
            let id_list = cover_ids
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let body = format!("fields id,image_id; where id = ({id_list});");
            match self.post_query(COVERS_URL, body).await? {
                IgdbResponse::Rows(rows) => {
                    let urls = parse_cover_urls(&rows);
                    for candidate in &mut candidates {
                        if let Some(id) = candidate.cover_id {
                            candidate.inner.cover_url = urls.get(&id).cloned();
                        }
                    }
                }
                IgdbResponse::Transient(reason) => {
                    warn!(reason = %reason, "IGDB cover lookup failed, returning candidates without covers");
                }
            }
        }

        Ok(SearchOutcome::Found(
            candidates.into_iter().map(|c| c.inner).collect(),
        ))
    }
}

struct GameCandidate {
    inner: SearchCandidate,
    cover_id: Option<u64>,
}

fn parse_games(rows: &serde_json::Value) -> Vec<GameCandidate> {
    let games = rows.as_array().cloned().unwrap_or_default();
    games
        .iter()
        .filter_map(|g| {
            let name = g["name"].as_str()?.to_string();
            let metadata = MediaMetadata {
                year: g["first_release_date"]
                    .as_i64()
                    .and_then(release_year),
                rating: g["rating"].as_f64(),
                summary: g["summary"].as_str().map(|s| s.to_string()),
                ..Default::default()
            };
            Some(GameCandidate {
                inner: SearchCandidate {
                    name,
                    cover_url: None,
                    metadata: Some(metadata),
                },
                cover_id: g["cover"].as_u64(),
            })
        })
        .collect()
}

fn parse_cover_urls(rows: &serde_json::Value) -> HashMap<u64, String> {
    let covers = rows.as_array().cloned().unwrap_or_default();
    covers
        .iter()
        .filter_map(|c| {
            let id = c["id"].as_u64()?;
            let image_id = c["image_id"].as_str()?;
            Some((id, format!("{IMAGE_BASE}/t_cover_big/{image_id}.jpg")))
        })
        .collect()
}

/// Release year from IGDB's unix-seconds `first_release_date`.
fn release_year(ts: i64) -> Option<i32> {
    use chrono::Datelike;
    chrono::DateTime::from_timestamp(ts, 0).map(|d| d.year())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_games_extracts_candidates_and_cover_ids() {
        let rows = serde_json::json!([
            {
                "name": "The Witcher 3: Wild Hunt",
                "cover": 89386,
                "first_release_date": 1431993600i64,
                "rating": 93.4,
                "summary": "Geralt of Rivia..."
            },
            { "name": "The Witcher 3: Wild Hunt - Blood and Wine" }
        ]);

        let parsed = parse_games(&rows);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].inner.name, "The Witcher 3: Wild Hunt");
        assert_eq!(parsed[0].cover_id, Some(89386));
        let meta = parsed[0].inner.metadata.as_ref().unwrap();
        assert_eq!(meta.year, Some(2015));
        assert!((meta.rating.unwrap() - 93.4).abs() < 0.01);
        // A found game without a cover id is still a candidate.
        assert_eq!(parsed[1].cover_id, None);
    }

    #[test]
    fn parse_cover_urls_builds_big_cover_urls() {
        let rows = serde_json::json!([
            { "id": 89386, "image_id": "co1wyy" },
            { "id": 99999 }
        ]);
        let urls = parse_cover_urls(&rows);
        assert_eq!(
            urls.get(&89386).unwrap(),
            "https://images.igdb.com/igdb/image/upload/t_cover_big/co1wyy.jpg"
        );
        // Rows without an image id are skipped, not invented.
        assert!(!urls.contains_key(&99999));
    }

    #[test]
    fn release_year_from_unix_seconds() {
        assert_eq!(release_year(1431993600), Some(2015));
    }
}
