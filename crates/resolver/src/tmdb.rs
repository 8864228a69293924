//! TMDB (The Movie Database) provider client.
//!
//! Uses TMDB API v3: https://developer.themoviedb.org/docs
//!
//! One client serves both films and series; the mode picks the search
//! endpoint, the payload field names, and the year-hint parameter. The
//! top-ranked result is enriched with a details call (genres, runtime,
//! season/episode counts); a failed details call degrades to search-level
//! metadata.

use async_trait::async_trait;
use tracing::{debug, warn};

use medialog_core::error::AuthError;
use medialog_core::types::{MediaMetadata, TitleHints};

use crate::provider::{ProviderClient, SearchCandidate, SearchOutcome};

const BASE_URL: &str = "https://api.themoviedb.org/3";
const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TmdbMode {
    Movies,
    Series,
}

impl TmdbMode {
    fn search_path(self) -> &'static str {
        match self {
            Self::Movies => "/search/movie",
            Self::Series => "/search/tv",
        }
    }

    fn details_path(self, id: u64) -> String {
        match self {
            Self::Movies => format!("/movie/{id}"),
            Self::Series => format!("/tv/{id}"),
        }
    }

    fn year_param(self) -> &'static str {
        match self {
            Self::Movies => "year",
            Self::Series => "first_air_date_year",
        }
    }

    fn title_field(self) -> &'static str {
        match self {
            Self::Movies => "title",
            Self::Series => "name",
        }
    }

    fn date_field(self) -> &'static str {
        match self {
            Self::Movies => "release_date",
            Self::Series => "first_air_date",
        }
    }
}

pub struct TmdbClient {
    api_key: String,
    language: String,
    mode: TmdbMode,
    http: reqwest::Client,
}

enum TmdbResponse {
    Payload(serde_json::Value),
    Transient(String),
}

impl TmdbClient {
    pub fn movies(api_key: String, language: String, http: reqwest::Client) -> Self {
        Self {
            api_key,
            language,
            mode: TmdbMode::Movies,
            http,
        }
    }

    pub fn series(api_key: String, language: String, http: reqwest::Client) -> Self {
        Self {
            api_key,
            language,
            mode: TmdbMode::Series,
            http,
        }
    }

    async fn get_json(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<TmdbResponse, AuthError> {
        let mut all_params = vec![
            ("api_key", self.api_key.as_str()),
            ("language", self.language.as_str()),
        ];
        all_params.extend_from_slice(params);

        let url = format!("{BASE_URL}{path}");
        debug!(url = %url, "TMDB request");

        let resp = match self.http.get(&url).query(&all_params).send().await {
            Ok(resp) => resp,
            Err(e) => return Ok(TmdbResponse::Transient(e.to_string())),
        };

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AuthError::Rejected("TMDB rejected the API key".into()));
        }
        if !status.is_success() {
            return Ok(TmdbResponse::Transient(format!("TMDB returned {status}")));
        }

        match resp.json().await {
            Ok(payload) => Ok(TmdbResponse::Payload(payload)),
            Err(e) => Ok(TmdbResponse::Transient(format!("parse JSON: {e}"))),
        }
    }
}

#[async_trait]
impl ProviderClient for TmdbClient {
    fn name(&self) -> &str {
        match self.mode {
            TmdbMode::Movies => "tmdb-movies",
            TmdbMode::Series => "tmdb-series",
        }
    }

    async fn search(
        &self,
        query: &str,
        hints: &TitleHints,
    ) -> Result<SearchOutcome, AuthError> {
        let mut params = vec![("query", query)];
        let year_str = hints.year.map(|y| y.to_string());
        if let Some(ref y) = year_str {
            params.push((self.mode.year_param(), y));
        }

        let payload = match self.get_json(self.mode.search_path(), &params).await? {
            TmdbResponse::Payload(p) => p,
            TmdbResponse::Transient(reason) => return Ok(SearchOutcome::Transient(reason)),
        };

        let mut candidates = parse_search_results(&payload, self.mode);
        if candidates.is_empty() {
            return Ok(SearchOutcome::NoMatch);
        }

        // Enrich the top-ranked result with its details payload.
        if let Some(id) = first_result_id(&payload) {
            match self.get_json(&self.mode.details_path(id), &[]).await? {
                TmdbResponse::Payload(details) => {
                    if let Some(first) = candidates.first_mut() {
                        let meta = first.metadata.get_or_insert_with(Default::default);
                        apply_details(meta, &details, self.mode);
                    }
                }
                TmdbResponse::Transient(reason) => {
                    warn!(id, reason = %reason, "TMDB details lookup failed, keeping search-level metadata");
                }
            }
        }

        Ok(SearchOutcome::Found(candidates))
    }
}

fn parse_search_results(payload: &serde_json::Value, mode: TmdbMode) -> Vec<SearchCandidate> {
    let results = payload["results"].as_array().cloned().unwrap_or_default();
    results
        .iter()
        .take(10)
        .filter_map(|r| {
            let name = r[mode.title_field()].as_str()?.to_string();
            Some(SearchCandidate {
                name,
                cover_url: r["poster_path"]
                    .as_str()
                    .map(|p| format!("{IMAGE_BASE}/w500{p}")),
                metadata: Some(MediaMetadata {
                    year: r[mode.date_field()]
                        .as_str()
                        .and_then(|d| d.get(..4))
                        .and_then(|y| y.parse().ok()),
                    rating: r["vote_average"].as_f64(),
                    summary: r["overview"].as_str().map(|s| s.to_string()),
                    ..Default::default()
                }),
            })
        })
        .collect()
}

fn first_result_id(payload: &serde_json::Value) -> Option<u64> {
    payload["results"].as_array()?.first()?["id"].as_u64()
}

fn apply_details(meta: &mut MediaMetadata, details: &serde_json::Value, mode: TmdbMode) {
    meta.genres = details["genres"].as_array().map(|gs| {
        gs.iter()
            .filter_map(|g| g["name"].as_str().map(|s| s.to_string()))
            .collect()
    });
    match mode {
        TmdbMode::Movies => {
            meta.runtime_minutes = details["runtime"].as_i64().map(|r| r as i32);
        }
        TmdbMode::Series => {
            meta.runtime_minutes = details["episode_run_time"]
                .as_array()
                .and_then(|a| a.first())
                .and_then(|v| v.as_i64())
                .map(|r| r as i32);
            meta.seasons = details["number_of_seasons"].as_i64().map(|n| n as i32);
            meta.episodes = details["number_of_episodes"].as_i64().map(|n| n as i32);
        }
    }
}
