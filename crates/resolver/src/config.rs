//! Engine configuration.
//!
//! Credentials come from the environment under the same names the catalog
//! vendors document; engine knobs have conservative defaults and their own
//! `MEDIALOG_*` overrides. Anything fancier than `std::env::var` (dotenv
//! files, config formats) belongs to the caller.

use std::path::PathBuf;
use std::time::Duration;

use crate::variants::TitleAliases;

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub igdb_client_id: Option<String>,
    pub igdb_client_secret: Option<String>,
    pub tmdb_api_key: Option<String>,
    pub google_books_api_key: Option<String>,

    /// Max titles resolved concurrently.
    pub worker_count: usize,
    /// Delay between successive network steps of one title's resolution.
    pub pacing: Duration,
    /// Per-call network timeout.
    pub call_timeout: Duration,
    /// BCP-47 tag passed to catalogs that localize results.
    pub search_language: String,
    /// Backing file for the persisted result cache; `None` keeps the run
    /// in-memory only.
    pub cache_path: Option<PathBuf>,
    /// Known-problematic titles mapped to their canonical search form.
    pub aliases: TitleAliases,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            igdb_client_id: None,
            igdb_client_secret: None,
            tmdb_api_key: None,
            google_books_api_key: None,
            worker_count: 10,
            pacing: Duration::from_millis(250),
            call_timeout: Duration::from_secs(10),
            search_language: "en-US".to_string(),
            cache_path: None,
            aliases: TitleAliases::new(),
        }
    }
}

impl ResolverConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            igdb_client_id: std::env::var("IGDB_CLIENT_ID").ok(),
            igdb_client_secret: std::env::var("IGDB_CLIENT_SECRET").ok(),
            tmdb_api_key: std::env::var("TMDB_API_KEY").ok(),
            google_books_api_key: std::env::var("GOOGLE_BOOKS_API_KEY").ok(),
            worker_count: std::env::var("MEDIALOG_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.worker_count),
            pacing: std::env::var("MEDIALOG_PACING_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.pacing),
            call_timeout: std::env::var("MEDIALOG_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.call_timeout),
            search_language: std::env::var("MEDIALOG_LANGUAGE")
                .unwrap_or(defaults.search_language),
            cache_path: std::env::var("MEDIALOG_CACHE").ok().map(PathBuf::from),
            aliases: TitleAliases::new(),
        }
    }
}
