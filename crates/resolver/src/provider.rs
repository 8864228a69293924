use async_trait::async_trait;

use medialog_core::error::AuthError;
use medialog_core::types::{MediaMetadata, TitleHints};

/// One catalog entry returned by a provider for a query.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SearchCandidate {
    pub name: String,
    pub cover_url: Option<String>,
    pub metadata: Option<MediaMetadata>,
}

/// Classified result of one provider call.
///
/// Every failure mode of a single call collapses into one of these three;
/// only an authentication failure escapes as an error, so the batch loop
/// can disable the provider and trigger a token refresh.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// HTTP success with at least one result, ranked by the provider.
    Found(Vec<SearchCandidate>),
    /// HTTP success, zero results.
    NoMatch,
    /// Timeout, connection failure, 5xx, or an unparseable payload.
    Transient(String),
}

/// A searchable external catalog.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn name(&self) -> &str;

    /// Run one text search for `query` against the catalog.
    async fn search(
        &self,
        query: &str,
        hints: &TitleHints,
    ) -> Result<SearchOutcome, AuthError>;

    /// Identifier lookup for catalogs that support it (books by ISBN).
    ///
    /// Identifier matches are unambiguous, so the batch loop tries this
    /// before any text variant when an ISBN hint is present.
    async fn lookup_isbn(&self, _isbn: &str) -> Result<SearchOutcome, AuthError> {
        Ok(SearchOutcome::NoMatch)
    }
}

/// Normalize a recorded ISBN: strip separators, accept only the 10- and
/// 13-digit forms (a trailing X check digit counts as a digit).
pub fn clean_isbn(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || c.eq_ignore_ascii_case(&'X'))
        .map(|c| c.to_ascii_uppercase())
        .collect();
    match cleaned.len() {
        10 | 13 => Some(cleaned),
        _ => None,
    }
}
