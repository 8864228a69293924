//! Title resolution & enrichment engine.
//!
//! Takes noisy, user-entered titles (games, films, series, books) and
//! resolves each to canonical cover art and metadata from external
//! catalogs, caching every outcome so repeat runs do no repeat network
//! work.

pub mod auth;
pub mod batch;
pub mod config;
pub mod googlebooks;
pub mod igdb;
pub mod openlibrary;
pub mod provider;
pub mod select;
pub mod tmdb;
pub mod variants;

pub use batch::{BatchOutcome, BatchResolver, BatchStats, ProviderSet};
pub use config::ResolverConfig;
pub use provider::{ProviderClient, SearchCandidate, SearchOutcome};
