//! Batch resolution driver.
//!
//! One bounded pool of concurrent per-title state machines:
//! `Pending → TryingVariant(i) → Matched | Exhausted → Persisted(Done)`.
//! Titles never interfere with each other; a provider that fails
//! authentication is sidelined for the rest of the run. Every outcome,
//! match or confirmed absence, lands in the persisted cache.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use medialog_cache::CoverCache;
use medialog_core::types::{MediaKind, ResolvedMedia, TitleRequest};

use crate::auth::TwitchTokenCache;
use crate::config::ResolverConfig;
use crate::googlebooks::GoogleBooksClient;
use crate::igdb::IgdbClient;
use crate::openlibrary::OpenLibraryClient;
use crate::provider::{clean_isbn, ProviderClient, SearchCandidate, SearchOutcome};
use crate::select::select;
use crate::tmdb::TmdbClient;
use crate::variants::{generate_with_aliases, TitleAliases};

/// Flush the persisted cache after this many fresh resolutions.
const FLUSH_EVERY: usize = 10;

/// Ordered provider lists per content kind.
#[derive(Default)]
pub struct ProviderSet {
    by_kind: HashMap<MediaKind, Vec<Arc<dyn ProviderClient>>>,
}

impl ProviderSet {
    /// No providers at all; every resolution exhausts immediately.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the catalog roster from configured credentials. Providers with
    /// missing credentials are simply not registered; the keyless book
    /// catalogs are always available.
    pub fn from_config(config: &ResolverConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.call_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let mut set = Self::default();

        if let (Some(id), Some(secret)) = (
            config.igdb_client_id.clone(),
            config.igdb_client_secret.clone(),
        ) {
            let tokens = Arc::new(TwitchTokenCache::new(id.clone(), secret, http.clone()));
            set.register(MediaKind::Game, Arc::new(IgdbClient::new(id, tokens, http.clone())));
        }

        if let Some(key) = config.tmdb_api_key.clone() {
            set.register(
                MediaKind::Film,
                Arc::new(TmdbClient::movies(
                    key.clone(),
                    config.search_language.clone(),
                    http.clone(),
                )),
            );
            set.register(
                MediaKind::Series,
                Arc::new(TmdbClient::series(
                    key,
                    config.search_language.clone(),
                    http.clone(),
                )),
            );
        }

        set.register(MediaKind::Book, Arc::new(OpenLibraryClient::new(http.clone())));
        set.register(
            MediaKind::Book,
            Arc::new(GoogleBooksClient::new(
                config.google_books_api_key.clone(),
                http,
            )),
        );

        set
    }

    /// Append a provider to a kind's roster (registration order is query
    /// order).
    pub fn register(&mut self, kind: MediaKind, provider: Arc<dyn ProviderClient>) {
        self.by_kind.entry(kind).or_default().push(provider);
    }

    pub fn providers_for(&self, kind: MediaKind) -> &[Arc<dyn ProviderClient>] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub resolved: usize,
    pub unresolved: usize,
    pub cache_hits: usize,
}

/// Result of one batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    /// One entry per submitted title: `Some` = matched, `None` = attempted
    /// and confirmed absent.
    pub results: HashMap<String, Option<ResolvedMedia>>,
    pub stats: BatchStats,
}

struct Shared {
    providers: ProviderSet,
    cache: CoverCache,
    aliases: TitleAliases,
    pacing: Duration,
    /// Providers sidelined after an authentication failure.
    disabled: Mutex<HashSet<String>>,
    fresh_resolutions: AtomicUsize,
}

impl Shared {
    fn is_disabled(&self, provider: &dyn ProviderClient) -> bool {
        self.disabled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(provider.name())
    }

    fn disable(&self, provider: &dyn ProviderClient) {
        self.disabled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(provider.name().to_string());
    }

    /// Persist one outcome and flush at the batching cadence.
    fn persist(&self, title: &str, resolved: Option<ResolvedMedia>) {
        self.cache.insert(title, resolved);
        let done = self.fresh_resolutions.fetch_add(1, Ordering::SeqCst) + 1;
        if done % FLUSH_EVERY == 0 {
            if let Err(e) = self.cache.flush() {
                warn!(error = %e, "cache flush failed, will retry at next flush point");
            }
        }
    }
}

pub struct BatchResolver {
    shared: Arc<Shared>,
    worker_count: usize,
}

impl BatchResolver {
    pub fn new(config: ResolverConfig) -> Self {
        let cache = match &config.cache_path {
            Some(path) => CoverCache::open(path),
            None => CoverCache::in_memory(),
        };
        let providers = ProviderSet::from_config(&config);
        Self::with_parts(providers, cache, &config)
    }

    /// Assemble from pre-built parts; the seam the integration tests use to
    /// inject scripted providers and a temp-file cache.
    pub fn with_parts(providers: ProviderSet, cache: CoverCache, config: &ResolverConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                providers,
                cache,
                aliases: config.aliases.clone(),
                pacing: config.pacing,
                disabled: Mutex::new(HashSet::new()),
                fresh_resolutions: AtomicUsize::new(0),
            }),
            worker_count: config.worker_count.max(1),
        }
    }

    /// Resolve every request, bounded to the configured concurrency.
    ///
    /// Duplicate titles collapse to one resolution. No request's failure
    /// can abort the batch; the worst outcome for any title is an explicit
    /// `None`.
    pub async fn resolve_all(&self, requests: Vec<TitleRequest>) -> BatchOutcome {
        let mut results: HashMap<String, Option<ResolvedMedia>> = HashMap::new();
        let mut unique = Vec::new();
        for req in requests {
            if !results.contains_key(&req.title) {
                results.insert(req.title.clone(), None);
                unique.push(req);
            }
        }

        let total = unique.len();
        info!(titles = total, workers = self.worker_count, "batch resolution starting");

        let semaphore = Arc::new(Semaphore::new(self.worker_count));
        let mut tasks = JoinSet::new();
        let mut stats = BatchStats::default();

        for req in unique {
            let shared = self.shared.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (req.title, None, false);
                };
                resolve_one(&shared, req).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((title, resolved, cache_hit)) => {
                    if cache_hit {
                        stats.cache_hits += 1;
                    }
                    if resolved.is_some() {
                        stats.resolved += 1;
                    } else {
                        stats.unresolved += 1;
                    }
                    results.insert(title, resolved);
                }
                Err(e) => {
                    // The pre-filled `None` stands for the lost title.
                    warn!(error = %e, "title resolution task failed");
                    stats.unresolved += 1;
                }
            }
        }

        if let Err(e) = self.shared.cache.flush() {
            warn!(error = %e, "final cache flush failed");
        }

        info!(
            resolved = stats.resolved,
            unresolved = stats.unresolved,
            cache_hits = stats.cache_hits,
            "batch resolution finished"
        );

        BatchOutcome { results, stats }
    }
}

/// One title's full state machine. Returns (title, outcome, was-cache-hit).
async fn resolve_one(shared: &Shared, req: TitleRequest) -> (String, Option<ResolvedMedia>, bool) {
    if !req.force {
        if let Some(entry) = shared.cache.get(&req.title) {
            debug!(title = %req.title, "cache hit, skipping network");
            return (req.title, entry.resolved, true);
        }
    }

    let resolved = run_state_machine(shared, &req).await;
    shared.persist(&req.title, resolved.clone());
    (req.title, resolved, false)
}

async fn run_state_machine(shared: &Shared, req: &TitleRequest) -> Option<ResolvedMedia> {
    let providers = shared.providers.providers_for(req.kind);
    if providers.is_empty() {
        debug!(title = %req.title, kind = %req.kind, "no providers registered");
        return None;
    }

    // Identifier lookups are unambiguous; run them once before any text
    // variant when an ISBN hint is present.
    if let Some(isbn) = req.hints.isbn.as_deref().and_then(clean_isbn) {
        for provider in providers {
            if shared.is_disabled(provider.as_ref()) {
                continue;
            }
            match provider.lookup_isbn(&isbn).await {
                Ok(SearchOutcome::Found(candidates)) => {
                    if let Some(winner) = select(&req.title, &candidates) {
                        debug!(title = %req.title, provider = provider.name(), "matched by ISBN");
                        return Some(to_resolved(winner));
                    }
                }
                Ok(SearchOutcome::NoMatch) => {}
                Ok(SearchOutcome::Transient(reason)) => {
                    debug!(title = %req.title, provider = provider.name(), reason = %reason, "transient during ISBN lookup");
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "provider disabled for this run");
                    shared.disable(provider.as_ref());
                }
            }
            tokio::time::sleep(shared.pacing).await;
        }
    }

    for variant in generate_with_aliases(&req.title, &shared.aliases) {
        for provider in providers {
            if shared.is_disabled(provider.as_ref()) {
                continue;
            }
            match provider.search(&variant, &req.hints).await {
                Ok(SearchOutcome::Found(candidates)) => {
                    if let Some(winner) = select(&variant, &candidates) {
                        debug!(
                            title = %req.title,
                            variant = %variant,
                            provider = provider.name(),
                            winner = %winner.name,
                            "matched"
                        );
                        return Some(to_resolved(winner));
                    }
                }
                Ok(SearchOutcome::NoMatch) => {}
                Ok(SearchOutcome::Transient(reason)) => {
                    // Forward progress through variants is the retry
                    // strategy; the same call is never repeated.
                    debug!(
                        title = %req.title,
                        variant = %variant,
                        provider = provider.name(),
                        reason = %reason,
                        "transient, advancing"
                    );
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "provider disabled for this run");
                    shared.disable(provider.as_ref());
                }
            }
            tokio::time::sleep(shared.pacing).await;
        }
    }

    debug!(title = %req.title, "variants exhausted without a match");
    None
}

fn to_resolved(candidate: &SearchCandidate) -> ResolvedMedia {
    ResolvedMedia {
        cover_url: candidate.cover_url.clone(),
        metadata: candidate.metadata.clone(),
    }
}
