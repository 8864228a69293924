//! Batch-level behavior: cache short-circuits, per-title isolation,
//! variant fallthrough, provider sidelining, persistence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use medialog_cache::CoverCache;
use medialog_core::error::AuthError;
use medialog_core::types::{MediaKind, ResolvedMedia, TitleHints, TitleRequest};
use medialog_resolver::{
    BatchResolver, ProviderClient, ProviderSet, ResolverConfig, SearchCandidate, SearchOutcome,
};

/// Provider double with canned responses and call counters.
///
/// Unknown queries answer `NoMatch` unless `echo_unknown` is set, in which
/// case they answer with a single exact-named candidate carrying a cover.
struct ScriptedProvider {
    name: &'static str,
    responses: HashMap<String, SearchOutcome>,
    isbn_responses: HashMap<String, SearchOutcome>,
    echo_unknown: bool,
    transient_substring: Option<&'static str>,
    auth_fail: bool,
    search_calls: AtomicUsize,
    isbn_calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            responses: HashMap::new(),
            isbn_responses: HashMap::new(),
            echo_unknown: false,
            transient_substring: None,
            auth_fail: false,
            search_calls: AtomicUsize::new(0),
            isbn_calls: AtomicUsize::new(0),
        }
    }

    fn respond(mut self, query: &str, outcome: SearchOutcome) -> Self {
        self.responses.insert(query.to_string(), outcome);
        self
    }

    fn respond_isbn(mut self, isbn: &str, outcome: SearchOutcome) -> Self {
        self.isbn_responses.insert(isbn.to_string(), outcome);
        self
    }

    fn echo_unknown(mut self) -> Self {
        self.echo_unknown = true;
        self
    }

    fn transient_when_contains(mut self, needle: &'static str) -> Self {
        self.transient_substring = Some(needle);
        self
    }

    fn fail_auth(mut self) -> Self {
        self.auth_fail = true;
        self
    }

    fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn isbn_calls(&self) -> usize {
        self.isbn_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn search(
        &self,
        query: &str,
        _hints: &TitleHints,
    ) -> Result<SearchOutcome, AuthError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.auth_fail {
            return Err(AuthError::Rejected("scripted auth failure".into()));
        }
        if let Some(needle) = self.transient_substring {
            if query.contains(needle) {
                return Ok(SearchOutcome::Transient("scripted outage".into()));
            }
        }
        if let Some(outcome) = self.responses.get(query) {
            return Ok(outcome.clone());
        }
        if self.echo_unknown {
            return Ok(SearchOutcome::Found(vec![candidate(
                query,
                Some("https://img.example/echo.jpg"),
            )]));
        }
        Ok(SearchOutcome::NoMatch)
    }

    async fn lookup_isbn(&self, isbn: &str) -> Result<SearchOutcome, AuthError> {
        self.isbn_calls.fetch_add(1, Ordering::SeqCst);
        if self.auth_fail {
            return Err(AuthError::Rejected("scripted auth failure".into()));
        }
        Ok(self
            .isbn_responses
            .get(isbn)
            .cloned()
            .unwrap_or(SearchOutcome::NoMatch))
    }
}

fn candidate(name: &str, cover: Option<&str>) -> SearchCandidate {
    SearchCandidate {
        name: name.to_string(),
        cover_url: cover.map(str::to_string),
        metadata: None,
    }
}

fn test_config() -> ResolverConfig {
    ResolverConfig {
        pacing: Duration::ZERO,
        ..Default::default()
    }
}

fn resolver_with(
    kind: MediaKind,
    provider: Arc<ScriptedProvider>,
    cache: CoverCache,
) -> BatchResolver {
    let mut providers = ProviderSet::empty();
    providers.register(kind, provider);
    BatchResolver::with_parts(providers, cache, &test_config())
}

#[tokio::test]
async fn cached_title_triggers_zero_network_calls() {
    let provider = Arc::new(ScriptedProvider::new("games").echo_unknown());
    let cache = CoverCache::in_memory();
    let cached = ResolvedMedia {
        cover_url: Some("https://img.example/cached.jpg".into()),
        metadata: None,
    };
    cache.insert("Outer Wilds", Some(cached.clone()));

    let resolver = resolver_with(MediaKind::Game, provider.clone(), cache);
    let outcome = resolver
        .resolve_all(vec![TitleRequest::new("Outer Wilds", MediaKind::Game)])
        .await;

    assert_eq!(outcome.results["Outer Wilds"], Some(cached));
    assert_eq!(outcome.stats.cache_hits, 1);
    assert_eq!(provider.search_calls(), 0);
    assert_eq!(provider.isbn_calls(), 0);
}

#[tokio::test]
async fn absent_marker_short_circuits_to_null() {
    let provider = Arc::new(ScriptedProvider::new("games").echo_unknown());
    let cache = CoverCache::in_memory();
    cache.insert("Some Obscure Game", None);

    let resolver = resolver_with(MediaKind::Game, provider.clone(), cache);
    let outcome = resolver
        .resolve_all(vec![TitleRequest::new("Some Obscure Game", MediaKind::Game)])
        .await;

    assert_eq!(outcome.results["Some Obscure Game"], None);
    assert_eq!(outcome.stats.cache_hits, 1);
    assert_eq!(provider.search_calls(), 0);
}

#[tokio::test]
async fn exact_match_on_later_variant_is_accepted() {
    // Only the suffix-stripped variant finds anything, and the exact-name
    // candidate wins even though a near-name candidate carries a cover too.
    let provider = Arc::new(ScriptedProvider::new("games").respond(
        "The Witcher 3: Wild Hunt",
        SearchOutcome::Found(vec![
            candidate("The Witcher 3: Wild Hunt", Some("https://img.example/w3.jpg")),
            candidate(
                "The Witcher 3: Wild Hunt - Blood and Wine",
                Some("https://img.example/baw.jpg"),
            ),
        ]),
    ));

    let resolver = resolver_with(MediaKind::Game, provider.clone(), CoverCache::in_memory());
    let outcome = resolver
        .resolve_all(vec![TitleRequest::new(
            "The Witcher 3: Wild Hunt - Complete Edition",
            MediaKind::Game,
        )])
        .await;

    let resolved = outcome.results["The Witcher 3: Wild Hunt - Complete Edition"]
        .as_ref()
        .expect("should match on the suffix-stripped variant");
    assert_eq!(resolved.cover_url.as_deref(), Some("https://img.example/w3.jpg"));
    // The raw title was tried (and missed) before the matching variant.
    assert!(provider.search_calls() > 1);
}

#[tokio::test]
async fn diacritic_folded_variant_rescues_accented_title() {
    let provider = Arc::new(ScriptedProvider::new("games").respond(
        "Asterix",
        SearchOutcome::Found(vec![candidate("Asterix", Some("https://img.example/ax.jpg"))]),
    ));

    let resolver = resolver_with(MediaKind::Game, provider.clone(), CoverCache::in_memory());
    let outcome = resolver
        .resolve_all(vec![TitleRequest::new("Astérix", MediaKind::Game)])
        .await;

    assert!(outcome.results["Astérix"].is_some());
}

#[tokio::test]
async fn one_failing_title_does_not_poison_the_batch() {
    let provider = Arc::new(
        ScriptedProvider::new("games")
            .echo_unknown()
            .transient_when_contains("Cursed"),
    );

    let mut requests: Vec<TitleRequest> = (1..=9)
        .map(|i| TitleRequest::new(format!("Game {i}"), MediaKind::Game))
        .collect();
    requests.push(TitleRequest::new("Cursed Game", MediaKind::Game));

    let resolver = resolver_with(MediaKind::Game, provider, CoverCache::in_memory());
    let outcome = resolver.resolve_all(requests).await;

    assert_eq!(outcome.results.len(), 10);
    assert_eq!(outcome.results["Cursed Game"], None);
    for i in 1..=9 {
        assert!(
            outcome.results[&format!("Game {i}")].is_some(),
            "Game {i} should have resolved"
        );
    }
    assert_eq!(outcome.stats.resolved, 9);
    assert_eq!(outcome.stats.unresolved, 1);
}

#[tokio::test]
async fn auth_failure_disables_provider_for_the_run() {
    let provider = Arc::new(ScriptedProvider::new("games").fail_auth());
    let config = ResolverConfig {
        pacing: Duration::ZERO,
        worker_count: 1,
        ..Default::default()
    };
    let mut providers = ProviderSet::empty();
    providers.register(MediaKind::Game, provider.clone());
    let resolver = BatchResolver::with_parts(providers, CoverCache::in_memory(), &config);

    let outcome = resolver
        .resolve_all(vec![
            TitleRequest::new("First Game", MediaKind::Game),
            TitleRequest::new("Second Game", MediaKind::Game),
        ])
        .await;

    // One call fails authentication; everything after skips the provider.
    assert_eq!(provider.search_calls(), 1);
    assert_eq!(outcome.results["First Game"], None);
    assert_eq!(outcome.results["Second Game"], None);
}

#[tokio::test]
async fn isbn_hint_is_tried_before_any_text_search() {
    let provider = Arc::new(
        ScriptedProvider::new("books")
            .echo_unknown()
            .respond_isbn(
                "9780441172719",
                SearchOutcome::Found(vec![candidate("Dune", Some("https://img.example/dune.jpg"))]),
            ),
    );

    let resolver = resolver_with(MediaKind::Book, provider.clone(), CoverCache::in_memory());
    let request = TitleRequest::new("Dune", MediaKind::Book).with_hints(TitleHints {
        isbn: Some("978-0-441-17271-9".into()),
        ..Default::default()
    });
    let outcome = resolver.resolve_all(vec![request]).await;

    assert_eq!(
        outcome.results["Dune"].as_ref().unwrap().cover_url.as_deref(),
        Some("https://img.example/dune.jpg")
    );
    assert_eq!(provider.isbn_calls(), 1);
    assert_eq!(provider.search_calls(), 0);
}

#[tokio::test]
async fn no_providers_yield_null_results_not_errors() {
    let resolver = BatchResolver::with_parts(
        ProviderSet::empty(),
        CoverCache::in_memory(),
        &test_config(),
    );

    let outcome = resolver
        .resolve_all(vec![
            TitleRequest::new("Anything", MediaKind::Film),
            TitleRequest::new("At All", MediaKind::Book),
        ])
        .await;

    assert_eq!(outcome.results["Anything"], None);
    assert_eq!(outcome.results["At All"], None);
    assert_eq!(outcome.stats.unresolved, 2);
}

#[tokio::test]
async fn outcomes_persist_across_resolver_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("covers.json");

    let provider = Arc::new(ScriptedProvider::new("games").respond(
        "Hollow Knight",
        SearchOutcome::Found(vec![candidate("Hollow Knight", Some("https://img.example/hk.jpg"))]),
    ));
    let resolver = resolver_with(MediaKind::Game, provider, CoverCache::open(&path));
    let outcome = resolver
        .resolve_all(vec![
            TitleRequest::new("Hollow Knight", MediaKind::Game),
            TitleRequest::new("Nonexistent Game", MediaKind::Game),
        ])
        .await;
    assert!(outcome.results["Hollow Knight"].is_some());

    // A second run against the same file needs no provider at all.
    let rerun = BatchResolver::with_parts(
        ProviderSet::empty(),
        CoverCache::open(&path),
        &test_config(),
    );
    let outcome = rerun
        .resolve_all(vec![
            TitleRequest::new("Hollow Knight", MediaKind::Game),
            TitleRequest::new("Nonexistent Game", MediaKind::Game),
        ])
        .await;

    assert_eq!(
        outcome.results["Hollow Knight"].as_ref().unwrap().cover_url.as_deref(),
        Some("https://img.example/hk.jpg")
    );
    // The confirmed absence also came from the cache, not a fresh miss.
    assert_eq!(outcome.results["Nonexistent Game"], None);
    assert_eq!(outcome.stats.cache_hits, 2);
}

#[tokio::test]
async fn duplicate_titles_collapse_to_one_resolution() {
    let provider = Arc::new(ScriptedProvider::new("games").echo_unknown());
    let resolver = resolver_with(MediaKind::Game, provider.clone(), CoverCache::in_memory());

    let outcome = resolver
        .resolve_all(vec![
            TitleRequest::new("Celeste", MediaKind::Game),
            TitleRequest::new("Celeste", MediaKind::Game),
        ])
        .await;

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(provider.search_calls(), 1);
}

#[tokio::test]
async fn force_re_resolution_overwrites_an_absent_marker() {
    let provider = Arc::new(ScriptedProvider::new("games").echo_unknown());
    let cache = CoverCache::in_memory();
    cache.insert("Tunic", None);

    let resolver = resolver_with(MediaKind::Game, provider.clone(), cache);
    let mut request = TitleRequest::new("Tunic", MediaKind::Game);
    request.force = true;
    let outcome = resolver.resolve_all(vec![request]).await;

    assert!(outcome.results["Tunic"].is_some());
    assert_eq!(outcome.stats.cache_hits, 0);
    assert!(provider.search_calls() > 0);
}

#[tokio::test]
async fn alias_table_rescues_a_romanized_title() {
    let provider = Arc::new(ScriptedProvider::new("games").respond(
        "Final Fantasy III",
        SearchOutcome::Found(vec![candidate(
            "Final Fantasy III",
            Some("https://img.example/ff3.jpg"),
        )]),
    ));

    let mut config = test_config();
    config.aliases.insert(
        "Fainaru Fantajī Surī".to_string(),
        "Final Fantasy III".to_string(),
    );
    let mut providers = ProviderSet::empty();
    providers.register(MediaKind::Game, provider.clone());
    let resolver = BatchResolver::with_parts(providers, CoverCache::in_memory(), &config);

    let outcome = resolver
        .resolve_all(vec![TitleRequest::new("Fainaru Fantajī Surī", MediaKind::Game)])
        .await;

    assert!(outcome.results["Fainaru Fantajī Surī"].is_some());
    // Raw title first, alias second: exactly two calls.
    assert_eq!(provider.search_calls(), 2);
}
