use std::cell::{Cell, RefCell};

use runtime::Metrics;
use thiserror::Error;

use crate::config::{CacheConfig, GenerationId};
use crate::network::Network;
use crate::request::{Request, RequestKey};
use crate::response::Response;
use crate::storage::{CacheStorage, StorageError};

/// Worker lifecycle. Transitions only move forward; `Redundant` is terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Installing,
    Installed,
    Active,
    /// Replaced by a newer worker or failed to install. Never writes again.
    Redundant,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("pre-cache of `{url}` failed: {reason}")]
    Install { url: String, reason: String },
    #[error("`{url}` is unavailable from both network and cache")]
    Offline { url: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: Lifecycle,
    },
}

/// Where a served response came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResponseSource {
    Network,
    Cache,
    /// The application shell, served in place of an unreachable navigation.
    ShellFallback,
}

/// Background refresh of a cache entry that was just served stale.
///
/// The host decides when to run it (`waitUntil` in a browser); the response
/// already handed to the page is unaffected either way.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a revalidation does nothing until it is run"]
pub struct Revalidation {
    request: Request,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevalidationOutcome {
    Updated,
    NotCacheable,
    Skipped,
    Failed(String),
}

impl Revalidation {
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub async fn run<S: CacheStorage, N: Network>(
        self,
        cache: &OfflineCache<S, N>,
    ) -> RevalidationOutcome {
        cache.revalidate(&self.request).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
    pub revalidation: Option<Revalidation>,
}

impl Served {
    fn network(response: Response) -> Self {
        Self {
            response,
            source: ResponseSource::Network,
            revalidation: None,
        }
    }
}

/// Offline cache manager for one worker instance.
///
/// Navigations are network-first with the shell entry as fallback; every
/// other GET is stale-while-revalidate. Writes go only to the configured
/// generation.
pub struct OfflineCache<S, N> {
    config: CacheConfig,
    storage: S,
    network: N,
    state: Cell<Lifecycle>,
    claimed: Cell<bool>,
    metrics: RefCell<Metrics>,
}

impl<S: CacheStorage, N: Network> OfflineCache<S, N> {
    pub fn new(config: CacheConfig, storage: S, network: N) -> Self {
        Self {
            config,
            storage,
            network,
            state: Cell::new(Lifecycle::Installing),
            claimed: Cell::new(false),
            metrics: RefCell::new(Metrics::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn generation(&self) -> &GenerationId {
        &self.config.generation
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.get()
    }

    /// Whether this worker has taken control of already-open pages.
    pub fn has_claimed_clients(&self) -> bool {
        self.claimed.get()
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.borrow().clone()
    }

    fn count(&self, name: &'static str) {
        self.metrics.borrow_mut().inc(name);
    }

    /// Pre-caches every manifest entry into the current generation.
    ///
    /// All-or-nothing: if any entry cannot be fetched nothing is written and
    /// the worker becomes redundant.
    pub async fn install(&self) -> Result<(), CacheError> {
        let state = self.state.get();
        if state != Lifecycle::Installing {
            return Err(CacheError::InvalidState {
                operation: "install",
                state,
            });
        }

        let mut entries = Vec::with_capacity(self.config.precache.len());
        for url in &self.config.precache {
            let request = Request::get(url.as_str());
            let fetched = match self.network.fetch(&request).await {
                Ok(resp) if resp.status.is_success() => Ok(resp),
                Ok(resp) => Err(format!("status {}", resp.status)),
                Err(err) => Err(err.to_string()),
            };
            match fetched {
                Ok(resp) => entries.push((request.key(), resp)),
                Err(reason) => {
                    tracing::error!(url = %url, %reason, "pre-cache failed; install aborted");
                    self.state.set(Lifecycle::Redundant);
                    return Err(CacheError::Install {
                        url: url.clone(),
                        reason,
                    });
                }
            }
        }

        let count = entries.len();
        if let Err(err) = self.storage.put_all(&self.config.generation, entries).await {
            self.state.set(Lifecycle::Redundant);
            return Err(err.into());
        }
        tracing::info!(generation = %self.config.generation, count, "pre-cache complete");
        self.state.set(Lifecycle::Installed);
        Ok(())
    }

    /// Deletes every generation except the current one and claims open pages.
    ///
    /// Returns the generations that were removed.
    pub async fn activate(&self) -> Result<Vec<GenerationId>, CacheError> {
        let state = self.state.get();
        if !matches!(state, Lifecycle::Installed | Lifecycle::Active) {
            return Err(CacheError::InvalidState {
                operation: "activate",
                state,
            });
        }

        let mut removed = Vec::new();
        for generation in self.storage.generations().await? {
            if generation == self.config.generation {
                continue;
            }
            if self.storage.delete_generation(&generation).await? {
                tracing::info!(%generation, "deleted stale cache generation");
                removed.push(generation);
            }
        }

        self.claimed.set(true);
        self.state.set(Lifecycle::Active);
        Ok(removed)
    }

    /// A newer worker took over. Stops all cache writes from this instance.
    pub fn mark_redundant(&self) {
        if self.state.get() != Lifecycle::Redundant {
            tracing::debug!(generation = %self.config.generation, "worker is now redundant");
        }
        self.state.set(Lifecycle::Redundant);
    }

    /// Serves one intercepted request.
    pub async fn handle(&self, request: &Request) -> Result<Served, CacheError> {
        if request.method != http::Method::GET || self.state.get() == Lifecycle::Redundant {
            self.count("bypassed");
            return self
                .network
                .fetch(request)
                .await
                .map(Served::network)
                .map_err(|_| CacheError::Offline {
                    url: request.url.clone(),
                });
        }

        if request.is_navigation() {
            self.network_first(request).await
        } else {
            self.stale_while_revalidate(request).await
        }
    }

    async fn network_first(&self, request: &Request) -> Result<Served, CacheError> {
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store(request.key(), response.clone()).await;
                }
                Ok(Served::network(response))
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "navigation offline; trying shell");
                let shell = RequestKey::new(&self.config.shell_entry);
                match self.lookup(&shell).await {
                    Some(response) => {
                        self.count("shell_fallbacks");
                        Ok(Served {
                            response,
                            source: ResponseSource::ShellFallback,
                            revalidation: None,
                        })
                    }
                    None => Err(CacheError::Offline {
                        url: request.url.clone(),
                    }),
                }
            }
        }
    }

    async fn stale_while_revalidate(&self, request: &Request) -> Result<Served, CacheError> {
        if let Some(response) = self.lookup(&request.key()).await {
            self.count("hits");
            return Ok(Served {
                response,
                source: ResponseSource::Cache,
                revalidation: Some(Revalidation {
                    request: request.clone(),
                }),
            });
        }

        self.count("misses");
        match self.network.fetch(request).await {
            Ok(response) => {
                self.count("network_fallbacks");
                if response.is_cacheable() {
                    self.store(request.key(), response.clone()).await;
                }
                Ok(Served::network(response))
            }
            Err(err) => {
                tracing::warn!(url = %request.url, error = %err, "resource unavailable offline");
                Err(CacheError::Offline {
                    url: request.url.clone(),
                })
            }
        }
    }

    async fn revalidate(&self, request: &Request) -> RevalidationOutcome {
        if self.state.get() == Lifecycle::Redundant {
            return RevalidationOutcome::Skipped;
        }
        self.count("revalidations");
        match self.network.fetch(request).await {
            Ok(response) if response.is_cacheable() => {
                if self.store(request.key(), response).await {
                    RevalidationOutcome::Updated
                } else {
                    RevalidationOutcome::Failed("cache write failed".to_string())
                }
            }
            Ok(_) => RevalidationOutcome::NotCacheable,
            Err(err) => {
                self.count("revalidation_failures");
                tracing::debug!(url = %request.url, error = %err, "background revalidation failed");
                RevalidationOutcome::Failed(err.to_string())
            }
        }
    }

    async fn lookup(&self, key: &RequestKey) -> Option<Response> {
        match self.storage.get(&self.config.generation, key).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(%key, error = %err, "cache read failed");
                None
            }
        }
    }

    /// Writes into the current generation. Returns whether the write landed.
    async fn store(&self, key: RequestKey, response: Response) -> bool {
        if self.state.get() == Lifecycle::Redundant {
            return false;
        }
        match self.storage.put(&self.config.generation, key, response).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "cache write failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    use http::{Method, StatusCode};
    use pollster::block_on;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::network::NetworkError;
    use crate::request::RequestMode;
    use crate::response::ResponseKind;
    use crate::storage::MemoryCacheStorage;

    #[derive(Default)]
    struct ScriptedNetwork {
        responses: RefCell<HashMap<String, Response>>,
        offline: Cell<bool>,
        calls: RefCell<Vec<String>>,
        headers_seen: RefCell<Vec<http::HeaderMap>>,
    }

    impl ScriptedNetwork {
        fn serving(entries: &[(&str, &str)]) -> Self {
            let net = Self::default();
            for (url, body) in entries {
                net.set(url, Response::ok(body.to_string()));
            }
            net
        }

        fn set(&self, url: &str, response: Response) {
            self.responses.borrow_mut().insert(url.to_string(), response);
        }

        fn go_offline(&self) {
            self.offline.set(true);
        }
    }

    impl Network for ScriptedNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
            self.calls.borrow_mut().push(request.url.clone());
            self.headers_seen.borrow_mut().push(request.headers.clone());
            if self.offline.get() {
                return Err(NetworkError::Offline);
            }
            Ok(self
                .responses
                .borrow()
                .get(&request.url)
                .cloned()
                .unwrap_or_else(|| Response::new(StatusCode::NOT_FOUND, ResponseKind::Basic, "")))
        }
    }

    fn small_config(generation: &str) -> CacheConfig {
        CacheConfig {
            generation: GenerationId::new(generation),
            precache: vec!["./index.html".to_string(), "./app.js".to_string()],
            shell_entry: "./index.html".to_string(),
        }
    }

    fn installed(generation: &str) -> OfflineCache<MemoryCacheStorage, ScriptedNetwork> {
        let net = ScriptedNetwork::serving(&[("./index.html", "<shell>"), ("./app.js", "v1")]);
        let cache = OfflineCache::new(small_config(generation), MemoryCacheStorage::new(), net);
        block_on(cache.install()).unwrap();
        block_on(cache.activate()).unwrap();
        cache
    }

    #[test]
    fn installed_manifest_is_served_offline() {
        let cache = installed("app-v1");
        assert_eq!(cache.lifecycle(), Lifecycle::Active);
        assert!(cache.has_claimed_clients());

        cache.network().go_offline();
        let served = block_on(cache.handle(&Request::get("./app.js"))).unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.body, "v1");
    }

    #[test]
    fn install_is_all_or_nothing() {
        let net = ScriptedNetwork::serving(&[("./index.html", "<shell>")]);
        let cache = OfflineCache::new(small_config("app-v1"), MemoryCacheStorage::new(), net);

        let err = block_on(cache.install()).unwrap_err();
        assert!(matches!(err, CacheError::Install { ref url, .. } if url == "./app.js"));
        assert_eq!(cache.lifecycle(), Lifecycle::Redundant);
        assert_eq!(cache.storage().entry_count(cache.generation()), 0);
        assert!(block_on(cache.activate()).is_err());
    }

    #[test]
    fn activation_deletes_other_generations() {
        let storage = MemoryCacheStorage::new();
        let old = GenerationId::new("app-v0");
        block_on(storage.put(&old, RequestKey::new("./app.js"), Response::ok("v0"))).unwrap();

        let net = ScriptedNetwork::serving(&[("./index.html", "<shell>"), ("./app.js", "v1")]);
        let cache = OfflineCache::new(small_config("app-v1"), storage, net);
        block_on(cache.install()).unwrap();
        assert!(!cache.has_claimed_clients());

        let removed = block_on(cache.activate()).unwrap();
        assert_eq!(removed, vec![old]);
        assert_eq!(
            block_on(cache.storage().generations()).unwrap(),
            vec![GenerationId::new("app-v1")]
        );
    }

    #[test]
    fn offline_navigation_falls_back_to_shell() {
        let cache = installed("app-v1");
        cache.network().go_offline();

        let served = block_on(cache.handle(&Request::navigate("./some/deep/link"))).unwrap();
        assert_eq!(served.source, ResponseSource::ShellFallback);
        assert_eq!(served.response.body, "<shell>");
        assert_eq!(cache.metrics().counter("shell_fallbacks"), 1);
    }

    #[test]
    fn online_navigation_uses_network_and_refreshes_cache() {
        let cache = installed("app-v1");
        cache.network().set("./index.html", Response::ok("<shell v2>"));

        let served = block_on(cache.handle(&Request::navigate("./index.html"))).unwrap();
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.body, "<shell v2>");

        cache.network().go_offline();
        let fallback = block_on(cache.handle(&Request::navigate("./elsewhere"))).unwrap();
        assert_eq!(fallback.response.body, "<shell v2>");
    }

    #[test]
    fn uncacheable_navigation_is_returned_but_not_stored() {
        let cache = installed("app-v1");
        cache.network().set(
            "./index.html",
            Response::new(StatusCode::INTERNAL_SERVER_ERROR, ResponseKind::Basic, "boom"),
        );

        let served = block_on(cache.handle(&Request::navigate("./index.html"))).unwrap();
        assert_eq!(served.response.status, StatusCode::INTERNAL_SERVER_ERROR);

        cache.network().go_offline();
        let fallback = block_on(cache.handle(&Request::navigate("./index.html"))).unwrap();
        assert_eq!(fallback.response.body, "<shell>");
    }

    #[test]
    fn stale_entry_served_then_revalidated_for_next_time() {
        let cache = installed("app-v1");
        cache.network().set("./app.js", Response::ok("v2"));

        let first = block_on(cache.handle(&Request::get("./app.js"))).unwrap();
        assert_eq!(first.response.body, "v1");
        let task = first.revalidation.expect("cache hit schedules revalidation");
        assert_eq!(block_on(task.run(&cache)), RevalidationOutcome::Updated);

        let second = block_on(cache.handle(&Request::get("./app.js"))).unwrap();
        assert_eq!(second.response.body, "v2");
        assert_eq!(cache.metrics().counter("hits"), 2);
        assert_eq!(cache.metrics().counter("revalidations"), 1);
    }

    #[test]
    fn failed_revalidation_keeps_cached_copy() {
        let cache = installed("app-v1");
        let served = block_on(cache.handle(&Request::get("./app.js"))).unwrap();
        cache.network().go_offline();

        let outcome = block_on(served.revalidation.unwrap().run(&cache));
        assert!(matches!(outcome, RevalidationOutcome::Failed(_)));
        let again = block_on(cache.handle(&Request::get("./app.js"))).unwrap();
        assert_eq!(again.response.body, "v1");
        assert_eq!(cache.metrics().counter("revalidation_failures"), 1);
    }

    #[test]
    fn miss_fetches_and_stores_cacheable_response() {
        let cache = installed("app-v1");
        cache.network().set("./data/extra.json", Response::ok("[]"));

        let served = block_on(cache.handle(&Request::get("./data/extra.json"))).unwrap();
        assert_eq!(served.source, ResponseSource::Network);
        assert!(served.revalidation.is_none());

        cache.network().go_offline();
        let cached = block_on(cache.handle(&Request::get("./data/extra.json"))).unwrap();
        assert_eq!(cached.source, ResponseSource::Cache);
    }

    #[test]
    fn miss_while_offline_fails() {
        let cache = installed("app-v1");
        cache.network().go_offline();
        let err = block_on(cache.handle(&Request::get("./missing.png"))).unwrap_err();
        assert_eq!(
            err,
            CacheError::Offline {
                url: "./missing.png".to_string()
            }
        );
    }

    #[test]
    fn non_get_requests_bypass_the_cache() {
        let cache = installed("app-v1");
        let before = cache.storage().entry_count(cache.generation());
        cache.network().set("./api", Response::ok("created"));

        let post = Request::new(Method::POST, "./api", RequestMode::Cors);
        let served = block_on(cache.handle(&post)).unwrap();
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(cache.storage().entry_count(cache.generation()), before);
        assert_eq!(cache.metrics().counter("bypassed"), 1);
    }

    #[test]
    fn request_headers_reach_the_network() {
        use http::header::{HeaderValue, RANGE};

        let cache = installed("app-v1");
        cache.network().set("./video.mp4", Response::ok("clip"));
        let ranged = Request::get("./video.mp4").with_header(RANGE, HeaderValue::from_static("bytes=0-99"));
        block_on(cache.handle(&ranged)).unwrap();

        let seen = cache.network().headers_seen.borrow();
        assert_eq!(seen.last().unwrap()[RANGE], "bytes=0-99");
    }

    #[test]
    fn redundant_worker_never_writes() {
        let cache = installed("app-v1");
        let served = block_on(cache.handle(&Request::get("./app.js"))).unwrap();
        cache.network().set("./app.js", Response::ok("v2"));
        cache.network().set("./new.js", Response::ok("new"));
        cache.mark_redundant();

        assert_eq!(
            block_on(served.revalidation.unwrap().run(&cache)),
            RevalidationOutcome::Skipped
        );
        block_on(cache.handle(&Request::get("./new.js"))).unwrap();
        assert_eq!(cache.storage().entry_count(cache.generation()), 2);
        let stored = block_on(
            cache
                .storage()
                .get(cache.generation(), &RequestKey::new("./app.js")),
        )
        .unwrap()
        .unwrap();
        assert_eq!(stored.body, "v1");
    }
}
