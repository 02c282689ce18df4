//! Cache orchestrator.
//!
//! `get` serves from the cache store when it can. A hit on a stale item
//! returns the cached payload at once and refreshes it on a detached task;
//! a miss populates synchronously. Both paths go through the single-flight
//! registry, so at most one origin-chain traversal per item runs at a time.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use sgtn_core::{CacheStore, Error, ItemId, MemoryCache, Payload};

use crate::flight::{Flight, Flights, Landing};
use crate::origin::OriginChain;

#[derive(Clone)]
pub struct CacheService {
    inner: Arc<Inner>,
}

struct Inner {
    chain: OriginChain,
    store: OnceLock<Arc<dyn CacheStore>>,
    flights: Arc<Flights>,
    wait_timeout: Option<Duration>,
}

impl CacheService {
    /// `wait_timeout` bounds how long a caller waits behind another caller's
    /// fetch; `None` waits indefinitely.
    pub fn new(chain: OriginChain, wait_timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                chain,
                store: OnceLock::new(),
                flights: Arc::new(Flights::new()),
                wait_timeout,
            }),
        }
    }

    /// Bind `store` as the cache. Returns `false` if a store is already bound.
    pub fn register_cache(&self, store: Arc<dyn CacheStore>) -> bool {
        let registered = self.inner.store.set(store).is_ok();
        if !registered {
            tracing::warn!("cache store already bound, ignoring registration");
        }
        registered
    }

    /// The bound store, binding the default in-memory cache on first use.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        self.inner.store.get_or_init(|| Arc::new(MemoryCache::new()))
    }

    /// Whether the cached copy of `id` is stale according to the first origin.
    pub fn is_expired(&self, id: &ItemId) -> bool {
        self.inner.chain.is_expired(id)
    }

    pub fn is_fetching(&self, id: &ItemId) -> bool {
        self.inner.flights.is_inflight(id)
    }

    pub async fn get(&self, id: &ItemId) -> Result<Payload, Error> {
        if let Some(payload) = self.store().get(id) {
            tracing::debug!(item = %id, "cache hit");
            if self.is_expired(id) {
                self.refresh(id);
            }
            return Ok(payload);
        }

        self.populate(id).await?;
        self.store().get(id).ok_or_else(|| {
            tracing::error!(item = %id, "item missing from cache after successful fetch");
            Error::InternalCacheInconsistency(format!("{id} not cached after successful fetch"))
        })
    }

    /// Start a background refresh of `id` unless a fetch is already running.
    /// Without a tokio runtime the refresh is skipped and the stale copy served.
    fn refresh(&self, id: &ItemId) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(item = %id, "no tokio runtime, skipping background refresh");
            return;
        };
        let Some(guard) = self.inner.flights.try_acquire(id) else {
            tracing::debug!(item = %id, "refresh already in flight");
            return;
        };

        let service = self.clone();
        let id = id.clone();
        runtime.spawn(async move {
            let result = service.fetch(&id).await;
            if let Err(err) = &result {
                tracing::warn!(item = %id, error = %err, "background refresh failed, keeping cached data");
            }
            guard.complete(result);
        });
    }

    async fn populate(&self, id: &ItemId) -> Result<(), Error> {
        loop {
            match self.inner.flights.acquire(id) {
                Flight::Leader(guard) => {
                    let result = self.fetch(id).await;
                    guard.complete(result.clone());
                    return result;
                }
                Flight::Follower(waiter) => {
                    tracing::debug!(item = %id, "waiting for in-flight fetch");
                    match waiter.wait(self.inner.wait_timeout).await {
                        Landing::Completed(result) => return result,
                        Landing::Abandoned => {
                            tracing::debug!(item = %id, "in-flight fetch abandoned, retrying");
                        }
                    }
                }
            }
        }
    }

    async fn fetch(&self, id: &ItemId) -> Result<(), Error> {
        let store = self.store();
        if store.get(id).is_some() && !self.is_expired(id) {
            return Ok(());
        }

        tracing::info!(item = %id, "start fetching");
        self.inner.chain.fetch(id, store).await
    }
}
