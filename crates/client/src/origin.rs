//! Cache-aware origins and the ranked origin chain.
//!
//! Raw origins know how to fetch. The wrappers here add the freshness policy
//! the orchestrator needs:
//!
//! - [`RemoteCacheOrigin`] keeps the metadata table current from response
//!   headers (`Cache-Control: max-age`, `ETag`) and reports an item expired
//!   once its TTL has run out.
//! - [`LocalCacheOrigin`] never expires anything; once cached, a bundle from
//!   disk stays for the life of the process.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{CACHE_CONTROL, ETAG, HeaderMap};
use sgtn_core::{CacheStore, ConfigError, Error, ItemId, MetadataTable, Payload, cache::unix_now};

use crate::local::BundleOrigin;
use crate::remote::{ServerOrigin, ServerReply};

static MAX_AGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bmax-age\b\s*=\s*\b(\d+)\b").expect("max-age pattern is valid"));

/// What an origin produced for an item.
#[derive(Debug, Clone)]
pub enum Fetched {
    /// New data to store.
    Data(Payload),
    /// The cached payload is still current.
    NotModified,
}

/// An origin as seen by the orchestrator.
#[async_trait]
pub trait CacheOrigin: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Whether the cached copy of `id` is due for a refresh from this origin.
    fn is_expired(&self, id: &ItemId) -> bool;

    /// Fetch `id`. `cached` tells the origin whether the store still holds a
    /// payload, which decides if a conditional request is allowed.
    async fn fetch(&self, id: &ItemId, cached: bool) -> Result<Fetched, Error>;
}

/// Remote origin with HTTP cache semantics.
pub struct RemoteCacheOrigin {
    server: Arc<ServerOrigin>,
    metadata: Arc<MetadataTable>,
}

impl RemoteCacheOrigin {
    pub fn new(server: Arc<ServerOrigin>, metadata: Arc<MetadataTable>) -> Self {
        Self { server, metadata }
    }
}

#[async_trait]
impl CacheOrigin for RemoteCacheOrigin {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn is_expired(&self, id: &ItemId) -> bool {
        self.metadata.get(id).is_expired()
    }

    async fn fetch(&self, id: &ItemId, cached: bool) -> Result<Fetched, Error> {
        let mut info = self.metadata.get(id);
        let etag = if cached { info.etag.as_deref() } else { None };

        let response = self.server.get(id, etag).await?;
        info.last_update = unix_now();

        let fetched = match response.reply {
            ServerReply::NotModified => {
                if let Some(ttl) = max_age(&response.headers) {
                    info.ttl_secs = ttl;
                }
                Fetched::NotModified
            }
            ServerReply::Updated(payload) => {
                info.ttl_secs = ttl_from_headers(&response.headers, self.metadata.default_ttl_secs());
                info.etag = response
                    .headers
                    .get(ETAG)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                Fetched::Data(payload)
            }
        };

        tracing::debug!(item = %id, ttl_secs = info.ttl_secs, etag = ?info.etag, "remote metadata refreshed");
        self.metadata.set(id.clone(), info);
        Ok(fetched)
    }
}

/// Local bundle origin; cached bundles never expire.
pub struct LocalCacheOrigin {
    bundles: BundleOrigin,
}

impl LocalCacheOrigin {
    pub fn new(bundles: BundleOrigin) -> Self {
        Self { bundles }
    }
}

#[async_trait]
impl CacheOrigin for LocalCacheOrigin {
    fn name(&self) -> &'static str {
        "local"
    }

    fn is_expired(&self, _id: &ItemId) -> bool {
        false
    }

    async fn fetch(&self, id: &ItemId, _cached: bool) -> Result<Fetched, Error> {
        self.bundles.get(id).await.map(Fetched::Data)
    }
}

/// `max-age` from `Cache-Control`, if present and well formed.
pub fn max_age(headers: &HeaderMap) -> Option<i64> {
    let cache_control = headers.get(CACHE_CONTROL)?.to_str().ok()?;
    MAX_AGE
        .captures(cache_control)
        .and_then(|captures| captures.get(1))
        .and_then(|age| age.as_str().parse().ok())
}

/// TTL for a fresh response: `max-age`, else `default_ttl_secs` with a warning.
pub fn ttl_from_headers(headers: &HeaderMap, default_ttl_secs: i64) -> i64 {
    max_age(headers).unwrap_or_else(|| {
        tracing::warn!(
            cache_control = ?headers.get(CACHE_CONTROL),
            default_ttl_secs,
            "missing or malformed Cache-Control, using default TTL"
        );
        default_ttl_secs
    })
}

/// Origins in priority order.
#[derive(Default)]
pub struct OriginChain {
    origins: Vec<Arc<dyn CacheOrigin>>,
}

impl OriginChain {
    pub fn new(origins: Vec<Arc<dyn CacheOrigin>>) -> Self {
        Self { origins }
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Staleness is decided by the first origin alone.
    pub fn is_expired(&self, id: &ItemId) -> bool {
        self.origins.first().is_some_and(|origin| origin.is_expired(id))
    }

    /// Try each origin in order until one succeeds, storing new data in `store`.
    ///
    /// An origin under which the cached item is still fresh counts as a
    /// success without being called. When every origin fails the last error
    /// is returned and the store is left untouched.
    pub async fn fetch(&self, id: &ItemId, store: &Arc<dyn CacheStore>) -> Result<(), Error> {
        let cached = store.get(id).is_some();
        let mut last_error = None;

        for origin in &self.origins {
            if cached && !origin.is_expired(id) {
                return Ok(());
            }

            let result = match origin.fetch(id, cached).await {
                Ok(Fetched::Data(payload)) => {
                    store.set(id.clone(), payload);
                    Ok(())
                }
                Ok(Fetched::NotModified) if cached => Ok(()),
                Ok(Fetched::NotModified) => {
                    Err(Error::WrongServerData("not modified reply for an item that is not cached".into()))
                }
                Err(err) => Err(err),
            };

            match result {
                Ok(()) => {
                    tracing::debug!(item = %id, origin = origin.name(), "origin query succeeded");
                    return Ok(());
                }
                Err(err) => {
                    tracing::error!(item = %id, origin = origin.name(), error = %err, "origin query failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or(Error::Config(ConfigError::NoOriginConfigured)))
    }
}
