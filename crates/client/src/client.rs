//! Host-facing client.
//!
//! A [`Client`] is built once from a [`ClientConfig`] and passed around by
//! reference (or cheaply cloned). Hosts that want a process-wide instance use
//! a [`SharedClient`], which reports [`Error::UninitializedClient`] instead of
//! panicking when used too early.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use sgtn_core::{CacheStore, ClientConfig, ComponentMessages, Error, ItemId, MessageError, MetadataTable};
use tokio::sync::broadcast;

use crate::local::BundleOrigin;
use crate::origin::{CacheOrigin, LocalCacheOrigin, OriginChain, RemoteCacheOrigin};
use crate::remote::ServerOrigin;
use crate::service::CacheService;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::translation::Translator;
use crate::version::{VersionFallback, VersionPicker, VersionResolver};

/// Builder for [`Client`] with optional injected collaborators.
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    cache: Option<Arc<dyn CacheStore>>,
    version_picker: Option<Arc<dyn VersionPicker>>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self { config, transport: None, cache: None, version_picker: None }
    }

    /// Use `transport` instead of the default reqwest transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Bind `store` as the cache instead of the default in-memory cache.
    pub fn cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(store);
        self
    }

    pub fn version_picker(mut self, picker: Arc<dyn VersionPicker>) -> Self {
        self.version_picker = Some(picker);
        self
    }

    /// Validate the configuration and assemble the origin chain.
    ///
    /// The remote origin, when configured, comes first; the local bundle
    /// directory second.
    pub fn build(self) -> Result<Client, Error> {
        let Self { config, transport, cache, version_picker } = self;
        config.validate()?;

        let metadata = Arc::new(MetadataTable::new(config.default_ttl_secs));
        let mut origins: Vec<Arc<dyn CacheOrigin>> = Vec::new();

        let server = match config.server_url.as_deref().map(str::trim).filter(|url| !url.is_empty()) {
            Some(server_url) => {
                let transport: Arc<dyn HttpTransport> = match transport {
                    Some(transport) => transport,
                    None => Arc::new(
                        ReqwestTransport::new(config.timeout(), &config.user_agent)
                            .map_err(|e| Error::Network(e.to_string()))?,
                    ),
                };
                let server = Arc::new(ServerOrigin::new(server_url, transport, config.retry_interval())?);
                server.set_headers(&config.headers);
                origins.push(Arc::new(RemoteCacheOrigin::new(Arc::clone(&server), Arc::clone(&metadata))));
                Some(server)
            }
            None => None,
        };

        if let Some(root) = config.local_bundles.as_deref().filter(|root| !root.as_os_str().is_empty()) {
            origins.push(Arc::new(LocalCacheOrigin::new(BundleOrigin::new(root))));
        }

        let service = CacheService::new(OriginChain::new(origins), config.wait_timeout());
        if let Some(store) = cache {
            service.register_cache(store);
        }

        let fallback_chain = config.fallback_chain();
        tracing::info!(
            server_url = ?config.server_url,
            local_bundles = ?config.local_bundles,
            fallback_chain = ?fallback_chain,
            "sgtn client initialized"
        );

        let translator = Translator::new(service, VersionResolver::new(version_picker), fallback_chain);
        Ok(Client { inner: Arc::new(ClientInner { config, translator, server, metadata }) })
    }
}

struct ClientInner {
    config: ClientConfig,
    translator: Translator,
    server: Option<Arc<ServerOrigin>>,
    metadata: Arc<MetadataTable>,
}

/// Resolves localized messages through the cache and origin chain.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Build a client with the default transport and cache.
    ///
    /// # Errors
    ///
    /// `Error::Config` when no origin or no default locale is configured, or
    /// when any other setting is invalid.
    pub fn initialize(config: ClientConfig) -> Result<Self, Error> {
        ClientBuilder::new(config).build()
    }

    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn fallback_chain(&self) -> &[String] {
        self.inner.translator.fallback_chain()
    }

    pub async fn get_string_message(
        &self, product: &str, version: &str, locale: &str, component: &str, key: &str, args: &[&str],
    ) -> Result<String, MessageError> {
        self.inner
            .translator
            .get_string_message(product, version, locale, component, key, args)
            .await
    }

    pub async fn get_component_messages(
        &self, product: &str, version: &str, locale: &str, component: &str,
    ) -> Result<Arc<ComponentMessages>, Error> {
        self.inner
            .translator
            .get_component_messages(product, version, locale, component)
            .await
    }

    pub async fn get_locale_list(&self, product: &str, version: &str) -> Result<Arc<Vec<String>>, Error> {
        self.inner.translator.get_locale_list(product, version).await
    }

    pub async fn get_component_list(&self, product: &str, version: &str) -> Result<Arc<Vec<String>>, Error> {
        self.inner.translator.get_component_list(product, version).await
    }

    /// Replace the extra headers sent to the remote service.
    pub fn set_custom_headers(&self, headers: &HashMap<String, String>) {
        match &self.inner.server {
            Some(server) => server.set_headers(headers),
            None => tracing::debug!("no remote origin configured, custom headers ignored"),
        }
    }

    /// Bind `store` as the cache. Ignored (returns `false`) once a store is
    /// in use.
    pub fn register_cache(&self, store: Arc<dyn CacheStore>) -> bool {
        self.inner.translator.service().register_cache(store)
    }

    /// Whether the cached copy of `id` is due for a refresh.
    pub fn is_expired(&self, id: &ItemId) -> bool {
        self.inner.translator.service().is_expired(id)
    }

    pub fn metadata(&self) -> &MetadataTable {
        &self.inner.metadata
    }

    /// Events for every lookup served from a substituted version.
    pub fn subscribe_version_fallback(&self) -> broadcast::Receiver<VersionFallback> {
        self.inner.translator.versions().subscribe()
    }
}

/// A client slot filled once per process.
#[derive(Default)]
pub struct SharedClient {
    slot: OnceLock<Client>,
}

impl SharedClient {
    pub const fn new() -> Self {
        Self { slot: OnceLock::new() }
    }

    /// Initialize the slot. A second call keeps the first client.
    pub fn initialize(&self, config: ClientConfig) -> Result<&Client, Error> {
        if self.slot.get().is_none() {
            let client = Client::initialize(config)?;
            if self.slot.set(client).is_err() {
                tracing::warn!("client initialized concurrently, keeping the first one");
            }
        } else {
            tracing::warn!("client already initialized, ignoring new configuration");
        }
        self.get()
    }

    pub fn get(&self) -> Result<&Client, Error> {
        self.slot.get().ok_or(Error::UninitializedClient)
    }
}
