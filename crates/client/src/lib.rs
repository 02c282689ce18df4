//! Client library for resolving localized message bundles.
//!
//! Lookups go through an in-process cache backed by a ranked chain of
//! origins: the remote translation service (conditional GET, circuit
//! breaker) and a local bundle directory. Stale entries are served
//! immediately and refreshed in the background; concurrent misses for the
//! same item share a single fetch.

pub mod client;
pub mod flight;
pub mod local;
pub mod origin;
pub mod remote;
pub mod service;
pub mod translation;
pub mod transport;
pub mod version;

#[cfg(test)]
mod test_support;

pub use client::{Client, ClientBuilder, SharedClient};
pub use local::BundleOrigin;
pub use origin::{CacheOrigin, Fetched, LocalCacheOrigin, OriginChain, RemoteCacheOrigin};
pub use remote::{BreakerStatus, CircuitBreaker, ServerOrigin, ServerReply, ServerResponse};
pub use service::CacheService;
pub use translation::{Translator, format_message};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};
pub use version::{VersionFallback, VersionPicker, VersionResolver};

pub use sgtn_core::{
    CacheMetadata, CacheStore, ClientConfig, ComponentMessages, ConfigError, Error, ItemId, ItemKind, MemoryCache,
    MessageError, MetadataTable, Payload,
};

/// Install `dispatch` as the process-wide `tracing` dispatcher.
///
/// # Errors
///
/// Fails if a global dispatcher is already installed.
pub fn set_logger(dispatch: tracing::Dispatch) -> Result<(), tracing::dispatcher::SetGlobalDefaultError> {
    tracing::dispatcher::set_global_default(dispatch)
}
