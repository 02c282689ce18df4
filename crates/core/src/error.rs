//! Unified error types for the sgtn client.
//!
//! Every variant renders with a stable code prefix so callers and logs can
//! match on the failure class without parsing free text.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ConfigError;

/// Unified error types for the sgtn client.
///
/// `Clone` so that the outcome of a single in-flight fetch can be handed to
/// every caller waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A required lookup parameter was empty.
    #[error("INVALID_PARAMETERS: {0}")]
    InvalidParameters(String),

    /// An origin was asked for an item kind it cannot serve.
    #[error("INVALID_ITEM_KIND: {0}")]
    InvalidItemKind(String),

    /// The client was used before it was initialized.
    #[error("UNINITIALIZED_CLIENT: client is not initialized")]
    UninitializedClient,

    /// Configuration was rejected at initialization.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The remote service rejected the request.
    #[error("SERVER_ERROR: HTTP code {http_code}, business code {business_code}: {message}")]
    Server { http_code: u16, business_code: i64, message: String },

    /// The remote service answered with a success status but an unusable body.
    #[error("WRONG_SERVER_DATA: {0}")]
    WrongServerData(String),

    /// A local bundle file exists but its content is unusable.
    #[error("WRONG_LOCAL_DATA: {0}")]
    WrongLocalData(String),

    /// The remote request timed out. Trips the circuit breaker.
    #[error("NETWORK_TIMEOUT: {0}")]
    NetworkTimeout(String),

    /// Any other transport-level failure.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// The circuit breaker is open; no request was sent.
    #[error("SERVER_UNAVAILABLE: server timed out recently, retry later")]
    ServerUnavailable,

    /// Local bundle I/O failed.
    #[error("FILESYSTEM_ERROR: {}: {source}", path.display())]
    Filesystem { path: PathBuf, source: Arc<std::io::Error> },

    /// The key is absent from the component's messages.
    #[error("MESSAGE_NOT_FOUND: locale {locale}, component {component}, key {key}")]
    MessageNotFound { locale: String, component: String, key: String },

    /// A populate reported success but the cache still misses the item.
    #[error("INTERNAL_CACHE_INCONSISTENCY: {0}")]
    InternalCacheInconsistency(String),

    /// Gave up waiting on another caller's in-flight fetch.
    #[error("WAIT_TIMEOUT: {0}")]
    WaitTimeout(String),
}

impl Error {
    /// Build a filesystem error for `path`.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem { path: path.into(), source: Arc::new(source) }
    }

    /// Whether this error came from an origin and may succeed elsewhere
    /// (another origin, another locale).
    pub fn is_origin_failure(&self) -> bool {
        !matches!(
            self,
            Error::InvalidParameters(_) | Error::UninitializedClient | Error::Config(_) | Error::InternalCacheInconsistency(_)
        )
    }
}

/// Failure of a string message lookup.
///
/// Carries the key that was asked for, so callers always have something to
/// display even when every locale failed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{error}")]
pub struct MessageError {
    /// The key that was looked up.
    pub key: String,
    /// The error surfaced for the lookup.
    #[source]
    pub error: Error,
}

impl MessageError {
    pub fn new(key: impl Into<String>, error: Error) -> Self {
        Self { key: key.into(), error }
    }

    /// Text to show in place of the missing message: the key itself.
    pub fn fallback_text(&self) -> &str {
        &self.key
    }
}
