//! Core types and shared functionality for the sgtn client.
//!
//! This crate provides:
//! - Item identity and payload types used as cache keys and values
//! - Pluggable cache store with a concurrent in-memory default
//! - Cache metadata table (TTL, ETag, last update)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod item;

pub use cache::{CacheMetadata, CacheStore, MemoryCache, MetadataTable};
pub use config::{ClientConfig, ConfigError};
pub use error::{Error, MessageError};
pub use item::{ComponentMessages, ItemId, ItemKind, Payload};
