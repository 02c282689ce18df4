//! Version fallback.
//!
//! The catalog of released versions lives outside this crate. A host that
//! knows it supplies a [`VersionPicker`]; the client asks it for the version
//! to use before building an item identity and announces every substitution.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Maps a requested version to the version that should actually be used.
pub trait VersionPicker: Send + Sync {
    fn pick(&self, product: &str, version: &str) -> String;
}

impl<F> VersionPicker for F
where
    F: Fn(&str, &str) -> String + Send + Sync,
{
    fn pick(&self, product: &str, version: &str) -> String {
        self(product, version)
    }
}

/// A lookup was served from a different version than requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionFallback {
    pub product: String,
    pub requested: String,
    pub picked: String,
}

/// Applies the optional picker and broadcasts substitutions.
pub struct VersionResolver {
    picker: Option<Arc<dyn VersionPicker>>,
    events: broadcast::Sender<VersionFallback>,
}

impl VersionResolver {
    pub fn new(picker: Option<Arc<dyn VersionPicker>>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { picker, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VersionFallback> {
        self.events.subscribe()
    }

    /// The version to look up for `product`/`version`.
    pub fn resolve(&self, product: &str, version: &str) -> String {
        let Some(picker) = &self.picker else {
            return version.to_string();
        };

        let picked = picker.pick(product, version);
        if picked != version {
            tracing::warn!(product, from = version, to = %picked, "version fallback occurs");
            // No receivers is fine.
            let _ = self.events.send(VersionFallback {
                product: product.to_string(),
                requested: version.to_string(),
                picked: picked.clone(),
            });
        }
        picked
    }
}

impl Default for VersionResolver {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_picker_keeps_version() {
        let resolver = VersionResolver::default();
        assert_eq!(resolver.resolve("SgtnTest", "1.0.0"), "1.0.0");
    }

    #[test]
    fn test_fallback_is_broadcast() {
        let picker = |_: &str, version: &str| if version == "9.9.9" { "1.0.0".to_string() } else { version.to_string() };
        let resolver = VersionResolver::new(Some(Arc::new(picker)));
        let mut events = resolver.subscribe();

        assert_eq!(resolver.resolve("SgtnTest", "1.0.0"), "1.0.0");
        assert!(events.try_recv().is_err());

        assert_eq!(resolver.resolve("SgtnTest", "9.9.9"), "1.0.0");
        let event = events.try_recv().unwrap();
        assert_eq!(
            event,
            VersionFallback { product: "SgtnTest".into(), requested: "9.9.9".into(), picked: "1.0.0".into() }
        );
    }

    #[test]
    fn test_fallback_without_subscribers() {
        let resolver = VersionResolver::new(Some(Arc::new(|_: &str, _: &str| "2.0.0".to_string())));
        assert_eq!(resolver.resolve("SgtnTest", "1.0.0"), "2.0.0");
    }
}
