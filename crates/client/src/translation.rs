//! Lookups with locale and version fallback.
//!
//! Every lookup validates its parameters, resolves the version through the
//! [`VersionResolver`] and builds an [`ItemId`] for the cache orchestrator.
//! Message lookups that fail for the requested locale are retried with the
//! locales that come after it in the fallback chain.

use std::sync::Arc;

use sgtn_core::{ComponentMessages, Error, ItemId, MessageError, Payload};

use crate::service::CacheService;
use crate::version::VersionResolver;

pub struct Translator {
    service: CacheService,
    versions: VersionResolver,
    fallback_chain: Vec<String>,
}

impl Translator {
    pub fn new(service: CacheService, versions: VersionResolver, fallback_chain: Vec<String>) -> Self {
        Self { service, versions, fallback_chain }
    }

    pub fn service(&self) -> &CacheService {
        &self.service
    }

    pub fn versions(&self) -> &VersionResolver {
        &self.versions
    }

    pub fn fallback_chain(&self) -> &[String] {
        &self.fallback_chain
    }

    /// Message `key` with `{0}`, `{1}`, ... replaced by `args`.
    ///
    /// On failure the error carries `key`, which callers can display instead.
    pub async fn get_string_message(
        &self, product: &str, version: &str, locale: &str, component: &str, key: &str, args: &[&str],
    ) -> Result<String, MessageError> {
        require(&[("product", product), ("version", version), ("locale", locale), ("component", component), ("key", key)])
            .map_err(|err| MessageError::new(key, err))?;
        let version = self.versions.resolve(product, version);

        let error = match self.message(product, &version, locale, component, key, args).await {
            Ok(message) => return Ok(message),
            Err(err) if !err.is_origin_failure() => return Err(MessageError::new(key, err)),
            Err(err) => err,
        };

        for fallback in self.fallbacks_after(locale) {
            tracing::warn!(from = locale, to = fallback, component, key, "fall back to locale");
            match self.message(product, &version, fallback, component, key, args).await {
                Ok(message) => return Ok(message),
                Err(err) => tracing::debug!(locale = fallback, error = %err, "fallback locale failed"),
            }
        }

        Err(MessageError::new(key, error))
    }

    /// All messages of `component`, with the same locale fallback as
    /// [`Translator::get_string_message`].
    pub async fn get_component_messages(
        &self, product: &str, version: &str, locale: &str, component: &str,
    ) -> Result<Arc<ComponentMessages>, Error> {
        require(&[("product", product), ("version", version), ("locale", locale), ("component", component)])?;
        let version = self.versions.resolve(product, version);

        let error = match self.component_messages(product, &version, locale, component).await {
            Ok(messages) => return Ok(messages),
            Err(err) if !err.is_origin_failure() => return Err(err),
            Err(err) => err,
        };

        for fallback in self.fallbacks_after(locale) {
            tracing::warn!(from = locale, to = fallback, component, "fall back to locale");
            match self.component_messages(product, &version, fallback, component).await {
                Ok(messages) => return Ok(messages),
                Err(err) => tracing::debug!(locale = fallback, error = %err, "fallback locale failed"),
            }
        }

        Err(error)
    }

    pub async fn get_locale_list(&self, product: &str, version: &str) -> Result<Arc<Vec<String>>, Error> {
        require(&[("product", product), ("version", version)])?;
        let version = self.versions.resolve(product, version);
        self.list(ItemId::locale_list(product, version)).await
    }

    pub async fn get_component_list(&self, product: &str, version: &str) -> Result<Arc<Vec<String>>, Error> {
        require(&[("product", product), ("version", version)])?;
        let version = self.versions.resolve(product, version);
        self.list(ItemId::component_list(product, version)).await
    }

    /// Chain entries strictly after `locale`; the whole chain if `locale` is not in it.
    fn fallbacks_after<'a>(&'a self, locale: &str) -> impl Iterator<Item = &'a str> {
        let start = self
            .fallback_chain
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(locale))
            .map_or(0, |index| index + 1);
        self.fallback_chain[start..].iter().map(String::as_str)
    }

    async fn message(
        &self, product: &str, version: &str, locale: &str, component: &str, key: &str, args: &[&str],
    ) -> Result<String, Error> {
        let messages = self.component_messages(product, version, locale, component).await?;
        let template = messages.get(key).ok_or_else(|| Error::MessageNotFound {
            locale: locale.to_string(),
            component: component.to_string(),
            key: key.to_string(),
        })?;
        Ok(format_message(template, args))
    }

    async fn component_messages(
        &self, product: &str, version: &str, locale: &str, component: &str,
    ) -> Result<Arc<ComponentMessages>, Error> {
        let id = ItemId::component_messages(product, version, locale, component);
        match self.service.get(&id).await? {
            Payload::Messages(messages) => Ok(messages),
            Payload::List(_) => Err(Error::InvalidItemKind(format!("{id} holds a list"))),
        }
    }

    async fn list(&self, id: ItemId) -> Result<Arc<Vec<String>>, Error> {
        match self.service.get(&id).await? {
            Payload::List(list) => Ok(list),
            Payload::Messages(_) => Err(Error::InvalidItemKind(format!("{id} holds messages"))),
        }
    }
}

/// Replace the first occurrence of each `{i}` with `args[i]`.
pub fn format_message(template: &str, args: &[&str]) -> String {
    args.iter()
        .enumerate()
        .fold(template.to_string(), |message, (index, arg)| message.replacen(&format!("{{{index}}}"), arg, 1))
}

fn require(fields: &[(&str, &str)]) -> Result<(), Error> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(Error::InvalidParameters(format!("{name} is empty"))),
        None => Ok(()),
    }
}
