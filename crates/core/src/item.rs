//! Item identity and cached payload types.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// What a cacheable unit holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Messages of one component in one locale.
    ComponentMessages,
    /// Locales available for a product version.
    LocaleList,
    /// Components available for a product version.
    ComponentList,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemKind::ComponentMessages => "component_messages",
            ItemKind::LocaleList => "locale_list",
            ItemKind::ComponentList => "component_list",
        };
        f.write_str(name)
    }
}

/// Identity of a cacheable unit; the cache key.
///
/// `locale` and `component` are empty for the list kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId {
    pub kind: ItemKind,
    pub product: String,
    pub version: String,
    pub locale: String,
    pub component: String,
}

impl ItemId {
    pub fn component_messages(
        product: impl Into<String>, version: impl Into<String>, locale: impl Into<String>, component: impl Into<String>,
    ) -> Self {
        Self {
            kind: ItemKind::ComponentMessages,
            product: product.into(),
            version: version.into(),
            locale: locale.into(),
            component: component.into(),
        }
    }

    pub fn locale_list(product: impl Into<String>, version: impl Into<String>) -> Self {
        Self::list(ItemKind::LocaleList, product, version)
    }

    pub fn component_list(product: impl Into<String>, version: impl Into<String>) -> Self {
        Self::list(ItemKind::ComponentList, product, version)
    }

    fn list(kind: ItemKind, product: impl Into<String>, version: impl Into<String>) -> Self {
        Self { kind, product: product.into(), version: version.into(), locale: String::new(), component: String::new() }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ItemKind::ComponentMessages => write!(
                f,
                "{}:{}/{}/{}/{}",
                self.kind, self.product, self.version, self.locale, self.component
            ),
            ItemKind::LocaleList | ItemKind::ComponentList => {
                write!(f, "{}:{}/{}", self.kind, self.product, self.version)
            }
        }
    }
}

/// Messages of one component in one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentMessages {
    messages: HashMap<String, String>,
}

impl ComponentMessages {
    pub fn new(messages: HashMap<String, String>) -> Self {
        Self { messages }
    }

    /// Look up a message by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.messages.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<HashMap<String, String>> for ComponentMessages {
    fn from(messages: HashMap<String, String>) -> Self {
        Self::new(messages)
    }
}

/// A resolved cache value. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Messages(Arc<ComponentMessages>),
    List(Arc<Vec<String>>),
}

impl Payload {
    pub fn messages(&self) -> Option<&Arc<ComponentMessages>> {
        match self {
            Payload::Messages(messages) => Some(messages),
            Payload::List(_) => None,
        }
    }

    pub fn list(&self) -> Option<&Arc<Vec<String>>> {
        match self {
            Payload::List(list) => Some(list),
            Payload::Messages(_) => None,
        }
    }
}

impl From<ComponentMessages> for Payload {
    fn from(messages: ComponentMessages) -> Self {
        Payload::Messages(Arc::new(messages))
    }
}

impl From<Vec<String>> for Payload {
    fn from(list: Vec<String>) -> Self {
        Payload::List(Arc::new(list))
    }
}
