//! Translation service response envelope and payload decoding.

use std::collections::HashMap;

use serde::Deserialize;
use sgtn_core::{ComponentMessages, Error, ItemKind, Payload};

/// Raw response body from the translation service.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub response: ResponseStatus,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Business-level outcome carried in every envelope.
#[derive(Debug, Deserialize)]
pub struct ResponseStatus {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "serverTime")]
    pub server_time: String,
}

impl ResponseStatus {
    /// Success is a code in `[200, 300)` or `[600, 700)`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code) || (600..700).contains(&self.code)
    }
}

/// `data` of a component-messages response.
#[derive(Debug, Deserialize)]
pub struct ProductData {
    #[serde(default, rename = "productName")]
    pub product_name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub locales: Vec<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub bundles: Vec<BundleData>,
}

/// One component/locale bundle inside [`ProductData`].
#[derive(Debug, Deserialize)]
pub struct BundleData {
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub messages: Option<HashMap<String, String>>,
}

/// `data` of a locale-list response.
#[derive(Debug, Deserialize)]
pub struct LocaleListData {
    pub locales: Option<Vec<String>>,
}

/// `data` of a component-list response.
#[derive(Debug, Deserialize)]
pub struct ComponentListData {
    pub components: Option<Vec<String>>,
}

impl Envelope {
    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(body).map_err(|e| Error::WrongServerData(format!("malformed response envelope: {e}")))
    }

    /// Map `data` to the payload expected for `kind`.
    pub fn into_payload(self, kind: ItemKind) -> Result<Payload, Error> {
        match kind {
            ItemKind::ComponentMessages => {
                let product: ProductData = decode(self.data)?;
                let [bundle] = <[BundleData; 1]>::try_from(product.bundles).map_err(|bundles| {
                    Error::WrongServerData(format!("expected exactly one bundle, got {}", bundles.len()))
                })?;
                match bundle.messages {
                    Some(messages) if !messages.is_empty() => Ok(ComponentMessages::new(messages).into()),
                    _ => Err(Error::WrongServerData(format!(
                        "bundle {}/{} has no messages",
                        bundle.component, bundle.locale
                    ))),
                }
            }
            ItemKind::LocaleList => {
                let data: LocaleListData = decode(self.data)?;
                data.locales
                    .map(Payload::from)
                    .ok_or_else(|| Error::WrongServerData("locale list is missing".into()))
            }
            ItemKind::ComponentList => {
                let data: ComponentListData = decode(self.data)?;
                data.components
                    .map(Payload::from)
                    .ok_or_else(|| Error::WrongServerData("component list is missing".into()))
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(data: serde_json::Value) -> Result<T, Error> {
    serde_json::from_value(data).map_err(|e| Error::WrongServerData(format!("unexpected data shape: {e}")))
}
