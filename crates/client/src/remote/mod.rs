//! Remote translation service origin.
//!
//! ### Endpoints
//!
//! Relative to the configured base URL:
//! - component messages: `/i18n/api/v2/translation/products/{product}/versions/{version}?locales=..&components=..`
//! - locale list: `.../versions/{version}/localelist`
//! - component list: `.../versions/{version}/componentlist`
//!
//! ### Behaviour
//! - Sends `If-None-Match` when a validator is supplied; a `304` is reported
//!   as [`ServerReply::NotModified`].
//! - A network timeout opens the [`CircuitBreaker`]; while open, requests
//!   fail with `ServerUnavailable` without any I/O.
//! - Non-2xx statuses and business codes outside the success ranges become
//!   `Error::Server`. The breaker is left alone for those.

pub mod breaker;
pub mod response;

pub use breaker::{BreakerStatus, CircuitBreaker};
pub use response::Envelope;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, IF_NONE_MATCH};
use sgtn_core::{Error, ItemId, ItemKind, Payload};
use url::Url;

use crate::transport::{HttpTransport, TransportError};

const API_ROOT: [&str; 4] = ["i18n", "api", "v2", "translation"];

/// Outcome of a successful remote request.
#[derive(Debug, Clone)]
pub enum ServerReply {
    Updated(Payload),
    NotModified,
}

/// Reply plus the response headers the cache layer derives metadata from.
#[derive(Debug, Clone)]
pub struct ServerResponse {
    pub reply: ServerReply,
    pub headers: HeaderMap,
}

/// Origin backed by the remote translation service.
#[derive(Debug)]
pub struct ServerOrigin {
    base_url: Url,
    transport: Arc<dyn HttpTransport>,
    headers: RwLock<Arc<HeaderMap>>,
    breaker: CircuitBreaker,
}

impl ServerOrigin {
    pub fn new(base_url: &str, transport: Arc<dyn HttpTransport>, retry_interval: Duration) -> Result<Self, Error> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| Error::InvalidParameters(format!("invalid server url {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidParameters(format!("server url {base_url} cannot be a base")));
        }

        Ok(Self {
            base_url,
            transport,
            headers: RwLock::new(Arc::new(HeaderMap::new())),
            breaker: CircuitBreaker::new(retry_interval),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Replace the extra headers sent with every request.
    ///
    /// Requests already in flight keep the previous set.
    pub fn set_headers(&self, headers: &HashMap<String, String>) {
        let map = to_header_map(headers);
        let mut current = self.headers.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Arc::new(map);
    }

    fn headers(&self) -> Arc<HeaderMap> {
        Arc::clone(&self.headers.read().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    /// Build the request URL for `id`.
    pub fn url_for(&self, id: &ItemId) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(API_ROOT)
                .extend(["products", id.product.as_str(), "versions", id.version.as_str()]);
            match id.kind {
                ItemKind::ComponentMessages => {}
                ItemKind::LocaleList => {
                    segments.push("localelist");
                }
                ItemKind::ComponentList => {
                    segments.push("componentlist");
                }
            }
        }

        if id.kind == ItemKind::ComponentMessages {
            url.query_pairs_mut()
                .append_pair("locales", &id.locale)
                .append_pair("components", &id.component);
        }
        url
    }

    /// Fetch `id`, sending `etag` as `If-None-Match` when given.
    pub async fn get(&self, id: &ItemId, etag: Option<&str>) -> Result<ServerResponse, Error> {
        if !self.breaker.allow_request() {
            tracing::debug!(item = %id, "remote origin is cooling down after a timeout");
            return Err(Error::ServerUnavailable);
        }

        let url = self.url_for(id);
        let mut headers = HeaderMap::clone(&self.headers());
        if let Some(etag) = etag.filter(|etag| !etag.is_empty()) {
            match HeaderValue::from_str(etag) {
                Ok(value) => {
                    headers.insert(IF_NONE_MATCH, value);
                }
                Err(_) => tracing::warn!(item = %id, etag, "ignoring ETag that is not a valid header value"),
            }
        }

        tracing::debug!(item = %id, url = %url, conditional = headers.contains_key(IF_NONE_MATCH), "querying remote origin");

        let response = match self.transport.get(&url, &headers).await {
            Ok(response) => response,
            Err(TransportError::Timeout(msg)) => {
                self.breaker.trip();
                tracing::warn!(item = %id, url = %url, "remote origin timed out");
                return Err(Error::NetworkTimeout(msg));
            }
            Err(TransportError::Request(msg)) => return Err(Error::Network(msg)),
        };

        let status = response.status;
        if status == StatusCode::NOT_MODIFIED {
            return Ok(ServerResponse { reply: ServerReply::NotModified, headers: response.headers });
        }

        if !status.is_success() {
            let (business_code, message) = match Envelope::parse(&response.body) {
                Ok(envelope) => (envelope.response.code, envelope.response.message),
                Err(_) => (0, status.canonical_reason().unwrap_or_default().to_string()),
            };
            return Err(Error::Server { http_code: status.as_u16(), business_code, message });
        }

        let envelope = Envelope::parse(&response.body)?;
        if !envelope.response.is_success() {
            return Err(Error::Server {
                http_code: status.as_u16(),
                business_code: envelope.response.code,
                message: envelope.response.message,
            });
        }

        let payload = envelope.into_payload(id.kind)?;
        Ok(ServerResponse { reply: ServerReply::Updated(payload), headers: response.headers })
    }
}

fn to_header_map(headers: &HashMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "skipping invalid custom header"),
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedTransport, component_body, json_reply, list_body};

    fn origin(transport: &Arc<ScriptedTransport>) -> ServerOrigin {
        ServerOrigin::new("https://l10n.example.com/base/", transport.clone(), Duration::from_millis(100)).unwrap()
    }

    #[test]
    fn test_url_for_each_kind() {
        let transport = Arc::new(ScriptedTransport::new());
        let origin = origin(&transport);

        let url = origin.url_for(&ItemId::component_messages("SgtnTest", "1.0.0", "zh-Hans", "sun glow"));
        assert_eq!(
            url.as_str(),
            "https://l10n.example.com/base/i18n/api/v2/translation/products/SgtnTest/versions/1.0.0?locales=zh-Hans&components=sun+glow"
        );

        let url = origin.url_for(&ItemId::locale_list("SgtnTest", "1.0.0"));
        assert_eq!(
            url.as_str(),
            "https://l10n.example.com/base/i18n/api/v2/translation/products/SgtnTest/versions/1.0.0/localelist"
        );

        let url = origin.url_for(&ItemId::component_list("SgtnTest", "1.0.0"));
        assert!(url.path().ends_with("/versions/1.0.0/componentlist"));
        assert!(url.query().is_none());
    }

    #[tokio::test]
    async fn test_get_component_messages() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(json_reply(200, &[("ETag", "1234567890")], component_body("fr", "sunglow", &[("message", "Message-fr")])));
        let origin = origin(&transport);

        let id = ItemId::component_messages("SgtnTest", "1.0.0", "fr", "sunglow");
        let response = origin.get(&id, None).await.unwrap();

        let ServerReply::Updated(payload) = response.reply else { panic!("expected new data") };
        assert_eq!(payload.messages().unwrap().get("message"), Some("Message-fr"));
        assert_eq!(response.headers.get("etag").unwrap(), "1234567890");
        assert!(!transport.requests()[0].headers.contains_key(IF_NONE_MATCH));
    }

    #[tokio::test]
    async fn test_get_sends_if_none_match_and_custom_headers() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(json_reply(304, &[], String::new()));
        let origin = origin(&transport);
        origin.set_headers(&HashMap::from([
            ("X-Tenant".to_string(), "acme".to_string()),
            ("bad header".to_string(), "x".to_string()),
        ]));

        let id = ItemId::locale_list("SgtnTest", "1.0.0");
        let response = origin.get(&id, Some("1234567890")).await.unwrap();

        assert!(matches!(response.reply, ServerReply::NotModified));
        let request = &transport.requests()[0];
        assert_eq!(request.headers.get(IF_NONE_MATCH).unwrap(), "1234567890");
        assert_eq!(request.headers.get("x-tenant").unwrap(), "acme");
        assert_eq!(request.headers.len(), 2);
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(json_reply(404, &[], r#"{"response": {"code": 404, "message": "no such product"}}"#.into()));
        let origin = origin(&transport);

        let result = origin.get(&ItemId::component_list("Nope", "1.0.0"), None).await;
        match result {
            Err(Error::Server { http_code, business_code, message }) => {
                assert_eq!(http_code, 404);
                assert_eq!(business_code, 404);
                assert_eq!(message, "no such product");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(origin.breaker().status(), BreakerStatus::Normal);
    }

    #[tokio::test]
    async fn test_business_error_code() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(json_reply(200, &[], r#"{"response": {"code": 500, "message": "backend down"}, "data": null}"#.into()));
        let origin = origin(&transport);

        let result = origin.get(&ItemId::component_list("SgtnTest", "1.0.0"), None).await;
        assert!(matches!(result, Err(Error::Server { http_code: 200, business_code: 500, .. })));
    }

    #[tokio::test]
    async fn test_business_code_in_600_range_is_success() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(json_reply(200, &[], list_body("locales", &["en", "fr"]).replace("200", "604")));
        let origin = origin(&transport);

        let response = origin.get(&ItemId::locale_list("SgtnTest", "1.0.0"), None).await.unwrap();
        assert!(matches!(response.reply, ServerReply::Updated(_)));
    }

    #[tokio::test]
    async fn test_wrong_server_data() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(json_reply(200, &[], "not json".into()));
        let origin = origin(&transport);

        let result = origin.get(&ItemId::component_list("SgtnTest", "1.0.0"), None).await;
        assert!(matches!(result, Err(Error::WrongServerData(_))));
    }

    #[tokio::test]
    async fn test_timeout_opens_breaker_without_further_io() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_timeout();
        transport.push(json_reply(200, &[], list_body("components", &["sunglow"])));
        let origin = origin(&transport);
        let id = ItemId::component_list("SgtnTest", "1.0.0");

        assert!(matches!(origin.get(&id, None).await, Err(Error::NetworkTimeout(_))));
        assert_eq!(origin.breaker().status(), BreakerStatus::TimedOut);

        assert!(matches!(origin.get(&id, None).await, Err(Error::ServerUnavailable)));
        assert_eq!(transport.calls(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(origin.get(&id, None).await.is_ok());
        assert_eq!(transport.calls(), 2);
        assert_eq!(origin.breaker().status(), BreakerStatus::Normal);
    }

    #[tokio::test]
    async fn test_network_error_leaves_breaker_closed() {
        let transport = Arc::new(ScriptedTransport::new());
        let origin = origin(&transport);

        let result = origin.get(&ItemId::component_list("SgtnTest", "1.0.0"), None).await;
        assert!(matches!(result, Err(Error::Network(_))));
        assert_eq!(origin.breaker().status(), BreakerStatus::Normal);
    }
}
