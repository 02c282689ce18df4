//! Scripted transport and fixtures shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::transport::{HttpResponse, HttpTransport, TransportError};

type Reply = Result<HttpResponse, TransportError>;

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub url: Url,
    pub headers: HeaderMap,
}

/// Replays queued replies in order, then repeats the fallback reply (if any).
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    queue: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Option<Reply>>,
    requests: Mutex<Vec<RecordedRequest>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request sleeps for `delay` before replying.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub fn push(&self, reply: HttpResponse) {
        self.queue.lock().unwrap().push_back(Ok(reply));
    }

    pub fn push_timeout(&self) {
        self.queue.lock().unwrap().push_back(Err(TransportError::Timeout("scripted timeout".into())));
    }

    pub fn always(&self, reply: HttpResponse) {
        *self.fallback.lock().unwrap() = Some(Ok(reply));
    }

    pub fn always_fail(&self) {
        *self.fallback.lock().unwrap() = Some(Err(TransportError::Request("connection refused".into())));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &Url, headers: &HeaderMap) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push(RecordedRequest { url: url.clone(), headers: headers.clone() });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.queue.lock().unwrap().pop_front();
        match queued {
            Some(reply) => reply,
            None => self
                .fallback
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(TransportError::Request("no scripted reply".into()))),
        }
    }
}

/// A reply with the given status, headers and body.
pub(crate) fn json_reply(status: u16, headers: &[(&str, &str)], body: String) -> HttpResponse {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(HeaderName::from_bytes(name.as_bytes()).unwrap(), HeaderValue::from_str(value).unwrap());
    }
    HttpResponse { status: StatusCode::from_u16(status).unwrap(), headers: map, body: Bytes::from(body) }
}

/// Envelope for a component-messages response.
pub(crate) fn component_body(locale: &str, component: &str, messages: &[(&str, &str)]) -> String {
    let messages: serde_json::Map<String, serde_json::Value> =
        messages.iter().map(|(k, v)| (k.to_string(), serde_json::Value::from(*v))).collect();
    serde_json::json!({
        "response": {"code": 200, "message": "OK", "serverTime": ""},
        "signature": "",
        "data": {
            "productName": "SgtnTest",
            "version": "1.0.0",
            "locales": [locale],
            "components": [component],
            "bundles": [{"component": component, "locale": locale, "messages": messages}]
        }
    })
    .to_string()
}

/// Envelope for a list response; `field` is `locales` or `components`.
pub(crate) fn list_body(field: &str, values: &[&str]) -> String {
    let mut data = serde_json::Map::new();
    data.insert(field.to_string(), serde_json::Value::from(values.to_vec()));
    serde_json::json!({
        "response": {"code": 200, "message": "OK", "serverTime": ""},
        "data": data
    })
    .to_string()
}

/// Write a local bundle file under `root`.
pub(crate) fn write_bundle(
    root: &std::path::Path, product: &str, version: &str, component: &str, file_name: &str, messages: &[(&str, &str)],
) {
    let dir = root.join(product).join(version).join(component);
    std::fs::create_dir_all(&dir).unwrap();
    let messages: serde_json::Map<String, serde_json::Value> =
        messages.iter().map(|(k, v)| (k.to_string(), serde_json::Value::from(*v))).collect();
    let body = serde_json::json!({"component": component, "locale": "", "messages": messages});
    std::fs::write(dir.join(file_name), body.to_string()).unwrap();
}
