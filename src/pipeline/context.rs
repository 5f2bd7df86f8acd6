//! Per-request state threaded through the pipeline stages

use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use hyper::body::Bytes;
use hyper::header::HeaderName;
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method, Uri, Version};
use serde_json::{Map, Value};

use super::query;

/// How the request body was decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyKind {
    #[default]
    None,
    Json,
    Form,
}

pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub client_ip: IpAddr,
    /// Undecoded body, as read by the transport
    pub raw_body: Bytes,
    pub cookies: BTreeMap<String, String>,
    /// Decoded body; `{}` when there was none
    pub body: Value,
    pub body_kind: BodyKind,
    pub query: Map<String, Value>,
    /// Values the pollution guard dropped, keyed like `query`
    pub query_polluted: Map<String, Value>,
    pub body_polluted: Map<String, Value>,
    pub params: Map<String, Value>,
    pub requested_at: Option<DateTime<Utc>>,
    /// Write an access log line once the response is known
    pub access_log: bool,
    /// Set once a response has started going out for this request
    pub headers_sent: bool,
    /// Headers stages want on whatever response is finally sent
    pub response_headers: HeaderMap,
}

impl RequestContext {
    pub fn new(parts: Parts, client_ip: IpAddr, raw_body: Bytes) -> Self {
        let query = parts.uri.query().map(query::parse).unwrap_or_default();
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            client_ip,
            raw_body,
            cookies: BTreeMap::new(),
            body: Value::Object(Map::new()),
            body_kind: BodyKind::None,
            query,
            query_polluted: Map::new(),
            body_polluted: Map::new(),
            params: Map::new(),
            requested_at: None,
            access_log: false,
            headers_sent: false,
            response_headers: HeaderMap::new(),
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Path plus query, as the client sent it
    pub fn original_url(&self) -> &str {
        self.uri
            .path_and_query()
            .map_or_else(|| self.uri.path(), |pq| pq.as_str())
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Queue a header for the final response, replacing any earlier value
    pub fn set_response_header(&mut self, name: HeaderName, value: &str) {
        match value.parse() {
            Ok(v) => {
                self.response_headers.insert(name, v);
            }
            Err(e) => crate::logger::log_warning(&format!(
                "Dropping invalid {name} header value '{value}': {e}"
            )),
        }
    }

    pub fn body_object(&self) -> Option<&Map<String, Value>> {
        self.body.as_object()
    }
}

#[cfg(test)]
pub(crate) fn test_context(method: Method, uri: &str) -> RequestContext {
    let (parts, ()) = hyper::Request::builder()
        .method(method)
        .uri(uri)
        .body(())
        .expect("valid test request")
        .into_parts();
    RequestContext::new(parts, IpAddr::from([127, 0, 0, 1]), Bytes::new())
}
