//! HTTP transport seam for the negotiator.
//!
//! The negotiator only needs `send(method, url, body, headers) -> {status, body, headers}`.
//! [`HttpTransport`] captures that contract; [`ReqwestTransport`] implements it on
//! top of a [`reqwest::Client`]. Transports perform a single call and never retry:
//! retry policy belongs to the negotiator, which knows which calls are safe to repeat.

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Default per-request timeout of [`ReqwestTransport`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An outgoing request, owned so it can be replayed with a payment header attached.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Copy of this request carrying `name: value`.
    ///
    /// Fails when either part is not a valid HTTP header token.
    pub fn with_payment_header(&self, name: &str, value: &str) -> Result<Self, TransportError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::other(format!("invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::other(format!("invalid header value: {e}")))?;
        let mut request = self.clone();
        request.headers.insert(name, value);
        Ok(request)
    }
}

/// A response as seen by the negotiator.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Header value as a string. Names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Serialized as `{status, headers, body}`; a JSON body is embedded as JSON,
/// anything else as text.
impl Serialize for HttpResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
            .collect();
        let body = serde_json::from_slice::<Value>(&self.body).unwrap_or_else(|_| Value::String(self.text()));
        let mut s = serializer.serialize_struct("HttpResponse", 3)?;
        s.serialize_field("status", &self.status.as_u16())?;
        s.serialize_field("headers", &headers)?;
        s.serialize_field("body", &body)?;
        s.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Other,
}

/// A request that produced no response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }

    /// Timeouts and connection failures may succeed when tried again.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, TransportErrorKind::Timeout | TransportErrorKind::Connect)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            TransportErrorKind::Timeout
        } else if error.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, error.to_string())
    }
}

/// Sends one HTTP request. Implementations must not retry.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}

/// [`HttpTransport`] backed by [`reqwest`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// A transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(body: &[u8]) -> HttpResponse {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        HttpResponse {
            status: StatusCode::OK,
            headers,
            body: body.to_vec(),
        }
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = response(b"{}");
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.header("x-missing"), None);
    }

    #[test]
    fn test_response_serializes_json_body_inline() {
        let value = serde_json::to_value(response(br#"{"ok":true}"#)).unwrap();
        assert_eq!(value["status"], 200);
        assert_eq!(value["body"], json!({"ok": true}));
        assert_eq!(value["headers"]["content-type"], "application/json");
    }

    #[test]
    fn test_response_serializes_text_body_as_string() {
        let value = serde_json::to_value(response(b"hello")).unwrap();
        assert_eq!(value["body"], "hello");
    }

    #[test]
    fn test_payment_header_leaves_original_untouched() {
        let original = HttpRequest::get("https://api.example.com/paid".parse().unwrap());
        let paid = original.with_payment_header("Payment-Signature", "abc").unwrap();
        assert!(original.headers.is_empty());
        assert_eq!(paid.headers.get("payment-signature").unwrap(), "abc");
        assert!(original.with_payment_header("bad header", "abc").is_err());
    }

    #[test]
    fn test_transient_kinds() {
        assert!(TransportError::new(TransportErrorKind::Timeout, "t").is_transient());
        assert!(TransportError::new(TransportErrorKind::Connect, "c").is_transient());
        assert!(!TransportError::other("o").is_transient());
    }
}
