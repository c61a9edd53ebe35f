use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use serde::Serialize;
use serde_json::Value;

use crate::data::{AbortSignal, MultipartForm, ProgressCallback};
use crate::error::Result;

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Bytes(Bytes),
    Multipart(MultipartForm),
}

impl Body {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Body::Bytes(Bytes::from(serde_json::to_vec(value)?)))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Body::Bytes(Bytes::from(text.into()))
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Body::Bytes(b) => Some(b),
            Body::Multipart(_) => None,
        }
    }

    /// Decode a byte body as JSON, if it is one.
    pub fn as_json(&self) -> Option<Value> {
        self.as_bytes().and_then(|b| serde_json::from_slice(b).ok())
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Body::Multipart(_))
    }
}

/// Everything about a request except its URL.
///
/// Unset fields fall back to whatever a request being wrapped already
/// carries; see [`RequestConfig::layered_over`].
#[derive(Clone, Default)]
pub struct RequestConfig {
    pub method: Option<Method>,
    pub headers: HeaderMap,
    pub body: Option<Body>,
    pub timeout: Option<Duration>,
    pub signal: Option<AbortSignal>,
    pub on_progress: Option<ProgressCallback>,
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .field("signal", &self.signal)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "{ ... }"))
            .finish()
    }
}

impl RequestConfig {
    pub fn new(method: Method) -> Self {
        Self {
            method: Some(method),
            ..Self::default()
        }
    }

    /// The verb to send; GET when unset.
    pub fn method(&self) -> Method {
        self.method.clone().unwrap_or(Method::GET)
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    #[must_use]
    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    #[must_use]
    pub fn on_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Merge onto `base`; fields set on `self` take precedence.
    #[must_use]
    pub fn layered_over(self, base: RequestConfig) -> RequestConfig {
        let mut headers = base.headers;
        for (name, value) in self.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
        RequestConfig {
            method: self.method.or(base.method),
            headers,
            body: self.body.or(base.body),
            timeout: self.timeout.or(base.timeout),
            signal: self.signal.or(base.signal),
            on_progress: self.on_progress.or(base.on_progress),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub config: RequestConfig,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>, config: RequestConfig) -> Self {
        Self {
            url: url.into(),
            config,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url, RequestConfig::new(Method::GET))
    }

    pub fn method(&self) -> Method {
        self.config.method()
    }
}

/// What a caller may hand to the pipeline: a bare URL or a built request.
#[derive(Debug, Clone)]
pub enum RequestInput {
    Url(String),
    Request(HttpRequest),
}

impl RequestInput {
    /// Split into URL and config, layering `init` over a built request.
    pub fn into_parts(self, init: Option<RequestConfig>) -> (String, RequestConfig) {
        let init = init.unwrap_or_default();
        match self {
            RequestInput::Url(url) => (url, init),
            RequestInput::Request(request) => (request.url, init.layered_over(request.config)),
        }
    }
}

impl From<&str> for RequestInput {
    fn from(url: &str) -> Self {
        RequestInput::Url(url.to_string())
    }
}

impl From<String> for RequestInput {
    fn from(url: String) -> Self {
        RequestInput::Url(url)
    }
}

impl From<&String> for RequestInput {
    fn from(url: &String) -> Self {
        RequestInput::Url(url.clone())
    }
}

impl From<HttpRequest> for RequestInput {
    fn from(request: HttpRequest) -> Self {
        RequestInput::Request(request)
    }
}
