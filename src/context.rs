//! Per-request context.
//!
//! One [`Context`] is created per dispatched request and shared as an
//! `Arc<Context>` between the interceptor chain and the handler. The request
//! side (method, path, headers, body, path parameters) is immutable; the
//! response side (status, headers, body) lives behind a mutex so any phase
//! can contribute headers through the shared handle. The context never
//! outlives its request and is never shared across requests.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;

/// The per-request value handed to handlers and interceptors.
pub struct Context {
    method: http::Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    response: Mutex<ResponseParts>,
}

impl Context {
    pub(crate) fn new(
        method: http::Method,
        path: String,
        headers: HeaderMap,
        body: Bytes,
        params: HashMap<String, String>,
    ) -> Self {
        Self {
            method,
            path,
            headers,
            body,
            params,
            response: Mutex::new(ResponseParts::default()),
        }
    }

    pub fn method(&self) -> &http::Method {
        &self.method
    }

    /// The request path after any configured router prefix was stripped.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Case-insensitive request-header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `ctx.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// All path parameters captured by the matched route.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Sets the response status. The last call before the response is
    /// materialised wins.
    pub fn set_status(&self, status: StatusCode) {
        self.response.lock().unwrap().status = status;
    }

    /// Sets a response header. Invalid header names or values are dropped.
    pub fn set_header(&self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.response.lock().unwrap().headers.insert(name, value);
        }
    }

    /// Commits a rendered body. The content type is only applied when no
    /// earlier phase set one explicitly.
    pub(crate) fn commit_body(&self, content_type: HeaderValue, body: Bytes) {
        let mut response = self.response.lock().unwrap();
        if !response.headers.contains_key(CONTENT_TYPE) {
            response.headers.insert(CONTENT_TYPE, content_type);
        }
        response.body = body;
    }

    pub(crate) fn take_response(&self) -> ResponseParts {
        std::mem::take(&mut *self.response.lock().unwrap())
    }
}

/// The accumulating response side of a [`Context`].
pub(crate) struct ResponseParts {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
}

impl Default for ResponseParts {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

impl ResponseParts {
    pub(crate) fn into_response(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
