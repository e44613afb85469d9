//! The router: registration API and per-request dispatch orchestration.
//!
//! A router is built once at startup — routes, global interceptors, static
//! mounts, and fallback handlers all register before serving begins — and is
//! read-only afterwards, so it is shared across connection tasks behind an
//! `Arc` with no locks on the hot path.
//!
//! Dispatch is an explicit state machine per request:
//!
//! 1. Normalise the path against the configured prefixes (no match → not found).
//! 2. Check a trie exists for the method (none → method not allowed).
//! 3. Try the static mounts (hit → serve the file, bypassing everything else).
//! 4. `Tree::find` (no match → not found).
//! 5. Run the interceptor chain around the matched handler.
//!
//! Faults are explicit values: an escalated interceptor error, a render
//! failure, or a caught handler panic routes to the configured fault handler
//! exactly once, and a last-resort unwind boundary around the whole request
//! keeps a panicking phase from taking the process down.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body_util::Full;
use tracing::error;

use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::interceptor::Interceptor;
use crate::method::Method;
use crate::pipeline::{self, Fault};
use crate::render::{render, Payload};
use crate::statics::{self, StaticMount};
use crate::trie::Tree;

/// Receives every escalated per-request [`Fault`].
///
/// The context's status is preset to 500 before the call; the handler may
/// override it and return a payload to render. When none is configured the
/// router logs the fault and emits a generic server-error response.
#[async_trait]
pub trait FaultHandler: Send + Sync + 'static {
    async fn handle(&self, ctx: &Context, fault: &Fault) -> Option<Payload>;
}

/// The application router.
///
/// Registration methods take and return `self` so a router builds as one
/// chained expression, and they panic on structurally invalid input
/// (duplicate route, bad parameter pattern) — registration mistakes are
/// programmer errors and must never survive into a serving process. The
/// `try_` variants return the error instead.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use torii::{Context, Payload, Router};
///
/// async fn get_user(ctx: Arc<Context>) -> Payload {
///     let id = ctx.param("id").unwrap_or("unknown");
///     Payload::Json(serde_json::json!({ "id": id }))
/// }
///
/// let app = Router::new()
///     .get("/users/{id:[0-9]+}", get_user)
///     .static_files("/assets", "./public");
/// ```
pub struct Router {
    prefixes: Vec<String>,
    trees: HashMap<Method, Tree>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    mounts: Vec<StaticMount>,
    not_found: Option<BoxedHandler>,
    method_not_allowed: Option<BoxedHandler>,
    fault_handler: Option<Arc<dyn FaultHandler>>,
}

impl Router {
    /// A router that accepts every path (no prefix constraints).
    pub fn new() -> Self {
        Self {
            prefixes: Vec::new(),
            trees: HashMap::new(),
            interceptors: Vec::new(),
            mounts: Vec::new(),
            not_found: None,
            method_not_allowed: None,
            fault_handler: None,
        }
    }

    /// A router that only accepts paths under the given prefixes.
    ///
    /// A matching prefix is stripped before route matching; a blank or `/`
    /// entry is the match-all root prefix, which strips nothing and is tried
    /// after every specific prefix. Paths matching no prefix go straight to
    /// the not-found path.
    pub fn with_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalised = Vec::new();
        let mut has_root = false;
        for prefix in prefixes {
            let prefix = prefix.as_ref().trim();
            if prefix.is_empty() || prefix == "/" {
                has_root = true;
                continue;
            }
            let prefix = prefix.trim_end_matches('/');
            if prefix.starts_with('/') {
                normalised.push(prefix.to_owned());
            } else {
                normalised.push(format!("/{prefix}"));
            }
        }
        if has_root {
            normalised.push("/".to_owned());
        }
        Self {
            prefixes: normalised,
            ..Self::new()
        }
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Registers a handler with route-bound interceptors.
    ///
    /// # Panics
    ///
    /// Panics on a duplicate route or an invalid parameter pattern.
    pub fn handle(
        mut self,
        method: Method,
        pattern: &str,
        handler: impl Handler,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> Self {
        self.try_handle(method, pattern, handler, interceptors)
            .unwrap_or_else(|e| panic!("invalid route `{method} {pattern}`: {e}"));
        self
    }

    /// Fallible twin of [`handle`](Router::handle).
    pub fn try_handle(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl Handler,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> Result<(), Error> {
        let tree = self.trees.entry(method).or_insert_with(Tree::new);
        if pattern.starts_with('/') {
            tree.add(pattern, handler.into_boxed_handler(), interceptors)
        } else {
            let pattern = format!("/{pattern}");
            tree.add(&pattern, handler.into_boxed_handler(), interceptors)
        }
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Self {
        self.handle(Method::Get, pattern, handler, Vec::new())
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Self {
        self.handle(Method::Post, pattern, handler, Vec::new())
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Self {
        self.handle(Method::Put, pattern, handler, Vec::new())
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Self {
        self.handle(Method::Delete, pattern, handler, Vec::new())
    }

    pub fn patch(self, pattern: &str, handler: impl Handler) -> Self {
        self.handle(Method::Patch, pattern, handler, Vec::new())
    }

    /// Appends a global interceptor. Globals run before route-bound
    /// interceptors, in registration order.
    pub fn wrap(mut self, interceptor: impl Interceptor) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Mounts `dir` under `prefix`. Directory requests are not listed.
    pub fn static_files(mut self, prefix: &str, dir: &str) -> Self {
        self.mounts.push(StaticMount::new(prefix, dir, false));
        self
    }

    /// Like [`static_files`](Router::static_files), with directory listings.
    pub fn static_dir(mut self, prefix: &str, dir: &str) -> Self {
        self.mounts.push(StaticMount::new(prefix, dir, true));
        self
    }

    /// Replaces the built-in not-found response.
    ///
    /// The context arrives with status preset to 404; override it with
    /// [`Context::set_status`] if needed.
    pub fn not_found(mut self, handler: impl Handler) -> Self {
        self.not_found = Some(handler.into_boxed_handler());
        self
    }

    /// Replaces the built-in method-not-allowed response (a generic 405).
    pub fn method_not_allowed(mut self, handler: impl Handler) -> Self {
        self.method_not_allowed = Some(handler.into_boxed_handler());
        self
    }

    /// Replaces the built-in fault response (log + generic 500).
    pub fn fault_handler(mut self, handler: impl FaultHandler) -> Self {
        self.fault_handler = Some(Arc::new(handler));
        self
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    /// Routes one request to a response. This is the request boundary: every
    /// outcome, including a panic anywhere in the pipeline, materialises as
    /// a response rather than crossing into the transport.
    pub async fn respond(
        &self,
        method: &http::Method,
        path: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> http::Response<Full<Bytes>> {
        match AssertUnwindSafe(self.route(method, path, headers, body))
            .catch_unwind()
            .await
        {
            Ok(response) => response,
            Err(panic) => {
                error!(
                    method = %method,
                    path,
                    "request aborted by panic: {}",
                    pipeline::panic_message(panic)
                );
                generic_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }

    async fn route(
        &self,
        method: &http::Method,
        path: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> http::Response<Full<Bytes>> {
        let Some(path) = self.strip_prefix(path) else {
            return self
                .terminal(
                    self.not_found.as_ref(),
                    StatusCode::NOT_FOUND,
                    "404 page not found",
                    method,
                    path,
                    headers,
                    body,
                )
                .await;
        };

        let tree = Method::from_str(method.as_str())
            .ok()
            .and_then(|m| self.trees.get(&m));
        let Some(tree) = tree else {
            return self
                .terminal(
                    self.method_not_allowed.as_ref(),
                    StatusCode::METHOD_NOT_ALLOWED,
                    "method not allowed",
                    method,
                    path,
                    headers,
                    body,
                )
                .await;
        };

        if let Some(hit) = statics::resolve(&self.mounts, path).await {
            return statics::serve(hit, path).await;
        }

        let Some(matched) = tree.find(path) else {
            return self
                .terminal(
                    self.not_found.as_ref(),
                    StatusCode::NOT_FOUND,
                    "404 page not found",
                    method,
                    path,
                    headers,
                    body,
                )
                .await;
        };

        let ctx = Arc::new(Context::new(
            method.clone(),
            path.to_owned(),
            headers,
            body,
            matched.params,
        ));
        let chain: Vec<Arc<dyn Interceptor>> = self
            .interceptors
            .iter()
            .cloned()
            .chain(matched.interceptors.iter().cloned())
            .collect();

        if let Some(fault) = pipeline::run(&chain, matched.handler, &ctx).await {
            self.handle_fault(&ctx, &fault).await;
        }
        ctx.take_response().into_response()
    }

    /// First matching prefix wins; the root prefix matches everything and
    /// strips nothing.
    fn strip_prefix<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.prefixes.is_empty() {
            return Some(path);
        }
        for prefix in &self.prefixes {
            if prefix == "/" {
                return Some(path);
            }
            if let Some(rest) = path.strip_prefix(prefix.as_str()) {
                return Some(rest);
            }
        }
        None
    }

    /// Emits a terminal (not-found / method-not-allowed) response, through
    /// the configured handler when present.
    #[allow(clippy::too_many_arguments)]
    async fn terminal(
        &self,
        handler: Option<&BoxedHandler>,
        status: StatusCode,
        message: &'static str,
        method: &http::Method,
        path: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> http::Response<Full<Bytes>> {
        let Some(handler) = handler else {
            return generic_response(status, message);
        };
        let ctx = Arc::new(Context::new(
            method.clone(),
            path.to_owned(),
            headers,
            body,
            HashMap::new(),
        ));
        ctx.set_status(status);
        if let Some(payload) = handler.call(Arc::clone(&ctx)).await {
            if let Err(e) = render(&ctx, payload) {
                error!("terminal render failed: {e}");
            }
        }
        ctx.take_response().into_response()
    }

    async fn handle_fault(&self, ctx: &Arc<Context>, fault: &Fault) {
        error!(method = %ctx.method(), path = ctx.path(), "request fault: {fault}");
        ctx.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        match &self.fault_handler {
            None => {
                let _ = render(ctx, Payload::Text("internal server error".to_owned()));
            }
            Some(handler) => {
                if let Some(payload) = handler.handle(ctx, fault).await {
                    if let Err(e) = render(ctx, payload) {
                        error!("fault render failed: {e}");
                    }
                }
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn generic_response(
    status: StatusCode,
    message: &'static str,
) -> http::Response<Full<Bytes>> {
    let mut response = http::Response::new(Full::new(Bytes::from_static(message.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
