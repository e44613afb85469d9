//! # torii
//!
//! An embeddable HTTP request router with three-phase interceptors.
//!
//! torii does three things: it resolves a method + path to a handler through
//! a **segment trie**, extracts path parameters along the way, and runs a
//! chain of **interceptors** (pre-handle / post-handle / after-completion)
//! around the handler call. Transport, static files, and rendering are thin
//! collaborators around that core.
//!
//! Out of scope — content negotiation, sessions and cookies, TLS, and
//! connection-level concerns all belong to the proxy or the application, not
//! the router.
//!
//! ## Routing
//!
//! Patterns are `/`-separated segments. `{name}` captures any non-empty
//! segment; `{name:regex}` additionally requires the segment to satisfy the
//! regex. Literal segments always beat parameter segments at the same depth,
//! and a chosen literal subtree is never abandoned to retry a parameter
//! sibling. Registering the same pattern twice for one method is a
//! registration-time panic, never a silent overwrite.
//!
//! ## Interceptors
//!
//! Global interceptors (via [`Router::wrap`]) run before route-bound ones.
//! Post-handle and after-completion walk the engaged interceptors in reverse
//! of pre-handle order, like a stack of scoped acquisitions unwinding. A
//! `false` from pre-handle short-circuits the request; errors from the later
//! phases escalate to the fault handler.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use torii::{Context, Payload, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .get("/ping", ping)
//!         .get("/users/{id:[0-9]+}", get_user);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn ping(_ctx: Arc<Context>) -> &'static str {
//!     "pong"
//! }
//!
//! async fn get_user(ctx: Arc<Context>) -> Payload {
//!     let id = ctx.param("id").unwrap_or("unknown");
//!     Payload::Json(serde_json::json!({ "id": id, "name": "alice" }))
//! }
//! ```

mod context;
mod error;
mod handler;
mod interceptor;
mod method;
mod pipeline;
mod render;
mod router;
mod server;
mod statics;
mod trie;

pub use context::Context;
pub use error::{BoxError, Error};
pub use handler::Handler;
pub use interceptor::Interceptor;
pub use method::Method;
pub use pipeline::{Fault, Phase};
pub use render::{IntoPayload, Payload};
pub use router::{FaultHandler, Router};
pub use server::Server;
