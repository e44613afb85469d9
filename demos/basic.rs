//! Minimal torii example — JSON endpoints behind interceptors.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/ping
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/users/abc          # constraint miss -> 404
//!   curl http://localhost:3000/admin/settings     # no token -> empty 401
//!   curl -H 'authorization: Bearer x' http://localhost:3000/admin/settings

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use torii::{BoxError, Context, Interceptor, Method, Payload, Router, Server};

/// Logs every request it wraps, on the way in and on the way out.
struct AccessLog;

#[async_trait]
impl Interceptor for AccessLog {
    async fn pre_handle(&self, ctx: &Context) -> bool {
        info!(method = %ctx.method(), path = ctx.path(), "request");
        true
    }

    async fn after_completion(&self, ctx: &Context) -> Result<(), BoxError> {
        info!(path = ctx.path(), "done");
        Ok(())
    }
}

/// Rejects requests without an authorization header before the handler runs.
struct RequireToken;

#[async_trait]
impl Interceptor for RequireToken {
    async fn pre_handle(&self, ctx: &Context) -> bool {
        if ctx.header("authorization").is_some() {
            true
        } else {
            ctx.set_status(http::StatusCode::UNAUTHORIZED);
            false
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .wrap(AccessLog)
        .get("/ping", ping)
        .get("/users/{id:[0-9]+}", get_user)
        .handle(
            Method::Get,
            "/admin/settings",
            admin_settings,
            vec![Arc::new(RequireToken)],
        )
        .static_files("/assets", "./public");

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

async fn ping(_ctx: Arc<Context>) -> &'static str {
    "pong"
}

async fn get_user(ctx: Arc<Context>) -> Payload {
    let id = ctx.param("id").unwrap_or("unknown");
    Payload::Json(serde_json::json!({ "id": id, "name": "alice" }))
}

async fn admin_settings(_ctx: Arc<Context>) -> Payload {
    Payload::Json(serde_json::json!({ "debug": false }))
}
