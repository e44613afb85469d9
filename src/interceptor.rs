//! The three-phase interceptor contract.
//!
//! An interceptor wraps a handler invocation with three hooks, modelled as
//! one trait rather than three loose function values so every interceptor
//! carries the full contract:
//!
//! | Phase | Runs | Signals |
//! |---|---|---|
//! | `pre_handle` | before the handler, registration order | `false` short-circuits |
//! | `post_handle` | after the handler, reverse order | error escalates |
//! | `after_completion` | always, reverse order | error escalates |
//!
//! A `false` from `pre_handle` is deliberate control flow, not a failure: the
//! handler is skipped, later interceptors are never attempted, and the ones
//! already engaged still receive `after_completion`. Errors from the other
//! two phases escalate to the router's fault handler.
//!
//! All hooks have permissive defaults, so an implementation only overrides
//! the phases it cares about:
//!
//! ```rust
//! use async_trait::async_trait;
//! use torii::{Context, Interceptor};
//!
//! struct RequireToken;
//!
//! #[async_trait]
//! impl Interceptor for RequireToken {
//!     async fn pre_handle(&self, ctx: &Context) -> bool {
//!         ctx.header("authorization").is_some()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::context::Context;
use crate::error::BoxError;

/// A middleware unit with pre/post/after phases wrapping a handler call.
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    /// Runs before the handler. Returning `false` aborts the request without
    /// invoking the handler or any later interceptor.
    async fn pre_handle(&self, ctx: &Context) -> bool {
        let _ = ctx;
        true
    }

    /// Runs after the handler, before the result is rendered. An error
    /// suppresses rendering and escalates to the fault handler.
    async fn post_handle(&self, ctx: &Context) -> Result<(), BoxError> {
        let _ = ctx;
        Ok(())
    }

    /// Runs unconditionally once the request winds down — whether the chain
    /// short-circuited, the handler ran, or post-handle failed.
    async fn after_completion(&self, ctx: &Context) -> Result<(), BoxError> {
        let _ = ctx;
        Ok(())
    }
}
