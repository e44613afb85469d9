//! Handler trait and type erasure.
//!
//! The router holds handlers of *different* concrete types in one trie, so
//! handlers are stored as trait objects (`dyn ErasedHandler`) behind an
//! `Arc`. The chain from user code to vtable call:
//!
//! ```text
//! async fn ping(ctx: Arc<Context>) -> Payload { … }   ← user writes this
//!        ↓ router.get("/ping", ping)
//! ping.into_boxed_handler()                           ← Handler blanket impl
//!        ↓ stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(ctx)  at request time                  ← one vtable dispatch
//! ```
//!
//! The only per-request cost is one `Arc` clone and one virtual call.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::render::{IntoPayload, Payload};

/// A heap-allocated, type-erased future resolving to the handler's payload.
pub(crate) type HandlerFuture = Pin<Box<dyn Future<Output = Option<Payload>> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: Arc<Context>) -> HandlerFuture;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(ctx: Arc<Context>) -> impl IntoPayload
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it, which
/// keeps the handler contract stable across versions.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoPayload + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoPayload + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Newtype wrapper bridging a concrete handler `F` to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Arc<Context>) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoPayload + Send + 'static,
{
    fn call(&self, ctx: Arc<Context>) -> HandlerFuture {
        let fut = (self.0)(ctx);
        Box::pin(async move { fut.await.into_payload() })
    }
}
