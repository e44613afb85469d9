//! Interceptor chain executor.
//!
//! Runs the pre-handle pass, the handler, the post-handle pass, the render
//! step, and the after-completion pass for one request, with the
//! short-circuit and failure semantics described on [`Interceptor`].
//!
//! Interceptors that pass `pre_handle` are pushed to the *front* of an
//! engaged list, so the post and after passes naturally walk them in reverse
//! of registration order — the interceptor that opened the request last
//! closes it first, like a stack of scoped acquisitions.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;

use crate::context::Context;
use crate::error::BoxError;
use crate::handler::BoxedHandler;
use crate::interceptor::Interceptor;
use crate::render::render;

/// The interceptor phase a fault originated from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    PostHandle,
    AfterCompletion,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PostHandle => "post-handle",
            Self::AfterCompletion => "after-completion",
        })
    }
}

/// An escalated per-request failure, handed to the router's fault handler.
///
/// Faults are explicit values returned up through the dispatcher — the crate
/// never uses unwinding as control flow. A handler panic is caught at the
/// invocation site and converted into [`Fault::Handler`] so the
/// after-completion pass and the fault handler still run.
#[derive(Debug, Error)]
pub enum Fault {
    #[error("interceptor {phase} failed: {error}")]
    Interceptor { phase: Phase, error: BoxError },

    #[error("handler panicked: {0}")]
    Handler(String),

    #[error("render failed: {0}")]
    Render(BoxError),
}

/// Runs the full chain around `handler`.
///
/// `interceptors` is the effective ordered list for the route: globals first,
/// then route-bound. Returns the first fault encountered, if any; the caller
/// escalates it exactly once. On a clean short-circuit (`pre_handle` returned
/// `false`) this returns `None` — short-circuiting is not a failure.
pub(crate) async fn run(
    interceptors: &[Arc<dyn Interceptor>],
    handler: &BoxedHandler,
    ctx: &Arc<Context>,
) -> Option<Fault> {
    let mut engaged: Vec<&Arc<dyn Interceptor>> = Vec::with_capacity(interceptors.len());
    let mut proceed = true;
    for interceptor in interceptors {
        if interceptor.pre_handle(ctx).await {
            engaged.insert(0, interceptor);
        } else {
            proceed = false;
            break;
        }
    }

    let mut fault = None;
    if proceed {
        let payload = match AssertUnwindSafe(handler.call(Arc::clone(ctx)))
            .catch_unwind()
            .await
        {
            Ok(payload) => payload,
            Err(panic) => {
                fault = Some(Fault::Handler(panic_message(panic)));
                None
            }
        };

        if fault.is_none() {
            for interceptor in &engaged {
                if let Err(error) = interceptor.post_handle(ctx).await {
                    fault = Some(Fault::Interceptor {
                        phase: Phase::PostHandle,
                        error,
                    });
                    break;
                }
            }
        }

        // Render only a present result, and only on a clean chain so far.
        if fault.is_none() {
            if let Some(payload) = payload {
                if let Err(error) = render(ctx, payload) {
                    fault = Some(Fault::Render(error));
                }
            }
        }
    }

    // Unconditional: engaged interceptors are released even after a
    // short-circuit, a handler panic, or a post-handle fault. The first
    // error here stops the pass; an already-pending fault keeps precedence
    // so the fault handler fires at most once per request.
    for interceptor in &engaged {
        if let Err(error) = interceptor.after_completion(ctx).await {
            if fault.is_none() {
                fault = Some(Fault::Interceptor {
                    phase: Phase::AfterCompletion,
                    error,
                });
            }
            break;
        }
    }

    fault
}

pub(crate) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::render::Payload;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records every phase it sees into a shared log.
    struct Probe {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        pass: bool,
        post_err: bool,
        after_err: bool,
    }

    impl Probe {
        fn new(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                log: Arc::clone(log),
                pass: true,
                post_err: false,
                after_err: false,
            }
        }

        fn record(&self, phase: &str) {
            self.log.lock().unwrap().push(format!("{} {}", self.name, phase));
        }
    }

    #[async_trait]
    impl Interceptor for Probe {
        async fn pre_handle(&self, _ctx: &Context) -> bool {
            self.record("pre");
            self.pass
        }

        async fn post_handle(&self, _ctx: &Context) -> Result<(), BoxError> {
            self.record("post");
            if self.post_err {
                return Err("post failed".into());
            }
            Ok(())
        }

        async fn after_completion(&self, _ctx: &Context) -> Result<(), BoxError> {
            self.record("after");
            if self.after_err {
                return Err("after failed".into());
            }
            Ok(())
        }
    }

    fn ctx() -> Arc<Context> {
        Arc::new(Context::new(
            http::Method::GET,
            "/test".to_owned(),
            http::HeaderMap::new(),
            bytes::Bytes::new(),
            HashMap::new(),
        ))
    }

    fn text_handler() -> BoxedHandler {
        async fn h(_ctx: Arc<Context>) -> &'static str {
            "ok"
        }
        h.into_boxed_handler()
    }

    fn panicking_handler() -> BoxedHandler {
        async fn h(_ctx: Arc<Context>) -> Option<Payload> {
            panic!("boom");
        }
        h.into_boxed_handler()
    }

    fn chain(probes: Vec<Probe>) -> Vec<Arc<dyn Interceptor>> {
        probes
            .into_iter()
            .map(|p| Arc::new(p) as Arc<dyn Interceptor>)
            .collect()
    }

    #[tokio::test]
    async fn post_and_after_run_in_reverse_of_pre_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let interceptors = chain(vec![
            Probe::new("a", &log),
            Probe::new("b", &log),
            Probe::new("c", &log),
        ]);
        let ctx = ctx();

        let fault = run(&interceptors, &text_handler(), &ctx).await;
        assert!(fault.is_none());
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "a pre", "b pre", "c pre", "c post", "b post", "a post", "c after", "b after",
                "a after",
            ]
        );
    }

    #[tokio::test]
    async fn short_circuit_skips_handler_but_releases_engaged() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut b = Probe::new("b", &log);
        b.pass = false;
        let interceptors = chain(vec![Probe::new("a", &log), b, Probe::new("c", &log)]);
        let ctx = ctx();

        let fault = run(&interceptors, &text_handler(), &ctx).await;
        assert!(fault.is_none());
        // c is never attempted, the handler never runs, nothing is rendered,
        // and only a (the sole engaged interceptor) winds down.
        assert_eq!(*log.lock().unwrap(), vec!["a pre", "b pre", "a after"]);
        assert!(ctx.take_response().body.is_empty());
    }

    #[tokio::test]
    async fn post_handle_error_suppresses_render_but_not_after() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut b = Probe::new("b", &log);
        b.post_err = true;
        let interceptors = chain(vec![Probe::new("a", &log), b]);
        let ctx = ctx();

        let fault = run(&interceptors, &text_handler(), &ctx).await;
        assert!(matches!(
            fault,
            Some(Fault::Interceptor { phase: Phase::PostHandle, .. })
        ));
        // b's error aborts the post pass before a, the body stays unrendered,
        // and the after pass still walks both engaged interceptors.
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a pre", "b pre", "b post", "b after", "a after"]
        );
        assert!(ctx.take_response().body.is_empty());
    }

    #[tokio::test]
    async fn after_completion_error_aborts_remaining_after_calls() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut b = Probe::new("b", &log);
        b.after_err = true;
        let interceptors = chain(vec![Probe::new("a", &log), b]);
        let ctx = ctx();

        let fault = run(&interceptors, &text_handler(), &ctx).await;
        assert!(matches!(
            fault,
            Some(Fault::Interceptor { phase: Phase::AfterCompletion, .. })
        ));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a pre", "b pre", "b post", "a post", "b after"]
        );
    }

    #[tokio::test]
    async fn handler_panic_becomes_fault_and_after_still_runs() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let interceptors = chain(vec![Probe::new("a", &log)]);
        let ctx = ctx();

        let fault = run(&interceptors, &panicking_handler(), &ctx).await;
        match fault {
            Some(Fault::Handler(message)) => assert_eq!(message, "boom"),
            other => panic!("expected handler fault, got {other:?}"),
        }
        // Post is skipped after a handler fault; after still runs.
        assert_eq!(*log.lock().unwrap(), vec!["a pre", "a after"]);
    }

    #[tokio::test]
    async fn pending_fault_keeps_precedence_over_after_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut b = Probe::new("b", &log);
        b.post_err = true;
        b.after_err = true;
        let interceptors = chain(vec![Probe::new("a", &log), b]);
        let ctx = ctx();

        let fault = run(&interceptors, &text_handler(), &ctx).await;
        assert!(matches!(
            fault,
            Some(Fault::Interceptor { phase: Phase::PostHandle, .. })
        ));
        // b's after error still stops the pass; a's after never runs.
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a pre", "b pre", "b post", "b after"]
        );
    }

    #[tokio::test]
    async fn empty_chain_renders_handler_payload() {
        let ctx = ctx();
        let fault = run(&[], &text_handler(), &ctx).await;
        assert!(fault.is_none());
        assert_eq!(&ctx.take_response().body[..], b"ok");
    }
}
