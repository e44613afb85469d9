//! Registration-error taxonomy and the boxed fault payload.

use thiserror::Error;

/// Errors travelling out of interceptor phases and the render step.
///
/// Interceptors report failures as whatever error type they like; the chain
/// only needs `Display` for logging and `Send + Sync` to cross task
/// boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by torii's fallible operations.
///
/// Routing outcomes (no match, unsupported method) are not errors — they are
/// normal dispatch results with their own response paths. This type surfaces
/// registration mistakes, which are always programmer errors and therefore
/// fatal before the router starts serving, plus transport-level I/O failures.
#[derive(Debug, Error)]
pub enum Error {
    /// A handler is already registered at this fully-resolved pattern.
    /// Registration never silently replaces an earlier handler.
    #[error("duplicate route `{0}`")]
    DuplicateRoute(String),

    /// The constraint inside a `{name:pattern}` segment failed to compile.
    #[error("invalid parameter pattern `{{{name}:{pattern}}}`: {source}")]
    InvalidPattern {
        name: String,
        pattern: String,
        source: regex::Error,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
