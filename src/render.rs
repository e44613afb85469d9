//! Render collaborator: payload kinds and body serialization.
//!
//! Handlers return a [`Payload`] (or anything implementing [`IntoPayload`]);
//! the dispatch pipeline hands it here at most once per request, and only
//! when the handler produced a value and no interceptor fault is pending.
//! Rendering picks the content type and serialises the body into the
//! context's response parts — it never touches the wire itself.

use bytes::Bytes;
use http::HeaderValue;

use crate::context::Context;
use crate::error::BoxError;

/// A handler result tagged with how it should be serialised.
pub enum Payload {
    /// `text/plain; charset=utf-8`.
    Text(String),
    /// `text/html; charset=utf-8`.
    Html(String),
    /// `application/json; charset=utf-8`, serialised with serde_json.
    Json(serde_json::Value),
    /// Caller-supplied content type and raw bytes.
    Raw {
        content_type: String,
        body: Bytes,
    },
}

/// Serialises `payload` into the context's response parts.
///
/// The content type is only set when no earlier phase set one — a handler
/// that called [`Context::set_header`] keeps its choice.
pub(crate) fn render(ctx: &Context, payload: Payload) -> Result<(), BoxError> {
    let (content_type, body) = match payload {
        Payload::Text(s) => (
            HeaderValue::from_static("text/plain; charset=utf-8"),
            Bytes::from(s),
        ),
        Payload::Html(s) => (
            HeaderValue::from_static("text/html; charset=utf-8"),
            Bytes::from(s),
        ),
        Payload::Json(value) => (
            HeaderValue::from_static("application/json; charset=utf-8"),
            Bytes::from(serde_json::to_vec(&value)?),
        ),
        Payload::Raw { content_type, body } => (HeaderValue::try_from(content_type)?, body),
    };
    ctx.commit_body(content_type, body);
    Ok(())
}

/// Conversion into an optional render payload.
///
/// Implemented for the types handlers commonly return. `None` means "nothing
/// to render" — the response is whatever status and headers the handler set
/// on the context.
pub trait IntoPayload {
    fn into_payload(self) -> Option<Payload>;
}

impl IntoPayload for Payload {
    fn into_payload(self) -> Option<Payload> {
        Some(self)
    }
}

impl IntoPayload for Option<Payload> {
    fn into_payload(self) -> Option<Payload> {
        self
    }
}

impl IntoPayload for () {
    fn into_payload(self) -> Option<Payload> {
        None
    }
}

impl IntoPayload for String {
    fn into_payload(self) -> Option<Payload> {
        Some(Payload::Text(self))
    }
}

impl IntoPayload for &'static str {
    fn into_payload(self) -> Option<Payload> {
        Some(Payload::Text(self.to_owned()))
    }
}

impl IntoPayload for serde_json::Value {
    fn into_payload(self) -> Option<Payload> {
        Some(Payload::Json(self))
    }
}
