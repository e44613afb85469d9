//! Static mount matching and file serving.
//!
//! Mounts are registered before serving and matched by path prefix; a hit
//! requires the target to exist on disk. Static hits bypass the trie and the
//! interceptor chain entirely. Directory listings are only generated for
//! mounts registered as listable.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use tracing::error;

use crate::router::generic_response;

/// One static mapping from a URL prefix to an on-disk directory.
pub(crate) struct StaticMount {
    /// Normalised to the `/prefix/` form; a blank or `/` prefix mounts at
    /// the root as `/`.
    prefix: String,
    dir: PathBuf,
    listable: bool,
}

impl StaticMount {
    pub(crate) fn new(prefix: &str, dir: impl Into<PathBuf>, listable: bool) -> Self {
        let trimmed = prefix.trim().trim_matches('/');
        let prefix = if trimmed.is_empty() {
            "/".to_owned()
        } else {
            format!("/{trimmed}/")
        };
        Self {
            prefix,
            dir: dir.into(),
            listable,
        }
    }
}

pub(crate) enum StaticHit {
    File(PathBuf),
    Listing(PathBuf),
}

/// Checks `path` against the mounts, first registration first.
///
/// Returns a hit only when the mapped target exists; a directory target on a
/// non-listable mount falls through to the next mount. Segments climbing out
/// of the mounted directory are rejected outright.
pub(crate) async fn resolve(mounts: &[StaticMount], path: &str) -> Option<StaticHit> {
    for mount in mounts {
        let Some(rest) = path.strip_prefix(mount.prefix.as_str()) else {
            continue;
        };
        if rest.split('/').any(|segment| segment == "..") {
            continue;
        }
        let target = mount.dir.join(rest.trim_start_matches('/'));
        match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_dir() && mount.listable => return Some(StaticHit::Listing(target)),
            Ok(meta) if !meta.is_dir() => return Some(StaticHit::File(target)),
            _ => continue,
        }
    }
    None
}

/// Serves a resolved hit. `request_path` is only used to build listing links.
pub(crate) async fn serve(hit: StaticHit, request_path: &str) -> http::Response<Full<Bytes>> {
    match hit {
        StaticHit::File(path) => match tokio::fs::read(&path).await {
            Ok(contents) => {
                let mut response = http::Response::new(Full::new(Bytes::from(contents)));
                response.headers_mut().insert(
                    http::header::CONTENT_TYPE,
                    http::HeaderValue::from_static(content_type_for(&path)),
                );
                response
            }
            // Existence was checked at resolve time; a read failure here is
            // a race with the filesystem.
            Err(e) => {
                error!(path = %path.display(), "static read failed: {e}");
                generic_response(StatusCode::NOT_FOUND, "404 page not found")
            }
        },
        StaticHit::Listing(path) => match listing(&path, request_path).await {
            Ok(html) => {
                let mut response = http::Response::new(Full::new(Bytes::from(html)));
                response.headers_mut().insert(
                    http::header::CONTENT_TYPE,
                    http::HeaderValue::from_static("text/html; charset=utf-8"),
                );
                response
            }
            Err(e) => {
                error!(path = %path.display(), "directory listing failed: {e}");
                generic_response(StatusCode::NOT_FOUND, "404 page not found")
            }
        },
    }
}

async fn listing(dir: &Path, request_path: &str) -> std::io::Result<String> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();

    let base = if request_path.ends_with('/') {
        request_path.to_owned()
    } else {
        format!("{request_path}/")
    };
    let mut html = String::from("<pre>\n");
    for name in &names {
        html.push_str(&format!("<a href=\"{base}{name}\">{name}</a>\n"));
    }
    html.push_str("</pre>\n");
    Ok(html)
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("css") => "text/css; charset=utf-8",
        Some("gif") => "image/gif",
        Some("htm" | "html") => "text/html; charset=utf-8",
        Some("ico") => "image/x-icon",
        Some("jpeg" | "jpg") => "image/jpeg",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        Some("txt") => "text/plain; charset=utf-8",
        Some("wasm") => "application/wasm",
        Some("woff2") => "font/woff2",
        Some("xml") => "application/xml; charset=utf-8",
        _ => "application/octet-stream",
    }
}
