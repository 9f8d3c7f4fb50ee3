//! Landing page and static file serving.

use std::io;
use std::path::{Component, Path, PathBuf};

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use msgboard_common::Error;
use tracing::{debug, warn};

use crate::api::error_response;
use crate::state::SharedState;

/// GET /: the landing page document.
pub async fn landing_page(State(state): State<SharedState>, uri: Uri) -> Response {
    serve_file(&state.config.web.landing_page, uri.path()).await
}

/// Fallback for every unmatched route: GET/HEAD read from the static
/// directory, anything else is a 404.
pub async fn static_fallback(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return not_found(uri.path());
    }

    match resolve_asset_path(&state.config.web.static_dir, uri.path()) {
        Some(path) => serve_file(&path, uri.path()).await,
        None => not_found(uri.path()),
    }
}

/// Respond with the file at `path`. Errors name only `request_path` so the
/// server's directory layout stays out of response bodies.
async fn serve_file(path: &Path, request_path: &str) -> Response {
    let is_file = tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        debug!("no asset at {}", path.display());
        return not_found(request_path);
    }

    match tokio::fs::read(path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type_for(path))],
            bytes,
        )
            .into_response(),
        Err(e) => {
            warn!("failed to read asset {}: {e}", path.display());
            error_response(Error::Io(io::Error::new(e.kind(), request_path.to_string())))
        }
    }
}

fn not_found(what: &str) -> Response {
    error_response(Error::NotFound(what.to_string()))
}

/// Map a request path onto `root`. Only plain path segments are accepted, so
/// `..`, absolute, and prefixed components never escape the directory.
fn resolve_asset_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = request_path.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }

    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(resolved)
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html" | "htm") => "text/html",
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}
