//! Frontend page and static assets.

use crate::server::http::HttpResponse;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Join `relative` onto `root`, refusing anything that could leave it.
pub fn safe_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    if relative.as_os_str().is_empty() {
        return None;
    }
    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return None,
        }
    }
    Some(root.join(relative))
}

async fn serve_file(path: &Path) -> HttpResponse {
    match tokio::fs::read(path).await {
        Ok(body) => HttpResponse::bytes(200, content_type_for(path), body),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Static file unavailable");
            HttpResponse::error(404, "Not found")
        }
    }
}

/// `GET /`: the single-page frontend.
pub async fn serve_index(frontend_dir: &Path) -> HttpResponse {
    let index = frontend_dir.join("index.html");
    if !index.is_file() {
        return HttpResponse::error(404, "frontend not found");
    }
    serve_file(&index).await
}

/// `GET /static/<relative>`.
pub async fn serve_static(frontend_dir: &Path, relative: &str) -> HttpResponse {
    match safe_join(frontend_dir, relative) {
        Some(path) => serve_file(&path).await,
        None => HttpResponse::error(400, "Invalid path"),
    }
}
