//! Request routing for the recipe search API.

use crate::search::{SearchRequest, SearchService};
use crate::server::http::{HttpRequest, HttpResponse};
use crate::server::image_proxy::ImageProxy;
use crate::server::static_files::{serve_index, serve_static};
use serde_json::json;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Everything a request handler needs, shared across connections.
pub struct ServerState {
    pub search: SearchService,
    pub images: ImageProxy,
    pub frontend_dir: PathBuf,
}

impl ServerState {
    pub fn new(search: SearchService, images: ImageProxy, frontend_dir: impl Into<PathBuf>) -> Self {
        Self {
            search,
            images,
            frontend_dir: frontend_dir.into(),
        }
    }
}

pub async fn handle_request(state: &ServerState, request: &HttpRequest) -> HttpResponse {
    let method = request.method.as_str();
    let path = request.path.as_str();

    match (method, path) {
        ("OPTIONS", _) => HttpResponse::bytes(204, "text/plain", Vec::new()),
        ("GET", "/api/health") => HttpResponse::json(200, &json!({ "ok": true })),
        ("POST", "/api/search") => handle_search(state, request).await,
        ("GET", "/img") => match request.query_param("url") {
            Some(url) if !url.trim().is_empty() => state.images.fetch(&url).await,
            _ => HttpResponse::error(400, "url parameter is required"),
        },
        ("GET", "/") => serve_index(&state.frontend_dir).await,
        ("GET", p) if p.starts_with("/static/") => {
            serve_static(&state.frontend_dir, &p["/static/".len()..]).await
        }
        _ => HttpResponse::error(404, "Not found"),
    }
}

async fn handle_search(state: &ServerState, request: &HttpRequest) -> HttpResponse {
    let body: SearchRequest = match serde_json::from_slice(&request.body) {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "Invalid search body");
            return HttpResponse::error(400, format!("Invalid JSON body: {}", e));
        }
    };

    match state.search.search(&body.q, body.limit).await {
        Ok(response) => match serde_json::to_value(&response) {
            Ok(value) => {
                info!(count = response.count, "Search served");
                HttpResponse::json(200, &value)
            }
            Err(e) => {
                error!(error = %e, "Failed to serialize search response");
                HttpResponse::error(500, "Failed to serialize response")
            }
        },
        Err(e) if e.is_client_facing() => {
            warn!(error = %e, "Search rejected");
            HttpResponse::error(400, e.to_string())
        }
        Err(e) => {
            error!(error = %e, "Search failed");
            HttpResponse::error(500, e.to_string())
        }
    }
}
