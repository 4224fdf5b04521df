//! HTTP API Server
//!
//! A small tokio TCP server: one task per connection, one request per connection.

pub mod http;
pub mod image_proxy;
pub mod routes;
pub mod static_files;

pub use image_proxy::ImageProxy;
pub use routes::{handle_request, ServerState};

use crate::error::Result;
use http::{parse_request, read_request, HttpResponse};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Accept connections on `addr` until the process stops.
pub async fn serve(addr: &str, state: Arc<ServerState>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(peer = %peer, "New connection");
        let state = state.clone();
        tokio::spawn(handle_connection(stream, state));
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<ServerState>) {
    let Some(raw) = read_request(&mut stream).await else {
        return;
    };

    let response = match parse_request(&raw) {
        Some(request) => {
            let request_id = Uuid::new_v4();
            let span = info_span!(
                "request",
                id = %request_id,
                method = %request.method,
                path = %request.path
            );
            async {
                let start = Instant::now();
                let response = handle_request(&state, &request).await;
                info!(
                    status = response.status,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Request handled"
                );
                response
            }
            .instrument(span)
            .await
        }
        None => HttpResponse::error(400, "Malformed request"),
    };

    if let Err(e) = stream.write_all(&response.to_bytes()).await {
        warn!(error = %e, "Failed to write response");
    }
}
