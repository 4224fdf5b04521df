//! Minimal HTTP/1.1 request reading and response writing over tokio streams.

use reqwest::Url;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::warn;

/// Requests larger than this are cut off.
pub const MAX_REQUEST_BYTES: usize = 1_000_000;

/// Deadline for receiving a complete request.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    /// Path without the query string; trailing slash removed except for `/`.
    pub path: String,
    /// Raw query string (without `?`), if any.
    pub query: Option<String>,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Decoded value of the first `key` query parameter.
    pub fn query_param(&self, key: &str) -> Option<String> {
        let query = self.query.as_ref()?;
        Url::parse(&format!("http://localhost/?{}", query))
            .ok()?
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            headers: Vec::new(),
            body: body.to_string().into_bytes(),
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, &serde_json::json!({ "error": message.into() }))
    }

    pub fn bytes(status: u16, content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::bytes(status, "text/plain; charset=utf-8", body.into().into_bytes())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Serialize status line, headers (with CORS) and body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n",
            self.status,
            reason_phrase(self.status),
            self.content_type,
            self.body.len()
        );
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}

fn header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

fn content_length(head: &str) -> Option<usize> {
    head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// Parse a complete raw request. `None` when the request line is malformed.
pub fn parse_request(raw: &[u8]) -> Option<HttpRequest> {
    let head_end = header_end(raw).unwrap_or(raw.len());
    let head = String::from_utf8_lossy(&raw[..head_end]);
    let mut lines = head.lines();

    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_uppercase();
    let target = parts.next()?;

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query.to_string())),
        None => (target, None),
    };
    let mut path = path.trim_end_matches('/').to_string();
    if path.is_empty() {
        path = "/".to_string();
    }

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let body = raw.get(head_end..).unwrap_or_default();
    let body = match headers.get("content-length").and_then(|v| v.parse::<usize>().ok()) {
        Some(len) => body[..len.min(body.len())].to_vec(),
        None => body.to_vec(),
    };

    Some(HttpRequest {
        method,
        path,
        query,
        headers,
        body,
    })
}

/// Read one request from `stream`, honoring `Content-Length`, the size cap and the
/// read deadline. `None` on timeout, I/O error or an empty connection.
pub async fn read_request(stream: &mut TcpStream) -> Option<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];

    let read = tokio::time::timeout(READ_TIMEOUT, async {
        loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);

            if let Some(end) = header_end(&buffer) {
                let head = String::from_utf8_lossy(&buffer[..end]);
                match content_length(&head) {
                    Some(len) if buffer.len() >= end + len => break,
                    Some(_) => {}
                    None => break,
                }
            }
            if buffer.len() > MAX_REQUEST_BYTES {
                break;
            }
        }
        Ok::<(), std::io::Error>(())
    })
    .await;

    match read {
        Ok(Ok(())) if !buffer.is_empty() => Some(buffer),
        Ok(Ok(())) => None,
        Ok(Err(e)) => {
            warn!(error = %e, "Failed to read from stream");
            None
        }
        Err(_) => {
            warn!("Request read timeout");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_post_with_body() {
        let raw = b"POST /api/search/ HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: 13\r\n\r\n{\"q\":\"soup\"}\n";
        let req = parse_request(raw).unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/api/search");
        assert_eq!(req.headers.get("content-type").unwrap(), "application/json");
        assert_eq!(req.body, b"{\"q\":\"soup\"}\n");
    }

    #[test]
    fn test_parse_query_string() {
        let raw = b"GET /img?url=https%3A%2F%2Fimg.taste.com.au%2Fa.jpg&x=1 HTTP/1.1\r\n\r\n";
        let req = parse_request(raw).unwrap();
        assert_eq!(req.path, "/img");
        assert_eq!(
            req.query_param("url").as_deref(),
            Some("https://img.taste.com.au/a.jpg")
        );
        assert_eq!(req.query_param("missing"), None);
    }

    #[test]
    fn test_root_path_and_malformed_line() {
        assert_eq!(parse_request(b"GET / HTTP/1.1\r\n\r\n").unwrap().path, "/");
        assert!(parse_request(b"GARBAGE\r\n\r\n").is_none());
        assert!(parse_request(b"").is_none());
    }

    #[test]
    fn test_response_serialization() {
        let resp = HttpResponse::json(200, &serde_json::json!({"ok": true}))
            .with_header("Cache-Control", "no-store");
        let text = String::from_utf8(resp.to_bytes()).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 11\r\n"));
        assert!(text.contains("Cache-Control: no-store\r\n"));
        assert!(text.ends_with("\r\n\r\n{\"ok\":true}"));
    }

    #[test]
    fn test_content_length_lookup() {
        assert_eq!(content_length("POST / HTTP/1.1\r\ncontent-length: 42\r\n"), Some(42));
        assert_eq!(content_length("GET / HTTP/1.1\r\n"), None);
    }
}
