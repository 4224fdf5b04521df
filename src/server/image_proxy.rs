//! Image proxy for recipe thumbnails hosted on third-party CDNs.
//!
//! Only a fixed set of hosts is reachable. Meredith image-service links are
//! unwrapped to the inner `url` they point at before the host check.

use crate::error::{FinderError, Result};
use crate::server::http::HttpResponse;
use reqwest::header::{ACCEPT, CONTENT_TYPE, REFERER, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::{debug, warn};

pub const ALLOWED_IMAGE_HOSTS: &[&str] = &[
    "imagesvc.meredithcorp.io",
    "images.media-allrecipes.com",
    "img.taste.com.au",
    "www.allrecipes.com",
];

const MEREDITH_HOST: &str = "imagesvc.meredithcorp.io";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REDIRECTS: usize = 5;
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Why a proxy URL was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRejection {
    InvalidUrl,
    UnsupportedScheme,
    HostNotAllowed(String),
}

impl ProxyRejection {
    pub fn status(&self) -> u16 {
        match self {
            ProxyRejection::InvalidUrl | ProxyRejection::UnsupportedScheme => 400,
            ProxyRejection::HostNotAllowed(_) => 403,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ProxyRejection::InvalidUrl => "Invalid url".to_string(),
            ProxyRejection::UnsupportedScheme => "Only http/https URLs are allowed".to_string(),
            ProxyRejection::HostNotAllowed(host) => format!("Host not allowed: {}", host),
        }
    }
}

fn is_allowed(url: &Url) -> bool {
    url.port().is_none()
        && url
            .host_str()
            .map(|host| ALLOWED_IMAGE_HOSTS.contains(&host))
            .unwrap_or(false)
}

/// Resolve the URL that will actually be fetched for `raw`.
pub fn resolve_image_url(raw: &str) -> std::result::Result<Url, ProxyRejection> {
    let mut url = Url::parse(raw.trim()).map_err(|_| ProxyRejection::InvalidUrl)?;

    if url.host_str() == Some(MEREDITH_HOST) {
        let inner = url
            .query_pairs()
            .find(|(key, _)| key == "url")
            .map(|(_, value)| value.into_owned());
        if let Some(inner) = inner {
            url = Url::parse(&inner).map_err(|_| ProxyRejection::InvalidUrl)?;
        }
    }

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProxyRejection::UnsupportedScheme);
    }
    if !is_allowed(&url) {
        let netloc = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };
        return Err(ProxyRejection::HostNotAllowed(netloc));
    }
    Ok(url)
}

pub struct ImageProxy {
    client: reqwest::Client,
}

impl ImageProxy {
    pub fn new() -> Result<Self> {
        // Redirects are followed only while they stay on allowed hosts.
        let policy = Policy::custom(|attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS || !is_allowed(attempt.url()) {
                attempt.stop()
            } else {
                attempt.follow()
            }
        });

        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(policy)
            .build()
            .map_err(|e| FinderError::Config(format!("Failed to build image client: {}", e)))?;
        Ok(Self { client })
    }

    /// Fetch `raw_url` and turn the outcome into a response.
    pub async fn fetch(&self, raw_url: &str) -> HttpResponse {
        let url = match resolve_image_url(raw_url) {
            Ok(url) => url,
            Err(rejection) => {
                debug!(url = %raw_url, reason = %rejection.message(), "Image proxy refused");
                return HttpResponse::error(rejection.status(), rejection.message());
            }
        };

        let referer = format!("{}://{}/", url.scheme(), url.host_str().unwrap_or_default());
        let upstream = self
            .client
            .get(url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(REFERER, referer)
            .header(ACCEPT, "image/avif,image/webp,image/apng,image/*,*/*;q=0.8")
            .send()
            .await;

        let upstream = match upstream {
            Ok(resp) => resp,
            Err(e) => {
                warn!(url = %url, error = %e, "Image fetch failed");
                return HttpResponse::error(502, format!("Upstream fetch failed: {}", e));
            }
        };

        let status = upstream.status();
        if status != StatusCode::OK {
            return HttpResponse::text(status.as_u16(), format!("Upstream error {}", status.as_u16()));
        }

        let content_type = upstream
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        match upstream.bytes().await {
            Ok(body) => HttpResponse::bytes(200, content_type, body.to_vec())
                .with_header("Cache-Control", "public, max-age=86400"),
            Err(e) => {
                warn!(url = %url, error = %e, "Image body read failed");
                HttpResponse::error(502, format!("Upstream fetch failed: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_host_passes() {
        let url = resolve_image_url("https://img.taste.com.au/abc/pie.jpg").unwrap();
        assert_eq!(url.as_str(), "https://img.taste.com.au/abc/pie.jpg");
    }

    #[test]
    fn test_meredith_url_is_unwrapped() {
        let raw = "https://imagesvc.meredithcorp.io/v3/mm/image?url=https%3A%2F%2Fimages.media-allrecipes.com%2Fuserphotos%2F1.jpg&w=200";
        let url = resolve_image_url(raw).unwrap();
        assert_eq!(url.host_str(), Some("images.media-allrecipes.com"));
        assert_eq!(url.path(), "/userphotos/1.jpg");
    }

    #[test]
    fn test_meredith_inner_host_is_still_checked() {
        let raw = "https://imagesvc.meredithcorp.io/v3/mm/image?url=https%3A%2F%2Fevil.example.com%2Fx.jpg";
        assert_eq!(
            resolve_image_url(raw),
            Err(ProxyRejection::HostNotAllowed("evil.example.com".to_string()))
        );
    }

    #[test]
    fn test_meredith_without_inner_url_is_fetched_directly() {
        let url = resolve_image_url("https://imagesvc.meredithcorp.io/v3/mm/image").unwrap();
        assert_eq!(url.host_str(), Some(MEREDITH_HOST));
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            resolve_image_url("ftp://img.taste.com.au/a.jpg"),
            Err(ProxyRejection::UnsupportedScheme)
        );
        assert_eq!(resolve_image_url("not a url"), Err(ProxyRejection::InvalidUrl));

        let rejected = resolve_image_url("https://example.com/a.jpg").unwrap_err();
        assert_eq!(rejected.status(), 403);

        let with_port = resolve_image_url("https://img.taste.com.au:8443/a.jpg").unwrap_err();
        assert_eq!(
            with_port,
            ProxyRejection::HostNotAllowed("img.taste.com.au:8443".to_string())
        );
        assert_eq!(ProxyRejection::UnsupportedScheme.status(), 400);
    }

    #[tokio::test]
    async fn test_fetch_refuses_before_network() {
        let proxy = ImageProxy::new().unwrap();
        let resp = proxy.fetch("https://example.com/a.jpg").await;
        assert_eq!(resp.status, 403);
        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["error"], "Host not allowed: example.com");
    }
}
