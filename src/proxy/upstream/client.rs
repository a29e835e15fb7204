// Upstream transport
// HTTP client wrapper for the bridged content API

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, StatusCode};
use tokio::time::Duration;

/// One upstream-bound request, fully assembled by a handler.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    /// Path plus optional query string, starting with '/'
    pub path_and_query: String,
    pub headers: HeaderMap,
    /// Never present for GET/HEAD
    pub body: Option<Bytes>,
}

/// Upstream response with the body left as a stream so large payloads are
/// never buffered in the proxy.
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

/// Network-level failure reaching upstream. Mapped to HTTP 502 by callers,
/// distinguishing "upstream unreachable" from proxy-side faults.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UpstreamError(pub String);

/// Transport seam over the HTTP client.
///
/// Handlers only see this trait, so tests can substitute a scripted
/// transport and assert on call counts and captured requests.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;
}

pub struct UpstreamClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    /// Build the production transport.
    ///
    /// Redirects are never followed: an upstream redirect may itself carry
    /// the credential-bearing Set-Cookie header that login needs to capture.
    pub fn new(base_url: &str, egress_proxy_url: Option<&str>) -> Result<Self, UpstreamError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::none());

        match egress_proxy_url {
            Some(url) if !url.is_empty() => {
                let proxy = reqwest::Proxy::all(url)
                    .map_err(|e| UpstreamError(format!("invalid egress proxy url: {}", e)))?;
                builder = builder.proxy(proxy);
                tracing::info!("upstream client using egress proxy: {}", url);
            }
            _ => {
                builder = builder.no_proxy();
            }
        }

        let http_client = builder
            .build()
            .map_err(|e| UpstreamError(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }
}

#[async_trait]
impl UpstreamTransport for UpstreamClient {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.build_url(&request.path_and_query);

        let mut builder = self
            .http_client
            .request(request.method.clone(), &url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::debug!("upstream request to {} failed: {}", url, e);
            UpstreamError(e.to_string())
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        tracing::debug!(
            "upstream {} {} -> {}",
            request.method,
            request.path_and_query,
            status
        );

        Ok(UpstreamResponse {
            status,
            headers,
            body: Body::from_stream(response.bytes_stream()),
        })
    }
}
