use serde::{Deserialize, Serialize};

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8017
}

fn default_upstream_base_url() -> String {
    "https://www.newsblur.com".to_string()
}

fn default_upstream_cookie_name() -> String {
    "newsblur_sessionid".to_string()
}

fn default_upstream_login_path() -> String {
    "/api/login".to_string()
}

fn default_session_ttl_secs() -> u64 {
    24 * 3600
}

fn default_body_limit() -> usize {
    100 * 1024 * 1024
}

/// Bridge service configuration
///
/// Populated from `FEEDBRIDGE_*` environment variables by the hosting
/// platform; every field has a usable default for local development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Listen address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the upstream content API
    #[serde(default = "default_upstream_base_url")]
    pub upstream_base_url: String,

    /// Name of the upstream service's session cookie
    #[serde(default = "default_upstream_cookie_name")]
    pub upstream_cookie_name: String,

    /// Upstream login endpoint (relative to the base URL)
    #[serde(default = "default_upstream_login_path")]
    pub upstream_login_path: String,

    /// Fallback CORS origin, used only when a request carries no Origin header
    #[serde(default)]
    pub default_origin: Option<String>,

    /// The proxy's own externally visible origin (scheme://host[:port]).
    /// When unset it is derived per request from the Host header.
    #[serde(default)]
    pub public_origin: Option<String>,

    /// Route prefix the proxy is mounted under, stripped before forwarding.
    /// Empty means the proxy owns the whole path space.
    #[serde(default)]
    pub route_prefix: String,

    /// Bridged session lifetime in seconds (fixed, no sliding expiration)
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Connection URL of the shared session store. When unset the proxy
    /// falls back to a process-local in-memory store.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Optional egress proxy for upstream calls (http://, https://, socks5://)
    #[serde(default)]
    pub egress_proxy_url: Option<String>,

    /// Maximum accepted request body size
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            upstream_base_url: default_upstream_base_url(),
            upstream_cookie_name: default_upstream_cookie_name(),
            upstream_login_path: default_upstream_login_path(),
            default_origin: None,
            public_origin: None,
            route_prefix: String::new(),
            session_ttl_secs: default_session_ttl_secs(),
            redis_url: None,
            egress_proxy_url: None,
            body_limit: default_body_limit(),
        }
    }
}

impl BridgeConfig {
    /// Build the configuration from `FEEDBRIDGE_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("FEEDBRIDGE_BIND") {
            config.bind_address = value;
        }
        if let Ok(value) = std::env::var("FEEDBRIDGE_PORT") {
            match value.parse() {
                Ok(port) => config.port = port,
                Err(_) => tracing::warn!("ignoring invalid FEEDBRIDGE_PORT: {}", value),
            }
        }
        if let Ok(value) = std::env::var("FEEDBRIDGE_UPSTREAM_URL") {
            config.upstream_base_url = value.trim_end_matches('/').to_string();
        }
        if let Ok(value) = std::env::var("FEEDBRIDGE_UPSTREAM_COOKIE") {
            config.upstream_cookie_name = value;
        }
        if let Ok(value) = std::env::var("FEEDBRIDGE_UPSTREAM_LOGIN_PATH") {
            config.upstream_login_path = value;
        }
        if let Ok(value) = std::env::var("FEEDBRIDGE_DEFAULT_ORIGIN") {
            if !value.is_empty() {
                config.default_origin = Some(value);
            }
        }
        if let Ok(value) = std::env::var("FEEDBRIDGE_PUBLIC_ORIGIN") {
            if !value.is_empty() {
                config.public_origin = Some(value);
            }
        }
        if let Ok(value) = std::env::var("FEEDBRIDGE_ROUTE_PREFIX") {
            config.route_prefix = normalize_prefix(&value);
        }
        if let Ok(value) = std::env::var("FEEDBRIDGE_SESSION_TTL_SECS") {
            match value.parse() {
                Ok(secs) => config.session_ttl_secs = secs,
                Err(_) => tracing::warn!("ignoring invalid FEEDBRIDGE_SESSION_TTL_SECS: {}", value),
            }
        }
        if let Ok(value) = std::env::var("FEEDBRIDGE_REDIS_URL") {
            if !value.is_empty() {
                config.redis_url = Some(value);
            }
        }
        if let Ok(value) = std::env::var("FEEDBRIDGE_EGRESS_PROXY") {
            if !value.is_empty() {
                config.egress_proxy_url = Some(value);
            }
        }
        if let Ok(value) = std::env::var("FEEDBRIDGE_BODY_LIMIT") {
            match value.parse() {
                Ok(limit) => config.body_limit = limit,
                Err(_) => tracing::warn!("ignoring invalid FEEDBRIDGE_BODY_LIMIT: {}", value),
            }
        }

        config
    }
}

/// Normalize a route prefix to "" or "/segment[/...]" with no trailing slash.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed == "/" {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
