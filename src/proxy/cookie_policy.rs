//! Per-request cookie/CORS policy resolution.
//!
//! Pure computation over request metadata. Nothing here is cached: the
//! resolved policy is only valid for the request it was computed from.

use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::SameSite;

use crate::modules::config::BridgeConfig;
use crate::proxy::error::BridgeError;

/// Hosts where unencrypted cookies are still usable during development.
const LOCAL_DEV_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1", "0.0.0.0"];

/// The three parameters that determine browser cookie/CORS behavior for one
/// request.
#[derive(Debug, Clone, PartialEq)]
pub struct CookiePolicy {
    /// Value for `Access-Control-Allow-Origin`
    pub allowed_origin: String,
    /// Whether cookies are issued with the `Secure` attribute
    pub secure: bool,
    /// `SameSite` attribute for issued cookies
    pub same_site: SameSite,
}

impl CookiePolicy {
    /// Resolve the full policy for one request.
    pub fn resolve(headers: &HeaderMap, config: &BridgeConfig) -> Result<Self, BridgeError> {
        let origin = declared_origin(headers);
        let scheme = request_scheme(headers);
        let host = request_host(headers).unwrap_or("");

        let allowed_origin =
            resolve_allowed_origin(origin, config.default_origin.as_deref())?;

        let own_origin = match &config.public_origin {
            Some(origin) => origin.clone(),
            None => format!("{}://{}", scheme, host),
        };

        let same_site = resolve_same_site(origin, &own_origin);
        let mut secure = resolve_secure_flag(scheme, host);

        // SameSite=None is rejected by browsers without Secure
        if same_site == SameSite::None {
            secure = true;
        }

        Ok(Self {
            allowed_origin,
            secure,
            same_site,
        })
    }
}

/// The Origin header as declared by the browser, if any.
pub fn declared_origin(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::ORIGIN).and_then(|v| v.to_str().ok())
}

/// Request scheme as seen by the edge ("https" or "http").
pub fn request_scheme(headers: &HeaderMap) -> &str {
    match headers.get("x-forwarded-proto").and_then(|v| v.to_str().ok()) {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        Some(_) => "http",
        // The proxy terminates plain HTTP itself only in local setups
        None => "http",
    }
}

/// Host (with port, if present) the request was addressed to.
pub fn request_host(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::HOST).and_then(|v| v.to_str().ok())
}

/// CORS origin: the declared origin verbatim when present (trust on
/// presence, no allow-list), else the configured default, else a
/// configuration error.
pub fn resolve_allowed_origin(
    origin: Option<&str>,
    default_origin: Option<&str>,
) -> Result<String, BridgeError> {
    if let Some(origin) = origin {
        return Ok(origin.to_string());
    }
    if let Some(default) = default_origin {
        return Ok(default.to_string());
    }
    Err(BridgeError::Config(
        "no Origin header and no default origin configured".into(),
    ))
}

/// Secure flag: always true over https; over plain http only a recognized
/// local-development host gets an insecure cookie.
pub fn resolve_secure_flag(scheme: &str, host: &str) -> bool {
    if scheme == "https" {
        return true;
    }
    !is_local_dev_host(host)
}

/// SameSite: Lax when the declared origin is exactly the proxy's own origin,
/// None otherwise. Cross-origin deployments therefore require https.
pub fn resolve_same_site(origin: Option<&str>, own_origin: &str) -> SameSite {
    match origin {
        Some(origin) if origin == own_origin => SameSite::Lax,
        Some(_) => SameSite::None,
        // No declared origin: not a cross-site browser context
        None => SameSite::Lax,
    }
}

fn is_local_dev_host(host: &str) -> bool {
    let bare = strip_port(host);
    LOCAL_DEV_HOSTS.contains(&bare)
}

/// Strip an optional port, handling bracketed IPv6 literals.
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    host.split(':').next().unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_origin_trust_on_presence() {
        let resolved = resolve_allowed_origin(Some("https://reader.example"), None).unwrap();
        assert_eq!(resolved, "https://reader.example");
    }

    #[test]
    fn test_origin_falls_back_to_default() {
        let resolved =
            resolve_allowed_origin(None, Some("https://app.example")).unwrap();
        assert_eq!(resolved, "https://app.example");
    }

    #[test]
    fn test_origin_unresolvable_is_config_error() {
        let err = resolve_allowed_origin(None, None).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn test_secure_flag() {
        assert!(resolve_secure_flag("https", "bridge.example"));
        assert!(resolve_secure_flag("https", "localhost:8017"));
        assert!(!resolve_secure_flag("http", "localhost:8017"));
        assert!(!resolve_secure_flag("http", "127.0.0.1"));
        assert!(!resolve_secure_flag("http", "[::1]:8017"));
        // Plain http to a non-local host still defaults to secure
        assert!(resolve_secure_flag("http", "bridge.example"));
    }

    #[test]
    fn test_same_site() {
        assert_eq!(
            resolve_same_site(Some("https://bridge.example"), "https://bridge.example"),
            SameSite::Lax
        );
        assert_eq!(
            resolve_same_site(Some("https://app.example"), "https://bridge.example"),
            SameSite::None
        );
        assert_eq!(resolve_same_site(None, "https://bridge.example"), SameSite::Lax);
        // Port differences are origin differences
        assert_eq!(
            resolve_same_site(
                Some("https://bridge.example:8443"),
                "https://bridge.example"
            ),
            SameSite::None
        );
    }

    #[test]
    fn test_cross_site_none_forces_secure() {
        // Local dev host over http would resolve insecure, but a cross-site
        // policy must still carry Secure.
        let mut config = BridgeConfig::default();
        config.public_origin = Some("http://localhost:8017".into());

        let headers = headers(&[
            ("origin", "http://localhost:5173"),
            ("host", "localhost:8017"),
        ]);
        let policy = CookiePolicy::resolve(&headers, &config).unwrap();
        assert_eq!(policy.same_site, SameSite::None);
        assert!(policy.secure);
    }

    #[test]
    fn test_same_origin_local_dev_stays_insecure() {
        let mut config = BridgeConfig::default();
        config.public_origin = Some("http://localhost:8017".into());

        let headers = headers(&[
            ("origin", "http://localhost:8017"),
            ("host", "localhost:8017"),
        ]);
        let policy = CookiePolicy::resolve(&headers, &config).unwrap();
        assert_eq!(policy.same_site, SameSite::Lax);
        assert!(!policy.secure);
        assert_eq!(policy.allowed_origin, "http://localhost:8017");
    }
}
