//! Generic forwarding: resolve the opaque session, substitute the upstream
//! credential, stream the response back, and invalidate dead sessions.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::CookieJar;
use serde_json::json;

use super::clear_session_cookie;
use crate::proxy::cookie_policy::CookiePolicy;
use crate::proxy::error::BridgeError;
use crate::proxy::server::AppState;
use crate::proxy::upstream::UpstreamRequest;
use crate::proxy::SESSION_COOKIE_NAME;

/// Hop-by-hop and edge-infrastructure headers never forwarded upstream.
/// The inbound Cookie header is replaced wholesale with the upstream
/// credential.
const STRIPPED_REQUEST_HEADERS: &[&str] = &[
    "host",
    "connection",
    "content-length",
    "cookie",
    "origin",
    "referer",
    "x-forwarded-for",
    "x-forwarded-proto",
    "x-forwarded-host",
    "x-real-ip",
    "cf-connecting-ip",
    "cf-ray",
    "cf-ipcountry",
    "cf-visitor",
    "cdn-loop",
];

/// The only upstream response headers relayed to the client. Everything else
/// stays inside so upstream infrastructure details never leak.
const RELAYED_RESPONSE_HEADERS: &[&str] = &["content-type", "content-length", "date", "etag"];

/// Browser auto-requests that should not show up as auth failures.
const NOISE_PATHS: &[&str] = &["/favicon.ico"];

/// Fallback handler: every proxied path that is not login, logout or
/// preflight.
pub async fn handle_forward(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();

    let policy = match CookiePolicy::resolve(&parts.headers, &state.config) {
        Ok(policy) => policy,
        Err(e) => return e.into_response(),
    };

    let path = parts.uri.path().to_string();

    let session_id = match jar.get(SESSION_COOKIE_NAME) {
        Some(cookie) => cookie.value().to_string(),
        None => {
            let probe_path = strip_route_prefix(&path, &state.config.route_prefix);
            if parts.method == Method::GET && is_noise_path(probe_path) {
                return StatusCode::NOT_FOUND.into_response();
            }
            return unauthorized(None);
        }
    };

    // The store is the sole source of truth for session liveness
    let credential = match state.store.get(&session_id).await {
        Ok(Some(credential)) => credential,
        Ok(None) => {
            tracing::debug!("unknown session presented for {}", path);
            return unauthorized(Some(&policy));
        }
        // Ambiguous state: do not clear the cookie, do not guess
        Err(e) => return BridgeError::Store(e).into_response(),
    };

    // GET/HEAD never carry a forwarded body
    let body_bytes = if parts.method == Method::GET || parts.method == Method::HEAD {
        None
    } else {
        match axum::body::to_bytes(body, state.config.body_limit).await {
            Ok(bytes) => Some(bytes),
            Err(_) => return StatusCode::PAYLOAD_TOO_LARGE.into_response(),
        }
    };

    let mut upstream_headers = filter_request_headers(&parts.headers);
    let credential_header = format!("{}={}", state.config.upstream_cookie_name, credential);
    match HeaderValue::from_str(&credential_header) {
        Ok(value) => {
            upstream_headers.insert(header::COOKIE, value);
        }
        Err(_) => {
            // A credential that cannot form a header is a dead session
            tracing::warn!("stored credential is not header-safe, invalidating session");
            schedule_delete(&state, &session_id);
            return unauthorized(Some(&policy));
        }
    }

    let upstream_request = UpstreamRequest {
        method: parts.method.clone(),
        path_and_query: build_path_and_query(
            &path,
            parts.uri.query(),
            &state.config.route_prefix,
        ),
        headers: upstream_headers,
        body: body_bytes,
    };

    let response = match state.upstream.send(upstream_request).await {
        Ok(response) => response,
        Err(e) => return BridgeError::UpstreamUnreachable(e.to_string()).into_response(),
    };

    // Upstream 401/403 is proof the bridged session is dead. Normalize to
    // 401 so the client has one re-authenticate signal.
    if response.status == StatusCode::UNAUTHORIZED || response.status == StatusCode::FORBIDDEN {
        tracing::info!(
            "upstream rejected session with {}, invalidating",
            response.status
        );
        schedule_delete(&state, &session_id);
        return unauthorized(Some(&policy));
    }

    relay_response(response.status, &response.headers, response.body)
}

fn schedule_delete(state: &AppState, session_id: &str) {
    let store = state.store.clone();
    let session_id = session_id.to_string();
    state
        .tasks
        .spawn("session delete", async move { store.delete(&session_id).await });
}

/// 401 with an optional cookie-clear instruction. The clear is attached
/// whenever a session identifier was actually presented.
fn unauthorized(policy: Option<&CookiePolicy>) -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "authentication required" })),
    )
        .into_response();

    if let Some(policy) = policy {
        let clear = clear_session_cookie(policy.secure, policy.same_site);
        if let Ok(value) = HeaderValue::from_str(&clear.to_string()) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

fn is_noise_path(path: &str) -> bool {
    NOISE_PATHS.contains(&path)
}

/// Copy inbound headers minus the strip list.
fn filter_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::new();
    for (name, value) in headers {
        if STRIPPED_REQUEST_HEADERS.contains(&name.as_str()) {
            continue;
        }
        filtered.append(name.clone(), value.clone());
    }
    filtered
}

/// Strip the proxy's route prefix when it matches at a segment boundary.
///
/// The remainder must be empty or start with '/': anything else (e.g.
/// "/proxy@evil.com/x" against prefix "/proxy") would yield a non-rooted
/// remainder that string-concatenates into a URL with an attacker-chosen
/// host, carrying the substituted credential there.
fn strip_route_prefix<'a>(path: &'a str, route_prefix: &str) -> &'a str {
    if route_prefix.is_empty() {
        return path;
    }
    match path.strip_prefix(route_prefix) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Strip the proxy's route prefix and re-attach the query string.
fn build_path_and_query(path: &str, query: Option<&str>, route_prefix: &str) -> String {
    let stripped = strip_route_prefix(path, route_prefix);

    match query {
        Some(query) => format!("{}?{}", stripped, query),
        None => stripped.to_string(),
    }
}

/// Pass the status through and stream the body, relaying only the response
/// header allow-list.
fn relay_response(status: StatusCode, headers: &HeaderMap, body: Body) -> Response {
    let mut builder = Response::builder().status(status);
    for name in RELAYED_RESPONSE_HEADERS {
        if let Some(value) = headers.get(*name) {
            builder = builder.header(*name, value);
        }
    }
    builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
