//! Login orchestration: exchange user credentials for an upstream session
//! cookie, stash the credential server-side, hand the browser an opaque
//! identifier.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use super::{clear_session_cookie, session_cookie};
use crate::proxy::cookie_policy::CookiePolicy;
use crate::proxy::error::BridgeError;
use crate::proxy::server::AppState;
use crate::proxy::upstream::{UpstreamRequest, UpstreamResponse};

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: Option<String>,
    password: Option<String>,
}

/// POST /api/login
pub async fn handle_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    body: Bytes,
) -> Response {
    let policy = match CookiePolicy::resolve(&headers, &state.config) {
        Ok(policy) => policy,
        Err(e) => return e.into_response(),
    };

    // Validate input before anything touches the network
    let form: LoginForm = match serde_urlencoded::from_bytes(&body) {
        Ok(form) => form,
        Err(_) => return BridgeError::InvalidInput("malformed form body").into_response(),
    };
    let username = match form.username.filter(|v| !v.is_empty()) {
        Some(username) => username,
        None => return BridgeError::InvalidInput("username is required").into_response(),
    };
    let password = match form.password.filter(|v| !v.is_empty()) {
        Some(password) => password,
        None => return BridgeError::InvalidInput("password is required").into_response(),
    };

    let login_body = match serde_urlencoded::to_string([
        ("username", username.as_str()),
        ("password", password.as_str()),
    ]) {
        Ok(body) => body,
        Err(e) => {
            return BridgeError::Config(format!("failed to encode login body: {}", e))
                .into_response()
        }
    };

    let mut upstream_headers = HeaderMap::new();
    upstream_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );

    // Redirects are disabled at the transport: a 3xx from upstream may itself
    // carry the credential-bearing Set-Cookie that must be captured here.
    let request = UpstreamRequest {
        method: Method::POST,
        path_and_query: state.config.upstream_login_path.clone(),
        headers: upstream_headers,
        body: Some(Bytes::from(login_body)),
    };

    let response = match state.upstream.send(request).await {
        Ok(response) => response,
        Err(e) => return BridgeError::UpstreamUnreachable(e.to_string()).into_response(),
    };

    let accepted = response.status.is_success() || response.status.is_redirection();
    let credential =
        extract_session_credential(&response.headers, &state.config.upstream_cookie_name);

    match credential {
        Some(credential) if accepted => {
            let session_id = mint_session_id();
            let ttl = Duration::from_secs(state.config.session_ttl_secs);

            // Fire-and-forget: the response does not wait for the write
            let store = state.store.clone();
            let stored_id = session_id.clone();
            state.tasks.spawn("session put", async move {
                store.put(&stored_id, &credential, ttl).await
            });

            tracing::info!("login bridged, new session issued for {}", username);

            let jar = jar.add(session_cookie(
                &policy,
                &session_id,
                state.config.session_ttl_secs,
            ));
            (jar, Json(json!({ "authenticated": true }))).into_response()
        }
        _ => {
            tracing::info!(
                "upstream rejected login for {} (status {})",
                username,
                response.status
            );
            relay_login_failure(response, &policy)
        }
    }
}

/// Scan Set-Cookie headers for the upstream service's session cookie and
/// return its raw value. Absence is the normal "login rejected" branch, not
/// an error.
pub fn extract_session_credential(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    for value in headers.get_all(header::SET_COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        let pair = raw.split(';').next().unwrap_or("").trim();
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        if name == cookie_name && !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

/// Globally unique, unguessable identifier. Never derived from user input.
fn mint_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Relay the upstream's own failure status and body, clearing any stale
/// session cookie on the way out.
fn relay_login_failure(response: UpstreamResponse, policy: &CookiePolicy) -> Response {
    let clear = clear_session_cookie(policy.secure, policy.same_site);

    let mut builder = Response::builder().status(response.status);
    if let Some(content_type) = response.headers.get(header::CONTENT_TYPE) {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder = builder.header(header::SET_COOKIE, clear.to_string());

    builder
        .body(response.body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
