//! Request-scoped CORS middleware.
//!
//! The allowed origin is recomputed for every request (trust on presence,
//! see `cookie_policy`) and applied to every proxied response, including
//! errors.
//! Preflight OPTIONS requests terminate here with 204.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::proxy::cookie_policy::{declared_origin, resolve_allowed_origin};
use crate::proxy::server::AppState;

pub async fn cors_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    // Liveness probes are not browser traffic
    if request.uri().path() == "/healthz" {
        return next.run(request).await;
    }

    let origin = match resolve_allowed_origin(
        declared_origin(request.headers()),
        state.config.default_origin.as_deref(),
    ) {
        Ok(origin) => origin,
        // CORS cannot be safely configured: fail before any auth logic
        Err(e) => return e.into_response(),
    };

    if request.method() == Method::OPTIONS {
        let requested_headers = request
            .headers()
            .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .cloned();
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut(), &origin, true, requested_headers);
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut(), &origin, false, None);
    response
}

fn apply_cors_headers(
    headers: &mut HeaderMap,
    origin: &str,
    preflight: bool,
    requested_headers: Option<HeaderValue>,
) {
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));

    if preflight {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, PUT, DELETE, PATCH, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            requested_headers.unwrap_or_else(|| HeaderValue::from_static("Content-Type")),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static("86400"),
        );
    }
}
