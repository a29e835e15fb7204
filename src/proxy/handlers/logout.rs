//! Logout: best-effort session deletion, unconditional cookie clearing.
//! Never fails from the client's perspective.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::SameSite;
use axum_extra::extract::CookieJar;
use serde_json::json;

use super::clear_session_cookie;
use crate::proxy::cookie_policy::CookiePolicy;
use crate::proxy::server::AppState;
use crate::proxy::SESSION_COOKIE_NAME;

/// POST /api/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    // Deletion failures are logged by the task runner, never surfaced
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        let session_id = cookie.value().to_string();
        let store = state.store.clone();
        state
            .tasks
            .spawn("session delete", async move { store.delete(&session_id).await });
    }

    // The clear must go out even when policy resolution cannot; logout is
    // triggered from the app itself, so treat it as same-site.
    let secure = CookiePolicy::resolve(&headers, &state.config)
        .map(|policy| policy.secure)
        .unwrap_or(true);

    let jar = jar.add(clear_session_cookie(secure, SameSite::Lax));
    (jar, Json(json!({ "success": true }))).into_response()
}
