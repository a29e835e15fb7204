use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::proxy::session::StoreError;

/// Terminal error taxonomy for the proxy boundary.
///
/// Nothing here is retried; each variant maps to exactly one HTTP status so
/// the frontend gets an unambiguous signal.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Malformed or missing login fields. No upstream or store interaction.
    #[error("invalid login request: {0}")]
    InvalidInput(&'static str),

    /// No valid bridged session.
    #[error("not authenticated")]
    Unauthenticated,

    /// The session store is unreachable or misconfigured. Distinct from a
    /// plain miss, which is a normal "no such session" signal.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Upstream service could not be reached.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// CORS cannot be configured for this request.
    #[error("configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Store(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
