use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::modules::config::BridgeConfig;
use crate::proxy::session::SessionStore;
use crate::proxy::tasks::DetachedTasks;
use crate::proxy::upstream::UpstreamTransport;

/// Axum application state
///
/// Handlers are stateless; everything cross-request lives behind the session
/// store, so the whole service is horizontally replicable.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BridgeConfig>,
    pub store: Arc<dyn SessionStore>,
    pub upstream: Arc<dyn UpstreamTransport>,
    pub tasks: DetachedTasks,
}

/// Build the route table: login, logout, preflight (middleware), generic
/// forwarding fallback, liveness.
pub fn create_app(state: AppState) -> Router {
    use crate::proxy::handlers;

    let prefix = state.config.route_prefix.clone();
    let login_path = format!("{}/api/login", prefix);
    let logout_path = format!("{}/api/logout", prefix);

    Router::new()
        .route("/healthz", get(health_check_handler))
        .route(&login_path, post(handlers::login::handle_login))
        .route(&logout_path, post(handlers::logout::handle_logout))
        .fallback(handlers::forward::handle_forward)
        .layer(DefaultBodyLimit::max(state.config.body_limit))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::proxy::middleware::cors_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Axum server instance
pub struct AxumServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl AxumServer {
    /// Start the proxy server, returning the instance and the accept-loop
    /// task handle.
    pub async fn start(state: AppState) -> Result<(Self, tokio::task::JoinHandle<()>), String> {
        let addr = format!("{}:{}", state.config.bind_address, state.config.port);
        let app = create_app(state);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("failed to bind address {}: {}", addr, e))?;

        tracing::info!("feedbridge listening on http://{}", addr);

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = TowerToHyperService::new(app.clone());

                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("connection handling ended or error: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("failed to accept connection: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("proxy server stopped listening");
                        break;
                    }
                }
            }
        });

        Ok((
            Self {
                shutdown_tx: Some(shutdown_tx),
            },
            handle,
        ))
    }

    /// Stop the server
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Health check handler
async fn health_check_handler() -> Response {
    Json(serde_json::json!({
        "status": "ok"
    }))
    .into_response()
}
