//! HTTP Server
//!
//! Binds the configured address and serves the gateway routes until Ctrl+C
//! or SIGTERM.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, Span};

use super::handlers::{self, auth, oauth};
use super::AppState;
use crate::common::GatewayError;

/// Routes served both at the root and under `/api`.
fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/values", any(handlers::values))
        .route("/values/{*action}", any(handlers::values))
        .route("/spreadsheets", any(handlers::spreadsheets))
        .route("/spreadsheets/{*action}", any(handlers::spreadsheets))
        .route("/proxy", any(handlers::forward))
        .route("/oauth/auth", any(oauth::authorize))
        .route("/oauth/token", any(oauth::token))
        .route("/auth/start", any(auth::start))
        .route("/auth/callback", any(auth::callback))
}

/// Render a panic as the `UNHANDLED` envelope.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Handler panicked: {}", detail);
    GatewayError::Internal("Unhandled error while processing the request".to_string())
        .into_response()
}

/// Request span carrying the path only. Query strings on the OAuth routes
/// hold codes and client secrets.
fn request_span(request: &Request) -> Span {
    info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

/// Build the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = routes();
    let cors = state.config.server.cors;

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .merge(api.clone())
        .nest("/api", api)
        .with_state(state);

    router = router.layer(CatchPanicLayer::custom(panic_response));
    router = router.layer(TraceLayer::new_for_http().make_span_with(request_span));

    if cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}

/// The gateway HTTP server
pub struct GatewayServer {
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl GatewayServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            addr: state.config.server.listen,
            state,
        }
    }

    /// Serve until a shutdown signal arrives.
    pub async fn run(self) -> std::io::Result<()> {
        let router = build_router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(
            addr = %self.addr,
            mode = self.state.config.credentials.mode.as_str(),
            "sheetgate listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
