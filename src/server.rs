//! HTTP surface.
//!
//! `GET /convert/{collection_id}/{image_name}` serves one encoded artifact;
//! `GET /healthz` answers `ok`.

mod error;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::config::VariantsConfig;
use crate::service::ConversionService;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConversionService>,
    pub variants: Arc<VariantsConfig>,
}

impl AppState {
    pub fn new(service: ConversionService, variants: VariantsConfig) -> Self {
        Self {
            service: Arc::new(service),
            variants: Arc::new(variants),
        }
    }
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let routes = Router::new()
        .route("/convert/{collection_id}/{image_name}", get(handlers::convert))
        .route("/healthz", get(handlers::healthz))
        .with_state(state);
    with_layers(routes, request_timeout)
}

fn with_layers(routes: Router, request_timeout: Duration) -> Router {
    routes
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(middleware::map_response(
            move |response: Response| timeout_body(response, request_timeout),
        ))
        .layer(TraceLayer::new_for_http())
}

/// The timeout layer answers with an empty body; handlers never emit 408.
async fn timeout_body(response: Response, request_timeout: Duration) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        ApiError::Timeout(request_timeout).into_response()
    } else {
        response
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
