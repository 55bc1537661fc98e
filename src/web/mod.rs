//! Local HTTP JSON front-end.

pub mod handlers;

use crate::core::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub const DEFAULT_PORT: u16 = 5000;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::health_check))
        .route("/health", get(handlers::health_check))
        .route("/search_cnr", post(handlers::search_cnr))
        .route("/check_listing", post(handlers::check_listing))
        .route("/download_causelist", post(handlers::download_causelist))
        .route("/get_states", get(handlers::get_states))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolves on Ctrl-C / SIGTERM, after closing the shared browser session.
pub async fn shutdown_signal(state: Arc<AppState>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("shutting down, closing browser session");
    state.service.shutdown().await;
}
