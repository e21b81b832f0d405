//! HTTP surface: exposition, reload, config inspection and webping.
//!
//! Thin routing glue over the fleet supervisor. Every handler reads or
//! drives state it is handed explicitly through [`AppState`]; nothing here
//! owns scheduling logic.

use crate::config::MetricSpec;
use crate::fleet::FleetSupervisor;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

mod webping;

pub use webping::WebPing;

/// Errors that can occur while serving HTTP.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    /// The fleet supervisor owning the live generation.
    pub fleet: Arc<FleetSupervisor>,
    /// The liveness flag behind `/webping`.
    pub webping: WebPing,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/webping", get(webping_handler))
        .route("/webpingon", get(webping_on_handler))
        .route("/webpingoff", get(webping_off_handler))
        .route("/metrics", get(metrics_handler))
        .route("/metrics/", get(metrics_handler))
        .route("/metrics/reload", get(reload_handler))
        .route("/metrics/configs", get(configs_handler))
        .with_state(state)
}

/// Runs the server until shutdown is requested.
pub async fn run(addr: SocketAddr, state: AppState) -> Result<(), ServerError> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to install Ctrl-C handler");
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(
        "<html>\n\
         <h2>Synthetic metrics generator</h2>\n\
         <br>\n\
         >  /webping - Get webping status.<br>\n\
         >  /webpingon - Enable webping.<br>\n\
         >  /webpingoff - Disable webping.<br>\n\
         >  /metrics - Render the generated metrics.<br>\n\
         >  /metrics/reload - Reload the metrics config.<br>\n\
         >  /metrics/configs - Show the parsed metrics config.<br>\n\
         </html>",
    )
}

async fn webping_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.webping.is_ok() {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::NOT_FOUND, "Fail")
    }
}

async fn webping_on_handler(State(state): State<AppState>) -> &'static str {
    state.webping.enable();
    "Done"
}

async fn webping_off_handler(State(state): State<AppState>) -> &'static str {
    state.webping.disable();
    "Done"
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.fleet.render().await {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {e}"),
        )
            .into_response(),
    }
}

/// Synchronous reload: answers OK only once the replacement generation's
/// workers are running.
async fn reload_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.fleet.reload().await {
        Ok(()) => (StatusCode::OK, "OK".to_owned()),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Reload failed: {e}")),
    }
}

async fn configs_handler(State(state): State<AppState>) -> Json<Vec<MetricSpec>> {
    Json(state.fleet.configs().await)
}
