//! HTTP boundary over the graph: a thin adapter mapping requests onto the
//! core API, one route per boundary operation.

mod handlers;
mod state;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use factgraph::{Dictionary, Graph, MigrationRegistry};

pub use state::AppState;

/// Structured error body; internal representations never leak.
pub(crate) fn json_error(status: StatusCode, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        status,
        Json(serde_json::json!({ "success": false, "error": message })),
    )
}

pub(crate) fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::handle_health))
        .route("/paths", get(handlers::handle_paths))
        .route("/fact", get(handlers::handle_describe))
        .route("/deps", get(handlers::handle_deps))
        .route("/rdeps", get(handlers::handle_rdeps))
        .route("/get", post(handlers::handle_get))
        .route("/set", post(handlers::handle_set))
        .route("/set-batch", post(handlers::handle_set_batch))
        .route("/save", post(handlers::handle_save))
        .route("/explain", post(handlers::handle_explain))
        .route("/snapshot", get(handlers::handle_snapshot))
        .route("/load", post(handlers::handle_load))
        .route("/diff", post(handlers::handle_diff))
        .route("/collection/add", post(handlers::handle_collection_add))
        .route("/collection/remove", post(handlers::handle_collection_remove))
        .route("/reset", post(handlers::handle_reset))
        .fallback(handlers::handle_not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn run(
    listen: &str,
    dictionary: Arc<Dictionary>,
    graph: Graph,
    registry: MigrationRegistry,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(dictionary, graph, registry));
    let router = app(state);
    let listener = tokio::net::TcpListener::bind(listen).await?;
    tracing::info!(address = %listener.local_addr()?, "factgraph serving");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
