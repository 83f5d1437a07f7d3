//! Route table for the HTTP/SSE edge: one `create_router(state) -> Router` that wires
//! every handler, `TraceLayer`, and `CorsLayer` onto a shared `AppState`.

use crate::handlers::{chat, execution, hitl};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat::chat))
        .route("/chat/image", post(chat::chat_image))
        .route("/hitl/respond", post(hitl::respond))
        .route("/hitl/continue", post(hitl::cont))
        .route("/api/execution/topology", get(execution::topology))
        .route("/api/execution/{session_id}/timeline", get(execution::timeline))
        .route("/api/execution/{execution_id}/snapshot", get(execution::snapshot))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
