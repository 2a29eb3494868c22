use super::{handlers, state::AppState};
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

// Room for the multipart framing and the text fields around the document.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    let body_limit = app_state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route(
            "/process-pdf",
            post(handlers::process_pdf_handler).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/api/process-pdf",
            post(handlers::api_process_pdf_handler).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
