use axum::{Router, extract::State, routing::get};
use std::sync::Arc;
use tracing::info;

use crate::detector::{DETECTOR_ID, NPlusOneLayer};
use crate::handlers::{
    health_handler, list_authors, list_authors_batched, list_books, metrics_handler,
};
use crate::state::AppState;

/// Repeats allowed on the `/tolerant` routes.
pub const TOLERANT_THRESHOLD: i64 = 10;

// creating the router with routes
pub fn build_router(state: Arc<AppState>) -> Router {
    let settings = &state.settings;
    let tolerant_authors = settings
        .threshold(TOLERANT_THRESHOLD)
        .decorate_async(list_authors);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/authors", get(list_authors))
        .route("/authors/batched", get(list_authors_batched))
        .route(
            "/authors/tolerant",
            get(move |state: State<Arc<AppState>>| async move {
                tolerant_authors.handle_async(state).await
            }),
        )
        .route("/books", get(list_books))
        .route(
            "/books/tolerant",
            get(list_books).layer(settings.threshold(TOLERANT_THRESHOLD).layer()),
        );

    let router = if settings.detector_active() {
        info!(detector = DETECTOR_ID, "N+1 detection enabled");
        router.layer(NPlusOneLayer::new())
    } else {
        router
    };

    router.with_state(state)
}
