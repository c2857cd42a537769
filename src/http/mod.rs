//! Thin HTTP transport: an `axum` router that deserializes JSON, calls into
//! the core subsystems, and serializes the result. No business logic lives
//! here.

mod handlers;
mod middleware;
mod state;

pub use state::AppState;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    let base_path = state.config.base_path.clone();

    // `/health` is deliberately NOT behind the admission gate: it reports
    // its own `shutting_down` body while draining instead of the generic
    // error envelope, so it must still reach its handler in that state.
    let gated = Router::new()
        .route("/page", post(handlers::page))
        .route("/batch", post(handlers::create_batch))
        .route("/batch/{id}", get(handlers::batch_status))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::admission_gate,
        ));

    let api = gated
        .route("/health", get(handlers::health))
        .with_state(state);

    let mount_path = format!("{base_path}/api/v1");
    Router::new()
        .nest(&mount_path, api)
        .layer(TraceLayer::new_for_http())
}
