//! Admission/shutdown gate. Runs before every handler; rejects with the
//! error envelope directly when the service is draining, without ever
//! reaching the handler.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::shutdown::Coordinator;

use super::state::AppState;

/// Decrements the active-request count on drop, so a client disconnect
/// (which drops this middleware's future without ever polling it to
/// completion) still releases the count rather than leaking it.
struct ActiveGuard(Arc<Coordinator>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// Cancels the request's token on drop. A handler's future is dropped
/// without being polled to completion when the client disconnects, so this
/// is the only reliable signal a handler has that it should stop working.
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

pub async fn admission_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if state.shutdown.is_draining() {
        return AppError::Draining.into_response();
    }

    let ctx = CancellationToken::new();
    request.extensions_mut().insert(ctx.clone());

    state.shutdown.inc();
    let _active = ActiveGuard(state.shutdown.clone());
    let _cancel_on_drop = CancelOnDrop(ctx);
    next.run(request).await
}
