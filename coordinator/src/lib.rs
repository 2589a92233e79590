//! HTTP front-end for [`nmfs_core::lease::LeaseTable`]: the single
//! authority clients consult to become (or stay) the exclusive writer for
//! a directory.

use axum::{extract::State, routing::post, Json, Router};
use nmfs_core::lease::{AcquireRequest, AcquireResponse, LeaseOutcome, LeaseTable};
use std::sync::Arc;
use std::time::Instant;

pub fn build_router(table: Arc<LeaseTable>) -> Router {
    Router::new()
        .route("/health", axum::routing::get(|| async { "OK" }))
        .route("/lease/acquire", post(acquire))
        .with_state(table)
}

async fn acquire(
    State(table): State<Arc<LeaseTable>>,
    Json(req): Json<AcquireRequest>,
) -> Json<AcquireResponse> {
    let outcome = table.acquire(req.ino, &req.remote_addr);
    tracing::debug!(ino = req.ino, holder = %req.remote_addr, granted = outcome.granted(), "lease acquire");

    let now = Instant::now();
    let response = match outcome {
        LeaseOutcome::Granted { expires_at } => AcquireResponse {
            granted: true,
            expires_in_ms: expires_at.saturating_duration_since(now).as_millis() as u64,
            current_holder: None,
        },
        LeaseOutcome::Held {
            current_holder,
            expires_at,
        } => AcquireResponse {
            granted: false,
            expires_in_ms: expires_at.saturating_duration_since(now).as_millis() as u64,
            current_holder: Some(current_holder),
        },
    };

    Json(response)
}
