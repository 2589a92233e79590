pub mod config;
pub mod handlers;
pub mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use handlers::*;
use tower_http::trace::TraceLayer;

pub fn build_router(store: SharedStore) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route(
            "/objects/*key",
            get(get_object).put(put_object).head(head_object).delete(delete_object),
        )
        .route("/lock/*key", post(acquire_lock).delete(release_lock))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}
