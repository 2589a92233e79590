use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::storage::{Store, StoreError};

pub type SharedStore = Arc<Store>;

#[derive(Deserialize)]
pub struct ReadQuery {
    offset: u64,
    length: usize,
}

#[derive(Deserialize)]
pub struct WriteQuery {
    #[serde(default)]
    offset: u64,
}

#[derive(Deserialize)]
pub struct LockQuery {
    #[serde(default)]
    exclusive: bool,
}

pub async fn get_object(
    State(store): State<SharedStore>,
    Path(key): Path<String>,
    Query(q): Query<ReadQuery>,
) -> Result<Bytes, StatusCode> {
    match store.read(&key, q.offset, q.length) {
        Ok(bytes) => Ok(Bytes::from(bytes)),
        Err(StoreError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(StoreError::Io(e)) => {
            tracing::error!(key, error = %e, "read failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn put_object(
    State(store): State<SharedStore>,
    Path(key): Path<String>,
    Query(q): Query<WriteQuery>,
    body: Bytes,
) -> StatusCode {
    match store.write(&key, q.offset, &body) {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::error!(key, error = ?e, "write failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub async fn head_object(State(store): State<SharedStore>, Path(key): Path<String>) -> StatusCode {
    if store.exists(&key) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn delete_object(State(store): State<SharedStore>, Path(key): Path<String>) -> StatusCode {
    match store.remove(&key) {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!(key, error = ?e, "delete failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub async fn acquire_lock(
    State(store): State<SharedStore>,
    Path(key): Path<String>,
    Query(q): Query<LockQuery>,
) -> StatusCode {
    if store.lock(&key, q.exclusive) {
        StatusCode::OK
    } else {
        StatusCode::CONFLICT
    }
}

pub async fn release_lock(State(store): State<SharedStore>, Path(key): Path<String>) -> StatusCode {
    store.unlock(&key);
    StatusCode::OK
}
