use nmfs_objectd::{build_router, storage::Store};
use reqwest::StatusCode;
use std::sync::Arc;

async fn spawn_server() -> String {
    let dir = std::env::temp_dir().join(format!("nmfs-objectd-test-{}", uuid_ish()));
    let store = Arc::new(Store::new(&dir).unwrap());
    let app = build_router(store);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Cheap per-test directory discriminator; good enough to avoid test
/// interference without pulling in a UUID dependency just for this.
fn uuid_ish() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    std::process::id() as u64 * 1_000_000 + COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[tokio::test]
async fn health_check() {
    let base = spawn_server().await;
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn write_then_read_object() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let put_resp = client
        .put(format!("{base}/objects/k$0?offset=0"))
        .body("hello world")
        .send()
        .await
        .unwrap();
    assert_eq!(put_resp.status(), StatusCode::OK);

    let get_resp = client
        .get(format!("{base}/objects/k$0?offset=0&length=11"))
        .send()
        .await
        .unwrap();
    assert_eq!(get_resp.status(), StatusCode::OK);
    assert_eq!(get_resp.text().await.unwrap(), "hello world");
}

#[tokio::test]
async fn partial_read_respects_offset_and_length() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();
    client
        .put(format!("{base}/objects/k$0?offset=0"))
        .body("0123456789")
        .send()
        .await
        .unwrap();

    let resp = client
        .get(format!("{base}/objects/k$0?offset=3&length=4"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.text().await.unwrap(), "3456");
}

#[tokio::test]
async fn missing_object_is_404() {
    let base = spawn_server().await;
    let resp = reqwest::get(format!("{base}/objects/never-written$0?offset=0&length=1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn head_reports_existence() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();
    client
        .put(format!("{base}/objects/k$0?offset=0"))
        .body("x")
        .send()
        .await
        .unwrap();

    let present = client.head(format!("{base}/objects/k$0")).send().await.unwrap();
    assert_eq!(present.status(), StatusCode::OK);

    let absent = client.head(format!("{base}/objects/nope$0")).send().await.unwrap();
    assert_eq!(absent.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();
    client
        .put(format!("{base}/objects/k$0?offset=0"))
        .body("x")
        .send()
        .await
        .unwrap();

    let first = client.delete(format!("{base}/objects/k$0")).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let second = client.delete(format!("{base}/objects/k$0")).send().await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
}

#[tokio::test]
async fn exclusive_lock_conflicts_with_second_holder() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let first = client
        .post(format!("{base}/lock/k$0?exclusive=true"))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = client
        .post(format!("{base}/lock/k$0?exclusive=false"))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let released = client.delete(format!("{base}/lock/k$0")).send().await.unwrap();
    assert_eq!(released.status(), StatusCode::OK);

    let third = client
        .post(format!("{base}/lock/k$0?exclusive=false"))
        .send()
        .await
        .unwrap();
    assert_eq!(third.status(), StatusCode::OK);
}
