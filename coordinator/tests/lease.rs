use nmfs_core::lease::LeaseTable;
use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;

async fn spawn_coordinator() -> String {
    let table = Arc::new(LeaseTable::new());
    let app = nmfs_coordinatord::build_router(table);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn first_acquirer_is_granted() {
    let base = spawn_coordinator().await;
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base}/lease/acquire"))
        .json(&json!({"ino": 1, "remote_addr": "http://client-a"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["granted"], true);
}

#[tokio::test]
async fn second_acquirer_is_denied_and_told_who_holds_it() {
    let base = spawn_coordinator().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/lease/acquire"))
        .json(&json!({"ino": 5, "remote_addr": "http://client-a"}))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}/lease/acquire"))
        .json(&json!({"ino": 5, "remote_addr": "http://client-b"}))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["granted"], false);
    assert_eq!(body["current_holder"], "http://client-a");
}

#[tokio::test]
async fn same_holder_can_renew() {
    let base = spawn_coordinator().await;
    let client = reqwest::Client::new();

    for _ in 0..3 {
        let resp = client
            .post(format!("{base}/lease/acquire"))
            .json(&json!({"ino": 9, "remote_addr": "http://client-a"}))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["granted"], true);
    }
}

#[tokio::test]
async fn distinct_inos_do_not_contend() {
    let base = spawn_coordinator().await;
    let client = reqwest::Client::new();

    let a = client
        .post(format!("{base}/lease/acquire"))
        .json(&json!({"ino": 1, "remote_addr": "http://client-a"}))
        .send()
        .await
        .unwrap();
    let b = client
        .post(format!("{base}/lease/acquire"))
        .json(&json!({"ino": 2, "remote_addr": "http://client-b"}))
        .send()
        .await
        .unwrap();

    assert_eq!(a.json::<serde_json::Value>().await.unwrap()["granted"], true);
    assert_eq!(b.json::<serde_json::Value>().await.unwrap()["granted"], true);
}
