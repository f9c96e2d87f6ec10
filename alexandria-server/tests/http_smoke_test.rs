//! Smoke tests against a live server instance. Not run by default — `cargo
//! test` against this crate doesn't boot Postgres/Redis/the provider
//! secrets a real run needs, so these stay opt-in, same as the other HTTP
//! integration tests in this workspace.

use std::time::Duration;

const BASE_URL: &str = "http://localhost:8080";

#[tokio::test]
#[ignore = "requires server running"]
async fn health_check_responds_ok() {
    tokio::time::sleep(Duration::from_secs(1)).await;
    let client = reqwest::Client::new();
    let response = client.get(format!("{BASE_URL}/health")).send().await.unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore = "requires server running"]
async fn quota_status_reports_the_configured_daily_limit() {
    let client = reqwest::Client::new();
    let response = client.get(format!("{BASE_URL}/api/quota/status")).send().await.unwrap();
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body.get("daily_limit").is_some());
}

#[tokio::test]
#[ignore = "requires server running"]
async fn batch_direct_rejects_an_oversized_request() {
    let client = reqwest::Client::new();
    let isbns: Vec<String> = (0..1001).map(|i| format!("97800000{i:05}")).collect();
    let response = client
        .post(format!("{BASE_URL}/api/enrich/batch-direct"))
        .json(&serde_json::json!({ "isbns": isbns }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}
