//! API route tests using in-process requests against the router.

use crate::api::create_router;
use crate::engine::test_helpers::{create_test_engine, test_config, StubFetcher, StubOutcome};
use crate::error::ApiError;
use crate::types::{JobSnapshot, Status};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use tower::ServiceExt;

fn test_router(dir: &tempfile::TempDir, fetcher: Arc<StubFetcher>) -> Router {
    let config = test_config(dir);
    let (engine, _processor) = create_test_engine(config, fetcher);
    let config = engine.get_config();
    create_router(engine, config)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_job_returns_201_with_id() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(&dir, Arc::new(StubFetcher::new()));

    let response = app.oneshot(empty_request("POST", "/jobs")).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: serde_json::Value = body_json(response).await;
    assert_eq!(body["id"], 1);
}

#[tokio::test]
async fn create_job_at_capacity_returns_503() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(&dir, Arc::new(StubFetcher::new()));

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(empty_request("POST", "/jobs"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.oneshot(empty_request("POST", "/jobs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let error: ApiError = body_json(response).await;
    assert_eq!(error.error.code, "capacity_exceeded");
    assert_eq!(error.error.details.unwrap()["capacity"], 3);
}

#[tokio::test]
async fn get_unknown_job_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(&dir, Arc::new(StubFetcher::new()));

    let response = app.oneshot(empty_request("GET", "/jobs/999")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: ApiError = body_json(response).await;
    assert_eq!(error.error.code, "not_found");
}

#[tokio::test]
async fn attached_resource_appears_in_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(&dir, Arc::new(StubFetcher::new()));

    let response = app
        .clone()
        .oneshot(empty_request("POST", "/jobs"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/jobs/1/resources",
            serde_json::json!({"url": "http://example.com/a.txt"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(empty_request("GET", "/jobs/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let snapshot: JobSnapshot = body_json(response).await;
    assert_eq!(snapshot.status, Status::Pending);
    assert_eq!(snapshot.resources, vec!["http://example.com/a.txt"]);
}

#[tokio::test]
async fn attach_with_empty_url_returns_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(&dir, Arc::new(StubFetcher::new()));

    app.clone()
        .oneshot(empty_request("POST", "/jobs"))
        .await
        .unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            "/jobs/1/resources",
            serde_json::json!({"url": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error: ApiError = body_json(response).await;
    assert_eq!(error.error.code, "validation_error");
}

#[tokio::test]
async fn attach_to_unknown_job_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(&dir, Arc::new(StubFetcher::new()));

    let response = app
        .oneshot(json_request(
            "POST",
            "/jobs/42/resources",
            serde_json::json!({"url": "http://example.com/a.txt"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_returns_204_and_fails_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(&dir, Arc::new(StubFetcher::new()));

    app.clone()
        .oneshot(empty_request("POST", "/jobs"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/jobs/1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(empty_request("GET", "/jobs/1")).await.unwrap();
    let snapshot: JobSnapshot = body_json(response).await;
    assert_eq!(snapshot.status, Status::Failed);
}

#[tokio::test]
async fn completed_job_snapshot_carries_the_result_location() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.stub("http://example.com/a.txt", StubOutcome::Ok(b"data".to_vec()));

    let mut config = test_config(&dir);
    config.max_resources_per_job = 1;
    let (engine, _processor) = create_test_engine(config, fetcher);
    let app = create_router(Arc::clone(&engine), engine.get_config());

    app.clone()
        .oneshot(empty_request("POST", "/jobs"))
        .await
        .unwrap();
    app.clone()
        .oneshot(json_request(
            "POST",
            "/jobs/1/resources",
            serde_json::json!({"url": "http://example.com/a.txt"}),
        ))
        .await
        .unwrap();

    let snapshot =
        crate::engine::test_helpers::wait_for_terminal(&engine, crate::types::JobId(1)).await;
    assert_eq!(snapshot.status, Status::Completed);

    let response = app.oneshot(empty_request("GET", "/jobs/1")).await.unwrap();
    let snapshot: JobSnapshot = body_json(response).await;
    assert_eq!(snapshot.status, Status::Completed);
    assert_eq!(snapshot.result_location.as_deref(), Some("/archives/1.zip"));
    assert!(snapshot.errors.is_empty());
}

#[tokio::test]
async fn health_check_reports_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(&dir, Arc::new(StubFetcher::new()));

    let response = app.oneshot(empty_request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn openapi_spec_is_served_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(&dir, Arc::new(StubFetcher::new()));

    let response = app
        .oneshot(empty_request("GET", "/openapi.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(response).await;
    assert_eq!(body["info"]["title"], "bundle-dl REST API");
    assert!(body["paths"].get("/jobs").is_some());
}
