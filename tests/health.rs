mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::offline_state;
use hoxobil_store::routes::create_app;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

fn app() -> axum::Router {
    create_app(offline_state(None), SessionManagerLayer::new(MemoryStore::default()))
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_degraded_database_and_missing_integrations() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["message"], "Health check");
    assert_eq!(body["data"]["status"], "degraded");
    assert_eq!(body["data"]["database"], false);
    assert_eq!(body["data"]["paystack"], false);
    assert_eq!(body["data"]["printify"], false);
}

#[tokio::test]
async fn protected_routes_require_sign_in() {
    let response = app()
        .oneshot(
            Request::post("/api/competition/submit")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"code":"123456"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_paths_are_json_404s() {
    let response = app()
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["data"]["path"], "/nope");
}

#[tokio::test]
async fn empty_session_cart_renders() {
    let response = app()
        .oneshot(Request::get("/api/cart").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["item_count"], 0);
}
