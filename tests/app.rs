mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{Method, StatusCode, header},
};
use request_shaper::{
    AppState, build_app,
    cache::{CacheStore, MemoryStore},
    config::Config,
    middleware::{HEADER_LIMIT, HEADER_REMAINING},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{body_json, settle};

fn test_config() -> Config {
    Config {
        jwt_secret: "test-secret".into(),
        ..Config::default()
    }
}

fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(test_config(), store.clone());
    (build_app(state).unwrap(), store)
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn login(app: &Router, user_id: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/auth/token",
            None,
            json!({ "user_id": user_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_not_rate_limited() {
    let (app, _) = test_app();

    let response = app.oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key(HEADER_LIMIT));
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn create_invalidates_the_cached_listing() {
    let (app, store) = test_app();
    let token = login(&app, "alice").await;

    let response = app.clone().oneshot(get("/api/items", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(HEADER_LIMIT).unwrap(), "100");
    assert_eq!(response.headers().get(HEADER_REMAINING).unwrap(), "99");
    assert_eq!(body_json(response).await["data"], json!([]));
    settle().await;
    assert!(
        store
            .get("cache:GET:/api/items:user:alice")
            .await
            .unwrap()
            .is_some()
    );

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/items",
            Some(&token),
            json!({ "name": "census", "description": "2020 extract" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let item_id = created["data"]["item_id"].as_str().unwrap().to_string();
    settle().await;
    assert!(
        store
            .get("cache:GET:/api/items:user:alice")
            .await
            .unwrap()
            .is_none()
    );

    let response = app.clone().oneshot(get("/api/items", Some(&token))).await.unwrap();
    let listing = body_json(response).await;
    assert_eq!(listing["data"].as_array().unwrap().len(), 1);
    assert_eq!(listing["data"][0]["item_id"], item_id.as_str());

    let response = app
        .oneshot(get(&format!("/api/items/{}", item_id), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["name"], "census");
}

#[tokio::test]
async fn listings_are_isolated_between_users() {
    let (app, _) = test_app();
    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/items",
            Some(&alice),
            json!({ "name": "notebook" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    settle().await;

    let response = app.clone().oneshot(get("/api/items", Some(&bob))).await.unwrap();
    assert_eq!(body_json(response).await["data"], json!([]));

    let response = app.oneshot(get("/api/items", Some(&alice))).await.unwrap();
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn writes_require_an_identity() {
    let (app, _) = test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/items",
            None,
            json!({ "name": "orphan" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(get("/api/items", Some("not-a-jwt")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_limiter_only_counts_failures() {
    let (app, _) = test_app();

    for _ in 0..8 {
        login(&app, "alice").await;
    }

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/auth/token",
                None,
                json!({ "user_id": "not valid!" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/auth/token",
            None,
            json!({ "user_id": "alice" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(response).await["retryAfter"], 900);
}
