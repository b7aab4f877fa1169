// End-to-end forwarding through the gateway router to a real downstream.
mod common;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    routing::post,
};
use common::{
    LOCAL_SERVICE, body_bytes, body_json, echo_service, gateway_config, gateway_router,
    spawn_downstream,
};
use tower::ServiceExt;

#[tokio::test(flavor = "multi_thread")]
async fn method_path_and_query_reach_the_service_unchanged() {
    let downstream = spawn_downstream(echo_service()).await;
    let app = gateway_router(gateway_config(downstream.port(), "5s"));

    let query = "q=a%26b%3Dc&name=%25percent&empty=&plus=a+b";
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::PATCH)
                .uri(format!("/{LOCAL_SERVICE}/users/me/settings?{query}"))
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let seen = body_json(response).await;
    assert_eq!(seen["method"], "PATCH");
    assert_eq!(seen["path"], "/users/me/settings");
    assert_eq!(seen["query"], query);
    assert_eq!(seen["body"], "{}");
}

#[tokio::test(flavor = "multi_thread")]
async fn service_root_is_forwarded_to_root_path() {
    let downstream = spawn_downstream(echo_service()).await;
    let app = gateway_router(gateway_config(downstream.port(), "5s"));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/{LOCAL_SERVICE}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let seen = body_json(response).await;
    assert_eq!(seen["path"], "/");
    assert!(seen["query"].is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn inbound_headers_arrive_with_their_values() {
    let downstream = spawn_downstream(echo_service()).await;
    let app = gateway_router(gateway_config(downstream.port(), "5s"));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/{LOCAL_SERVICE}/chats/rooms"))
                .header(header::HOST, "gateway.example.com")
                .header(header::AUTHORIZATION, "Bearer token-123")
                .header("x-trace", "first")
                .header("x-trace", "second")
                .header(header::CONNECTION, "keep-alive")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let seen = body_json(response).await;
    let headers = &seen["headers"];
    assert_eq!(headers["authorization"][0], "Bearer token-123");
    assert_eq!(headers["x-trace"][0], "first");
    assert_eq!(headers["x-trace"][1], "second");
    assert_eq!(headers["connection"][0], "keep-alive");
    // The caller-facing authority never reaches the service.
    assert_eq!(
        headers["host"][0],
        format!("{LOCAL_SERVICE}:{}", downstream.port())
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn absent_body_arrives_without_framing() {
    let downstream = spawn_downstream(echo_service()).await;
    let app = gateway_router(gateway_config(downstream.port(), "5s"));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/{LOCAL_SERVICE}/chats/rooms/7"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let seen = body_json(response).await;
    assert_eq!(seen["method"], "DELETE");
    assert_eq!(seen["framed"], false);
    assert_eq!(seen["body"], "");
}

#[tokio::test(flavor = "multi_thread")]
async fn explicit_empty_body_arrives_as_zero_length() {
    let downstream = spawn_downstream(echo_service()).await;
    let app = gateway_router(gateway_config(downstream.port(), "5s"));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/{LOCAL_SERVICE}/chats/rooms"))
                .header(header::CONTENT_LENGTH, "0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let seen = body_json(response).await;
    assert_eq!(seen["framed"], true);
    assert_eq!(seen["headers"]["content-length"][0], "0");
}

#[tokio::test(flavor = "multi_thread")]
async fn stale_content_length_is_replaced() {
    let downstream = spawn_downstream(echo_service()).await;
    let app = gateway_router(gateway_config(downstream.port(), "5s"));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri(format!("/{LOCAL_SERVICE}/users/me"))
                .header(header::CONTENT_LENGTH, "999")
                .body(Body::from("hello world"))
                .unwrap(),
        )
        .await
        .unwrap();

    let seen = body_json(response).await;
    // The declared length was wrong; the forwarded one matches the bytes sent.
    assert_eq!(seen["headers"]["content-length"].as_array().unwrap().len(), 1);
    assert_eq!(seen["headers"]["content-length"][0], "11");
    assert_eq!(seen["body"], "hello world");
}

#[tokio::test(flavor = "multi_thread")]
async fn forwarding_twice_gives_identical_responses() {
    let downstream = spawn_downstream(echo_service()).await;
    let app = gateway_router(gateway_config(downstream.port(), "5s"));

    let request = || {
        Request::builder()
            .method(Method::POST)
            .uri(format!("/{LOCAL_SERVICE}/chats/rooms?limit=5"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"general"}"#))
            .unwrap()
    };

    let first = app.clone().oneshot(request()).await.unwrap();
    let second = app.oneshot(request()).await.unwrap();

    assert_eq!(first.status(), second.status());
    assert_eq!(
        first.headers().get(header::CONTENT_TYPE),
        second.headers().get(header::CONTENT_TYPE)
    );
    assert_eq!(body_bytes(first).await, body_bytes(second).await);
}

#[tokio::test(flavor = "multi_thread")]
async fn mount_prefix_is_stripped_before_resolution() {
    let downstream = spawn_downstream(
        Router::new().route("/rooms", post(|| async { "created" })),
    )
    .await;
    let mut config = gateway_config(downstream.port(), "5s");
    config.mount_prefix = "/api".to_string();
    let app = gateway_router(config);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/api/{LOCAL_SERVICE}/rooms"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, "created");

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/{LOCAL_SERVICE}/rooms"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
