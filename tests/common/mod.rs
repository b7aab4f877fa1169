//! Shared fixtures: real downstream services on ephemeral ports and a gateway
//! router pointed at them.
#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use arc_swap::ArcSwap;
use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::Request,
    http::header,
    response::Response,
};
use http_body_util::BodyExt;
use mirror_gateway::{
    HttpClientAdapter, HttpHandler, MirrorGateway, config::models::ServerConfig,
};
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;

/// Service segment that reaches the local downstream
pub const LOCAL_SERVICE: &str = "127.0.0.1";

pub async fn spawn_downstream(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A downstream that describes the request it received as JSON.
pub fn echo_service() -> Router {
    Router::new().fallback(echo)
}

async fn echo(req: Request) -> Json<Value> {
    let (parts, body) = req.into_parts();

    let mut headers = Map::new();
    for name in parts.headers.keys() {
        let values: Vec<Value> = parts
            .headers
            .get_all(name)
            .iter()
            .map(|v| Value::String(v.to_str().unwrap_or_default().to_string()))
            .collect();
        headers.insert(name.as_str().to_string(), Value::Array(values));
    }

    let framed = parts.headers.contains_key(header::CONTENT_LENGTH)
        || parts.headers.contains_key(header::TRANSFER_ENCODING);
    let body = to_bytes(body, usize::MAX).await.unwrap_or_default();

    Json(json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "headers": headers,
        "framed": framed,
        "body": String::from_utf8_lossy(&body),
    }))
}

pub fn gateway_config(port: u16, timeout: &str) -> ServerConfig {
    ServerConfig::builder()
        .upstream_port(port)
        .upstream_timeout(timeout)
        .build()
}

pub fn gateway_router(config: ServerConfig) -> Router {
    let client = Arc::new(HttpClientAdapter::new(config.upstream.timeout_duration()).unwrap());
    let gateway = MirrorGateway::from_config(&config, client);
    let handler = HttpHandler::new(
        Arc::new(ArcSwap::from_pointee(gateway)),
        Arc::new(ArcSwap::from_pointee(config)),
    );
    Arc::new(handler).router()
}

pub async fn body_bytes(response: Response<Body>) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
