use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    Router,
    body::Body as AxumBody,
    extract::Request,
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::Response,
    routing::any,
};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body as _;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    adapters::middleware::request_timing_middleware,
    config::models::ServerConfig,
    core::{
        envelope::ErrorEnvelope,
        exchange::{InboundRequest, ProxyResponse},
        gateway::MirrorGateway,
    },
    metrics, tracing_setup,
};

/// Inbound HTTP surface of the mirror gateway.
///
/// Converts axum requests into [`InboundRequest`]s, hands them to the current
/// [`MirrorGateway`] and turns the result back into an axum response. Both the
/// gateway and the config are read through `ArcSwap` so a reload takes effect
/// on the next request without disturbing in-flight ones.
#[derive(Clone)]
pub struct HttpHandler {
    gateway: Arc<ArcSwap<MirrorGateway>>,
    config: Arc<ArcSwap<ServerConfig>>,
}

impl HttpHandler {
    pub fn new(gateway: Arc<ArcSwap<MirrorGateway>>, config: Arc<ArcSwap<ServerConfig>>) -> Self {
        Self { gateway, config }
    }

    /// Build the axum router: every method on every path goes to the gateway.
    pub fn router(self: Arc<Self>) -> Router {
        let make_route = |handler: Arc<HttpHandler>| {
            any(move |req: Request| {
                let handler = handler.clone();
                async move { handler.handle_request(req).await }
            })
        };

        Router::new()
            .route("/{*path}", make_route(self.clone()))
            .route("/", make_route(self))
            .layer(middleware::from_fn(request_timing_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// Handle one inbound request. Every path ends in a response.
    pub async fn handle_request(&self, req: Request<AxumBody>) -> Response<AxumBody> {
        let method = req.method().clone();
        let request_id = Uuid::new_v4().to_string();
        let span = tracing_setup::create_request_span(method.as_str(), req.uri().path(), &request_id);

        async move {
            let _timer = metrics::RequestTimer::new(method.as_str());
            let gateway = self.gateway.load_full();
            let body_limit = self.config.load().max_body_bytes;

            let response = match read_inbound(req, body_limit).await {
                Ok(inbound) => gateway.forward(inbound).await,
                Err(rejection) => rejection,
            };

            tracing::Span::current().record("http.status_code", response.status.as_u16());
            metrics::increment_request_total(method.as_str(), response.status.as_u16());
            into_axum_response(response)
        }
        .instrument(span)
        .await
    }
}

/// Whether the caller sent a body at all, as opposed to an empty one.
fn declares_body(headers: &HeaderMap, body: &AxumBody) -> bool {
    headers.contains_key(header::CONTENT_LENGTH)
        || headers.contains_key(header::TRANSFER_ENCODING)
        || !body.is_end_stream()
}

/// Buffer the inbound request. Failures are already rendered as responses.
async fn read_inbound(
    req: Request<AxumBody>,
    body_limit: usize,
) -> Result<InboundRequest, ProxyResponse> {
    let (parts, body) = req.into_parts();
    let has_body = declares_body(&parts.headers, &body);

    let body = if has_body {
        Some(buffer_body(body, body_limit).await?)
    } else {
        None
    };

    Ok(InboundRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
    })
}

async fn buffer_body(body: AxumBody, body_limit: usize) -> Result<Bytes, ProxyResponse> {
    match Limited::new(body, body_limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            tracing::warn!(limit = body_limit, "Inbound body exceeds limit");
            Err(ProxyResponse::error(
                StatusCode::PAYLOAD_TOO_LARGE,
                &ErrorEnvelope::new(
                    "PayloadTooLarge",
                    format!("Request body exceeds {body_limit} bytes"),
                ),
            ))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read inbound body");
            Err(ProxyResponse::error(
                StatusCode::BAD_REQUEST,
                &ErrorEnvelope::new("InvalidRequestBody", e.to_string()),
            ))
        }
    }
}

fn into_axum_response(response: ProxyResponse) -> Response<AxumBody> {
    let mut relayed = Response::new(AxumBody::from(response.body));
    *relayed.status_mut() = response.status;
    *relayed.headers_mut() = response.headers;
    relayed
}
