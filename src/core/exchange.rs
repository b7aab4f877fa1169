//! Request-scoped data model for one mirrored exchange.
//!
//! Nothing here outlives a single inbound request. The outbound call is
//! summarized as a [`ForwardOutcome`], a tagged result that the gateway
//! matches exhaustively instead of relying on error propagation.
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header};

use crate::core::envelope::ErrorEnvelope;

/// An inbound request as seen by the gateway.
///
/// `body` is `None` when the caller sent no body at all and `Some(empty)` when
/// it sent an explicitly empty one; the two states are forwarded distinctly.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub path: String,
    /// Raw query string, still percent-encoded exactly as received.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl InboundRequest {
    pub fn new(method: Method, uri: &Uri) -> Self {
        Self {
            method,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// The request actually issued to the internal service.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// A fully buffered HTTP response, either relayed from downstream or
/// synthesized by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Synthesize a gateway error response carrying an [`ErrorEnvelope`].
    pub fn error(status: StatusCode, envelope: &ErrorEnvelope) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Self {
            status,
            headers,
            body: envelope.to_bytes(),
        }
    }

    pub fn page_not_found() -> Self {
        Self::error(StatusCode::NOT_FOUND, &ErrorEnvelope::page_not_found())
    }
}

/// Result of a single outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Downstream answered with a non-error status.
    Response(ProxyResponse),
    /// Downstream answered with a 4xx/5xx status; relayed verbatim.
    DownstreamError(ProxyResponse),
    /// The service name could not be resolved or nothing accepted the connection.
    Unreachable { authority: String, message: String },
    /// Any other failure while talking to the service.
    TransportFailure { kind: String, message: String },
}

impl ForwardOutcome {
    /// Classify a received response by status.
    pub fn from_response(response: ProxyResponse) -> Self {
        if response.status.is_client_error() || response.status.is_server_error() {
            ForwardOutcome::DownstreamError(response)
        } else {
            ForwardOutcome::Response(response)
        }
    }

    /// Short label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ForwardOutcome::Response(_) => "response",
            ForwardOutcome::DownstreamError(_) => "downstream_error",
            ForwardOutcome::Unreachable { .. } => "unreachable",
            ForwardOutcome::TransportFailure { .. } => "transport_failure",
        }
    }

    /// Map the outcome to what the caller receives.
    pub fn into_response(self) -> ProxyResponse {
        match self {
            ForwardOutcome::Response(response) | ForwardOutcome::DownstreamError(response) => {
                response
            }
            ForwardOutcome::Unreachable { .. } => ProxyResponse::page_not_found(),
            ForwardOutcome::TransportFailure { kind, message } => ProxyResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorEnvelope::new(kind, message),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &'static str) -> ProxyResponse {
        let mut headers = HeaderMap::new();
        headers.insert("x-downstream", HeaderValue::from_static("yes"));
        ProxyResponse::new(StatusCode::from_u16(status).unwrap(), headers, body)
    }

    #[test]
    fn classifies_by_status() {
        assert!(matches!(
            ForwardOutcome::from_response(response(200, "")),
            ForwardOutcome::Response(_)
        ));
        assert!(matches!(
            ForwardOutcome::from_response(response(302, "")),
            ForwardOutcome::Response(_)
        ));
        assert!(matches!(
            ForwardOutcome::from_response(response(400, "")),
            ForwardOutcome::DownstreamError(_)
        ));
        assert!(matches!(
            ForwardOutcome::from_response(response(503, "")),
            ForwardOutcome::DownstreamError(_)
        ));
    }

    #[test]
    fn downstream_error_is_relayed_verbatim() {
        let original = response(400, r#"{"msg":"bad"}"#);
        let relayed = ForwardOutcome::from_response(original.clone()).into_response();
        assert_eq!(relayed, original);
    }

    #[test]
    fn unreachable_maps_to_page_not_found() {
        let relayed = ForwardOutcome::Unreachable {
            authority: "ghost:8080".to_string(),
            message: "dns error".to_string(),
        }
        .into_response();

        assert_eq!(relayed.status, StatusCode::NOT_FOUND);
        assert_eq!(
            relayed.headers.get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            relayed.body,
            Bytes::from_static(br#"{"error":{"type":"PageNotFound","message":"Page not found"}}"#)
        );
    }

    #[test]
    fn transport_failure_maps_to_500_with_kind_and_message() {
        let relayed = ForwardOutcome::TransportFailure {
            kind: "Timeout".to_string(),
            message: "request timed out after 30s".to_string(),
        }
        .into_response();

        assert_eq!(relayed.status, StatusCode::INTERNAL_SERVER_ERROR);
        let json: serde_json::Value = serde_json::from_slice(&relayed.body).unwrap();
        assert_eq!(json["error"]["type"], "Timeout");
        assert_eq!(json["error"]["message"], "request timed out after 30s");
    }
}
