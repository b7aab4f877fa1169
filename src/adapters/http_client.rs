use std::{error::Error as StdError, io, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use eyre::Result;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Version, header};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;
use tokio::time::timeout;
use tracing::Instrument;

use crate::{
    core::exchange::{ForwardOutcome, OutboundRequest, ProxyResponse},
    ports::http_client::HttpClient,
    tracing_setup::create_upstream_span,
};

/// HTTP client adapter using Hyper with Rustls.
///
/// Responsibilities:
/// * Sends the outbound request exactly as the gateway built it (HTTP/1.1)
/// * Buffers the downstream response so it can be relayed or inspected
/// * Bounds each exchange by a single timeout
/// * Classifies every failure into a [`ForwardOutcome`]
///
/// There are no retries; one attempt is made per call.
pub struct HttpClientAdapter {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    timeout: Duration,
}

/// Failure while exchanging one request, before classification.
#[derive(Debug)]
enum ExchangeError {
    Request(hyper_util::client::legacy::Error),
    Body(hyper::Error),
}

impl ExchangeError {
    fn as_error(&self) -> &(dyn StdError + 'static) {
        match self {
            ExchangeError::Request(e) => e,
            ExchangeError::Body(e) => e,
        }
    }
}

impl HttpClientAdapter {
    /// Create a new HTTP client adapter bounding every exchange by `request_timeout`.
    pub fn new(request_timeout: Duration) -> Result<Self> {
        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false); // Allow HTTPS URLs

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();

        if !native_certs.certs.is_empty() {
            for cert in native_certs.certs {
                if root_cert_store.add(cert).is_err() {
                    tracing::warn!("Failed to add native certificate to rustls RootCertStore");
                }
            }
            tracing::debug!("Loaded {} native root certificates.", root_cert_store.len());
        }

        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, Full<Bytes>>(https_connector);

        tracing::info!(
            timeout = %humantime::format_duration(request_timeout),
            "Created upstream HTTP client"
        );
        Ok(Self {
            client,
            timeout: request_timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn into_hyper_request(req: OutboundRequest) -> Request<Full<Bytes>> {
        // An absent body goes out with no framing at all; the gateway has
        // already set `Content-Length` for present ones, including empty ones.
        let mut request = Request::new(Full::new(req.body.unwrap_or_default()));
        *request.method_mut() = req.method;
        *request.uri_mut() = req.uri;
        *request.version_mut() = Version::HTTP_11;
        *request.headers_mut() = req.headers;
        request
    }

    async fn exchange(
        &self,
        request: Request<Full<Bytes>>,
    ) -> Result<ProxyResponse, ExchangeError> {
        let response = self
            .client
            .request(request)
            .await
            .map_err(ExchangeError::Request)?;

        let (mut parts, body) = response.into_parts();
        // The body is fully decoded here; the serving layer re-frames it.
        parts.headers.remove(header::TRANSFER_ENCODING);

        let body = body
            .collect()
            .await
            .map_err(ExchangeError::Body)?
            .to_bytes();

        Ok(ProxyResponse::new(parts.status, parts.headers, body))
    }
}

#[async_trait]
impl HttpClient for HttpClientAdapter {
    async fn send_request(&self, req: OutboundRequest) -> ForwardOutcome {
        let authority = req
            .uri
            .authority()
            .map_or_else(|| "unknown".to_string(), |a| a.to_string());

        let span = create_upstream_span(&authority, req.method.as_str(), req.uri.path());

        async move {
            let request = Self::into_hyper_request(req);

            match timeout(self.timeout, self.exchange(request)).await {
                Ok(Ok(response)) => {
                    tracing::Span::current().record("http.status_code", response.status.as_u16());
                    ForwardOutcome::from_response(response)
                }
                Ok(Err(e)) => {
                    tracing::debug!("Upstream exchange with {} failed: {:?}", authority, e);
                    classify_error(&authority, e.as_error())
                }
                Err(_) => ForwardOutcome::TransportFailure {
                    kind: "Timeout".to_string(),
                    message: format!(
                        "request to {authority} timed out after {}",
                        humantime::format_duration(self.timeout)
                    ),
                },
            }
        }
        .instrument(span)
        .await
    }
}

/// Turn a transport error into an outcome by inspecting its root cause.
///
/// Host-resolution failures and refused connections mean the named service is
/// not there and become [`ForwardOutcome::Unreachable`]. Everything else is a
/// [`ForwardOutcome::TransportFailure`] whose kind names the failure category
/// and whose message is the root cause's description.
pub fn classify_error(authority: &str, err: &(dyn StdError + 'static)) -> ForwardOutcome {
    let mut root = err;
    let mut resolution_failed = false;
    let mut hyper_kind = None;
    let mut current = Some(err);

    while let Some(e) = current {
        if e.to_string().starts_with("dns error") {
            resolution_failed = true;
        }
        if let Some(hyper_err) = e.downcast_ref::<hyper::Error>() {
            hyper_kind = hyper_kind.or_else(|| hyper_error_kind(hyper_err));
        }
        root = e;
        current = e.source();
    }

    let message = root.to_string();
    let io_err = root.downcast_ref::<io::Error>();

    if resolution_failed || message.starts_with("failed to lookup address") {
        return ForwardOutcome::Unreachable {
            authority: authority.to_string(),
            message,
        };
    }

    if let Some(io_err) = io_err {
        if io_err.kind() == io::ErrorKind::ConnectionRefused {
            return ForwardOutcome::Unreachable {
                authority: authority.to_string(),
                message,
            };
        }
        if io_err
            .get_ref()
            .is_some_and(|inner| inner.downcast_ref::<rustls::Error>().is_some())
        {
            return ForwardOutcome::TransportFailure {
                kind: "TlsError".to_string(),
                message,
            };
        }
    }

    let kind = if root.downcast_ref::<rustls::Error>().is_some() {
        "TlsError".to_string()
    } else if let Some(io_err) = io_err {
        format!("{:?}", io_err.kind())
    } else if let Some(kind) = hyper_kind {
        kind.to_string()
    } else {
        "TransportError".to_string()
    };

    ForwardOutcome::TransportFailure { kind, message }
}

fn hyper_error_kind(err: &hyper::Error) -> Option<&'static str> {
    if err.is_parse() || err.is_parse_status() {
        Some("MalformedResponse")
    } else if err.is_incomplete_message() {
        Some("IncompleteMessage")
    } else if err.is_canceled() {
        Some("Canceled")
    } else if err.is_closed() {
        Some("ConnectionClosed")
    } else if err.is_timeout() {
        Some("Timeout")
    } else {
        None
    }
}
