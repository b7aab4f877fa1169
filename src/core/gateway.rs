//! The mirror gateway: one inbound request in, one response out.
//!
//! `MirrorGateway` resolves the service named by the inbound path, rebuilds an
//! equivalent outbound request (same method, headers, query and body), makes a
//! single call through the [`HttpClient`] port and maps the classified
//! [`ForwardOutcome`] to the caller's response. It holds no per-request state,
//! so one instance serves every concurrent request.
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, header, uri::Authority};

use crate::{
    config::{ServerConfig, UpstreamConfig},
    core::{
        exchange::{ForwardOutcome, InboundRequest, OutboundRequest, ProxyResponse},
        target::{ServiceTarget, TargetError},
    },
    metrics,
    ports::http_client::HttpClient,
};

/// The subset of configuration the gateway routes with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    pub mount_prefix: String,
    pub upstream: UpstreamConfig,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for GatewaySettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            mount_prefix: config.mount_prefix.clone(),
            upstream: config.upstream.clone(),
        }
    }
}

pub struct MirrorGateway {
    settings: GatewaySettings,
    client: Arc<dyn HttpClient>,
}

impl MirrorGateway {
    pub fn new(settings: GatewaySettings, client: Arc<dyn HttpClient>) -> Self {
        Self { settings, client }
    }

    pub fn from_config(config: &ServerConfig, client: Arc<dyn HttpClient>) -> Self {
        Self::new(GatewaySettings::from(config), client)
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Build the outbound request for `inbound` without sending it.
    pub fn resolve(
        &self,
        inbound: &InboundRequest,
    ) -> Result<(ServiceTarget, OutboundRequest), TargetError> {
        let target = ServiceTarget::parse(&self.settings.mount_prefix, &inbound.path)?;
        let uri = target.destination(&self.settings.upstream, inbound.query.as_deref())?;
        let authority = target.authority(&self.settings.upstream)?;

        let outbound = OutboundRequest {
            method: inbound.method.clone(),
            uri,
            headers: outbound_headers(&inbound.headers, &authority, inbound.body.as_ref()),
            body: inbound.body.clone(),
        };
        Ok((target, outbound))
    }

    /// Mirror `inbound` to its internal service. Always produces a response.
    pub async fn forward(&self, inbound: InboundRequest) -> ProxyResponse {
        let (target, outbound) = match self.resolve(&inbound) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(path = %inbound.path, error = %e, "Cannot resolve target service");
                metrics::increment_upstream_request_total("unresolved", "unresolved");
                return ProxyResponse::page_not_found();
            }
        };

        tracing::info!(
            service = %target.service,
            method = %outbound.method,
            uri = %outbound.uri,
            has_body = outbound.body.is_some(),
            "Forwarding request"
        );
        tracing::debug!("Outgoing request headers: {:?}", outbound.headers);

        let outcome = {
            let _timer = metrics::UpstreamRequestTimer::new(&target.service);
            self.client.send_request(outbound).await
        };
        metrics::increment_upstream_request_total(&target.service, outcome.label());

        match &outcome {
            ForwardOutcome::Response(response) => {
                tracing::info!(service = %target.service, status = %response.status, "Relaying response");
            }
            ForwardOutcome::DownstreamError(response) => {
                tracing::info!(
                    service = %target.service,
                    status = %response.status,
                    "Relaying downstream error response"
                );
            }
            ForwardOutcome::Unreachable { authority, message } => {
                tracing::warn!(service = %target.service, %authority, %message, "Service unreachable");
            }
            ForwardOutcome::TransportFailure { kind, message } => {
                tracing::error!(service = %target.service, %kind, %message, "Transport failure");
            }
        }

        outcome.into_response()
    }
}

/// Copy every inbound header, then make `Host` and body framing describe the
/// outbound request rather than the inbound one.
fn outbound_headers(inbound: &HeaderMap, authority: &Authority, body: Option<&Bytes>) -> HeaderMap {
    let mut headers = inbound.clone();

    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::TRANSFER_ENCODING);
    if let Some(body) = body {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    }

    if let Ok(host) = HeaderValue::from_str(authority.as_str()) {
        headers.insert(header::HOST, host);
    }

    headers
}
