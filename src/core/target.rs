//! Resolution of the internal service addressed by an inbound path.
//!
//! For a gateway mounted at `/api`, the path `/api/chats/rooms/7` names the
//! service `chats` and forwards `/rooms/7`. Parsing works on path segments,
//! never on the full URL string, so the caller's own host is ignored.
use http::{
    Uri,
    uri::{Authority, PathAndQuery, Scheme},
};
use thiserror::Error;

use crate::config::UpstreamConfig;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    /// Path does not live under the gateway's mount prefix.
    #[error("path '{0}' is outside the mount prefix")]
    OutsideMount(String),

    /// Nothing follows the mount prefix.
    #[error("path '{0}' does not name a service")]
    MissingService(String),

    /// The service segment cannot be used as a host name.
    #[error("service segment '{0}' is not a valid host name")]
    InvalidService(String),

    /// The destination could not be assembled into a URI.
    #[error("invalid destination URI: {0}")]
    InvalidUri(String),
}

/// Service name plus the path to forward to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTarget {
    pub service: String,
    /// Remainder of the inbound path after the service segment, separator
    /// included. Empty segments are kept as received.
    pub path: String,
}

impl ServiceTarget {
    /// Split `path` into service segment and forwarded remainder.
    ///
    /// Empty segments between the mount prefix and the service segment are
    /// skipped (`//svc/x` names `svc`); empty segments after it are preserved
    /// (`/svc//double/slash` forwards `//double/slash`).
    pub fn parse(mount_prefix: &str, path: &str) -> Result<Self, TargetError> {
        let prefix = mount_prefix.trim_end_matches('/');
        let remainder = path
            .strip_prefix(prefix)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .ok_or_else(|| TargetError::OutsideMount(path.to_string()))?;

        let remainder = remainder.trim_start_matches('/');
        let (service, rest) = match remainder.find('/') {
            Some(idx) => remainder.split_at(idx),
            None => (remainder, ""),
        };

        if service.is_empty() {
            return Err(TargetError::MissingService(path.to_string()));
        }
        if !Self::is_host_label(service) {
            return Err(TargetError::InvalidService(service.to_string()));
        }

        Ok(Self {
            service: service.to_string(),
            path: rest.to_string(),
        })
    }

    fn is_host_label(service: &str) -> bool {
        service
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_'))
    }

    /// Forwarded path, `/` when the inbound path stopped at the service segment.
    pub fn forwarded_path(&self) -> &str {
        if self.path.is_empty() { "/" } else { &self.path }
    }

    /// `host:port` of the internal service.
    pub fn authority(&self, upstream: &UpstreamConfig) -> Result<Authority, TargetError> {
        format!("{}:{}", self.service, upstream.port)
            .parse::<Authority>()
            .map_err(|_| TargetError::InvalidService(self.service.clone()))
    }

    /// Build `{scheme}://{service}:{port}{path}[?{query}]`.
    ///
    /// The query is attached byte-for-byte and parsed once by the `http`
    /// crate, which validates but never re-encodes it.
    pub fn destination(
        &self,
        upstream: &UpstreamConfig,
        query: Option<&str>,
    ) -> Result<Uri, TargetError> {
        let scheme = upstream
            .scheme
            .parse::<Scheme>()
            .map_err(|e| TargetError::InvalidUri(e.to_string()))?;

        let path_and_query = match query {
            Some(query) => format!("{}?{}", self.forwarded_path(), query),
            None => self.forwarded_path().to_string(),
        };
        let path_and_query = PathAndQuery::try_from(path_and_query)
            .map_err(|e| TargetError::InvalidUri(e.to_string()))?;

        Uri::builder()
            .scheme(scheme)
            .authority(self.authority(upstream)?)
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| TargetError::InvalidUri(e.to_string()))
    }
}
