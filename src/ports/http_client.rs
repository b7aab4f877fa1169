use async_trait::async_trait;

use crate::core::exchange::{ForwardOutcome, OutboundRequest};

/// HttpClient defines the port (interface) for calling internal services.
///
/// Implementations never return an error: every failure is classified into a
/// [`ForwardOutcome`] variant so the gateway can map it to a response.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Send a request to an internal service and buffer its response.
    ///
    /// # Arguments
    /// * `req` - The fully resolved outbound request
    ///
    /// # Returns
    /// A future that resolves to the classified outcome of the single attempt
    async fn send_request(&self, req: OutboundRequest) -> ForwardOutcome;
}
