pub mod envelope;
pub mod exchange;
pub mod gateway;
pub mod target;

pub use envelope::ErrorEnvelope;
pub use exchange::{ForwardOutcome, InboundRequest, OutboundRequest, ProxyResponse};
pub use gateway::{GatewaySettings, MirrorGateway};
pub use target::{ServiceTarget, TargetError};
