//! JSON body used for every error the gateway synthesizes itself.
//!
//! ```json
//! { "error": { "type": "PageNotFound", "message": "Page not found" } }
//! ```
//!
//! Serialization goes through serde so quotes, backslashes or newlines in a
//! failure message are always escaped.
use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                kind: kind.into(),
                message: message.into(),
            },
        }
    }

    pub fn page_not_found() -> Self {
        Self::new("PageNotFound", "Page not found")
    }

    pub fn to_bytes(&self) -> Bytes {
        // Two string fields cannot fail to serialize.
        serde_json::to_vec(self)
            .map(Bytes::from)
            .unwrap_or_else(|_| Bytes::from_static(b"{}"))
    }
}
