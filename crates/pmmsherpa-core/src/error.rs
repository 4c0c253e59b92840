//! Error type for calls that leave the process.

use thiserror::Error;

/// Failure of an outbound call: the embedding endpoint or a search procedure.
///
/// This is the only error kind the retrieval layer produces. The fail-soft
/// entry points in [`crate::retrieval`] convert it into an empty result.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The embedding endpoint returned an error or an unusable payload.
    #[error("embedding request failed: {message}")]
    Embedding { message: String },

    /// A database procedure (`hybrid_search`, `match_chunks`) failed.
    #[error("{procedure} failed: {message}")]
    Rpc { procedure: String, message: String },

    /// The call did not complete within the client timeout.
    #[error("{service} timed out")]
    Timeout { service: String },

    /// The upstream answered, but the body did not match the expected record shape.
    #[error("unexpected response from {service}: {message}")]
    InvalidResponse { service: String, message: String },
}

impl UpstreamError {
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    pub fn rpc(procedure: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rpc {
            procedure: procedure.into(),
            message: message.into(),
        }
    }

    pub fn timeout(service: impl Into<String>) -> Self {
        Self::Timeout {
            service: service.into(),
        }
    }

    pub fn invalid_response(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service: service.into(),
            message: message.into(),
        }
    }
}
