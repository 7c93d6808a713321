//! Error types for the remote API client.
//!
//! Every failure a caller can observe is classified into one of six
//! variants so the engine can log it and move on, and batch tools can
//! decide whether a retry makes sense.

/// Errors returned by [`SpaceApi`](crate::SpaceApi) calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The shared secret is not valid base64 (or cannot key the MAC).
    #[error("invalid credentials: {reason}")]
    InvalidCredentials {
        /// Why the secret was rejected.
        reason: String,
    },

    /// The server answered 403: signature, clock skew, or key rejected.
    #[error("access denied")]
    AccessDenied,

    /// The server answered with any other non-success status.
    #[error("server error: {status}")]
    ServerError {
        /// Status line text, e.g. `500 Internal Server Error`.
        status: String,
    },

    /// The request never produced a usable response (connect, timeout,
    /// body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// A request body could not be serialized.
    #[error("encode error: {source}")]
    Encode {
        /// The underlying serialization error.
        source: serde_json::Error,
    },

    /// The body did not match the endpoint's expected schema.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
