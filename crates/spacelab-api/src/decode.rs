//! Per-endpoint response decoding.
//!
//! The server exposes two families of endpoints. Session endpoints wrap
//! their result in an envelope:
//!
//! ```json
//! { "data": { "Messages": [ ... ] }, "meta": { "apiVersion": "1.0", "queryTime": 0.3 } }
//! ```
//!
//! Info endpoints return the bare array or object. Each endpoint declares
//! its [`ResponseShape`]; nothing guesses.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// How an endpoint wraps its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// The body is the payload.
    Bare,
    /// The payload sits at `data.{key}` inside an envelope.
    Envelope {
        /// Field of `data` holding the payload.
        key: &'static str,
    },
}

/// Only `data` is read; `meta` carries nothing the client acts on.
#[derive(Deserialize)]
struct Envelope {
    data: serde_json::Value,
}

/// Decode `body` according to `shape`.
///
/// # Errors
///
/// Returns [`ApiError::Decode`] if the body is not JSON, the envelope is
/// missing `data.{key}`, or the payload does not match `T`.
pub fn decode<T: DeserializeOwned>(body: &str, shape: ResponseShape) -> Result<T, ApiError> {
    match shape {
        ResponseShape::Bare => Ok(serde_json::from_str(body)?),
        ResponseShape::Envelope { key } => {
            let mut envelope: Envelope = serde_json::from_str(body)?;
            let payload = envelope
                .data
                .get_mut(key)
                .map(serde_json::Value::take)
                .ok_or_else(|| {
                    <serde_json::Error as serde::de::Error>::custom(format!(
                        "envelope has no data.{key}"
                    ))
                })?;
            Ok(serde_json::from_value(payload)?)
        }
    }
}
