//! Request signing.
//!
//! Every request carries an `Authorization: {nonce}:{signature}` header and
//! a `Date` header. The signature is an HMAC-SHA1 over the canonical string
//!
//! ```text
//! {path_and_query}\r\n{nonce}\r\n{date}\r\n
//! ```
//!
//! keyed with the shared secret and encoded as base64. The server rebuilds
//! the same string from the request it receives, so the path, query, and
//! date must be byte-identical on both sides.
//!
//! # Query ordering
//!
//! Parameters are held in a [`BTreeMap`] and always emitted in lexicographic
//! key order. The same logical request therefore always produces the same
//! canonical string, whichever order the caller inserted the parameters in.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::ApiError;

type HmacSha1 = Hmac<Sha1>;

/// Query parameters, ordered by key.
pub type QueryParams = BTreeMap<String, String>;

/// Nonce size in bytes (160 bits).
pub const NONCE_LEN: usize = 20;

/// Keyed request signer.
///
/// Holds the MAC already keyed with the decoded secret; each signature
/// clones it, so signing never fails after construction.
#[derive(Clone)]
pub struct Signer {
    mac: HmacSha1,
}

/// Authentication material for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAuth {
    /// Base64 nonce, unique to this request.
    pub nonce: String,
    /// Value of the `Date` header; identical to what was signed.
    pub date: String,
    /// Base64 HMAC of the canonical string.
    pub signature: String,
}

impl RequestAuth {
    /// Value of the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("{}:{}", self.nonce, self.signature)
    }
}

impl Signer {
    /// Decode a base64 secret and key the MAC with it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidCredentials`] if the secret is not valid
    /// base64 or decodes to zero bytes.
    pub fn from_base64(secret: &str) -> Result<Self, ApiError> {
        let key = STANDARD
            .decode(secret.trim())
            .map_err(|e| ApiError::InvalidCredentials {
                reason: format!("secret is not valid base64: {e}"),
            })?;
        if key.is_empty() {
            return Err(ApiError::InvalidCredentials {
                reason: "secret is empty".to_owned(),
            });
        }
        let mac = HmacSha1::new_from_slice(&key).map_err(|e| ApiError::InvalidCredentials {
            reason: format!("secret cannot key HMAC: {e}"),
        })?;
        Ok(Self { mac })
    }

    /// Sign a request with an explicit nonce and date.
    ///
    /// Deterministic: identical inputs always yield identical output.
    pub fn sign(&self, path_and_query: &str, nonce: &str, date: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(canonical_string(path_and_query, nonce, date).as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }

    /// Sign a request with a fresh nonce and the current time.
    pub fn authorize(&self, path_and_query: &str) -> RequestAuth {
        self.authorize_at(path_and_query, generate_nonce(), Utc::now())
    }

    /// Sign a request with the given nonce and timestamp.
    pub fn authorize_at(
        &self,
        path_and_query: &str,
        nonce: String,
        now: DateTime<Utc>,
    ) -> RequestAuth {
        let date = http_date(now);
        let signature = self.sign(path_and_query, &nonce, &date);
        RequestAuth {
            nonce,
            date,
            signature,
        }
    }
}

impl core::fmt::Debug for Signer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

/// Build the string that gets signed.
pub fn canonical_string(path_and_query: &str, nonce: &str, date: &str) -> String {
    format!("{path_and_query}\r\n{nonce}\r\n{date}\r\n")
}

/// Build `{prefix}{resource}?k=v&...` with keys in sorted order.
///
/// The `?` is omitted when there are no parameters. Keys and values are
/// form-urlencoded (space becomes `+`).
pub fn path_and_query(prefix: &str, resource: &str, params: &QueryParams) -> String {
    let mut out = format!("{prefix}{resource}");
    for (i, (key, value)) in params.iter().enumerate() {
        out.push(if i == 0 { '?' } else { '&' });
        out.extend(url::form_urlencoded::byte_serialize(key.as_bytes()));
        out.push('=');
        out.extend(url::form_urlencoded::byte_serialize(value.as_bytes()));
    }
    out
}

/// A fresh random nonce, base64 encoded.
pub fn generate_nonce() -> String {
    STANDARD.encode(rand::random::<[u8; NONCE_LEN]>())
}

/// Format a timestamp the way the `Date` header expects it
/// (RFC 1123, always `GMT`).
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
