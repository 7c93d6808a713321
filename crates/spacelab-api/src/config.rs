//! Connection settings for the remote API.

use std::time::Duration;

use serde::Deserialize;

/// Default path prefix every resource is mounted under.
pub const DEFAULT_PATH_PREFIX: &str = "/vrageremote";

/// Connection settings for [`SpaceApi`](crate::SpaceApi).
///
/// Usually embedded in the engine's YAML configuration under `api:`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    /// Scheme, host, and port of the server, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base64-encoded shared secret.
    #[serde(default)]
    pub secret: String,

    /// Fixed prefix prepended to every resource path.
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,

    /// Upper bound on a single request, connect to last body byte.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ApiConfig {
    /// Create a config for `base_url` and `secret` with default prefix and
    /// timeout.
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            secret: secret.into(),
            ..Self::default()
        }
    }

    /// Override the URL and secret with environment variables when set.
    ///
    /// - `SPACELAB_API_URL` overrides `base_url`
    /// - `SPACELAB_API_SECRET` overrides `secret`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SPACELAB_API_URL") {
            self.base_url = val;
        }
        if let Ok(val) = std::env::var("SPACELAB_API_SECRET") {
            self.secret = val;
        }
    }

    /// The per-request timeout as a [`Duration`].
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            secret: String::new(),
            path_prefix: default_path_prefix(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

// The secret never reaches logs.
impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("secret", &"<redacted>")
            .field("path_prefix", &self.path_prefix)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_owned()
}

fn default_path_prefix() -> String {
    DEFAULT_PATH_PREFIX.to_owned()
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}
