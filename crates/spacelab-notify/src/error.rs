//! Error types for the notification engine.
//!
//! Only construction and startup can fail. Once the engine is running,
//! per-class fetch failures are logged and skipped for that tick; they never
//! surface as a [`NotifyError`].

use spacelab_api::ApiError;

use crate::config::ConfigError;

/// Errors returned while building or starting a [`Notifier`](crate::Notifier).
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The remote API could not be reached or rejected the credentials.
    #[error("failed to connect to remote API: {source}")]
    Connect {
        /// The underlying client error.
        source: ApiError,
    },

    /// The initial voxel load failed; the engine stays stopped.
    #[error("bootstrap fetch failed: {source}")]
    Bootstrap {
        /// The underlying client error.
        source: ApiError,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },
}
