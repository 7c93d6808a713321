//! Change notifications for a pull-only remote world.
//!
//! The remote server only answers "give me everything" queries. This crate
//! polls it on a fixed interval, reconciles each full result against the
//! previous snapshot, and publishes discrete appear/update/disappear events
//! to any number of in-process subscribers.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration ([`NotifyConfig`])
//! - [`logging`] -- `tracing` subscriber setup
//! - [`source`] -- [`WorldSource`] seam over the remote client
//! - [`store`] -- Id-keyed snapshot stores
//! - [`reconcile`] -- Pure snapshot diffing and inclusion filters
//! - [`bus`] -- Topic-based [`EventBus`]
//! - [`engine`] -- [`Notifier`]: tick loop, lifecycle, getters
//! - [`error`] -- [`NotifyError`]

pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod reconcile;
pub mod source;
pub mod store;

pub use bus::{Callback, EventBus, SubscriptionHandle, SubscriptionId};
pub use config::{ConfigError, EngineConfig, LoggingConfig, NotifyConfig};
pub use engine::{ChangeCounts, Notifier, TickSummary};
pub use error::NotifyError;
pub use logging::init_tracing;
pub use source::WorldSource;
