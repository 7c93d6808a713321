//! Signed REST client for the `SpaceLab` remote server.
//!
//! Every request is authenticated with an HMAC over its path, query, a fresh
//! nonce, and the current date (see [`signer`]). Responses are classified
//! into [`ApiError`] variants and decoded per endpoint (see [`decode`]).
//!
//! # Modules
//!
//! - [`config`] -- [`ApiConfig`] connection settings
//! - [`signer`] -- Canonical string, nonce, date, HMAC
//! - [`client`] -- [`SpaceApi`] signed transport
//! - [`endpoints`] -- Typed calls (`grids`, `players`, `chat`, ...)
//! - [`decode`] -- Envelope vs bare response decoding
//! - [`error`] -- [`ApiError`]

pub mod client;
pub mod config;
pub mod decode;
pub mod endpoints;
pub mod error;
pub mod signer;

pub use client::SpaceApi;
pub use config::ApiConfig;
pub use decode::ResponseShape;
pub use error::ApiError;
pub use signer::{QueryParams, RequestAuth, Signer};
