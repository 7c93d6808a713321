//! Signed HTTP transport.
//!
//! [`SpaceApi`] owns a pooled `reqwest` client, the base URL, and the
//! [`Signer`]. Each call signs its own path and query with a fresh nonce,
//! sends the request, and classifies the response. The typed endpoint
//! helpers live in [`endpoints`](crate::endpoints).

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, DATE};
use reqwest::{Method, StatusCode};
use tracing::{debug, info};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::signer::{QueryParams, Signer, path_and_query};

/// Client for the remote server's REST API.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct SpaceApi {
    http: reqwest::Client,
    base_url: String,
    path_prefix: String,
    signer: Signer,
}

impl SpaceApi {
    /// Build a client and probe the server.
    ///
    /// Fails fast: a malformed secret or an unreachable/rejecting server
    /// aborts construction.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidCredentials`] for a bad secret, or whatever
    /// error the liveness probe produced.
    pub async fn connect(config: &ApiConfig) -> Result<Self, ApiError> {
        let api = Self::build(config)?;
        api.ping().await?;
        info!(base_url = %api.base_url, "Remote API reachable");
        Ok(api)
    }

    fn build(config: &ApiConfig) -> Result<Self, ApiError> {
        let signer = Signer::from_base64(&config.secret)?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            path_prefix: config.path_prefix.clone(),
            signer,
        })
    }

    /// The server base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET` a resource and return the raw body.
    pub async fn get(&self, resource: &str, params: &QueryParams) -> Result<String, ApiError> {
        self.request(Method::GET, resource, params, None).await
    }

    /// `POST` a JSON body to a resource and return the raw response body.
    pub async fn post(
        &self,
        resource: &str,
        params: &QueryParams,
        body: String,
    ) -> Result<String, ApiError> {
        self.request(Method::POST, resource, params, Some(body)).await
    }

    /// `DELETE` a resource and return the raw response body.
    pub async fn delete(&self, resource: &str, params: &QueryParams) -> Result<String, ApiError> {
        self.request(Method::DELETE, resource, params, None).await
    }

    async fn request(
        &self,
        method: Method,
        resource: &str,
        params: &QueryParams,
        body: Option<String>,
    ) -> Result<String, ApiError> {
        let path = path_and_query(&self.path_prefix, resource, params);
        let auth = self.signer.authorize(&path);
        let url = format!("{}{path}", self.base_url);

        debug!(%method, %path, "Sending signed request");

        let mut builder = self
            .http
            .request(method.clone(), &url)
            .header(DATE, &auth.date)
            .header(AUTHORIZATION, auth.authorization());
        if let Some(body) = body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("{method} {path} failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(ApiError::AccessDenied);
        }
        if !status.is_success() {
            return Err(ApiError::ServerError {
                status: status.to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("{method} {path} body read failed: {e}")))
    }
}
