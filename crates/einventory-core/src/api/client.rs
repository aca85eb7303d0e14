//! API client for communicating with the E-Inventory identity service.
//!
//! This module provides the `IdentityService` trait the session core depends
//! on, and `ApiClient`, which implements it over HTTP.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::Token;
use crate::config::{Config, Endpoints};

use super::types::SitesResponse;
use super::{ApiError, LoginRequest, LoginResponse, Profile, Site};

/// Calls the session lifecycle makes against the identity service.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Exchange credentials for a bearer token.
    async fn authenticate(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError>;

    /// Succeeds only if the service still accepts `token`.
    async fn validate_token(&self, token: &Token) -> Result<(), ApiError>;

    /// Profile of the operator `token` belongs to.
    async fn fetch_profile(&self, token: &Token) -> Result<Profile, ApiError>;

    /// Sites offered on the login form.
    async fn fetch_sites(&self) -> Result<Vec<Site>, ApiError>;
}

/// HTTP client for the identity service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    endpoints: Endpoints,
}

impl ApiClient {
    /// Create a new API client from the console configuration
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url().trim_end_matches('/').to_string(),
            endpoints: config.endpoints.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> Result<T, ApiError> {
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }
}

#[async_trait]
impl IdentityService for ApiClient {
    async fn authenticate(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let url = self.url(&self.endpoints.login);
        debug!(url = %url, identifier = %request.identifier, site_id = request.site_id, "Authenticating");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let login: LoginResponse = Self::parse(response, "login response").await?;

        if login.token.is_empty() {
            warn!("Login response carried an empty token");
            return Err(ApiError::InvalidResponse("Login response carried no token".to_string()));
        }
        Ok(login)
    }

    async fn validate_token(&self, token: &Token) -> Result<(), ApiError> {
        let url = self.url(&self.endpoints.validate_token);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    async fn fetch_profile(&self, token: &Token) -> Result<Profile, ApiError> {
        let url = self.url(&self.endpoints.profile);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token.as_str())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse(response, "profile").await
    }

    async fn fetch_sites(&self) -> Result<Vec<Site>, ApiError> {
        let url = self.url(&self.endpoints.sites);

        let response = self.client.get(&url).send().await?;
        let response = Self::check_response(response).await?;
        let sites: SitesResponse = Self::parse(response, "site list").await?;
        debug!(count = sites.sedes.len(), "Sites loaded");
        Ok(sites.sedes)
    }
}
