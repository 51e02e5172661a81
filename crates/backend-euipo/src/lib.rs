//! EUIPO trademark-registry backend.
//!
//! Provides the `RegistryBackend` trait and its EUIPO implementation:
//! OAuth2 client-credentials authentication, RSQL search, mark-image download
//! and the response parser that turns raw records into `CandidateMark`s.

mod parse;

pub use parse::parse_response;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use brandcheck_model::ImageData;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Registry authentication failed: {0}")]
    Authentication(String),

    #[error("Registry search failed: {0}")]
    Search(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Registry API credentials.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Bearer token scoped to a single pipeline run.
#[derive(Clone)]
pub struct AccessToken {
    token: String,
    client_id: String,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            client_id: client_id.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.token
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Unparsed result set of a registry search.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSearchResponse {
    #[serde(default)]
    pub trademarks: Vec<serde_json::Value>,
    #[serde(default)]
    pub total_elements: Option<u64>,
}

/// Trait for trademark registries.
pub trait RegistryBackend: Send + Sync {
    /// Exchange credentials for a bearer token.
    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AccessToken, BackendError>> + Send;

    /// Run a registry query.
    fn search(
        &self,
        query: &str,
        token: &AccessToken,
    ) -> impl Future<Output = Result<RawSearchResponse, BackendError>> + Send;

    /// Run an image-classified query. Failures degrade to an empty result set.
    fn search_figurative(
        &self,
        query: &str,
        token: &AccessToken,
    ) -> impl Future<Output = RawSearchResponse> + Send {
        async move {
            match self.search(query, token).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(backend = self.name(), error = %e, "Figurative search failed, continuing without it");
                    RawSearchResponse::default()
                }
            }
        }
    }

    /// Download a mark image as base64.
    fn fetch_image(
        &self,
        url: &str,
        token: &AccessToken,
    ) -> impl Future<Output = Result<ImageData, BackendError>> + Send;

    /// Get the backend name for logging.
    fn name(&self) -> &'static str;
}

/// EUIPO registry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EuipoConfig {
    /// OAuth2 token endpoint
    pub token_url: String,
    /// Trademark search endpoint
    pub search_url: String,
    pub scope: String,
    /// Records per search
    pub page_size: u32,
    pub sort: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EuipoConfig {
    fn default() -> Self {
        Self {
            token_url: "https://euipo.europa.eu/cas-server-webapp/oidc/accessToken".to_string(),
            search_url: "https://api.euipo.europa.eu/trademark-search/trademarks".to_string(),
            scope: "trademark-search.trademarks.read".to_string(),
            page_size: 20,
            sort: "applicationDate:desc".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// EUIPO registry backend.
#[derive(Clone)]
pub struct EuipoBackend {
    config: EuipoConfig,
    client: reqwest::Client,
}

impl EuipoBackend {
    /// Create a new EUIPO backend.
    pub fn new(config: EuipoConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &EuipoConfig {
        &self.config
    }
}

impl RegistryBackend for EuipoBackend {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken, BackendError> {
        let response = self
            .client
            .post(&self.config.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.config.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<TokenResponse> = serde_json::from_str(&body).ok();

        match parsed {
            Some(TokenResponse {
                access_token: Some(token),
                ..
            }) if status.is_success() => {
                debug!("Registry token acquired");
                Ok(AccessToken::new(token, credentials.client_id.clone()))
            }
            Some(TokenResponse {
                error,
                error_description,
                ..
            }) => Err(BackendError::Authentication(
                error_description
                    .or(error)
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            )),
            None => Err(BackendError::Authentication(format!("HTTP {}", status))),
        }
    }

    async fn search(&self, query: &str, token: &AccessToken) -> Result<RawSearchResponse, BackendError> {
        debug!(query = %query, "Executing registry query");

        let size = self.config.page_size.to_string();
        let response = self
            .client
            .get(&self.config.search_url)
            .query(&[
                ("query", query),
                ("size", size.as_str()),
                ("sort", self.config.sort.as_str()),
            ])
            .bearer_auth(token.secret())
            .header("X-IBM-Client-Id", token.client_id())
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Search(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    async fn fetch_image(&self, url: &str, token: &AccessToken) -> Result<ImageData, BackendError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(token.secret())
            .header("X-IBM-Client-Id", token.client_id())
            .send()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Search(format!(
                "image download HTTP {}",
                response.status()
            )));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_string())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or_else(|| "image/jpeg".to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::Connection(e.to_string()))?;

        Ok(ImageData {
            base64: STANDARD.encode(&bytes),
            mime_type,
        })
    }

    fn name(&self) -> &'static str {
        "euipo"
    }
}
