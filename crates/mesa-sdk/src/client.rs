//! HTTP client for the MESA API
//!
//! This module provides a type-safe client for the medical expert system
//! backend. Requests are decorated with `Authorization: Bearer {token}` when
//! the token manager holds a usable token; unauthenticated requests go out
//! bare, and the backend decides which routes require auth.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use mesa_sdk::{ClientBuilder, DiagnosisRequest, Symptom};
//!
//! # async fn example() -> mesa_sdk::Result<()> {
//! let client = ClientBuilder::default()
//!     .base_url("https://mesa.example.org/api")
//!     .build()?;
//!
//! let response = client
//!     .diagnose(&DiagnosisRequest {
//!         symptoms: vec![Symptom::present("fever")],
//!         patient: None,
//!         lab_results: None,
//!         dehydration_signs: None,
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::{
    auth::TokenManager,
    error::{extract_error_message, ApiError, Result},
    routes,
    types::{
        ApiInfo, ChatRequest, ChatResponse, DiagnosisRequest, DiagnosisResponse, DiseaseInfo,
        ModelValidationRequest, ModelValidationResponse, ModelsResponse, PingResponse,
        SymptomInfo,
    },
};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default timeout in seconds for API requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP client for interacting with the MESA API
#[derive(Debug)]
pub struct MesaClient {
    http_client: reqwest::Client,
    base_url: String,
    token_manager: Arc<TokenManager>,
}

impl MesaClient {
    /// Create a new client (private - use ClientBuilder instead)
    fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        token_manager: Arc<TokenManager>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::HttpClient)?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            token_manager,
        })
    }

    /// The token manager backing this client
    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.token_manager
    }

    // ===== General =====

    /// Get API information and status
    pub async fn api_info(&self) -> Result<ApiInfo> {
        self.get(routes::ROOT).await
    }

    /// Health check
    pub async fn ping(&self) -> Result<PingResponse> {
        self.get(routes::PING).await
    }

    // ===== Expert system =====

    /// Run the expert system diagnosis on provided symptoms
    pub async fn diagnose(&self, request: &DiagnosisRequest) -> Result<DiagnosisResponse> {
        self.post(routes::DIAGNOSE, request).await
    }

    /// Get the list of all valid symptoms the expert system accepts
    pub async fn symptoms(&self) -> Result<Vec<SymptomInfo>> {
        self.get(routes::SYMPTOMS).await
    }

    /// Get the list of all diseases the expert system can diagnose
    pub async fn diseases(&self) -> Result<Vec<DiseaseInfo>> {
        self.get(routes::DISEASES).await
    }

    /// Get detailed information about a specific disease
    pub async fn disease(&self, name: &str) -> Result<DiseaseInfo> {
        self.get(&routes::disease(name)).await
    }

    // ===== AI chat =====

    /// Send a message to the AI medical assistant
    pub async fn send_chat_message(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.post(routes::CHAT_MESSAGE, request).await
    }

    /// Get the list of available LLM models
    pub async fn models(&self) -> Result<ModelsResponse> {
        self.get(routes::CHAT_MODELS).await
    }

    /// Validate whether a model id is available
    pub async fn validate_model(&self, model: &str) -> Result<ModelValidationResponse> {
        let request = ModelValidationRequest {
            model: model.to_string(),
        };
        self.post(routes::VALIDATE_MODEL, &request).await
    }

    // ===== Private helpers =====

    /// Apply authentication to a request.
    /// Uses the TokenManager for automatic token refresh; requests go out
    /// without the header when no token is available.
    async fn apply_auth(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match self.token_manager.authorization_header().await? {
            Some((name, value)) => Ok(request.header(name, value)),
            None => Ok(request),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Generic GET request
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.http_client.get(self.url(path));
        let request = self.apply_auth(request).await?;

        let response = request.send().await.map_err(ApiError::HttpClient)?;
        self.handle_response(response).await
    }

    /// Generic POST request
    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let request = self.http_client.post(self.url(path)).json(body);
        let request = self.apply_auth(request).await?;

        let response = request.send().await.map_err(ApiError::HttpClient)?;
        self.handle_response(response).await
    }

    /// Handle successful response
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        if response.status().is_success() {
            response.json().await.map_err(ApiError::HttpClient)
        } else {
            self.handle_error_response(response).await
        }
    }

    /// Handle error response
    async fn handle_error_response<T>(&self, response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("request failed with status {status}"));

        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Authentication { message }),
            StatusCode::FORBIDDEN => Err(ApiError::Authorization { message }),
            StatusCode::TOO_MANY_REQUESTS => Err(ApiError::RateLimitExceeded),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound { resource: message }),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(ApiError::BadRequest { message })
            }
            StatusCode::REQUEST_TIMEOUT => Err(ApiError::Timeout),
            StatusCode::SERVICE_UNAVAILABLE => Err(ApiError::ServiceUnavailable),
            _ => Err(ApiError::Internal { message }),
        }
    }
}

/// Builder for constructing a MesaClient with custom configuration
#[derive(Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    token_manager: Option<Arc<TokenManager>>,
}

impl ClientBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL for the API
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Inject an explicitly constructed token manager.
    ///
    /// The same manager instance can be shared with other consumers so that
    /// every caller observes one token lifecycle.
    pub fn with_token_manager(mut self, token_manager: Arc<TokenManager>) -> Self {
        self.token_manager = Some(token_manager);
        self
    }

    /// Build the client.
    ///
    /// Without an injected manager the client starts unauthenticated; seed
    /// it later through `client.token_manager().set_tokens(..)` after login.
    pub fn build(self) -> Result<MesaClient> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| mesa_common::DEFAULT_API_URL.to_string());
        let token_manager = self
            .token_manager
            .unwrap_or_else(|| Arc::new(TokenManager::new(&base_url)));
        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        MesaClient::new(base_url, timeout, token_manager)
    }

    /// Build the client with the on-disk token store, restoring any session
    /// persisted by a previous run
    pub async fn build_with_stored_auth(self) -> Result<MesaClient> {
        let base_url = self
            .base_url
            .clone()
            .unwrap_or_else(|| mesa_common::DEFAULT_API_URL.to_string());

        let token_manager = TokenManager::new_file_based(&base_url)
            .await
            .map_err(ApiError::Auth)?;

        self.with_token_manager(Arc::new(token_manager)).build()
    }
}
