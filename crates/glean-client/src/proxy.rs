use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use glean_config::GleanConfig;
use glean_core::{ChatRequest, ChatResponse};
use reqwest::{header, Client, StatusCode};

use crate::auth::{ApiKeyAuth, Authenticator, MissingCredentials};
use crate::error::{GleanError, Result};
use crate::provider::ChatProvider;
use crate::stream::{decode_ndjson, ChatStream};

/// Chat API resource below the REST root
pub const CHAT_RESOURCE: &str = "chat";

/// Forwards chat requests to Glean's Chat API
///
/// Holds only immutable configuration and a pooled HTTP client, so one
/// instance serves concurrent calls without locking.
pub struct GleanChatProxy {
    config: GleanConfig,
    http_client: Client,
    authenticator: Arc<dyn Authenticator>,
}

impl GleanChatProxy {
    /// Create a proxy from validated configuration
    pub fn new(config: GleanConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| GleanError::Config(e.to_string()))?;

        let authenticator: Arc<dyn Authenticator> = match &config.api_key {
            Some(key) => {
                let auth = ApiKeyAuth::new(key.clone());
                match &config.act_as {
                    Some(email) => Arc::new(auth.with_act_as(email.clone())),
                    None => Arc::new(auth),
                }
            }
            None => Arc::new(MissingCredentials),
        };

        Self::with_authenticator(config, authenticator)
    }

    /// Create with a custom authenticator
    pub fn with_authenticator(
        config: GleanConfig,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("mcp-glean/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GleanError::Config(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
            authenticator,
        })
    }

    /// Get the config
    pub fn config(&self) -> &GleanConfig {
        &self.config
    }

    /// Full URL of the chat endpoint
    pub fn chat_url(&self) -> String {
        self.config.endpoint(CHAT_RESOURCE)
    }

    /// Build request headers
    fn build_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        self.authenticator.apply(&mut headers)?;
        Ok(headers)
    }

    /// Validate, authenticate and POST the request; the response is returned
    /// only when its status is a success.
    async fn post(&self, request: &ChatRequest) -> Result<reqwest::Response> {
        request.validate()?;
        let headers = self.build_headers()?;
        let url = self.chat_url();

        tracing::debug!(
            url = %url,
            messages = request.messages.len(),
            save_chat = request.save_chat,
            stream = request.stream,
            "Sending Glean chat request"
        );

        let response = self
            .http_client
            .post(&url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(GleanError::from_reqwest)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(status = status.as_u16(), "Failed to read Glean error body: {}", e);
                String::new()
            }
        };
        tracing::warn!(status = status.as_u16(), "Glean API returned an error");

        Err(match status {
            StatusCode::UNAUTHORIZED => GleanError::Authentication("Invalid Glean API key".to_string()),
            StatusCode::FORBIDDEN => {
                GleanError::Authentication("Access forbidden - check API key permissions".to_string())
            }
            _ => GleanError::RemoteService {
                status: status.as_u16(),
                body: error_text,
            },
        })
    }

    /// Send a non-streaming request
    pub async fn send_request(&self, request: ChatRequest) -> Result<ChatResponse> {
        let response = self.post(&request).await?;

        let bytes = response.bytes().await.map_err(GleanError::from_reqwest)?;
        let body = serde_json::from_slice(&bytes).map_err(|e| GleanError::Decode(e.to_string()))?;

        tracing::debug!(bytes = bytes.len(), "Received Glean chat response");
        Ok(ChatResponse::new(body, request.save_chat))
    }

    /// Send a streaming request
    pub async fn send_stream_request(&self, request: ChatRequest) -> Result<ChatStream> {
        let mut request = request;
        request.stream = true;

        let response = self.post(&request).await?;
        let body = response.bytes_stream().map_err(GleanError::from_reqwest);
        Ok(decode_ndjson(body))
    }
}

#[async_trait]
impl ChatProvider for GleanChatProxy {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.send_request(request).await
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream> {
        self.send_stream_request(request).await
    }
}
