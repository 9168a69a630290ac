//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI, Ollama, vLLM, OpenRouter and any other endpoint that
//! speaks `/v1/chat/completions`, streaming (SSE) or not.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use steward_config::ProviderConfig;
use steward_core::error::ProviderError;
use steward_core::message::PromptMessage;
use steward_core::provider::*;
use tracing::{debug, warn};

use crate::sse::{SseEvent, SseParser};

const COMPLETIONS_PATH: &str = "/chat/completions";

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a provider for `api_url`, which may be a base URL
    /// (`http://host/v1`) or the full completions endpoint.
    pub fn new(
        name: impl Into<String>,
        api_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            endpoint: Self::completions_endpoint(api_url),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        if config.api_url.trim().is_empty() {
            return Err(ProviderError::NotConfigured("api_url is empty".into()));
        }
        Self::new(
            "openai_compat",
            &config.api_url,
            config.api_key.clone().unwrap_or_default(),
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(model: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new(
            "ollama",
            "http://localhost:11434/v1",
            "ollama", // Ollama doesn't need a real key
            model,
            Duration::from_secs(120),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_endpoint(api_url: &str) -> String {
        let trimmed = api_url.trim().trim_end_matches('/');
        if trimmed.ends_with(COMPLETIONS_PATH) {
            trimmed.to_string()
        } else {
            format!("{trimmed}{COMPLETIONS_PATH}")
        }
    }

    fn request_body<'a>(&'a self, request: &'a ProviderRequest, stream: bool) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        }
    }

    async fn post(&self, body: &ApiRequest<'_>) -> Result<reqwest::Response, ProviderError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(body);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }
        if body.stream {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        debug!(provider = %self.name, model = %self.model, "Sending completion request");
        let response = self.post(&self.request_body(&request, false)).await?;

        let api_response: ApiResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            model: api_response.model.unwrap_or_else(|| self.model.clone()),
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        debug!(provider = %self.name, model = %self.model, "Sending streaming request");
        let response = self.post(&self.request_body(&request, true)).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Spawn task to read the SSE byte stream and parse chunks
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut parser = SseParser::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for event in parser.feed(&bytes) {
                    let chunk = match event {
                        SseEvent::Delta(text) => StreamChunk {
                            content: Some(text),
                            done: false,
                        },
                        SseEvent::Done => StreamChunk {
                            content: None,
                            done: true,
                        },
                    };
                    let done = chunk.done;
                    if tx.send(Ok(chunk)).await.is_err() || done {
                        return;
                    }
                }
            }

            // Stream ended without [DONE]
            if let Some(SseEvent::Delta(text)) = parser.finish() {
                let _ = tx
                    .send(Ok(StreamChunk {
                        content: Some(text),
                        done: false,
                    }))
                    .await;
            }
            let _ = tx
                .send(Ok(StreamChunk {
                    content: None,
                    done: true,
                }))
                .await;
        });

        Ok(rx)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}
