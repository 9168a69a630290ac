//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider knows how to send a message list to an LLM and get text back,
//! either as a complete reply or as a stream of deltas. The agent consumes
//! streams eagerly to completion before acting on a reply.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use crate::error::ProviderError;
use crate::message::PromptMessage;

/// A single completion request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The conversation messages
    pub messages: Vec<PromptMessage>,

    /// Temperature override (provider default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ProviderRequest {
    pub fn new(messages: Vec<PromptMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated text
    pub content: String,

    /// Which model actually responded
    pub model: String,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,
}

/// Receiving half of a provider stream.
pub type ChunkReceiver = mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>;

/// The core Provider trait.
///
/// Every LLM backend implements this trait. The orchestrator calls
/// `stream_text()` without knowing which provider is being used.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider.
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// Default implementation calls `complete()` and wraps the result as a single chunk.
    async fn stream(&self, request: ProviderRequest) -> std::result::Result<ChunkReceiver, ProviderError> {
        let response = self.complete(request).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx
            .send(Ok(StreamChunk {
                content: Some(response.content),
                done: true,
            }))
            .await;
        Ok(rx)
    }

    /// Stream a reply and drain it into a single string.
    async fn stream_text(&self, request: ProviderRequest) -> std::result::Result<String, ProviderError> {
        let mut rx = self.stream(request).await?;
        let mut text = String::new();
        while let Some(chunk) = rx.recv().await {
            let chunk = chunk?;
            if let Some(delta) = chunk.content {
                text.push_str(&delta);
            }
            if chunk.done {
                break;
            }
        }
        Ok(text)
    }

    /// Health check: can we reach the provider?
    ///
    /// Default implementation sends a minimal `ping` prompt.
    async fn health_check(&self) -> std::result::Result<(), ProviderError> {
        self.complete(ProviderRequest::new(vec![PromptMessage::system("ping")]))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider;

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                content: format!("{} messages", request.messages.len()),
                model: "fixed-model".into(),
            })
        }
    }

    struct ChunkedProvider;

    #[async_trait]
    impl Provider for ChunkedProvider {
        fn name(&self) -> &str {
            "chunked"
        }

        async fn complete(&self, _request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("stream only".into()))
        }

        async fn stream(&self, _request: ProviderRequest) -> std::result::Result<ChunkReceiver, ProviderError> {
            let (tx, rx) = mpsc::channel(4);
            for part in ["Hel", "lo", "!"] {
                tx.send(Ok(StreamChunk { content: Some(part.into()), done: false }))
                    .await
                    .unwrap();
            }
            tx.send(Ok(StreamChunk { content: None, done: true })).await.unwrap();
            Ok(rx)
        }
    }

    #[tokio::test]
    async fn default_stream_wraps_complete() {
        let provider = FixedProvider;
        let text = provider
            .stream_text(ProviderRequest::new(vec![PromptMessage::user("hi")]))
            .await
            .unwrap();
        assert_eq!(text, "1 messages");
    }

    #[tokio::test]
    async fn stream_text_concatenates_deltas() {
        let text = ChunkedProvider
            .stream_text(ProviderRequest::default())
            .await
            .unwrap();
        assert_eq!(text, "Hello!");
    }

    #[tokio::test]
    async fn health_check_uses_complete() {
        assert!(FixedProvider.health_check().await.is_ok());
        assert!(ChunkedProvider.health_check().await.is_err());
    }

    #[test]
    fn request_omits_unset_options() {
        let req = ProviderRequest::new(vec![PromptMessage::user("x")]);
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("temperature"));
        assert!(!json.contains("max_tokens"));
    }
}
