//! LLM provider implementations for Steward.
//!
//! Every provider implements `steward_core::Provider`. Steward talks to a
//! single OpenAI-compatible chat-completions endpoint (OpenAI, Ollama,
//! vLLM, OpenRouter, ...), streaming replies over SSE.

pub mod openai_compat;
pub mod sse;

pub use openai_compat::OpenAiCompatProvider;
pub use sse::{SseEvent, SseParser};
