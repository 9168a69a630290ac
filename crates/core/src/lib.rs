//! # Steward Core
//!
//! Domain types, traits, and error definitions for the Steward agent runtime.
//! This crate has **no framework dependencies**. It defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the orchestrator is a trait here (LLM provider,
//! tools, shell approval, host queries). Implementations live in their
//! respective crates, so tests can swap in scripted stand-ins.

pub mod approval;
pub mod error;
pub mod host;
pub mod identity;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use approval::{ApprovalDecision, ShellApprover};
pub use error::{AgentError, ChannelError, Error, ProviderError, Result, ToolError};
pub use host::HostQuery;
pub use identity::{ContextPaths, Identity};
pub use message::{Message, MessageMetadata, PromptMessage, Role, TurnId};
pub use provider::{ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk};
pub use tool::{Tool, ToolRegistry};
