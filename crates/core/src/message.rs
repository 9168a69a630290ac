//! Message domain types.
//!
//! A `Message` is what conversation memory stores: role, text and the
//! bookkeeping metadata (timestamp, token estimate, turn, topics).
//! A `PromptMessage` is the metadata-free view that is sent to the LLM.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifier of a conversation turn. Allocated by each user message.
pub type TurnId = u64;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions and tool results
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping attached to every stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub timestamp: DateTime<Utc>,

    /// Estimated token count of `content`, computed once at append time.
    pub token_count: usize,

    /// The turn this message belongs to. System messages outside a turn have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<TurnId>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub topics: BTreeSet<String>,
}

/// A single message in conversation memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    pub metadata: MessageMetadata,
}

impl Message {
    /// Build a message with fresh metadata.
    pub fn new(
        role: Role,
        content: impl Into<String>,
        token_count: usize,
        turn_id: Option<TurnId>,
        topics: BTreeSet<String>,
    ) -> Self {
        Self {
            role,
            content: content.into(),
            metadata: MessageMetadata {
                timestamp: Utc::now(),
                token_count,
                turn_id,
                topics,
            },
        }
    }

    pub fn turn_id(&self) -> Option<TurnId> {
        self.metadata.turn_id
    }

    pub fn token_count(&self) -> usize {
        self.metadata.token_count
    }

    /// Strip metadata for LLM consumption.
    pub fn to_prompt(&self) -> PromptMessage {
        PromptMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// A role/content pair as sent to the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
