//! Conversation memory for Steward.
//!
//! The active window holds raw messages under a token budget. Whatever the
//! window evicts is folded, one complete turn at a time, into a bounded
//! long-term store, and a short running summary is kept over both.

pub mod conversation;
pub mod long_term;
pub mod summary;
pub mod token;

pub use conversation::{ConversationMemory, MemoryConfig, MemorySnapshot};
pub use long_term::{LongTermEntry, LongTermStore};
pub use token::{HeuristicEstimator, TokenEstimator, estimate_tokens, shorten};
