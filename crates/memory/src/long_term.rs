//! Long-term store: compacted records of turns evicted from the window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use steward_core::message::{Message, Role, TurnId};

use crate::token::shorten;

/// Snippet length used when folding messages into an entry.
pub const ENTRY_SNIPPET_CHARS: usize = 120;

/// A summarized record of one or more complete turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongTermEntry {
    pub summary: String,

    #[serde(default)]
    pub turn_ids: BTreeSet<TurnId>,

    #[serde(default)]
    pub topics: BTreeSet<String>,

    pub timestamp: DateTime<Utc>,
}

impl LongTermEntry {
    /// Fold messages into a single entry.
    ///
    /// User and assistant snippets are grouped (`User: a | b`), every other
    /// role keeps its own `role: snippet` segment. Returns `None` for an
    /// empty slice.
    pub fn fold(messages: &[Message]) -> Option<Self> {
        if messages.is_empty() {
            return None;
        }

        let mut turn_ids = BTreeSet::new();
        let mut topics = BTreeSet::new();
        let mut user = Vec::new();
        let mut assistant = Vec::new();
        let mut other = Vec::new();

        for msg in messages {
            if let Some(id) = msg.turn_id() {
                turn_ids.insert(id);
            }
            topics.extend(msg.metadata.topics.iter().cloned());

            let snippet = shorten(&msg.content, ENTRY_SNIPPET_CHARS);
            match msg.role {
                Role::User => user.push(snippet),
                Role::Assistant => assistant.push(snippet),
                Role::System => other.push(format!("{}: {}", msg.role, snippet)),
            }
        }

        let mut segments = Vec::new();
        if !user.is_empty() {
            segments.push(format!("User: {}", user.join(" | ")));
        }
        if !assistant.is_empty() {
            segments.push(format!("Assistant: {}", assistant.join(" | ")));
        }
        segments.extend(other);

        Some(Self {
            summary: segments.join("; "),
            turn_ids,
            topics,
            timestamp: Utc::now(),
        })
    }

    /// `turn N`, `turns A-B`, or `misc` for entries without a turn.
    pub fn turn_label(&self) -> String {
        match (self.turn_ids.first(), self.turn_ids.last()) {
            (Some(first), Some(last)) if first == last => format!("turn {first}"),
            (Some(first), Some(last)) => format!("turns {first}-{last}"),
            _ => "misc".to_string(),
        }
    }
}

/// Ordered, capacity-bounded list of entries. Oldest entries drop first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LongTermStore {
    entries: VecDeque<LongTermEntry>,
}

impl LongTermStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, then trim to `capacity`.
    pub fn push(&mut self, entry: LongTermEntry, capacity: usize) {
        self.entries.push_back(entry);
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }
    }

    /// The most recent `limit` entries (all when `None`), oldest first.
    pub fn recent(&self, limit: Option<usize>) -> Vec<LongTermEntry> {
        let skip = match limit {
            Some(limit) => self.entries.len().saturating_sub(limit),
            None => 0,
        };
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LongTermEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry covers `turn_id`.
    pub fn covers_turn(&self, turn_id: TurnId) -> bool {
        self.entries.iter().any(|e| e.turn_ids.contains(&turn_id))
    }
}
