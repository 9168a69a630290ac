//! Token-budgeted, turn-aware conversation window.
//!
//! Every append runs the eviction pass. Evicted messages are staged per
//! turn and only folded into the long-term store once no message of that
//! turn remains in the window and the turn is closed, so a turn is never
//! partially summarized.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use steward_core::identity::is_tools_prompt;
use steward_core::message::{Message, PromptMessage, Role, TurnId};
use tracing::{debug, warn};

use crate::long_term::{LongTermEntry, LongTermStore};
use crate::summary;
use crate::token::{HeuristicEstimator, TokenEstimator};

/// Budgets for the conversation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Soft cap on the window's estimated tokens. Zero disables eviction.
    pub token_window: usize,

    /// Token budget of the running summary.
    pub summary_token_budget: usize,

    /// Long-term entries kept before the oldest are dropped.
    pub max_long_term_entries: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            token_window: 1200,
            summary_token_budget: 400,
            max_long_term_entries: 50,
        }
    }
}

/// A deep copy of the full memory state.
///
/// Serializable so a snapshot can cross a process boundary; every field
/// defaults, so a partial snapshot restores what it carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySnapshot {
    messages: VecDeque<Message>,
    turn_counter: TurnId,
    current_turn: Option<TurnId>,
    long_term: LongTermStore,
    running_summary: String,
    eviction_buffer: BTreeMap<TurnId, Vec<Message>>,
}

/// The conversation memory.
pub struct ConversationMemory {
    config: MemoryConfig,
    estimator: Arc<dyn TokenEstimator>,
    state: MemorySnapshot,
    window_tokens: usize,
}

impl ConversationMemory {
    pub fn new(config: MemoryConfig) -> Self {
        Self::with_estimator(config, Arc::new(HeuristicEstimator))
    }

    pub fn with_estimator(config: MemoryConfig, estimator: Arc<dyn TokenEstimator>) -> Self {
        Self {
            config,
            estimator,
            state: MemorySnapshot::default(),
            window_tokens: 0,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Append a turnless system message (instructions, seeding).
    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.append(Role::System, content.into(), None, BTreeSet::new());
    }

    /// Append a system message that belongs to the current turn, such as a
    /// tool result or an approval denial.
    pub fn add_tool_message(&mut self, content: impl Into<String>) {
        let turn = self.state.current_turn;
        self.append(Role::System, content.into(), turn, BTreeSet::new());
    }

    /// Append a user message, opening a new turn.
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.add_user_message_with_topics(content, BTreeSet::new());
    }

    pub fn add_user_message_with_topics(&mut self, content: impl Into<String>, topics: BTreeSet<String>) {
        self.state.turn_counter += 1;
        self.state.current_turn = Some(self.state.turn_counter);
        let turn = self.state.current_turn;
        self.append(Role::User, content.into(), turn, topics);
    }

    /// Append an assistant message to the current turn.
    ///
    /// The running summary is not refreshed here; the next non-assistant
    /// append (or any long-term promotion) does it.
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        let turn = self.state.current_turn;
        self.append(Role::Assistant, content.into(), turn, BTreeSet::new());
    }

    /// Messages newest-first until the budget would be exceeded, returned in
    /// chronological order.
    ///
    /// `token_budget` defaults to the window; a zero budget means unbounded.
    /// `recent_count` of zero counts like `None`. A non-empty memory always
    /// yields at least one message.
    pub fn get_messages(&self, token_budget: Option<usize>, recent_count: Option<usize>) -> Vec<Message> {
        let messages = &self.state.messages;
        let skip = match recent_count {
            Some(count) if count > 0 => messages.len().saturating_sub(count),
            _ => 0,
        };
        let budget = token_budget.unwrap_or(self.config.token_window);

        let mut selected: Vec<Message> = Vec::new();
        let mut running = 0usize;
        for msg in messages.iter().skip(skip).rev() {
            let tokens = msg.token_count();
            if budget > 0 && running + tokens > budget && !selected.is_empty() {
                break;
            }
            running += tokens;
            selected.push(msg.clone());
        }
        selected.reverse();
        selected
    }

    /// The reduced prompt sent to the model.
    ///
    /// Every system message except the stored tool listing, then
    /// `tool_instructions` as a fresh system message, then the last
    /// `recent_turns * 2` user/assistant messages.
    pub fn get_efficient_prompt(&self, recent_turns: usize, tool_instructions: Option<&str>) -> Vec<PromptMessage> {
        let mut prompt: Vec<PromptMessage> = self
            .state
            .messages
            .iter()
            .filter(|m| m.role == Role::System && !is_tools_prompt(&m.content))
            .map(Message::to_prompt)
            .collect();

        if let Some(instructions) = tool_instructions.filter(|s| !s.is_empty()) {
            prompt.push(PromptMessage::system(instructions));
        }

        let dialogue: Vec<&Message> = self
            .state
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .collect();
        let skip = dialogue.len().saturating_sub(recent_turns * 2);
        prompt.extend(dialogue[skip..].iter().map(|m| m.to_prompt()));
        prompt
    }

    pub fn get_long_term_context(&self, limit: Option<usize>) -> Vec<LongTermEntry> {
        self.state.long_term.recent(limit)
    }

    pub fn get_running_summary(&self) -> &str {
        &self.state.running_summary
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        self.state.clone()
    }

    pub fn restore(&mut self, snapshot: MemorySnapshot) {
        self.window_tokens = snapshot.messages.iter().map(Message::token_count).sum();
        self.state = snapshot;
    }

    /// Restore from a serialized snapshot. Anything that does not parse
    /// leaves an empty memory.
    pub fn restore_json(&mut self, value: serde_json::Value) {
        let snapshot = match serde_json::from_value::<MemorySnapshot>(value) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Malformed memory snapshot, starting empty");
                MemorySnapshot::default()
            }
        };
        self.restore(snapshot);
    }

    /// Drop everything, keeping the configuration and estimator.
    pub fn clear(&mut self) {
        self.restore(MemorySnapshot::default());
    }

    pub fn len(&self) -> usize {
        self.state.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.messages.is_empty()
    }

    /// Estimated tokens currently in the window.
    pub fn window_tokens(&self) -> usize {
        self.window_tokens
    }

    /// The turn the next assistant message will join.
    pub fn current_turn(&self) -> Option<TurnId> {
        self.state.current_turn
    }

    /// Turns evicted from the window but not yet folded.
    pub fn staged_turns(&self) -> Vec<TurnId> {
        self.state.eviction_buffer.keys().copied().collect()
    }

    fn append(&mut self, role: Role, content: String, turn_id: Option<TurnId>, topics: BTreeSet<String>) {
        let tokens = self.estimator.estimate(&content);
        self.state
            .messages
            .push_back(Message::new(role, content, tokens, turn_id, topics));
        self.window_tokens += tokens;

        let promoted = self.enforce_window();
        if promoted || role != Role::Assistant {
            self.refresh_running_summary();
        }
    }

    /// Evict oldest messages while over budget. Returns whether anything was
    /// promoted to the long-term store.
    fn enforce_window(&mut self) -> bool {
        let mut promoted = false;

        if self.config.token_window > 0 {
            while self.window_tokens > self.config.token_window && self.state.messages.len() > 1 {
                let Some(evicted) = self.state.messages.pop_front() else {
                    break;
                };
                self.window_tokens = self.window_tokens.saturating_sub(evicted.token_count());

                match evicted.turn_id() {
                    None => {
                        promoted |= self.promote(vec![evicted]);
                    }
                    Some(turn) => {
                        debug!(turn, "Staging evicted message");
                        self.state.eviction_buffer.entry(turn).or_default().push(evicted);
                    }
                }
            }
        }

        promoted | self.flush_closed_turns()
    }

    /// Fold every staged turn that has left the window and is no longer open.
    fn flush_closed_turns(&mut self) -> bool {
        let ready: Vec<TurnId> = self
            .state
            .eviction_buffer
            .keys()
            .copied()
            .filter(|turn| Some(*turn) != self.state.current_turn && !self.is_turn_in_window(*turn))
            .collect();

        let mut promoted = false;
        for turn in ready {
            if let Some(batch) = self.state.eviction_buffer.remove(&turn) {
                promoted |= self.promote(batch);
            }
        }
        promoted
    }

    fn promote(&mut self, batch: Vec<Message>) -> bool {
        let Some(entry) = LongTermEntry::fold(&batch) else {
            return false;
        };
        debug!(label = %entry.turn_label(), messages = batch.len(), "Promoting to long-term memory");
        self.state.long_term.push(entry, self.config.max_long_term_entries);
        true
    }

    fn is_turn_in_window(&self, turn: TurnId) -> bool {
        self.state.messages.iter().any(|m| m.turn_id() == Some(turn))
    }

    fn refresh_running_summary(&mut self) {
        let recent = self.get_messages(Some(self.config.summary_token_budget), None);
        self.state.running_summary = summary::render(
            &self.state.long_term,
            &recent,
            self.config.summary_token_budget,
            self.estimator.as_ref(),
        );
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

impl std::fmt::Debug for ConversationMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationMemory")
            .field("config", &self.config)
            .field("messages", &self.state.messages.len())
            .field("window_tokens", &self.window_tokens)
            .field("long_term", &self.state.long_term.len())
            .finish()
    }
}
