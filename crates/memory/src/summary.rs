//! Running summary rendering.

use steward_core::message::Message;

use crate::long_term::LongTermStore;
use crate::token::{TokenEstimator, shorten};

/// How many long-term entries the summary mentions.
pub const SUMMARY_LONG_TERM_ENTRIES: usize = 3;

/// How many recent window messages the summary mentions.
pub const SUMMARY_RECENT_MESSAGES: usize = 4;

/// Snippet length for recent messages.
pub const SUMMARY_SNIPPET_CHARS: usize = 160;

/// Render the running summary.
///
/// `recent` is the budget-limited tail of the active window. Lines are
/// dropped from the oldest end until the whole text fits `budget`.
pub fn render(
    long_term: &LongTermStore,
    recent: &[Message],
    budget: usize,
    estimator: &dyn TokenEstimator,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    if !long_term.is_empty() {
        lines.push("Long-term context:".to_string());
        for entry in long_term.recent(Some(SUMMARY_LONG_TERM_ENTRIES)) {
            lines.push(format!("- {}: {}", entry.turn_label(), entry.summary));
        }
    }

    if !recent.is_empty() {
        lines.push("Recent focus:".to_string());
        let skip = recent.len().saturating_sub(SUMMARY_RECENT_MESSAGES);
        for msg in &recent[skip..] {
            let snippet = shorten(&msg.content, SUMMARY_SNIPPET_CHARS);
            match msg.turn_id() {
                Some(turn) => lines.push(format!("- ({}, turn {turn}) {snippet}", msg.role)),
                None => lines.push(format!("- ({}) {snippet}", msg.role)),
            }
        }
    }

    let mut start = 0;
    let mut joined = lines.join("\n").trim().to_string();
    while start < lines.len() && estimator.estimate(&joined) > budget {
        start += 1;
        joined = lines[start..].join("\n").trim().to_string();
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::long_term::LongTermEntry;
    use crate::token::HeuristicEstimator;
    use std::collections::BTreeSet;
    use steward_core::message::Role;

    fn msg(role: Role, content: &str, turn: Option<u64>) -> Message {
        Message::new(role, content, 1, turn, BTreeSet::new())
    }

    #[test]
    fn empty_memory_renders_nothing() {
        let text = render(&LongTermStore::new(), &[], 400, &HeuristicEstimator);
        assert!(text.is_empty());
    }

    #[test]
    fn recent_focus_lists_last_four() {
        let recent: Vec<_> = (1..=6)
            .map(|i| msg(Role::User, &format!("question {i}"), Some(i)))
            .collect();
        let text = render(&LongTermStore::new(), &recent, 400, &HeuristicEstimator);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Recent focus:");
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "- (user, turn 3) question 3");
        assert_eq!(lines[4], "- (user, turn 6) question 6");
    }

    #[test]
    fn system_messages_have_no_turn_label() {
        let text = render(
            &LongTermStore::new(),
            &[msg(Role::System, "rules", None)],
            400,
            &HeuristicEstimator,
        );
        assert_eq!(text, "Recent focus:\n- (system) rules");
    }

    #[test]
    fn long_term_section_comes_first() {
        let mut store = LongTermStore::new();
        for i in 1..=5 {
            let entry = LongTermEntry::fold(&[msg(Role::User, &format!("old {i}"), Some(i))]).unwrap();
            store.push(entry, 50);
        }
        let text = render(&store, &[msg(Role::User, "now", Some(6))], 400, &HeuristicEstimator);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Long-term context:");
        assert_eq!(lines[1], "- turn 3: User: old 3");
        assert_eq!(lines[3], "- turn 5: User: old 5");
        assert_eq!(lines[4], "Recent focus:");
    }

    #[test]
    fn over_budget_drops_oldest_lines() {
        let recent: Vec<_> = (1..=4)
            .map(|i| msg(Role::User, &format!("entry {i}"), Some(i)))
            .collect();
        // One token per line makes the budget a line count.
        let per_line = |text: &str| text.lines().count();
        let text = render(&LongTermStore::new(), &recent, 2, &per_line);
        assert_eq!(text, "- (user, turn 3) entry 3\n- (user, turn 4) entry 4");
    }
}
