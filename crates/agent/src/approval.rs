//! Per-session shell approval state.
//!
//! Decisions are cached by the exact (trimmed) command text, and a single
//! "approve all" answer opens the gate for the rest of the session. A
//! transport failure while waiting counts as a denial and is not cached,
//! so the same command is asked again next time.

use std::collections::HashMap;
use steward_core::approval::{ApprovalDecision, ShellApprover};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone)]
pub struct ApprovalState {
    approve_all: bool,
    cache: HashMap<String, ApprovalDecision>,
}

impl ApprovalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn approves_all(&self) -> bool {
        self.approve_all
    }

    /// A remembered decision for `command`, if any.
    pub fn cached(&self, command: &str) -> Option<ApprovalDecision> {
        self.cache.get(command.trim()).copied()
    }

    /// Remember a decision without asking anyone.
    pub fn record(&mut self, command: &str, decision: ApprovalDecision) {
        if decision.grants_all() {
            self.approve_all = true;
        }
        self.cache.insert(command.trim().to_string(), decision);
    }

    /// Decide whether `command` may run, asking `approver` on a cache miss.
    pub async fn check(&mut self, command: &str, approver: &dyn ShellApprover, cancel: &CancellationToken) -> bool {
        if self.approve_all {
            return true;
        }

        let key = command.trim();
        let decision = match self.cached(key) {
            Some(decision) => {
                debug!(command = key, ?decision, "Using cached approval");
                decision
            }
            None => match approver.request_approval(key, cancel).await {
                Ok(decision) => {
                    info!(command = key, ?decision, "Shell approval answered");
                    self.record(key, decision);
                    decision
                }
                Err(e) => {
                    warn!(command = key, error = %e, "Shell approval unavailable, denying");
                    return false;
                }
            },
        };

        if decision.grants_all() {
            self.approve_all = true;
        }
        decision.is_approved()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedApprover;
    use steward_core::error::ChannelError;

    #[tokio::test]
    async fn answers_are_cached_per_command() {
        let approver = ScriptedApprover::new(vec![Ok(ApprovalDecision::Approved), Ok(ApprovalDecision::Denied)]);
        let mut state = ApprovalState::new();
        let cancel = CancellationToken::new();

        assert!(state.check("ls", &approver, &cancel).await);
        assert!(state.check("  ls ", &approver, &cancel).await);
        assert!(!state.check("rm -rf /", &approver, &cancel).await);
        assert!(!state.check("rm -rf /", &approver, &cancel).await);
        assert_eq!(approver.requests(), vec!["ls", "rm -rf /"]);
    }

    #[tokio::test]
    async fn approve_all_skips_future_prompts() {
        let approver = ScriptedApprover::new(vec![Ok(ApprovalDecision::ApproveAll)]);
        let mut state = ApprovalState::new();
        let cancel = CancellationToken::new();

        assert!(state.check("make", &approver, &cancel).await);
        assert!(state.approves_all());
        assert!(state.check("make install", &approver, &cancel).await);
        assert_eq!(approver.requests().len(), 1);
    }

    #[tokio::test]
    async fn cached_denial_is_not_asked_again() {
        let approver = ScriptedApprover::new(vec![]);
        let mut state = ApprovalState::new();
        state.record("echo hi", ApprovalDecision::Denied);

        assert!(!state.check("echo hi", &approver, &CancellationToken::new()).await);
        assert!(approver.requests().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_denies_without_caching() {
        let approver = ScriptedApprover::new(vec![Err(ChannelError::Closed), Ok(ApprovalDecision::Approved)]);
        let mut state = ApprovalState::new();
        let cancel = CancellationToken::new();

        assert!(!state.check("ls", &approver, &cancel).await);
        assert!(state.cached("ls").is_none());
        assert!(state.check("ls", &approver, &cancel).await);
    }
}
