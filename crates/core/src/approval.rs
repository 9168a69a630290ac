//! Shell approval seam.
//!
//! Shell-class tools run only after a human grants the exact command. The
//! orchestrator owns the per-session cache; implementations of
//! `ShellApprover` only carry one request to the human and back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use crate::error::ChannelError;

/// The human's answer to one approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    /// Run this command.
    Approved,
    /// Run this command and every later shell command in the session.
    ApproveAll,
    /// Do not run this command.
    Denied,
}

impl ApprovalDecision {
    /// Map the `approved` / `approve_all` wire flags. `approve_all` implies approval.
    pub fn from_flags(approved: bool, approve_all: bool) -> Self {
        if approve_all {
            ApprovalDecision::ApproveAll
        } else if approved {
            ApprovalDecision::Approved
        } else {
            ApprovalDecision::Denied
        }
    }

    pub fn is_approved(&self) -> bool {
        !matches!(self, ApprovalDecision::Denied)
    }

    pub fn grants_all(&self) -> bool {
        matches!(self, ApprovalDecision::ApproveAll)
    }
}

/// Carries a single approval request to a human.
///
/// The wait has no timeout; it is a suspension point that ends with an
/// answer, a closed transport, or cancellation of `cancel`.
#[async_trait]
pub trait ShellApprover: Send + Sync {
    async fn request_approval(
        &self,
        command: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<ApprovalDecision, ChannelError>;
}
