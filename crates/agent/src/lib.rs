//! The agent: everything between an inbound user message and the reply.
//!
//! 1. **Route** the request: answer directly or plan (`orchestrator`)
//! 2. **Respond**: complete, run `<tool:...>` directives, follow up until
//!    the reply is plain text or the iteration cap is hit
//! 3. **Plan**: numbered steps, each executed and verified with bounded
//!    retries (`plan`), then a final summary
//!
//! `Session` is the main pump that feeds host messages into the
//! orchestrator and writes exactly one reply per request.

pub mod approval;
pub mod directive;
pub mod orchestrator;
pub mod plan;
pub mod prompts;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use approval::ApprovalState;
pub use directive::Segment;
pub use orchestrator::{DebugLog, OrchestratorLimits, PlanRun, Reply, Route, ToolCallOrchestrator};
pub use plan::{PlanStepRecord, StepState};
pub use session::Session;
