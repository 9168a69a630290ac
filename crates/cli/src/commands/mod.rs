//! Subcommand implementations and the wiring they share.

pub mod check;
pub mod init;
pub mod plan_only;
pub mod serve;

use async_trait::async_trait;
use std::sync::Arc;
use steward_agent::OrchestratorLimits;
use steward_config::AppConfig;
use steward_core::approval::{ApprovalDecision, ShellApprover};
use steward_core::error::ChannelError;
use steward_core::provider::Provider;
use steward_memory::{ConversationMemory, MemoryConfig};
use steward_providers::OpenAiCompatProvider;
use tokio_util::sync::CancellationToken;

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

fn load_config() -> CliResult<AppConfig> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

fn build_provider(config: &AppConfig) -> CliResult<Arc<dyn Provider>> {
    let provider = OpenAiCompatProvider::from_config(&config.provider)?;
    tracing::info!(endpoint = provider.endpoint(), model = provider.model(), "LLM provider ready");
    Ok(Arc::new(provider))
}

fn build_memory(config: &AppConfig) -> ConversationMemory {
    ConversationMemory::new(MemoryConfig {
        token_window: config.memory.token_window,
        summary_token_budget: config.memory.summary_token_budget,
        max_long_term_entries: config.memory.max_long_term_entries,
    })
}

fn limits(config: &AppConfig) -> OrchestratorLimits {
    OrchestratorLimits::from(&config.agent)
}

/// Used where no host is attached to ask; every shell command is refused.
struct NoHostApprover;

#[async_trait]
impl ShellApprover for NoHostApprover {
    async fn request_approval(
        &self,
        command: &str,
        _cancel: &CancellationToken,
    ) -> Result<ApprovalDecision, ChannelError> {
        tracing::warn!(command, "No host attached, refusing shell command");
        Ok(ApprovalDecision::Denied)
    }
}
