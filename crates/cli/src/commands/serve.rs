//! `steward serve`: the session over stdin/stdout.

use std::sync::Arc;
use std::time::Duration;
use steward_agent::{Session, ToolCallOrchestrator};
use steward_channels::{ChannelApprover, HostBridge, MessageChannel, shared};
use steward_core::host::HostQuery;
use steward_core::identity::{ContextPaths, Identity};

use super::{CliResult, build_memory, build_provider, limits, load_config};

pub async fn run() -> CliResult {
    let config = load_config()?;
    let workspace = std::env::current_dir()?;
    let provider = build_provider(&config)?;

    let channel = shared(MessageChannel::stdio());
    let host: Arc<dyn HostQuery> = Arc::new(HostBridge::new(
        channel.clone(),
        Duration::from_secs(config.host.query_timeout_secs),
    ));
    let tools = Arc::new(steward_tools::default_registry(&config.tools, &workspace, Some(host)));
    let approver = Arc::new(ChannelApprover::new(channel.clone()));

    let orchestrator = ToolCallOrchestrator::new(provider, tools, approver).with_limits(limits(&config));
    let identity = Identity::load(&ContextPaths::from_working_dir(&workspace));
    if let Some(source) = &identity.source {
        tracing::info!(file = %source.display(), "Project instructions loaded");
    }

    let mut session = Session::new(channel, orchestrator, build_memory(&config), identity)
        .with_debug_metrics(config.debug_metrics);
    session.run().await?;
    tracing::info!("Session ended");
    Ok(())
}
