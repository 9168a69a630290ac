//! `steward plan-only <request>`: print a plan and exit.

use std::sync::Arc;
use steward_agent::{DebugLog, ToolCallOrchestrator};
use steward_core::identity::{ContextPaths, Identity};

use super::{CliResult, NoHostApprover, build_memory, build_provider, limits, load_config};

pub async fn run(message: String) -> CliResult {
    let config = load_config()?;
    let workspace = std::env::current_dir()?;
    let provider = build_provider(&config)?;

    let tools = Arc::new(steward_tools::default_registry(&config.tools, &workspace, None));
    let identity = Identity::load(&ContextPaths::from_working_dir(&workspace));
    let mut memory = build_memory(&config);
    for prompt in identity.seed_prompts(&tools) {
        memory.add_system_message(prompt);
    }

    let orchestrator =
        ToolCallOrchestrator::new(provider, tools, Arc::new(NoHostApprover)).with_limits(limits(&config));
    let mut debug_log = DebugLog::new(config.debug_metrics);
    let plan = orchestrator.plan_only(&mut memory, &message, &mut debug_log).await?;

    for line in debug_log.lines() {
        tracing::info!("{line}");
    }
    println!("{plan}");
    Ok(())
}
