//! The tool-call orchestrator.
//!
//! Turns model replies into tool executions and drives planning runs:
//!
//! 1. **Direct reply**: record the reply, run any `<tool:...>` directives,
//!    ask the model to explain the results, repeat until the reply has no
//!    directives or the iteration cap is hit
//! 2. **Planning**: request a numbered plan, then execute and verify each
//!    step with bounded retries, then ask for a final summary
//!
//! Tool failures never escape; they become system messages the model can
//! see. Provider failures propagate to the caller untouched.

use std::sync::Arc;
use std::time::{Duration, Instant};
use steward_config::AgentConfig;
use steward_core::approval::ShellApprover;
use steward_core::error::{AgentError, Error, ProviderError, ToolError};
use steward_core::identity::build_tools_prompt;
use steward_core::provider::{Provider, ProviderRequest};
use steward_core::tool::ToolRegistry;
use steward_memory::ConversationMemory;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::approval::ApprovalState;
use crate::directive;
use crate::plan::{PlanStepRecord, StepState, parse_plan};
use crate::prompts;

const ARGS_PREVIEW_CHARS: usize = 40;

/// Orchestration limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorLimits {
    /// Maximum plan steps executed
    pub chain_limit: usize,
    /// Maximum tool rounds per reply
    pub tool_iterations: usize,
    /// Retries per plan step after the first attempt
    pub step_retries: usize,
    /// Dialogue exchanges included in each prompt
    pub recent_turns: usize,
}

impl Default for OrchestratorLimits {
    fn default() -> Self {
        Self::from(&AgentConfig::default())
    }
}

impl From<&AgentConfig> for OrchestratorLimits {
    fn from(config: &AgentConfig) -> Self {
        Self {
            chain_limit: config.chain_limit.max(1),
            tool_iterations: config.tool_iterations.max(1),
            step_retries: config.agent_step_retries,
            recent_turns: config.recent_turns,
        }
    }
}

/// Timing lines for the `debug` field of a reply.
#[derive(Debug, Default, Clone)]
pub struct DebugLog {
    enabled: bool,
    lines: Vec<String>,
}

impl DebugLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            lines: Vec::new(),
        }
    }

    pub fn record(&mut self, line: impl FnOnce() -> String) {
        if self.enabled {
            self.lines.push(line());
        }
    }

    pub fn timing(&mut self, label: &str, elapsed: Duration) {
        self.record(|| format!("[DEBUG] {label}: {:.2}s", elapsed.as_secs_f64()));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Final text plus side-channel extras.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub extras: Vec<String>,
}

/// The outcome of a planning run.
#[derive(Debug, Clone)]
pub struct PlanRun {
    pub reply: Reply,
    pub records: Vec<PlanStepRecord>,
}

/// Router verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Respond,
    Plan,
}

pub struct ToolCallOrchestrator {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    approver: Arc<dyn ShellApprover>,
    approvals: ApprovalState,
    limits: OrchestratorLimits,
    cancel: CancellationToken,
}

impl ToolCallOrchestrator {
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>, approver: Arc<dyn ShellApprover>) -> Self {
        Self {
            provider,
            tools,
            approver,
            approvals: ApprovalState::new(),
            limits: OrchestratorLimits::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_limits(mut self, limits: OrchestratorLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Start from existing approval state.
    pub fn with_approvals(mut self, approvals: ApprovalState) -> Self {
        self.approvals = approvals;
        self
    }

    /// Token that abandons a pending approval wait when cancelled.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn approvals(&self) -> &ApprovalState {
        &self.approvals
    }

    pub fn limits(&self) -> &OrchestratorLimits {
        &self.limits
    }

    /// Send the efficient prompt and drain the streamed reply.
    pub async fn collect_response(&self, memory: &ConversationMemory) -> Result<(String, Duration), ProviderError> {
        let start = Instant::now();
        let instructions = build_tools_prompt(&self.tools);
        let messages = memory.get_efficient_prompt(self.limits.recent_turns, Some(&instructions));
        debug!(messages = messages.len(), provider = self.provider.name(), "LLM prompt");
        let text = self.provider.stream_text(ProviderRequest::new(messages)).await?;
        Ok((text, start.elapsed()))
    }

    /// Answer a user message already in memory: route it, then reply
    /// directly or run a plan. `force_plan` skips the router.
    pub async fn handle(
        &mut self,
        memory: &mut ConversationMemory,
        input: &str,
        force_plan: bool,
        debug_log: &mut DebugLog,
    ) -> Result<Reply, Error> {
        let route = if force_plan {
            Route::Plan
        } else {
            self.route(memory, input).await?
        };
        info!(?route, "Routing decision");
        match route {
            Route::Plan => Ok(self.run_plan(memory, input, debug_log).await?.reply),
            Route::Respond => Ok(self.respond(memory, debug_log).await?),
        }
    }

    /// Ask the model whether `input` needs a plan. Memory is left untouched.
    pub async fn route(&self, memory: &mut ConversationMemory, input: &str) -> Result<Route, ProviderError> {
        let snapshot = memory.snapshot();
        memory.add_system_message(prompts::router(input));
        let result = self.collect_response(memory).await;
        memory.restore(snapshot);

        let (decision, _) = result?;
        let decision = decision.trim().to_lowercase();
        debug!(decision = %decision, "Router replied");
        Ok(if decision.contains("plan") { Route::Plan } else { Route::Respond })
    }

    /// One completion for the current memory, then the tool loop.
    pub async fn respond(&mut self, memory: &mut ConversationMemory, debug_log: &mut DebugLog) -> Result<Reply, ProviderError> {
        let (text, elapsed) = self.collect_response(memory).await?;
        debug_log.timing("Response time", elapsed);
        self.process_tool_calls(&text, memory, debug_log).await
    }

    /// Produce a plan for `input` without executing it. Memory is rolled
    /// back afterwards.
    pub async fn plan_only(
        &self,
        memory: &mut ConversationMemory,
        input: &str,
        debug_log: &mut DebugLog,
    ) -> Result<String, ProviderError> {
        let snapshot = memory.snapshot();
        memory.add_user_message(input);
        memory.add_user_message(prompts::plan_request(self.limits.chain_limit));
        let result = self.collect_response(memory).await;
        memory.restore(snapshot);

        let (plan, elapsed) = result?;
        debug_log.timing("Planning time", elapsed);
        Ok(plan)
    }

    /// The direct-reply loop.
    ///
    /// Returns within `tool_iterations` follow-up completions no matter how
    /// many directives each reply carries.
    pub async fn process_tool_calls(
        &mut self,
        response: &str,
        memory: &mut ConversationMemory,
        debug_log: &mut DebugLog,
    ) -> Result<Reply, ProviderError> {
        let mut text = response.trim().to_string();
        let mut extras = Vec::new();
        let mut iterations = 0;
        let mut limit_reached = false;

        loop {
            memory.add_assistant_message(text.as_str());
            let calls = directive::tool_calls(&text);
            debug!(count = calls.len(), "Tool directives found");
            if calls.is_empty() {
                break;
            }
            if iterations >= self.limits.tool_iterations {
                warn!(iterations, "Tool iteration limit reached");
                extras.push(prompts::TOOL_LIMIT_NOTICE.to_string());
                limit_reached = true;
                break;
            }
            iterations += 1;

            for (name, args) in calls {
                let message = match self.run_directive(&name, &args).await {
                    Some(message) => message,
                    None => {
                        let denial = format!("[Tool {name}] Command denied by user.");
                        memory.add_tool_message(denial.as_str());
                        extras.push(denial);
                        continue;
                    }
                };
                memory.add_tool_message(message.as_str());
                extras.push(message);
                debug_log.record(|| format!("[DEBUG] Tool {name} invoked with args: {}", preview(&args)));
            }

            memory.add_user_message(prompts::TOOL_FOLLOW_UP);
            let (follow_up, elapsed) = self.collect_response(memory).await?;
            debug_log.timing("Tool follow-up time", elapsed);
            text = follow_up.trim().to_string();
        }

        let cleaned = directive::strip(&text).trim().to_string();
        let content = if cleaned.is_empty() && limit_reached {
            prompts::TOOL_LIMIT_NOTICE.to_string()
        } else {
            cleaned
        };
        Ok(Reply { content, extras })
    }

    /// Run one directive. `None` means a shell-class call was denied.
    async fn run_directive(&mut self, name: &str, args: &str) -> Option<String> {
        let Some(tool) = self.tools.lookup(name) else {
            warn!(tool = name, "Unknown tool requested");
            return Some(format!("[Tool {name}] not found."));
        };

        if tool.requires_approval() && !self.approvals.check(args, self.approver.as_ref(), &self.cancel).await {
            warn!(tool = name, command = args, "Shell command denied");
            return None;
        }

        debug!(tool = name, args, "Invoking tool");
        Some(match tool.invoke(args).await {
            Ok(output) if output.trim().is_empty() => format!("[Tool {name}] (no output)"),
            Ok(output) => output,
            Err(ToolError::NotFound(_)) => format!("[Tool {name}] not found."),
            Err(e) => {
                warn!(tool = name, error = %e, "Tool failed");
                format!("[Tool {name}] Error: {e}")
            }
        })
    }

    /// The plan, execute, verify, retry cycle for `goal`.
    ///
    /// A plan without parseable steps is reported as
    /// `AgentError::EmptyPlan`. A step that never verifies is marked failed
    /// and the run moves on.
    pub async fn run_plan(
        &mut self,
        memory: &mut ConversationMemory,
        goal: &str,
        debug_log: &mut DebugLog,
    ) -> Result<PlanRun, Error> {
        memory.add_user_message(prompts::plan_request(self.limits.chain_limit));
        let (plan_text, elapsed) = self.collect_response(memory).await?;
        debug_log.timing("Planning time", elapsed);

        let steps = parse_plan(&plan_text);
        if steps.is_empty() {
            warn!("Plan reply had no numbered steps");
            return Err(AgentError::EmptyPlan { reply: plan_text }.into());
        }
        info!(steps = steps.len(), limit = self.limits.chain_limit, "Executing plan");

        let started = Instant::now();
        let max_attempts = self.limits.step_retries + 1;
        let mut extras = Vec::new();
        let mut records = Vec::new();

        for (offset, step) in steps.iter().take(self.limits.chain_limit).enumerate() {
            let index = offset + 1;
            extras.push(format!("[Plan Step {index}] {step}"));
            let mut record = PlanStepRecord::new(index, step.as_str());
            let mut feedback: Option<String> = None;

            loop {
                record.begin_attempt();
                let attempt = record.attempts;

                memory.add_user_message(prompts::execute_step(index, step, feedback.as_deref()));
                let (response, elapsed) = self.collect_response(memory).await?;
                debug_log.timing(&format!("Step {index} attempt {attempt} execution time"), elapsed);

                let outcome = self.process_tool_calls(&response, memory, debug_log).await?;
                extras.extend(outcome.extras);
                record.record_result(outcome.content);

                memory.add_user_message(prompts::verify_step(index, step, &record.last_result));
                let (verdict, elapsed) = self.collect_response(memory).await?;
                debug_log.timing(&format!("Step {index} attempt {attempt} verification time"), elapsed);

                match record.record_verification(verdict.trim(), max_attempts) {
                    StepState::Complete => {
                        extras.push(format!("[Step {index}] Completed in {attempt} attempt(s)."));
                        break;
                    }
                    state => {
                        extras.push(format!(
                            "[Step {index}] Attempt {attempt} incomplete: {}",
                            record.verification_headline()
                        ));
                        feedback = Some(record.last_verification.clone());
                        if state == StepState::Failed {
                            break;
                        }
                        memory.add_user_message(prompts::retry_step(step, &record.last_verification));
                    }
                }
            }

            if !record.completed {
                warn!(step = index, attempts = record.attempts, "Plan step failed");
                let outcome = if record.last_result.is_empty() {
                    "(no result)"
                } else {
                    record.last_result.as_str()
                };
                extras.push(format!(
                    "[Step {index}] Failed after {} attempt(s). Latest outcome: {outcome}",
                    record.attempts
                ));
            }
            records.push(record);
        }

        let total = started.elapsed();
        debug_log.record(|| {
            format!(
                "[DEBUG] Agentic planning steps executed: {} | Total time: {:.2}s",
                records.len(),
                total.as_secs_f64()
            )
        });

        let outcomes: Vec<String> = records.iter().map(PlanStepRecord::outcome_line).collect();
        memory.add_user_message(prompts::final_summary(goal, &outcomes));
        let (summary, elapsed) = self.collect_response(memory).await?;
        debug_log.timing("Final summary time", elapsed);

        let final_reply = self.process_tool_calls(&summary, memory, debug_log).await?;
        extras.extend(final_reply.extras);

        Ok(PlanRun {
            reply: Reply {
                content: final_reply.content,
                extras,
            },
            records,
        })
    }
}

fn preview(args: &str) -> String {
    let mut chars = args.chars();
    let head: String = chars.by_ref().take(ARGS_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedApprover, SequentialMockProvider, SharedTool, StubTool};
    use steward_core::approval::ApprovalDecision;
    use steward_core::message::Role;
    use steward_memory::MemoryConfig;

    struct Harness {
        provider: Arc<SequentialMockProvider>,
        approver: Arc<ScriptedApprover>,
        orchestrator: ToolCallOrchestrator,
        memory: ConversationMemory,
    }

    fn harness(replies: Vec<&str>, tools: Vec<Box<dyn steward_core::tool::Tool>>, approvals: Vec<ApprovalDecision>) -> Harness {
        let provider = Arc::new(SequentialMockProvider::new(replies));
        let approver = Arc::new(ScriptedApprover::new(approvals.into_iter().map(Ok).collect()));
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool);
        }
        let orchestrator = ToolCallOrchestrator::new(provider.clone(), Arc::new(registry), approver.clone());
        Harness {
            provider,
            approver,
            orchestrator,
            memory: ConversationMemory::new(MemoryConfig::default()),
        }
    }

    #[tokio::test]
    async fn reply_without_directives_is_final() {
        let mut h = harness(vec![], vec![], vec![]);
        h.memory.add_user_message("hi");
        let mut log = DebugLog::new(true);

        let reply = h
            .orchestrator
            .process_tool_calls("  Hello there!  ", &mut h.memory, &mut log)
            .await
            .unwrap();
        assert_eq!(reply, Reply { content: "Hello there!".into(), extras: vec![] });
        assert_eq!(h.provider.call_count(), 0);
        let last = h.memory.get_messages(Some(0), None).pop().unwrap();
        assert_eq!(last.role, Role::Assistant);
    }

    #[tokio::test]
    async fn tool_output_goes_to_extras_and_follow_up_is_content() {
        let echo = Arc::new(StubTool::ok("read_file", "file body"));
        let mut h = harness(
            vec!["The file says: file body"],
            vec![Box::new(SharedTool(echo.clone()))],
            vec![],
        );
        h.memory.add_user_message("read a.txt");
        let mut log = DebugLog::new(true);

        let reply = h
            .orchestrator
            .process_tool_calls("Reading. <tool:read_file>a.txt</tool>", &mut h.memory, &mut log)
            .await
            .unwrap();

        assert_eq!(reply.content, "The file says: file body");
        assert_eq!(reply.extras, vec!["file body"]);
        assert_eq!(echo.calls(), 1);
        assert_eq!(h.provider.last_message_of(0), prompts::TOOL_FOLLOW_UP);
        assert!(log.lines()[0].starts_with("[DEBUG] Tool read_file invoked with args: a.txt"));
        assert!(log.lines()[1].starts_with("[DEBUG] Tool follow-up time: "));
    }

    #[tokio::test]
    async fn unknown_and_failing_tools_become_messages() {
        let mut h = harness(
            vec!["Sorry about that."],
            vec![Box::new(StubTool::failing("list_dir", "disk on fire"))],
            vec![],
        );
        h.memory.add_user_message("go");
        let mut log = DebugLog::new(false);

        let reply = h
            .orchestrator
            .process_tool_calls("<tool:nope>x</tool><tool:list_dir>.</tool>", &mut h.memory, &mut log)
            .await
            .unwrap();
        assert_eq!(
            reply.extras,
            vec![
                "[Tool nope] not found.".to_string(),
                "[Tool list_dir] Error: list_dir failed: disk on fire".to_string(),
            ]
        );
        assert!(log.lines().is_empty());
    }

    #[tokio::test]
    async fn empty_tool_output_is_marked() {
        let mut h = harness(vec!["ok"], vec![Box::new(StubTool::ok("touch", "  "))], vec![]);
        h.memory.add_user_message("go");
        let reply = h
            .orchestrator
            .process_tool_calls("<tool:touch>f</tool>", &mut h.memory, &mut DebugLog::default())
            .await
            .unwrap();
        assert_eq!(reply.extras, vec!["[Tool touch] (no output)"]);
    }

    #[tokio::test]
    async fn cached_denial_skips_execution_without_prompting() {
        let shell = Arc::new(StubTool::shell("hi"));
        let mut approvals = ApprovalState::new();
        approvals.record("echo hi", ApprovalDecision::Denied);

        let mut h = harness(vec!["Okay, I won't run it."], vec![Box::new(SharedTool(shell.clone()))], vec![]);
        h.orchestrator = h.orchestrator.with_approvals(approvals);
        h.memory.add_user_message("say hi");

        let reply = h
            .orchestrator
            .process_tool_calls("<tool:shell>echo hi</tool>", &mut h.memory, &mut DebugLog::default())
            .await
            .unwrap();

        assert_eq!(shell.calls(), 0);
        assert!(h.approver.requests().is_empty());
        assert_eq!(reply.extras, vec!["[Tool shell] Command denied by user."]);
        let history: Vec<String> = h.memory.get_messages(Some(0), None).into_iter().map(|m| m.content).collect();
        assert!(history.contains(&"[Tool shell] Command denied by user.".to_string()));
    }

    #[tokio::test]
    async fn denial_does_not_stop_later_directives() {
        let shell = Arc::new(StubTool::shell("done"));
        let mut h = harness(
            vec!["Ran the second one."],
            vec![Box::new(SharedTool(shell.clone()))],
            vec![ApprovalDecision::Denied, ApprovalDecision::Approved],
        );
        h.memory.add_user_message("go");

        let reply = h
            .orchestrator
            .process_tool_calls("<tool:shell>rm -rf /</tool><tool:shell>ls</tool>", &mut h.memory, &mut DebugLog::default())
            .await
            .unwrap();
        assert_eq!(reply.extras, vec!["[Tool shell] Command denied by user.", "done"]);
        assert_eq!(shell.calls(), 1);
        assert_eq!(h.approver.requests(), vec!["rm -rf /", "ls"]);
    }

    #[tokio::test]
    async fn approve_all_carries_across_calls() {
        let shell = Arc::new(StubTool::shell("ok"));
        let mut h = harness(
            vec!["first", "second"],
            vec![Box::new(SharedTool(shell.clone()))],
            vec![ApprovalDecision::ApproveAll],
        );
        h.memory.add_user_message("go");
        let mut log = DebugLog::default();
        h.orchestrator
            .process_tool_calls("<tool:shell>make</tool>", &mut h.memory, &mut log)
            .await
            .unwrap();
        h.orchestrator
            .process_tool_calls("<tool:shell>make test</tool>", &mut h.memory, &mut log)
            .await
            .unwrap();
        assert_eq!(shell.calls(), 2);
        assert_eq!(h.approver.requests().len(), 1);
        assert!(h.orchestrator.approvals().approves_all());
    }

    #[tokio::test]
    async fn loop_stops_at_iteration_limit() {
        let tool = Arc::new(StubTool::ok("ping", "pong"));
        let mut h = harness(
            vec!["<tool:ping>2</tool>", "<tool:ping>3</tool>", "<tool:ping>4</tool><tool:ping>5</tool>"],
            vec![Box::new(SharedTool(tool.clone()))],
            vec![],
        );
        h.memory.add_user_message("go");

        let reply = h
            .orchestrator
            .process_tool_calls("<tool:ping>1</tool>", &mut h.memory, &mut DebugLog::default())
            .await
            .unwrap();

        assert_eq!(h.provider.call_count(), 3);
        assert_eq!(tool.calls(), 3);
        assert_eq!(reply.content, prompts::TOOL_LIMIT_NOTICE);
        assert_eq!(reply.extras.last().map(String::as_str), Some(prompts::TOOL_LIMIT_NOTICE));
    }

    #[tokio::test]
    async fn residual_markup_is_stripped_at_the_limit() {
        let tool = Arc::new(StubTool::ok("ping", "pong"));
        let mut h = harness(vec!["Still going <tool:ping>again</tool>"], vec![Box::new(SharedTool(tool))], vec![]);
        h.orchestrator = h.orchestrator.with_limits(OrchestratorLimits {
            tool_iterations: 1,
            ..OrchestratorLimits::default()
        });
        h.memory.add_user_message("go");

        let reply = h
            .orchestrator
            .process_tool_calls("<tool:ping>1</tool>", &mut h.memory, &mut DebugLog::default())
            .await
            .unwrap();
        assert_eq!(reply.content, "Still going");
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let provider = Arc::new(SequentialMockProvider::with_results(vec![Err(ProviderError::Network(
            "connection refused".into(),
        ))]));
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(StubTool::ok("ping", "pong")));
        let mut orchestrator = ToolCallOrchestrator::new(
            provider,
            Arc::new(registry),
            Arc::new(ScriptedApprover::new(vec![])),
        );
        let mut memory = ConversationMemory::new(MemoryConfig::default());
        memory.add_user_message("go");

        let err = orchestrator
            .process_tool_calls("<tool:ping>1</tool>", &mut memory, &mut DebugLog::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }

    #[tokio::test]
    async fn prompts_include_tool_instructions() {
        let mut h = harness(vec!["hello"], vec![Box::new(StubTool::ok("ping", "pong"))], vec![]);
        h.memory.add_user_message("hi");
        h.orchestrator.respond(&mut h.memory, &mut DebugLog::default()).await.unwrap();

        let prompt = &h.provider.prompts()[0];
        assert!(prompt.iter().any(|m| m.role == Role::System && m.content.starts_with("Available tools:")));
        assert_eq!(prompt.last().map(|m| m.content.as_str()), Some("hi"));
    }

    #[tokio::test]
    async fn router_check_leaves_no_trace() {
        let mut h = harness(vec!["Plan."], vec![], vec![]);
        h.memory.add_user_message("build a website");
        let before = h.memory.snapshot();

        let route = h.orchestrator.route(&mut h.memory, "build a website").await.unwrap();
        assert_eq!(route, Route::Plan);
        assert_eq!(h.memory.snapshot(), before);
        let prompt = &h.provider.prompts()[0];
        assert!(
            prompt
                .iter()
                .any(|m| m.role == Role::System && m.content.contains("User request: 'build a website'"))
        );
        assert_eq!(prompt.last().map(|m| m.content.as_str()), Some("build a website"));
    }

    #[tokio::test]
    async fn router_defaults_to_respond() {
        let mut h = harness(vec!["respond"], vec![], vec![]);
        h.memory.add_user_message("2+2?");
        assert_eq!(h.orchestrator.route(&mut h.memory, "2+2?").await.unwrap(), Route::Respond);
    }

    #[tokio::test]
    async fn plan_only_rolls_memory_back() {
        let mut h = harness(vec!["1. one\n2. two"], vec![], vec![]);
        h.memory.add_system_message("seed");
        let before = h.memory.snapshot();
        let mut log = DebugLog::new(true);

        let plan = h.orchestrator.plan_only(&mut h.memory, "do things", &mut log).await.unwrap();
        assert_eq!(plan, "1. one\n2. two");
        assert_eq!(h.memory.snapshot(), before);
        assert!(log.lines()[0].starts_with("[DEBUG] Planning time: "));
    }

    #[tokio::test]
    async fn plan_steps_complete_and_fail_independently() {
        let mut h = harness(
            vec![
                "1. create file a.txt\n2. read file a.txt",
                "Created a.txt",
                "yes",
                "Could not read a.txt",
                "no, the file is empty",
                "Step 1 done, step 2 incomplete.",
            ],
            vec![],
            vec![],
        );
        h.orchestrator = h.orchestrator.with_limits(OrchestratorLimits {
            chain_limit: 25,
            step_retries: 0,
            ..OrchestratorLimits::default()
        });
        h.memory.add_user_message("make and read a.txt");
        let mut log = DebugLog::new(true);

        let run = h
            .orchestrator
            .run_plan(&mut h.memory, "make and read a.txt", &mut log)
            .await
            .unwrap();

        assert_eq!(run.records.len(), 2);
        assert!(run.records[0].completed);
        assert_eq!(run.records[0].attempts, 1);
        assert!(!run.records[1].completed);
        assert_eq!(run.records[1].attempts, 1);
        assert_eq!(run.records[1].state, StepState::Failed);
        assert_eq!(run.reply.content, "Step 1 done, step 2 incomplete.");
        assert_eq!(
            run.reply.extras,
            vec![
                "[Plan Step 1] create file a.txt",
                "[Step 1] Completed in 1 attempt(s).",
                "[Plan Step 2] read file a.txt",
                "[Step 2] Attempt 1 incomplete: no, the file is empty",
                "[Step 2] Failed after 1 attempt(s). Latest outcome: Could not read a.txt",
            ]
        );
        assert_eq!(h.provider.remaining(), 0);

        let summary_prompt = h.provider.last_message_of(5);
        assert!(summary_prompt.contains("Step 1: create file a.txt -> complete | Attempts: 1 | Result: Created a.txt"));
        assert!(summary_prompt.contains("Step 2: read file a.txt -> incomplete | Attempts: 1 | Result: Could not read a.txt"));
        assert!(log.lines().iter().any(|l| l.starts_with("[DEBUG] Agentic planning steps executed: 2")));
    }

    #[tokio::test]
    async fn failing_step_is_attempted_retries_plus_one_times() {
        let mut h = harness(
            vec![
                "1. impossible thing",
                "tried",
                "no, try harder",
                "tried again",
                "no",
                "tried thrice",
                "no\nstill nothing",
                "Could not finish.",
            ],
            vec![],
            vec![],
        );
        h.orchestrator = h.orchestrator.with_limits(OrchestratorLimits {
            step_retries: 2,
            ..OrchestratorLimits::default()
        });
        h.memory.add_user_message("do it");

        let run = h.orchestrator.run_plan(&mut h.memory, "do it", &mut DebugLog::default()).await.unwrap();
        assert_eq!(run.records[0].attempts, 3);
        assert!(!run.records[0].completed);
        assert_eq!(run.reply.content, "Could not finish.");
        assert_eq!(h.provider.remaining(), 0);

        // the second execution prompt carries the first verdict as feedback
        let retry_prompt = h.provider.last_message_of(3);
        assert!(retry_prompt.ends_with("Previous feedback: no, try harder"));
        let prompts = h.provider.prompts();
        assert!(prompts[3].iter().any(|m| m.content.starts_with("Step 'impossible thing' remains incomplete.")));
    }

    #[tokio::test]
    async fn chain_limit_caps_steps() {
        let mut h = harness(vec!["1. a\n2. b\n3. c", "did a", "yes", "summary"], vec![], vec![]);
        h.orchestrator = h.orchestrator.with_limits(OrchestratorLimits {
            chain_limit: 1,
            ..OrchestratorLimits::default()
        });
        h.memory.add_user_message("abc");

        let run = h.orchestrator.run_plan(&mut h.memory, "abc", &mut DebugLog::default()).await.unwrap();
        assert_eq!(run.records.len(), 1);
        assert_eq!(run.reply.content, "summary");
    }

    #[tokio::test]
    async fn empty_plan_is_an_agent_error() {
        let mut h = harness(vec!["I would just do it."], vec![], vec![]);
        h.memory.add_user_message("x");
        let err = h.orchestrator.run_plan(&mut h.memory, "x", &mut DebugLog::default()).await.unwrap_err();
        assert!(matches!(err, Error::Agent(AgentError::EmptyPlan { .. })));
    }

    #[tokio::test]
    async fn handle_forced_plan_skips_router() {
        let mut h = harness(vec!["1. only step", "done", "yes", "All done."], vec![], vec![]);
        h.memory.add_user_message("task");
        let reply = h
            .orchestrator
            .handle(&mut h.memory, "task", true, &mut DebugLog::default())
            .await
            .unwrap();
        assert_eq!(reply.content, "All done.");
        assert!(!h.provider.last_message_of(0).contains("Reply with only one word"));
    }

    #[test]
    fn preview_truncates_long_args() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(45);
        assert_eq!(preview(&long), format!("{}…", "x".repeat(40)));
    }
}
