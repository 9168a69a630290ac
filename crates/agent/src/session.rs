//! The session: Steward's main inbound pump.
//!
//! Reads one message at a time from the shared channel and answers every
//! user request with exactly one `assistant` or `error` message. Nested
//! exchanges (shell approval, editor queries) happen on the same channel
//! while a request is in flight; the channel lock is never held across
//! request handling so they can take it.

use steward_core::error::{AgentError, Error};
use steward_core::identity::Identity;
use steward_channels::{Inbound, MessageMode, Outbound, SharedChannel};
use steward_memory::ConversationMemory;
use tracing::{debug, info, warn};

use crate::orchestrator::{DebugLog, ToolCallOrchestrator};
use crate::prompts;

const PLAN_COMMAND: &str = "/plan";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

pub struct Session {
    channel: SharedChannel,
    orchestrator: ToolCallOrchestrator,
    memory: ConversationMemory,
    identity: Identity,
    debug_metrics: bool,
    force_plan: bool,
    connection_check: bool,
}

impl Session {
    /// Create a session and seed `memory` with the identity prompts.
    pub fn new(
        channel: SharedChannel,
        orchestrator: ToolCallOrchestrator,
        memory: ConversationMemory,
        identity: Identity,
    ) -> Self {
        let mut session = Self {
            channel,
            orchestrator,
            memory,
            identity,
            debug_metrics: false,
            force_plan: false,
            connection_check: true,
        };
        session.seed_memory();
        session
    }

    pub fn with_debug_metrics(mut self, enabled: bool) -> Self {
        self.debug_metrics = enabled;
        self
    }

    /// Skip the provider ping before `ready`.
    pub fn without_connection_check(mut self) -> Self {
        self.connection_check = false;
        self
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn debug_metrics(&self) -> bool {
        self.debug_metrics
    }

    /// Run until the host closes the channel, asks to shut down, or the
    /// user ends the session. A failed connection check is reported to the
    /// host and returned.
    pub async fn run(&mut self) -> Result<(), Error> {
        if self.connection_check {
            if let Err(e) = self.orchestrator.provider().health_check().await {
                warn!(error = %e, "LLM connection check failed");
                self.send(Outbound::error(format!("LLM connection failed: {e}"))).await?;
                return Err(e.into());
            }
        }

        self.send(Outbound::Ready {
            debug: self.debug_metrics,
        })
        .await?;
        info!(tools = self.orchestrator.tools().len(), "Session ready");

        loop {
            let next = { self.channel.lock().await.next_message().await? };
            let Some(envelope) = next else {
                info!("Host closed the channel");
                break;
            };
            if self.dispatch(Inbound::from_envelope(&envelope)).await? == Flow::Stop {
                break;
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, inbound: Inbound) -> Result<Flow, Error> {
        match inbound {
            Inbound::ShellApprovalResponse { id, .. } | Inbound::EditorQueryResponse { id, .. } => {
                debug!(?id, "Response with no waiter, ignoring");
                Ok(Flow::Continue)
            }
            Inbound::Shutdown => {
                info!("Shutdown requested");
                self.send(Outbound::notification("Shutting down.")).await?;
                Ok(Flow::Stop)
            }
            Inbound::ToggleDebug => {
                self.toggle_debug().await?;
                Ok(Flow::Continue)
            }
            Inbound::Unknown { kind } => {
                warn!(kind = %kind, "Unknown inbound message type");
                self.send(Outbound::error(format!("Unknown action '{kind}'."))).await?;
                Ok(Flow::Continue)
            }
            Inbound::Message { content, mode } => self.handle_message(content, mode).await,
        }
    }

    async fn handle_message(&mut self, content: String, mode: MessageMode) -> Result<Flow, Error> {
        if content.is_empty() {
            self.send(Outbound::error("Empty message.")).await?;
            return Ok(Flow::Continue);
        }
        if matches!(content.to_lowercase().as_str(), "exit" | "quit") {
            self.send(Outbound::notification("Session closed.")).await?;
            return Ok(Flow::Stop);
        }

        match content.as_str() {
            "!tools" => {
                let listing = self
                    .orchestrator
                    .tools()
                    .descriptions()
                    .into_iter()
                    .map(|(name, description)| format!("- {name}: {description}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                let listing = if listing.is_empty() {
                    "No tools available.".to_string()
                } else {
                    listing
                };
                return self.reply(listing, Vec::new(), Vec::new()).await;
            }
            "!new" => {
                self.memory.clear();
                self.seed_memory();
                info!("Memory cleared");
                return self.reply("[Memory cleared]", Vec::new(), Vec::new()).await;
            }
            "!debug" => {
                self.toggle_debug().await?;
                return Ok(Flow::Continue);
            }
            _ => {}
        }

        if let Some(command) = content.strip_prefix('!') {
            return self.run_tool_command(command).await;
        }

        let mut input = content;
        if input.trim().to_lowercase().starts_with(PLAN_COMMAND) {
            input = input.trim()[PLAN_COMMAND.len()..].trim().to_string();
            self.force_plan = true;
            if input.is_empty() {
                return self.reply(prompts::FORCE_PLAN_ARMED, Vec::new(), Vec::new()).await;
            }
        }
        if mode == MessageMode::Plan {
            self.force_plan = true;
        }

        let mut debug_log = DebugLog::new(self.debug_metrics);
        // a plan-only request consumes an armed `/plan` as well
        let force_plan = std::mem::take(&mut self.force_plan);

        if mode == MessageMode::PlanOnly {
            return match self.orchestrator.plan_only(&mut self.memory, &input, &mut debug_log).await {
                Ok(plan) => self.reply(plan, debug_log.into_lines(), Vec::new()).await,
                Err(e) => self.report(e.into(), debug_log).await,
            };
        }

        self.memory.add_user_message(input.as_str());
        match self
            .orchestrator
            .handle(&mut self.memory, &input, force_plan, &mut debug_log)
            .await
        {
            Ok(reply) => self.reply(reply.content, debug_log.into_lines(), reply.extras).await,
            Err(e) => self.report(e, debug_log).await,
        }
    }

    /// `!name args`: run a tool directly and return its output verbatim.
    async fn run_tool_command(&mut self, command: &str) -> Result<Flow, Error> {
        let (name, args) = match command.trim().split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (command.trim(), ""),
        };
        let output = match self.orchestrator.tools().lookup(name) {
            Some(tool) => match tool.invoke(args).await {
                Ok(output) => output,
                Err(e) => format!("Tool '{name}' failed: {e}"),
            },
            None => format!("Tool '{name}' not found."),
        };
        self.reply(output, Vec::new(), Vec::new()).await
    }

    async fn report(&mut self, error: Error, debug_log: DebugLog) -> Result<Flow, Error> {
        match error {
            Error::Agent(AgentError::EmptyPlan { .. }) => {
                self.reply(prompts::NO_PLAN_STEPS, debug_log.into_lines(), Vec::new()).await
            }
            Error::Provider(e) => {
                warn!(error = %e, "LLM request failed");
                self.send(Outbound::error(format!("LLM request failed: {e}"))).await?;
                Ok(Flow::Continue)
            }
            Error::Channel(e) => Err(e.into()),
            other => {
                warn!(error = %other, "Request failed");
                self.send(Outbound::error(other.to_string())).await?;
                Ok(Flow::Continue)
            }
        }
    }

    async fn toggle_debug(&mut self) -> Result<(), Error> {
        self.debug_metrics = !self.debug_metrics;
        let state = if self.debug_metrics { "enabled" } else { "disabled" };
        self.send(Outbound::Notification {
            content: format!("Debug metrics {state}."),
            debug: Some(self.debug_metrics),
        })
        .await
    }

    fn seed_memory(&mut self) {
        for prompt in self.identity.seed_prompts(self.orchestrator.tools()) {
            self.memory.add_system_message(prompt);
        }
    }

    async fn reply(&self, content: impl Into<String>, debug: Vec<String>, extras: Vec<String>) -> Result<Flow, Error> {
        self.send(Outbound::assistant(content, debug, extras)).await?;
        Ok(Flow::Continue)
    }

    async fn send(&self, message: Outbound) -> Result<(), Error> {
        self.channel.lock().await.send(&message).await?;
        Ok(())
    }
}
