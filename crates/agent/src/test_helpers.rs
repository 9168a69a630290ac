//! Shared test doubles for orchestrator and session tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use steward_core::approval::{ApprovalDecision, ShellApprover};
use steward_core::error::{ChannelError, ProviderError, ToolError};
use steward_core::message::PromptMessage;
use steward_core::provider::{Provider, ProviderRequest, ProviderResponse};
use steward_core::tool::Tool;
use tokio_util::sync::CancellationToken;

/// A mock provider that returns a sequence of scripted replies and
/// records every prompt it was sent.
///
/// Panics if more calls are made than replies provided.
pub struct SequentialMockProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<Vec<PromptMessage>>>,
}

impl SequentialMockProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub fn with_results(replies: impl IntoIterator<Item = Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<Vec<PromptMessage>> {
        self.prompts.lock().unwrap().clone()
    }

    /// Content of the last message of the `n`th prompt.
    pub fn last_message_of(&self, n: usize) -> String {
        self.prompts.lock().unwrap()[n]
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(request.messages);
            prompts.len()
        };
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("SequentialMockProvider: no reply scripted for call #{call}"));
        reply.map(|content| ProviderResponse {
            content,
            model: "mock-model".into(),
        })
    }
}

/// Answers approval requests from a script and records what was asked.
pub struct ScriptedApprover {
    answers: Mutex<VecDeque<Result<ApprovalDecision, ChannelError>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedApprover {
    pub fn new(answers: Vec<Result<ApprovalDecision, ChannelError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShellApprover for ScriptedApprover {
    async fn request_approval(
        &self,
        command: &str,
        _cancel: &CancellationToken,
    ) -> Result<ApprovalDecision, ChannelError> {
        self.requests.lock().unwrap().push(command.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedApprover: unexpected request for '{command}'"))
    }
}

/// A tool that returns a fixed output and counts invocations.
pub struct StubTool {
    name: &'static str,
    output: Result<&'static str, &'static str>,
    gated: bool,
    calls: AtomicUsize,
}

impl StubTool {
    pub fn ok(name: &'static str, output: &'static str) -> Self {
        Self {
            name,
            output: Ok(output),
            gated: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &'static str, reason: &'static str) -> Self {
        Self {
            output: Err(reason),
            ..Self::ok(name, "")
        }
    }

    /// A shell-class stub.
    pub fn shell(output: &'static str) -> Self {
        Self {
            gated: true,
            ..Self::ok("shell", output)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for StubTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "stub"
    }

    fn requires_approval(&self) -> bool {
        self.gated
    }

    async fn invoke(&self, _arguments: &str) -> Result<String, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output
            .map(str::to_string)
            .map_err(|reason| ToolError::ExecutionFailed {
                tool_name: self.name.into(),
                reason: reason.into(),
            })
    }
}

/// Lets a test keep a handle on a tool after the registry takes ownership.
pub struct SharedTool(pub std::sync::Arc<StubTool>);

#[async_trait]
impl Tool for SharedTool {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    fn requires_approval(&self) -> bool {
        self.0.requires_approval()
    }

    async fn invoke(&self, arguments: &str) -> Result<String, ToolError> {
        self.0.invoke(arguments).await
    }
}
