//! Leaf task that delegates to a single agent.

use crate::agent::{Agent, Capabilities, Message, ResolvedApis, Toolbox};
use crate::error::TaskFault;
use crate::response::{TaskResponse, CODE_FAILURE};
use crate::task::{ExecutionContext, Task, TaskIdentity, TaskInputs};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of asking the agent for messages.
pub(crate) enum Generation {
    /// Agent produced at least one message
    Messages(Vec<Message>),
    /// Agent failed or produced nothing; the response is already built
    Failed(TaskResponse),
}

/// Task that hands its inputs to an agent and returns the generated messages.
///
/// Tools are sub-tasks the agent may call while generating. They are only
/// offered to the agent, and only checked for availability, when the task's
/// capabilities include `has_functions`.
pub struct PromptAgentTask {
    pub(crate) identity: TaskIdentity,
    agent: Arc<dyn Agent>,
    capabilities: Capabilities,
    tools: BTreeMap<String, Arc<Task>>,
}

impl PromptAgentTask {
    /// Creates a prompt task backed by `agent`.
    pub fn new(identity: TaskIdentity, agent: Arc<dyn Agent>) -> Self {
        Self {
            identity,
            agent,
            capabilities: Capabilities::default(),
            tools: BTreeMap::new(),
        }
    }

    /// Sets the capability flags of the agent.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Adds a tool sub-task under `name`.
    pub fn with_tool(mut self, name: impl Into<String>, tool: impl Into<Arc<Task>>) -> Self {
        self.tools.insert(name.into(), tool.into());
        self
    }

    pub fn identity(&self) -> &TaskIdentity {
        &self.identity
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn tools(&self) -> &BTreeMap<String, Arc<Task>> {
        &self.tools
    }

    /// Tools the agent may call; empty unless `has_functions` is set.
    pub fn callable_tools(&self) -> impl Iterator<Item = &Arc<Task>> {
        let enabled = self.capabilities.has_functions;
        self.tools.values().filter(move |_| enabled)
    }

    pub fn agent(&self) -> &Arc<dyn Agent> {
        &self.agent
    }

    pub(crate) async fn run(
        &self,
        context: &ExecutionContext,
        prepared: &TaskInputs,
        recorded: &TaskInputs,
    ) -> Result<TaskResponse, TaskFault> {
        match self.generate(context, prepared, recorded).await? {
            Generation::Messages(messages) => Ok(TaskResponse::success(
                self.identity.response_identity(),
                recorded.clone(),
                messages,
            )),
            Generation::Failed(response) => Ok(response),
        }
    }

    /// Resolves the task's APIs and asks the agent for messages.
    ///
    /// API resolution failures are faults; agent failures and empty output
    /// are ordinary failed responses.
    pub(crate) async fn generate(
        &self,
        context: &ExecutionContext,
        prepared: &TaskInputs,
        recorded: &TaskInputs,
    ) -> Result<Generation, TaskFault> {
        let mut apis = ResolvedApis::new();
        for api in &self.identity.required_apis {
            apis.insert(api.clone(), context.registry().resolve(api)?);
        }

        let generated = if self.capabilities.has_functions {
            let tools = Toolbox::new(&self.tools, context);
            self.agent.generate_with_tools(prepared, &apis, tools).await
        } else {
            self.agent.generate(prepared, &apis).await
        };
        let messages = match generated {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(task = %self.identity.key, agent = self.agent.name(), error = %e, "agent failed");
                return Ok(Generation::Failed(TaskResponse::failure(
                    self.identity.response_identity(),
                    recorded.clone(),
                    CODE_FAILURE,
                    format!("Agent '{}' failed: {}", self.agent.name(), e),
                )));
            }
        };

        if messages.is_empty() {
            tracing::warn!(task = %self.identity.key, agent = self.agent.name(), "no messages returned from agent");
            return Ok(Generation::Failed(TaskResponse::failure(
                self.identity.response_identity(),
                recorded.clone(),
                CODE_FAILURE,
                format!("No messages returned from agent '{}'", self.agent.name()),
            )));
        }

        Ok(Generation::Messages(messages))
    }
}

impl std::fmt::Debug for PromptAgentTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptAgentTask")
            .field("key", &self.identity.key)
            .field("agent", &self.agent.name())
            .field("capabilities", &self.capabilities)
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}
